//! Scenario tests for the moon dial binary: whole ticks driven through the
//! library with fixed instants and temporary input files.
