//! # Terminator Generator
//!
//! Traces the circle of constant apparent altitude around a body's sub-point
//! (sunset line, twilight limits, moonrise line) in pixel space.
//!
//! The curve is built in the body's own frame: the sub-point sits at a
//! quarter of the raster width, and the caller shifts the result by
//! [`lon_to_x`](crate::projection::lon_to_x) of the body's longitude when it
//! composites.
//!
//! One sampler walks the hour angle around the circle and emits a sequence of
//! [`TraceEvent`]s; each time the curve leaves one side of the raster and
//! comes back on the other it emits a [`Seam`]. Two finishing stages consume
//! that sequence:
//!
//! - [`close_ring`] turns seams into raster corners so the below-threshold
//!   cap becomes one fillable polygon (night, twilight bands)
//! - [`split_runs`] cuts the curve at seams into open polylines (moon arc)
//!
//! Permanent day or night at the poles needs no special case: when the curve
//! never crosses the seam no corners are added and the sampled loop is
//! already a closed ring.

use crate::coords::ecl_to_equ;
use crate::projection::{check_range, GeometryError, RasterSize};
use embedded_graphics::prelude::Point;
use std::f64::consts::{PI, TAU};

/// Sun's apparent altitude at rise and set: −50′ (refraction plus
/// semi-diameter), radians.
pub const SUN_RISE_SET_ALTITUDE: f64 = -0.014_543_828_656_9;

/// Apparent altitude at rise and set for a point source, −34′ of refraction,
/// radians. Used for the Moon's visibility line.
pub const STANDARD_RISE_SET_ALTITUDE: f64 = -0.009_890_780_871_05;

/// Twilight limits, radians.
pub const CIVIL_TWILIGHT_ALTITUDE: f64 = -6.0 / 180.0 * PI;
pub const NAUTICAL_TWILIGHT_ALTITUDE: f64 = -12.0 / 180.0 * PI;
pub const ASTRONOMICAL_TWILIGHT_ALTITUDE: f64 = -18.0 / 180.0 * PI;

/// One sample per degree of hour angle.
pub const DEFAULT_SAMPLES: usize = 360;

/// Which pole's cap a seam crossing closes over.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Seam {
    /// Closed across the top edge: `(0, 0)` then `(w-1, 0)`
    North,
    /// Closed across the bottom edge: `(w-1, h-1)` then `(0, h-1)`
    South,
}

/// Output of the sampler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Point(Point),
    Seam(Seam),
}

/// A finished terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TerminatorCurve {
    /// Closed polygon around the below-threshold cap
    Ring(Vec<Point>),
    /// Disjoint open polylines, each at least two points long
    Polylines(Vec<Vec<Point>>),
}

impl TerminatorCurve {
    /// Every point in the curve, in order.
    pub fn points(&self) -> Box<dyn Iterator<Item = Point> + '_> {
        match self {
            TerminatorCurve::Ring(ring) => Box::new(ring.iter().copied()),
            TerminatorCurve::Polylines(runs) => Box::new(runs.iter().flatten().copied()),
        }
    }
}

/// Build the terminator for a body at `sub_latitude` (degrees) and an
/// altitude threshold (radians), at the default one-degree resolution.
pub fn terminator(
    sub_latitude: f64,
    altitude: f64,
    size: RasterSize,
    as_polygon: bool,
) -> Result<TerminatorCurve, GeometryError> {
    terminator_with_samples(sub_latitude, altitude, size, as_polygon, DEFAULT_SAMPLES)
}

/// [`terminator`] with an explicit number of hour-angle samples.
pub fn terminator_with_samples(
    sub_latitude: f64,
    altitude: f64,
    size: RasterSize,
    as_polygon: bool,
    samples: usize,
) -> Result<TerminatorCurve, GeometryError> {
    let events = sample(sub_latitude, altitude, size, samples)?;
    Ok(if as_polygon {
        TerminatorCurve::Ring(close_ring(&events, size))
    } else {
        TerminatorCurve::Polylines(split_runs(&events))
    })
}

/// Walk the constant-altitude circle and report points and seam crossings.
///
/// The circle is the ecliptic-to-equatorial rotation of a small circle at
/// latitude `altitude`, using `sub_latitude − 90°` as the tilt. Seam tests
/// use strict inequalities: at a threshold of exactly zero over the equator
/// neither test fires.
pub fn sample(
    sub_latitude: f64,
    altitude: f64,
    size: RasterSize,
    samples: usize,
) -> Result<Vec<TraceEvent>, GeometryError> {
    if samples == 0 {
        return Err(GeometryError::NoSamples);
    }
    check_range("sub-latitude", sub_latitude, -90.0, 90.0)?;
    check_range("altitude threshold", altitude, -PI / 2.0, PI / 2.0)?;

    let w = size.width() as i32;
    let h = size.height() as f64;
    let lat = sub_latitude / 180.0 * PI;
    let tilt = lat - PI / 2.0;
    let step = 360.0 / samples as f64;

    let mut events = Vec::with_capacity(samples + 2);
    let mut prev_x = if lat < 0.0 { w } else { -1 };

    for i in 0..samples {
        let hour_angle = i as f64 * step / 180.0 * PI;
        let eq = ecl_to_equ(hour_angle, altitude, tilt);
        let x = (eq.right_ascension / TAU * w as f64).round_ties_even() as i32;
        let y = ((0.5 - eq.declination / PI) * h).round_ties_even() as i32;

        if lat < altitude {
            if x > prev_x {
                events.push(TraceEvent::Seam(Seam::North));
            }
        } else if lat > -altitude && x < prev_x {
            events.push(TraceEvent::Seam(Seam::South));
        }
        events.push(TraceEvent::Point(Point::new(x, y)));
        prev_x = x;
    }

    Ok(events)
}

/// Replace seams with the raster corners of the matching pole.
pub fn close_ring(events: &[TraceEvent], size: RasterSize) -> Vec<Point> {
    let right = size.width() as i32 - 1;
    let bottom = size.height() as i32 - 1;
    let mut ring = Vec::with_capacity(events.len() + 4);
    for event in events {
        match *event {
            TraceEvent::Point(p) => ring.push(p),
            TraceEvent::Seam(Seam::North) => {
                ring.extend([Point::new(0, 0), Point::new(right, 0)]);
            }
            TraceEvent::Seam(Seam::South) => {
                ring.extend([Point::new(right, bottom), Point::new(0, bottom)]);
            }
        }
    }
    ring
}

/// Cut the trace at every seam; runs shorter than two points are dropped.
pub fn split_runs(events: &[TraceEvent]) -> Vec<Vec<Point>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for event in events {
        match *event {
            TraceEvent::Point(p) => current.push(p),
            TraceEvent::Seam(_) => {
                let run = std::mem::take(&mut current);
                if run.len() > 1 {
                    runs.push(run);
                }
            }
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(w: i32, h: i32) -> RasterSize {
        RasterSize::new(w, h).unwrap()
    }

    fn seams(events: &[TraceEvent]) -> Vec<Seam> {
        events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Seam(s) => Some(*s),
                TraceEvent::Point(_) => None,
            })
            .collect()
    }

    #[test]
    fn southern_sun_closes_over_the_north_pole() {
        let s = size(360, 180);
        let events = sample(-5.0, SUN_RISE_SET_ALTITUDE, s, DEFAULT_SAMPLES).unwrap();
        assert_eq!(seams(&events), vec![Seam::North]);

        let ring = close_ring(&events, s);
        assert_eq!(ring.len(), 362);
        assert!(ring.contains(&Point::new(0, 0)));
        assert!(ring.contains(&Point::new(359, 0)));
    }

    #[test]
    fn northern_sun_closes_over_the_south_pole() {
        let s = size(360, 180);
        let events = sample(5.0, SUN_RISE_SET_ALTITUDE, s, DEFAULT_SAMPLES).unwrap();
        assert_eq!(seams(&events), vec![Seam::South]);

        let TerminatorCurve::Ring(ring) = terminator(5.0, SUN_RISE_SET_ALTITUDE, s, true).unwrap()
        else {
            panic!("polygon mode returns a ring");
        };
        let corner = ring.iter().position(|p| *p == Point::new(359, 179)).unwrap();
        assert_eq!(ring[corner + 1], Point::new(0, 179));
    }

    #[test]
    fn polar_sun_gives_a_bare_loop() {
        let s = size(360, 180);
        let TerminatorCurve::Ring(ring) = terminator(90.0, 0.0, s, true).unwrap() else {
            panic!("polygon mode returns a ring");
        };
        assert_eq!(ring.len(), DEFAULT_SAMPLES);
        assert!(ring.iter().all(|p| p.y == 90), "equator row");
        assert!(!ring.contains(&Point::new(0, 0)));
        assert!(!ring.contains(&Point::new(359, 179)));
    }

    #[test]
    fn zero_threshold_over_the_equator_inserts_nothing() {
        let events = sample(0.0, 0.0, size(360, 180), DEFAULT_SAMPLES).unwrap();
        assert!(seams(&events).is_empty());
        assert_eq!(events.len(), DEFAULT_SAMPLES);
    }

    #[test]
    fn sampling_resolution_is_configurable() {
        let s = size(720, 360);
        for samples in [1, 90, 720, 1440] {
            let events = sample(12.0, CIVIL_TWILIGHT_ALTITUDE, s, samples).unwrap();
            let points = events
                .iter()
                .filter(|e| matches!(e, TraceEvent::Point(_)))
                .count();
            assert_eq!(points, samples);
        }
        assert_eq!(
            sample(12.0, 0.0, s, 0).unwrap_err(),
            GeometryError::NoSamples
        );
    }

    #[test]
    fn out_of_range_latitude_is_a_contract_violation() {
        let err = terminator(95.0, 0.0, size(10, 10), true).unwrap_err();
        assert!(matches!(err, GeometryError::OutOfRange { .. }));
        assert!(terminator(f64::NAN, 0.0, size(10, 10), true).is_err());
    }

    #[test]
    fn points_stay_within_the_raster_bounds() {
        let s = size(400, 200);
        for lat in [-23.4, -10.0, 0.5, 17.0, 23.4] {
            for alt in [SUN_RISE_SET_ALTITUDE, ASTRONOMICAL_TWILIGHT_ALTITUDE] {
                let curve = terminator(lat, alt, s, true).unwrap();
                for p in curve.points() {
                    assert!((0..=400).contains(&p.x) && (0..=200).contains(&p.y), "{p:?}");
                }
            }
        }
    }

    #[test]
    fn polyline_runs_match_the_seams() {
        let s = size(360, 180);
        for lat in [-40.0, -5.0, 0.0, 5.0, 40.0] {
            let events = sample(lat, STANDARD_RISE_SET_ALTITUDE, s, DEFAULT_SAMPLES).unwrap();
            let runs = split_runs(&events);
            assert!(runs.iter().all(|r| r.len() >= 2), "lat {lat}");
            assert!(runs.len() <= seams(&events).len() + 1);

            // No point is lost except from discarded single-point runs.
            let kept: usize = runs.iter().map(Vec::len).sum();
            assert!(kept + seams(&events).len() + 1 >= DEFAULT_SAMPLES);
        }
    }

    #[test]
    fn seam_splits_the_arc_in_two() {
        let curve = terminator(5.0, STANDARD_RISE_SET_ALTITUDE, size(360, 180), false).unwrap();
        let TerminatorCurve::Polylines(runs) = curve else {
            panic!("polyline mode returns runs");
        };
        assert_eq!(runs.len(), 2);
        assert_eq!(runs.iter().map(Vec::len).sum::<usize>(), DEFAULT_SAMPLES);
    }

    #[test]
    fn consecutive_seams_yield_no_empty_runs() {
        let p = |x| TraceEvent::Point(Point::new(x, 0));
        let events = [
            p(0),
            TraceEvent::Seam(Seam::North),
            TraceEvent::Seam(Seam::North),
            p(1),
            p(2),
            TraceEvent::Seam(Seam::South),
            p(3),
        ];
        assert_eq!(split_runs(&events), vec![vec![Point::new(1, 0), Point::new(2, 0)]]);
    }
}
