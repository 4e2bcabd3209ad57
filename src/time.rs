//! # Time Scales
//!
//! Converts wall-clock UTC instants into the Julian day numbers the ephemeris
//! works in, and estimates ΔT (TT − UT) so positions can be evaluated in
//! dynamical time.
//!
//! ΔT uses the Espenak & Meeus piecewise polynomials (NASA eclipse pages),
//! valid from antiquity through 2150 with a parabolic extrapolation outside.

use chrono::{DateTime, Utc};

/// Julian day of the Unix epoch (1970-01-01T00:00:00Z).
pub const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian day of the J2000.0 epoch (2000-01-01T12:00:00 TT).
pub const J2000_JD: f64 = 2_451_545.0;

/// Days in a Julian century.
pub const DAYS_PER_CENTURY: f64 = 36_525.0;

/// Seconds in a civil day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian day (UT) of a UTC instant, truncated to whole seconds.
pub fn julian_day(instant: &DateTime<Utc>) -> f64 {
    instant.timestamp() as f64 / SECONDS_PER_DAY + UNIX_EPOCH_JD
}

/// Julian centuries since J2000.0.
pub fn julian_centuries(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_CENTURY
}

/// Decimal Gregorian year of a Julian day, good enough for ΔT lookup.
pub fn decimal_year(jd: f64) -> f64 {
    2000.0 + (jd - J2000_JD) / 365.25
}

/// ΔT = TT − UT in seconds for the given Julian day.
pub fn delta_t_seconds(jd: f64) -> f64 {
    let y = decimal_year(jd);

    if y < -500.0 {
        long_term(y)
    } else if y < 500.0 {
        let u = y / 100.0;
        10583.6 - 1014.41 * u + 33.78311 * u.powi(2) - 5.952053 * u.powi(3)
            - 0.1798452 * u.powi(4)
            + 0.022174192 * u.powi(5)
            + 0.0090316521 * u.powi(6)
    } else if y < 1600.0 {
        let u = (y - 1000.0) / 100.0;
        1574.2 - 556.01 * u + 71.23472 * u.powi(2) + 0.319781 * u.powi(3)
            - 0.8503463 * u.powi(4)
            - 0.005050998 * u.powi(5)
            + 0.0083572073 * u.powi(6)
    } else if y < 1700.0 {
        let t = y - 1600.0;
        120.0 - 0.9808 * t - 0.01532 * t.powi(2) + t.powi(3) / 7129.0
    } else if y < 1800.0 {
        let t = y - 1700.0;
        8.83 + 0.1603 * t - 0.0059285 * t.powi(2) + 0.00013336 * t.powi(3)
            - t.powi(4) / 1_174_000.0
    } else if y < 1860.0 {
        let t = y - 1800.0;
        13.72 - 0.332447 * t + 0.0068612 * t.powi(2) + 0.0041116 * t.powi(3)
            - 0.00037436 * t.powi(4)
            + 0.0000121272 * t.powi(5)
            - 0.0000001699 * t.powi(6)
            + 0.000000000875 * t.powi(7)
    } else if y < 1900.0 {
        let t = y - 1860.0;
        7.62 + 0.5737 * t - 0.251754 * t.powi(2) + 0.01680668 * t.powi(3)
            - 0.0004473624 * t.powi(4)
            + t.powi(5) / 233_174.0
    } else if y < 1920.0 {
        let t = y - 1900.0;
        -2.79 + 1.494119 * t - 0.0598939 * t.powi(2) + 0.0061966 * t.powi(3)
            - 0.000197 * t.powi(4)
    } else if y < 1941.0 {
        let t = y - 1920.0;
        21.20 + 0.84493 * t - 0.076100 * t.powi(2) + 0.0020936 * t.powi(3)
    } else if y < 1961.0 {
        let t = y - 1950.0;
        29.07 + 0.407 * t - t.powi(2) / 233.0 + t.powi(3) / 2547.0
    } else if y < 1986.0 {
        let t = y - 1975.0;
        45.45 + 1.067 * t - t.powi(2) / 260.0 - t.powi(3) / 718.0
    } else if y < 2005.0 {
        let t = y - 2000.0;
        63.86 + 0.3345 * t - 0.060374 * t.powi(2)
            + 0.0017275 * t.powi(3)
            + 0.000651814 * t.powi(4)
            + 0.00002373599 * t.powi(5)
    } else if y < 2050.0 {
        let t = y - 2000.0;
        62.92 + 0.32217 * t + 0.005589 * t.powi(2)
    } else if y < 2150.0 {
        long_term(y) - 0.5628 * (2150.0 - y)
    } else {
        long_term(y)
    }
}

/// Morrison & Stephenson long-term parabola.
fn long_term(y: f64) -> f64 {
    let u = (y - 1820.0) / 100.0;
    -20.0 + 32.0 * u * u
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unix_epoch_maps_to_its_julian_day() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(julian_day(&epoch), UNIX_EPOCH_JD);
    }

    #[test]
    fn j2000_noon() {
        let noon = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        assert!((julian_day(&noon) - J2000_JD).abs() < 1e-9);
        assert!(julian_centuries(julian_day(&noon)).abs() < 1e-12);
    }

    #[test]
    fn delta_t_matches_published_values() {
        // Observed ΔT: ~63.8 s in 2000, ~69.4 s in 2020.
        let dt_2000 = delta_t_seconds(J2000_JD);
        assert!((dt_2000 - 63.86).abs() < 1.0, "ΔT(2000) = {dt_2000}");

        let jd_2020 = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let dt_2020 = delta_t_seconds(julian_day(&jd_2020));
        assert!((dt_2020 - 69.4).abs() < 3.0, "ΔT(2020) = {dt_2020}");
    }

    #[test]
    fn delta_t_is_finite_across_extended_range() {
        for year in (-3000..=3000).step_by(50) {
            let jd = J2000_JD + (year as f64 - 2000.0) * 365.25;
            let dt = delta_t_seconds(jd);
            assert!(dt.is_finite(), "ΔT not finite for year {year}");
        }
    }
}
