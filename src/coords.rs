//! # Coordinate Frames
//!
//! Rotations between the ecliptic and equatorial frames, and the single
//! conversion point from the celestial frame to geographic sub-points.
//!
//! All angles are radians unless a name says otherwise. Callers are expected
//! to pass range-reduced values (right ascension and sidereal time in
//! `[0, 2π)`, declination and latitudes in `[-π/2, π/2]`); anything else is a
//! contract violation and is only caught by debug assertions.

use crate::SubPoint;
use std::f64::consts::TAU;

/// Ecliptic longitude/latitude pair, radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ecliptic {
    pub longitude: f64,
    pub latitude: f64,
}

/// Right ascension/declination pair, radians.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Equatorial {
    pub right_ascension: f64,
    pub declination: f64,
}

/// Rotate ecliptic coordinates into the equatorial frame about the x axis.
///
/// Right ascension is reduced into `[0, 2π)`. The terminator generator reuses
/// this rotation with a synthetic "obliquity" to tilt a constant-altitude
/// circle into the sub-solar frame, so the operation order is kept stable.
pub fn ecl_to_equ(longitude: f64, latitude: f64, obliquity: f64) -> Equatorial {
    let cose = obliquity.cos();
    let sine = obliquity.sin();
    let sinl = longitude.sin();
    let ra = (sinl * cose - latitude.tan() * sine).atan2(longitude.cos());
    let dec = (latitude.sin() * cose + latitude.cos() * sine * sinl).asin();
    Equatorial {
        right_ascension: ra.rem_euclid(TAU),
        declination: dec,
    }
}

/// Geographic point directly beneath a body.
///
/// Latitude is the declination in degrees. Longitude is the hour angle of
/// Greenwich measured westward, reduced once into `[0, 360)` and then folded
/// into `(-180, 180]`.
pub fn equ_to_geo(ra: f64, dec: f64, sidereal_time: f64) -> SubPoint {
    debug_assert!(ra.is_finite() && dec.is_finite() && sidereal_time.is_finite());
    let mut longitude = (ra - sidereal_time).to_degrees().rem_euclid(360.0);
    if longitude > 180.0 {
        longitude -= 360.0;
    }
    SubPoint {
        latitude: dec.to_degrees(),
        longitude,
    }
}
