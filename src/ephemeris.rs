//! # Ephemeris Provider and Time Adapter
//!
//! This module turns a wall-clock instant into the equatorial positions of
//! the Sun, the Moon and the seven major planets, plus the Greenwich sidereal
//! time needed to hang them over the map.
//!
//! ## Layers
//!
//! - [`EphemerisProvider`]: the low-level series (ΔT, nutation, obliquity,
//!   sidereal time, solar/lunar ecliptic positions, planetary equatorial
//!   positions) for a given Julian day. The provider is an explicit value
//!   passed to the adapter rather than a shared global.
//! - [`LowPrecisionEphemeris`]: a stateless provider built from the classic
//!   low-precision theories (Meeus, *Astronomical Algorithms*, ch. 12, 22, 25,
//!   47 and the JPL Keplerian table).
//! - [`positions`]: the adapter. UTC → Julian day → dynamical time, then each
//!   body's ecliptic coordinates are rotated into the equatorial frame with
//!   the true obliquity of date.
//!
//! Everything here is a pure function of the instant; nothing is cached
//! between ticks.

use crate::coords::{ecl_to_equ, equ_to_geo, Ecliptic, Equatorial};
use crate::planets::{self, OrbitError, Planet};
use crate::time::{self, julian_centuries, SECONDS_PER_DAY};
use crate::{Body, SubPoint};
use chrono::{DateTime, Utc};
use std::f64::consts::TAU;
use thiserror::Error;

/// Mean obliquity of the ecliptic at J2000, degrees (23°26′, arcseconds
/// added by the series).
const MEAN_OBLIQUITY_J2000_DEG: f64 = 23.0 + 26.0 / 60.0;

/// Errors raised when a position cannot be produced for an instant.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    /// The Julian day handed to the provider is NaN or infinite
    #[error("non-finite Julian day: {jd}")]
    NonFiniteInstant { jd: f64 },

    /// A planetary orbit could not be solved
    #[error("orbit: {0}")]
    Orbit(#[from] OrbitError),
}

/// Nutation in longitude (Δψ) and obliquity (Δε), radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Nutation {
    pub longitude: f64,
    pub obliquity: f64,
}

/// Source of raw ephemeris quantities.
///
/// `jd` arguments are universal-time Julian days, `jde` arguments are
/// dynamical-time Julian days. Angles are radians.
pub trait EphemerisProvider {
    /// ΔT = TT − UT, seconds.
    fn delta_t_seconds(&self, jd: f64) -> Result<f64, EphemerisError>;

    /// Nutation of date. A provider may return zeros.
    fn nutation(&self, jde: f64) -> Result<Nutation, EphemerisError>;

    /// Mean obliquity of the ecliptic.
    fn mean_obliquity(&self, jde: f64) -> Result<f64, EphemerisError>;

    /// Greenwich mean sidereal time in `[0, 2π)`.
    fn mean_sidereal_time(&self, jd: f64) -> Result<f64, EphemerisError>;

    /// Apparent ecliptic position of the Sun.
    fn sun(&self, jde: f64) -> Result<Ecliptic, EphemerisError>;

    /// Apparent ecliptic position of the Moon.
    fn moon(&self, jde: f64, nutation: &Nutation) -> Result<Ecliptic, EphemerisError>;

    /// Apparent equatorial position of a planet.
    fn planet(
        &self,
        planet: Planet,
        jde: f64,
        nutation: &Nutation,
        obliquity: f64,
    ) -> Result<Equatorial, EphemerisError>;
}

/// Stateless low-precision provider; all coefficients are constants.
#[derive(Clone, Copy, Debug, Default)]
pub struct LowPrecisionEphemeris;

impl EphemerisProvider for LowPrecisionEphemeris {
    fn delta_t_seconds(&self, jd: f64) -> Result<f64, EphemerisError> {
        Ok(time::delta_t_seconds(finite(jd)?))
    }

    fn nutation(&self, jde: f64) -> Result<Nutation, EphemerisError> {
        let t = julian_centuries(finite(jde)?);
        let omega = (125.044_52 - 1_934.136_261 * t).to_radians();
        let l_sun = (280.4665 + 36_000.7698 * t).to_radians();
        let l_moon = (218.3165 + 481_267.8813 * t).to_radians();

        let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * l_sun).sin()
            - 0.23 * (2.0 * l_moon).sin()
            + 0.21 * (2.0 * omega).sin();
        let deps = 9.20 * omega.cos() + 0.57 * (2.0 * l_sun).cos()
            + 0.10 * (2.0 * l_moon).cos()
            - 0.09 * (2.0 * omega).cos();

        Ok(Nutation {
            longitude: arcsec(dpsi),
            obliquity: arcsec(deps),
        })
    }

    fn mean_obliquity(&self, jde: f64) -> Result<f64, EphemerisError> {
        let t = julian_centuries(finite(jde)?);
        let seconds = 21.448 - 46.8150 * t - 0.000_59 * t * t + 0.001_813 * t.powi(3);
        Ok(MEAN_OBLIQUITY_J2000_DEG.to_radians() + arcsec(seconds))
    }

    fn mean_sidereal_time(&self, jd: f64) -> Result<f64, EphemerisError> {
        let jd = finite(jd)?;
        let t = julian_centuries(jd);
        let degrees = 280.460_618_37 + 360.985_647_366_29 * (jd - time::J2000_JD)
            + 0.000_387_933 * t * t
            - t.powi(3) / 38_710_000.0;
        Ok(degrees.to_radians().rem_euclid(TAU))
    }

    fn sun(&self, jde: f64) -> Result<Ecliptic, EphemerisError> {
        Ok(Ecliptic {
            longitude: solar_apparent_longitude(finite(jde)?),
            latitude: 0.0,
        })
    }

    fn moon(&self, jde: f64, nutation: &Nutation) -> Result<Ecliptic, EphemerisError> {
        let pos = crate::lunar::moon_position(finite(jde)?);
        Ok(Ecliptic {
            longitude: (pos.lon_deg.to_radians() + nutation.longitude).rem_euclid(TAU),
            latitude: pos.lat_deg.to_radians(),
        })
    }

    fn planet(
        &self,
        planet: Planet,
        jde: f64,
        nutation: &Nutation,
        obliquity: f64,
    ) -> Result<Equatorial, EphemerisError> {
        let ecl = planets::geocentric_ecliptic(planet, finite(jde)?)?;
        Ok(ecl_to_equ(
            ecl.longitude + nutation.longitude,
            ecl.latitude,
            obliquity,
        ))
    }
}

/// Apparent solar longitude (radians, `[0, 2π)`), low-precision theory.
/// Includes aberration and the dominant nutation term.
pub fn solar_apparent_longitude(jde: f64) -> f64 {
    let t = julian_centuries(jde);
    let l0 = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t * t;
    let m = (357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t * t).to_radians();
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t * t) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();
    let omega = (125.04 - 1_934.136 * t).to_radians();
    let apparent = l0 + c - 0.005_69 - 0.004_78 * omega.sin();
    apparent.to_radians().rem_euclid(TAU)
}

/// Time quantities shared by every body at one instant.
#[derive(Clone, Copy, Debug)]
pub struct Epoch {
    /// Wall-clock instant, UTC
    pub instant: DateTime<Utc>,
    /// Julian day (UT)
    pub jd: f64,
    /// Julian ephemeris day (TT)
    pub jde: f64,
    /// Greenwich apparent sidereal time, radians in `[0, 2π)`
    pub sidereal_time: f64,
    /// True obliquity of the ecliptic, radians
    pub obliquity: f64,
    pub nutation: Nutation,
}

/// Equatorial positions of every dial body at one epoch.
#[derive(Clone, Debug)]
pub struct SkyPositions {
    pub epoch: Epoch,
    /// One entry per body, in [`Body::ALL`] order
    pub bodies: Vec<(Body, Equatorial)>,
}

impl SkyPositions {
    /// Geographic sub-points in draw order.
    pub fn sub_points(&self) -> Vec<(Body, SubPoint)> {
        self.bodies
            .iter()
            .map(|&(body, eq)| {
                (
                    body,
                    equ_to_geo(eq.right_ascension, eq.declination, self.epoch.sidereal_time),
                )
            })
            .collect()
    }

    /// Sub-point of one body.
    pub fn sub_point(&self, body: Body) -> Option<SubPoint> {
        self.bodies
            .iter()
            .find(|(b, _)| *b == body)
            .map(|&(_, eq)| equ_to_geo(eq.right_ascension, eq.declination, self.epoch.sidereal_time))
    }
}

/// Derive the epoch (dynamical time, sidereal time, obliquity) for `now`.
pub fn epoch<E: EphemerisProvider + ?Sized>(
    provider: &E,
    now: &DateTime<Utc>,
) -> Result<Epoch, EphemerisError> {
    let jd = time::julian_day(now);
    let jde = jd + provider.delta_t_seconds(jd)? / SECONDS_PER_DAY;
    let nutation = provider.nutation(jde)?;
    let obliquity = provider.mean_obliquity(jde)? + nutation.obliquity;
    let sidereal_time = (provider.mean_sidereal_time(jd)?
        + nutation.longitude * obliquity.cos())
    .rem_euclid(TAU);

    Ok(Epoch {
        instant: *now,
        jd,
        jde,
        sidereal_time,
        obliquity,
        nutation,
    })
}

/// Greenwich apparent sidereal time at `now`, radians.
pub fn sidereal_time<E: EphemerisProvider + ?Sized>(
    provider: &E,
    now: &DateTime<Utc>,
) -> Result<f64, EphemerisError> {
    Ok(epoch(provider, now)?.sidereal_time)
}

/// Equatorial coordinates of the Sun, the Moon and the seven planets at `now`.
pub fn positions<E: EphemerisProvider + ?Sized>(
    provider: &E,
    now: &DateTime<Utc>,
) -> Result<SkyPositions, EphemerisError> {
    let epoch = epoch(provider, now)?;
    let mut bodies = Vec::with_capacity(Body::ALL.len());

    let sun = provider.sun(epoch.jde)?;
    bodies.push((
        Body::Sun,
        ecl_to_equ(sun.longitude, sun.latitude, epoch.obliquity),
    ));

    let moon = provider.moon(epoch.jde, &epoch.nutation)?;
    bodies.push((
        Body::Moon,
        ecl_to_equ(moon.longitude, moon.latitude, epoch.obliquity),
    ));

    for planet in Planet::ALL {
        let eq = provider.planet(planet, epoch.jde, &epoch.nutation, epoch.obliquity)?;
        bodies.push((Body::from(planet), eq));
    }

    log::debug!(
        "positions at {} (JD {:.5}, JDE {:.5}, GAST {:.4} rad)",
        now,
        epoch.jd,
        epoch.jde,
        epoch.sidereal_time
    );

    Ok(SkyPositions { epoch, bodies })
}

fn finite(jd: f64) -> Result<f64, EphemerisError> {
    if jd.is_finite() {
        Ok(jd)
    } else {
        Err(EphemerisError::NonFiniteInstant { jd })
    }
}

fn arcsec(value: f64) -> f64 {
    (value / 3600.0).to_radians()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn equinox_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 3, 0, 0).unwrap()
    }

    #[test]
    fn meeus_example_25a_solar_longitude() {
        // 1992-10-13 0h TD: apparent λ = 199.90895°
        let lambda = solar_apparent_longitude(2_448_908.5).to_degrees();
        assert!((lambda - 199.909).abs() < 0.01, "λ = {lambda}");
    }

    #[test]
    fn meeus_example_12a_sidereal_time() {
        // 1987-04-10 0h UT: θ0 = 13h10m46.3668s = 197.693195°
        let st = LowPrecisionEphemeris
            .mean_sidereal_time(2_446_895.5)
            .unwrap()
            .to_degrees();
        assert!((st - 197.693_195).abs() < 1e-4, "θ0 = {st}");
    }

    #[test]
    fn mean_obliquity_at_j2000() {
        // 23°26'21.448"
        let eps0 = LowPrecisionEphemeris
            .mean_obliquity(time::J2000_JD)
            .unwrap()
            .to_degrees();
        assert!((eps0 - 23.439_291).abs() < 1e-6, "ε0 = {eps0}");
    }

    #[test]
    fn meeus_example_22a_obliquity_and_nutation() {
        // 1987-04-10 0h TD: ε0 = 23°26'27.407", Δψ = −3.788", Δε = +9.443"
        let provider = LowPrecisionEphemeris;
        let eps0 = provider.mean_obliquity(2_446_895.5).unwrap().to_degrees();
        assert!((eps0 - 23.440_946).abs() < 1e-5, "ε0 = {eps0}");

        let nut = provider.nutation(2_446_895.5).unwrap();
        let dpsi = nut.longitude.to_degrees() * 3600.0;
        let deps = nut.obliquity.to_degrees() * 3600.0;
        assert!((dpsi + 3.788).abs() < 0.5, "Δψ = {dpsi}");
        assert!((deps - 9.443).abs() < 0.5, "Δε = {deps}");
    }

    #[test]
    fn rejects_non_finite_julian_days() {
        let err = LowPrecisionEphemeris.sun(f64::NAN).unwrap_err();
        assert!(matches!(err, EphemerisError::NonFiniteInstant { .. }));
        assert!(LowPrecisionEphemeris
            .mean_sidereal_time(f64::INFINITY)
            .is_err());
    }

    #[test]
    fn positions_cover_every_body_in_draw_order() {
        let sky = positions(&LowPrecisionEphemeris, &equinox_2024()).unwrap();
        let order: Vec<Body> = sky.bodies.iter().map(|(b, _)| *b).collect();
        assert_eq!(order, Body::ALL.to_vec());
    }

    #[test]
    fn equinox_sun_sits_on_the_equator() {
        // The March 2024 equinox fell at 03:06 UTC on the 20th.
        let sky = positions(&LowPrecisionEphemeris, &equinox_2024()).unwrap();
        let sun = sky.sub_point(Body::Sun).unwrap();
        assert!(sun.latitude.abs() < 0.1, "sun latitude {}", sun.latitude);
        // 03:00 UTC puts the Sun roughly over 135°E (plus equation of time).
        assert!(
            (sun.longitude - 136.8).abs() < 1.5,
            "sun longitude {}",
            sun.longitude
        );
    }

    #[test]
    fn dynamical_time_runs_ahead_of_universal_time() {
        let ep = epoch(&LowPrecisionEphemeris, &equinox_2024()).unwrap();
        let lead_seconds = (ep.jde - ep.jd) * SECONDS_PER_DAY;
        assert!((lead_seconds - 69.0).abs() < 5.0, "ΔT = {lead_seconds}");
        assert!((0.0..TAU).contains(&ep.sidereal_time));
    }

    #[test]
    fn sub_points_are_in_range() {
        let mut now = equinox_2024();
        for _ in 0..48 {
            let sky = positions(&LowPrecisionEphemeris, &now).unwrap();
            for (body, sub) in sky.sub_points() {
                assert!(
                    (-90.0..=90.0).contains(&sub.latitude),
                    "{body:?} latitude {}",
                    sub.latitude
                );
                assert!(
                    sub.longitude > -180.0 && sub.longitude <= 180.0,
                    "{body:?} longitude {}",
                    sub.longitude
                );
            }
            now += chrono::Duration::minutes(37);
        }
    }
}
