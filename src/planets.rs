//! # Planetary Positions
//!
//! Geocentric positions of Mercury through Neptune from the JPL "Keplerian
//! Elements for Approximate Positions of the Major Planets" (Standish),
//! table valid 1800–2050 AD. Each element is a mean value at J2000 plus a
//! linear rate per Julian century; positions come out in the J2000 ecliptic
//! and are carried to the ecliptic of date with the general precession in
//! longitude.
//!
//! Accuracy is a fraction of a degree over the validity window and degrades
//! gracefully outside it, which is more than enough for map markers.

use crate::coords::Ecliptic;
use crate::time::julian_centuries;
use std::f64::consts::TAU;
use thiserror::Error;

/// The seven planets whose sub-points the dial shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Planet {
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Planet {
    /// Draw order, innermost first.
    pub const ALL: [Planet; 7] = [
        Planet::Mercury,
        Planet::Venus,
        Planet::Mars,
        Planet::Jupiter,
        Planet::Saturn,
        Planet::Uranus,
        Planet::Neptune,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Planet::Mercury => "Mercury",
            Planet::Venus => "Venus",
            Planet::Mars => "Mars",
            Planet::Jupiter => "Jupiter",
            Planet::Saturn => "Saturn",
            Planet::Uranus => "Uranus",
            Planet::Neptune => "Neptune",
        }
    }

    fn elements(self) -> &'static Elements {
        match self {
            Planet::Mercury => &MERCURY,
            Planet::Venus => &VENUS,
            Planet::Mars => &MARS,
            Planet::Jupiter => &JUPITER,
            Planet::Saturn => &SATURN,
            Planet::Uranus => &URANUS,
            Planet::Neptune => &NEPTUNE,
        }
    }
}

/// Errors from the orbit solver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitError {
    /// Newton iteration on Kepler's equation did not settle
    #[error("Kepler's equation did not converge for {body} (M = {mean_anomaly})")]
    Divergence {
        body: &'static str,
        mean_anomaly: f64,
    },
}

/// Mean orbital elements: (value at J2000, rate per century).
/// a [au], e, I [deg], L [deg], ϖ [deg], Ω [deg].
struct Elements {
    a: (f64, f64),
    e: (f64, f64),
    i: (f64, f64),
    l: (f64, f64),
    peri: (f64, f64),
    node: (f64, f64),
}

const MERCURY: Elements = Elements {
    a: (0.387_099_27, 0.000_000_37),
    e: (0.205_635_93, 0.000_019_06),
    i: (7.004_979_02, -0.005_947_49),
    l: (252.250_323_50, 149_472.674_111_75),
    peri: (77.457_796_28, 0.160_476_89),
    node: (48.330_765_93, -0.125_340_81),
};

const VENUS: Elements = Elements {
    a: (0.723_335_66, 0.000_003_90),
    e: (0.006_776_72, -0.000_041_07),
    i: (3.394_676_05, -0.000_788_90),
    l: (181.979_099_50, 58_517.815_387_29),
    peri: (131.602_467_18, 0.002_683_29),
    node: (76.679_842_55, -0.277_694_18),
};

const EARTH_MOON_BARYCENTER: Elements = Elements {
    a: (1.000_002_61, 0.000_005_62),
    e: (0.016_711_23, -0.000_043_92),
    i: (-0.000_015_31, -0.012_946_68),
    l: (100.464_571_66, 35_999.372_449_81),
    peri: (102.937_681_93, 0.323_273_64),
    node: (0.0, 0.0),
};

const MARS: Elements = Elements {
    a: (1.523_710_34, 0.000_018_47),
    e: (0.093_394_10, 0.000_078_82),
    i: (1.849_691_42, -0.008_131_31),
    l: (-4.553_432_05, 19_140.302_684_99),
    peri: (-23.943_629_59, 0.444_410_88),
    node: (49.559_538_91, -0.292_573_43),
};

const JUPITER: Elements = Elements {
    a: (5.202_887_00, -0.000_116_07),
    e: (0.048_386_24, -0.000_132_53),
    i: (1.304_396_95, -0.001_837_14),
    l: (34.396_440_51, 3_034.746_127_75),
    peri: (14.728_479_83, 0.212_526_68),
    node: (100.473_909_09, 0.204_691_06),
};

const SATURN: Elements = Elements {
    a: (9.536_675_94, -0.001_250_60),
    e: (0.053_861_79, -0.000_509_91),
    i: (2.485_991_87, 0.001_936_09),
    l: (49.954_244_23, 1_222.493_622_01),
    peri: (92.598_878_31, -0.418_972_16),
    node: (113.662_424_48, -0.288_677_94),
};

const URANUS: Elements = Elements {
    a: (19.189_164_64, -0.001_961_76),
    e: (0.047_257_44, -0.000_043_97),
    i: (0.772_637_83, -0.002_429_39),
    l: (313.238_104_51, 428.482_027_85),
    peri: (170.954_276_30, 0.408_052_81),
    node: (74.016_925_03, 0.042_405_89),
};

const NEPTUNE: Elements = Elements {
    a: (30.069_922_76, 0.000_262_91),
    e: (0.008_590_48, 0.000_051_05),
    i: (1.770_043_47, 0.000_353_72),
    l: (-55.120_029_69, 218.459_453_25),
    peri: (44.964_762_27, -0.322_414_64),
    node: (131.784_225_74, -0.005_086_64),
};

/// Light travel time for one astronomical unit, days.
const LIGHT_TIME_DAYS_PER_AU: f64 = 0.005_775_518_3;

/// General precession in longitude, degrees per Julian century.
const PRECESSION_DEG_PER_CENTURY: f64 = 1.396_971_3;

const KEPLER_TOLERANCE: f64 = 1e-12;
const KEPLER_MAX_ITERATIONS: usize = 30;

/// Geocentric ecliptic position of a planet, mean equinox of date, corrected
/// for light time. Nutation is left to the caller.
pub fn geocentric_ecliptic(planet: Planet, jde: f64) -> Result<Ecliptic, OrbitError> {
    let earth = heliocentric(&EARTH_MOON_BARYCENTER, "Earth", jde)?;

    // Evaluate the planet where it was when the light left it.
    let mut tau = 0.0;
    let mut geo = [0.0; 3];
    for _ in 0..2 {
        let body = heliocentric(planet.elements(), planet.name(), jde - tau)?;
        geo = [body[0] - earth[0], body[1] - earth[1], body[2] - earth[2]];
        let distance = (geo[0] * geo[0] + geo[1] * geo[1] + geo[2] * geo[2]).sqrt();
        tau = distance * LIGHT_TIME_DAYS_PER_AU;
    }

    let longitude = geo[1].atan2(geo[0])
        + (PRECESSION_DEG_PER_CENTURY * julian_centuries(jde)).to_radians();
    let latitude = geo[2].atan2((geo[0] * geo[0] + geo[1] * geo[1]).sqrt());

    Ok(Ecliptic {
        longitude: longitude.rem_euclid(TAU),
        latitude,
    })
}

/// Heliocentric J2000 ecliptic rectangular coordinates, au.
fn heliocentric(el: &Elements, body: &'static str, jd: f64) -> Result<[f64; 3], OrbitError> {
    let t = julian_centuries(jd);
    let at = |(v0, rate): (f64, f64)| v0 + rate * t;

    let a = at(el.a);
    let e = at(el.e);
    let i = at(el.i).to_radians();
    let node = at(el.node).to_radians();
    let peri = at(el.peri).to_radians();
    let arg_peri = peri - node;
    let mean_anomaly = (at(el.l).to_radians() - peri).rem_euclid(TAU);

    let ecc_anomaly = solve_kepler(mean_anomaly, e).ok_or(OrbitError::Divergence {
        body,
        mean_anomaly,
    })?;

    // Orbital plane, x towards perihelion
    let xp = a * (ecc_anomaly.cos() - e);
    let yp = a * (1.0 - e * e).sqrt() * ecc_anomaly.sin();

    let (sw, cw) = arg_peri.sin_cos();
    let (so, co) = node.sin_cos();
    let (si, ci) = i.sin_cos();

    Ok([
        (cw * co - sw * so * ci) * xp + (-sw * co - cw * so * ci) * yp,
        (cw * so + sw * co * ci) * xp + (-sw * so + cw * co * ci) * yp,
        (sw * si) * xp + (cw * si) * yp,
    ])
}

/// Newton-Raphson on E − e·sin E = M. `None` if it fails to settle.
fn solve_kepler(mean_anomaly: f64, e: f64) -> Option<f64> {
    let mut ecc_anomaly = if e < 0.8 { mean_anomaly } else { std::f64::consts::PI };
    for _ in 0..KEPLER_MAX_ITERATIONS {
        let delta = (ecc_anomaly - e * ecc_anomaly.sin() - mean_anomaly)
            / (1.0 - e * ecc_anomaly.cos());
        ecc_anomaly -= delta;
        if !ecc_anomaly.is_finite() {
            return None;
        }
        if delta.abs() < KEPLER_TOLERANCE {
            return Some(ecc_anomaly);
        }
    }
    None
}
