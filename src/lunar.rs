//! Low-precision lunar ephemeris (truncated ELP-2000/82)
//!
//! Main periodic terms of Meeus, *Astronomical Algorithms* ch. 47.
//! Accuracy: ~0.1° in λ, ~0.05° in β, plenty for a sub-point marker that is a
//! few pixels wide.

use crate::time::julian_centuries;

/// Geocentric ecliptic position of the Moon (mean equinox of date).
#[derive(Debug, Clone, Copy)]
pub struct LunarPosition {
    /// Ecliptic longitude (deg, 0–360).
    pub lon_deg: f64,
    /// Ecliptic latitude (deg).
    pub lat_deg: f64,
    /// Geocentric distance (km).
    pub distance_km: f64,
}

// (D, M, M', F, Σl coefficient, Σr coefficient), units 1e-6 deg and 1e-3 km.
const LON_DIST_TERMS: [(i8, i8, i8, i8, f64, f64); 24] = [
    (0, 0, 1, 0, 6_288_774.0, -20_905_355.0),
    (2, 0, -1, 0, 1_274_027.0, -3_699_111.0),
    (2, 0, 0, 0, 658_314.0, -2_955_968.0),
    (0, 0, 2, 0, 213_618.0, -569_925.0),
    (0, 1, 0, 0, -185_116.0, 48_888.0),
    (0, 0, 0, 2, -114_332.0, -3_149.0),
    (2, 0, -2, 0, 58_793.0, 246_158.0),
    (2, -1, -1, 0, 57_066.0, -152_138.0),
    (2, 0, 1, 0, 53_322.0, -170_733.0),
    (2, -1, 0, 0, 45_758.0, -204_586.0),
    (0, 1, -1, 0, -40_923.0, -129_620.0),
    (1, 0, 0, 0, -34_720.0, 108_743.0),
    (0, 1, 1, 0, -30_383.0, 104_755.0),
    (2, 0, 0, -2, 15_327.0, 10_321.0),
    (0, 0, 1, 2, -12_528.0, 0.0),
    (0, 0, 1, -2, 10_980.0, 79_661.0),
    (4, 0, -1, 0, 10_675.0, -34_782.0),
    (0, 0, 3, 0, 10_034.0, -23_210.0),
    (4, 0, -2, 0, 8_548.0, -21_636.0),
    (2, 1, -1, 0, -7_888.0, 24_208.0),
    (2, 1, 0, 0, -6_766.0, 30_824.0),
    (1, 0, -1, 0, -5_163.0, -8_379.0),
    (1, 1, 0, 0, 4_987.0, -16_675.0),
    (2, -1, 1, 0, 4_036.0, -12_831.0),
];

// (D, M, M', F, Σb coefficient), units 1e-6 deg.
const LAT_TERMS: [(i8, i8, i8, i8, f64); 10] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
];

/// Geometric lunar position for a dynamical-time Julian day.
///
/// Nutation is not applied here; the caller adds Δψ to obtain the apparent
/// longitude.
pub fn moon_position(jde: f64) -> LunarPosition {
    let t = julian_centuries(jde);

    // ---------- 1. Fundamental arguments (deg) ----------
    let lp = 218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t * t
        + t.powi(3) / 538_841.0
        - t.powi(4) / 65_194_000.0;
    let d = 297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t * t
        + t.powi(3) / 545_868.0
        - t.powi(4) / 113_065_000.0;
    let m = 357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t * t
        + t.powi(3) / 24_490_000.0;
    let mp = 134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t * t
        + t.powi(3) / 69_699.0
        - t.powi(4) / 14_712_000.0;
    let f = 93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t * t
        - t.powi(3) / 3_526_000.0
        + t.powi(4) / 863_310_000.0;

    // Additive planetary arguments
    let a1 = (119.75 + 131.849 * t).to_radians();
    let a2 = (53.09 + 479_264.290 * t).to_radians();
    let a3 = (313.45 + 481_266.484 * t).to_radians();

    // Earth orbit eccentricity damping for terms involving M
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t * t;
    let ecc = |mult: i8| match mult.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };

    let (d_r, m_r, mp_r, f_r) = (
        d.to_radians(),
        m.to_radians(),
        mp.to_radians(),
        f.to_radians(),
    );
    let arg = |cd: i8, cm: i8, cmp: i8, cf: i8| {
        cd as f64 * d_r + cm as f64 * m_r + cmp as f64 * mp_r + cf as f64 * f_r
    };

    // ---------- 2. Periodic sums ----------
    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(cd, cm, cmp, cf, l, r) in &LON_DIST_TERMS {
        let a = arg(cd, cm, cmp, cf);
        sum_l += l * ecc(cm) * a.sin();
        sum_r += r * ecc(cm) * a.cos();
    }

    let mut sum_b = 0.0;
    for &(cd, cm, cmp, cf, b) in &LAT_TERMS {
        sum_b += b * ecc(cm) * arg(cd, cm, cmp, cf).sin();
    }

    let lp_r = lp.to_radians();
    sum_l += 3958.0 * a1.sin() + 1962.0 * (lp_r - f_r).sin() + 318.0 * a2.sin();
    sum_b += -2235.0 * lp_r.sin()
        + 382.0 * a3.sin()
        + 175.0 * (a1 - f_r).sin()
        + 175.0 * (a1 + f_r).sin()
        + 127.0 * (lp_r - mp_r).sin()
        - 115.0 * (lp_r + mp_r).sin();

    LunarPosition {
        lon_deg: (lp + sum_l / 1_000_000.0).rem_euclid(360.0),
        lat_deg: sum_b / 1_000_000.0,
        distance_km: 385_000.56 + sum_r / 1_000.0,
    }
}
