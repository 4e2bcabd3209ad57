//! # Projection & Wrap Compositor
//!
//! Equirectangular mapping between geographic coordinates and raster pixels,
//! and the horizontal "double blit" that shows a longitude-periodic overlay
//! at an arbitrary rotation.
//!
//! Pixel rows grow downward, so latitude is inverted on the y axis. Every
//! rounding here is ties-to-even so that overlay pixels land on the same
//! columns from one tick to the next.

use crate::raster::{Layer, Raster};
use crate::SubPoint;
use embedded_graphics::{prelude::*, primitives::Rectangle};
use thiserror::Error;

/// Geometry contract violations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A raster must have at least one row and one column
    #[error("degenerate raster {width}x{height}: both sides must be at least 1 pixel")]
    DegenerateRaster { width: i64, height: i64 },

    /// The terminator sampler needs at least one hour angle
    #[error("terminator sampling resolution must be at least 1")]
    NoSamples,

    /// Input outside its documented domain
    #[error("{quantity} {value} outside [{min}, {max}]")]
    OutOfRange {
        quantity: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Width and height of a raster, both at least one pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterSize {
    width: u32,
    height: u32,
}

impl RasterSize {
    /// Fails fast on any side ≤ 0; nothing downstream clamps.
    pub fn new(width: i32, height: i32) -> Result<Self, GeometryError> {
        if width <= 0 || height <= 0 {
            return Err(GeometryError::DegenerateRaster {
                width: width as i64,
                height: height as i64,
            });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
        })
    }

    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }
}

impl From<RasterSize> for Size {
    fn from(size: RasterSize) -> Self {
        Size::new(size.width, size.height)
    }
}

/// Geographic coordinates (degrees) to pixel coordinates.
///
/// `(-180, 90)` maps to `(0, 0)` and `(180, -90)` to `(width, height)`, one
/// past the last pixel; callers drawing points clip as usual.
pub fn lonlat_to_pixel(longitude: f64, latitude: f64, size: RasterSize) -> Point {
    let w = size.width as f64;
    let h = size.height as f64;
    Point::new(
        ((longitude + 180.0) * w / 360.0).round_ties_even() as i32,
        ((90.0 - latitude) * h / 180.0).round_ties_even() as i32,
    )
}

/// Horizontal offset for an overlay built in the frame of a body at
/// `longitude`. The overlay's own sub-point column sits a quarter width in,
/// so this is `(lon/360 + 1/4)·w` reduced modulo the width.
pub fn lon_to_x(longitude: f64, width: u32) -> i32 {
    let w = width as i64;
    let x = ((longitude / 360.0 + 0.25) * width as f64).round_ties_even() as i64;
    x.rem_euclid(w) as i32
}

/// Reject sub-points outside latitude `[-90, 90]` or longitude `[-180, 180]`.
pub fn check_sub_point(point: &SubPoint) -> Result<(), GeometryError> {
    check_range("latitude", point.latitude, -90.0, 90.0)?;
    check_range("longitude", point.longitude, -180.0, 180.0)
}

pub(crate) fn check_range(
    quantity: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), GeometryError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(GeometryError::OutOfRange {
            quantity,
            value,
            min,
            max,
        })
    }
}

/// Composite a horizontally periodic overlay onto `base` shifted right by
/// `x_offset` (expected in `[0, width)`), with its top edge at row `y`.
///
/// The overlay is drawn twice, at `x_offset - width` and at `x_offset`, so
/// whatever leaves the right edge reappears on the left. Returns the patched
/// band: full base width, overlay height, at row `y`.
pub fn wrap_composite<L: Layer + ?Sized>(
    base: &mut Raster,
    overlay: &L,
    x_offset: i32,
    y: i32,
) -> Rectangle {
    let period = overlay.size().width as i32;
    base.blit(overlay, Point::new(x_offset - period, y));
    base.blit(overlay, Point::new(x_offset, y));

    Rectangle::new(
        Point::new(0, y),
        Size::new(base.size().width, overlay.size().height),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Overlay;
    use embedded_graphics::pixelcolor::Rgb888;

    fn size(w: i32, h: i32) -> RasterSize {
        RasterSize::new(w, h).unwrap()
    }

    #[test]
    fn degenerate_rasters_are_rejected() {
        assert!(matches!(
            RasterSize::new(0, 10),
            Err(GeometryError::DegenerateRaster { width: 0, height: 10 })
        ));
        assert!(RasterSize::new(10, -1).is_err());
        assert!(RasterSize::new(1, 1).is_ok());
    }

    #[test]
    fn lonlat_corners() {
        let s = size(800, 400);
        assert_eq!(lonlat_to_pixel(-180.0, 90.0, s), Point::new(0, 0));
        assert_eq!(lonlat_to_pixel(180.0, -90.0, s), Point::new(800, 400));
        assert_eq!(lonlat_to_pixel(0.0, 0.0, s), Point::new(400, 200));
    }

    #[test]
    fn lonlat_is_monotonic() {
        let s = size(640, 320);
        let mut prev = lonlat_to_pixel(-180.0, 90.0, s);
        for step in 1..=360 {
            let lon = -180.0 + step as f64;
            let lat = 90.0 - step as f64 / 2.0;
            let p = lonlat_to_pixel(lon, lat, s);
            assert!(p.x >= prev.x && p.y >= prev.y, "{prev:?} -> {p:?}");
            prev = p;
        }
    }

    #[test]
    fn lon_to_x_stays_inside_the_raster() {
        for w in [1_u32, 7, 360, 1024] {
            let mut lon = -720.0;
            while lon <= 720.0 {
                let x = lon_to_x(lon, w);
                assert!((0..w as i32).contains(&x), "lon {lon} w {w} -> {x}");
                lon += 3.7;
            }
        }
    }

    #[test]
    fn lon_to_x_is_periodic() {
        for lon in [-179.5, -90.0, -12.25, 0.0, 33.3, 179.9] {
            assert_eq!(lon_to_x(lon, 1000), lon_to_x(lon + 360.0, 1000));
            assert_eq!(lon_to_x(lon, 1000), lon_to_x(lon - 360.0, 1000));
        }
    }

    #[test]
    fn zero_longitude_lands_a_quarter_width_in() {
        assert_eq!(lon_to_x(0.0, 800), 200);
        assert_eq!(lon_to_x(90.0, 800), 400);
        assert_eq!(lon_to_x(-90.0, 800), 0);
    }

    #[test]
    fn shifted_overlay_frame_lines_up_with_the_map() {
        // An overlay's sub-point column is w/4; after the shift it must sit
        // on the body's longitude.
        let s = size(720, 360);
        for lon in [-170.0, -45.5, 0.0, 12.0, 100.25, 179.0] {
            let shifted = (lon_to_x(lon, 720) + 180).rem_euclid(720);
            let direct = lonlat_to_pixel(lon, 0.0, s).x.rem_euclid(720);
            assert!((shifted - direct).abs() <= 1, "lon {lon}: {shifted} vs {direct}");
        }
    }

    #[test]
    fn sub_points_outside_the_globe_are_rejected() {
        let ok = SubPoint { latitude: 45.0, longitude: -180.0 };
        assert!(check_sub_point(&ok).is_ok());
        let bad = SubPoint { latitude: 91.0, longitude: 0.0 };
        assert!(matches!(
            check_sub_point(&bad),
            Err(GeometryError::OutOfRange { quantity: "latitude", .. })
        ));
        let nan = SubPoint { latitude: 0.0, longitude: f64::NAN };
        assert!(check_sub_point(&nan).is_err());
    }

    fn striped_overlay(s: RasterSize) -> Overlay {
        let mut overlay = Overlay::new(s, Rgb888::WHITE);
        // Opaque first column only
        let column = (0..s.height() as i32).map(|y| Pixel(Point::new(0, y), Overlay::ink(255)));
        overlay.draw_iter(column).unwrap();
        overlay
    }

    #[test]
    fn zero_offset_is_a_direct_blit() {
        let s = size(16, 4);
        let overlay = striped_overlay(s);

        let mut wrapped = Raster::new(s, Rgb888::BLACK);
        let band = wrap_composite(&mut wrapped, &overlay, 0, 0);

        let mut direct = Raster::new(s, Rgb888::BLACK);
        direct.blit(&overlay, Point::zero());

        assert_eq!(wrapped, direct);
        assert_eq!(band, Rectangle::new(Point::zero(), Size::new(16, 4)));
    }

    #[test]
    fn overlay_wraps_across_the_seam() {
        let s = size(16, 4);
        let mut overlay = Overlay::new(s, Rgb888::WHITE);
        overlay
            .draw_iter([Pixel(Point::new(12, 1), Overlay::ink(255))])
            .unwrap();

        let mut base = Raster::new(s, Rgb888::BLACK);
        wrap_composite(&mut base, &overlay, 10, 0);

        // Column 12 shifted by 10 is 22, which wraps to 6.
        assert_eq!(base.pixel(Point::new(6, 1)), Some(Rgb888::WHITE));
        let lit = (0..16)
            .flat_map(|x| (0..4).map(move |y| Point::new(x, y)))
            .filter(|p| base.pixel(*p) == Some(Rgb888::WHITE))
            .count();
        assert_eq!(lit, 1);
    }

    #[test]
    fn band_sits_at_the_requested_row() {
        let base_size = size(16, 10);
        let strip = Raster::new(size(16, 3), Rgb888::RED);
        let mut base = Raster::new(base_size, Rgb888::BLACK);

        let band = wrap_composite(&mut base, &strip, 5, 7);
        assert_eq!(band, Rectangle::new(Point::new(0, 7), Size::new(16, 3)));
        assert!((0..16).all(|x| base.pixel(Point::new(x, 7)) == Some(Rgb888::RED)));
        assert!((0..16).all(|x| base.pixel(Point::new(x, 6)) == Some(Rgb888::BLACK)));
    }
}
