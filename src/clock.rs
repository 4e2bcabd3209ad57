//! 24-hour clock strip drawn under the map.
//!
//! The strip is one day wide: hour `n` sits `n/24` of the way across. Each
//! tick it is wrap-composited so that every column shows the local mean time
//! of the meridian above it, which puts hour 12 under the sub-solar point.

use crate::projection::RasterSize;
use crate::raster::Raster;
use chrono::{DateTime, Timelike, Utc};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};

pub const CLOCK_BACKGROUND: Rgb888 = Rgb888::new(0, 128, 255);
const CLOCK_INK: Rgb888 = Rgb888::WHITE;

/// Draw the strip for a raster `size` wide and tall.
pub fn render_clock(size: RasterSize) -> Raster {
    let mut strip = Raster::new(size, CLOCK_BACKGROUND);
    let w = size.width() as f64;
    let h = size.height() as i32;
    let font = &FONT_6X10;
    let label_height = font.character_size.height as i32;
    let stroke = PrimitiveStyle::with_stroke(CLOCK_INK, 1);
    let text_style = MonoTextStyle::new(font, CLOCK_INK);

    for hour in 0..24 {
        let x = (hour as f64 * w / 24.0).round_ties_even() as i32;
        let half = ((hour as f64 + 0.5) * w / 24.0).round_ties_even() as i32;

        Line::new(Point::new(x, 0), Point::new(x, h))
            .into_styled(stroke)
            .draw(&mut strip)
            .ok();
        Line::new(Point::new(half, 0), Point::new(half, h - label_height))
            .into_styled(stroke)
            .draw(&mut strip)
            .ok();

        // Label centred on the half-hour tick
        let label = hour.to_string();
        let label_width = (label.len() as u32 * font.character_size.width) as f64;
        let left = half - (label_width / 2.0).round_ties_even() as i32;
        Text::with_baseline(
            &label,
            Point::new(left, h - label_height),
            text_style,
            Baseline::Top,
        )
        .draw(&mut strip)
        .ok();
    }

    strip
}

/// Horizontal offset of the strip at `now`, in `[0, width)`.
pub fn clock_x(now: &DateTime<Utc>, width: u32) -> i32 {
    let w = width as f64;
    let frac =
        now.hour() as f64 / 24.0 + now.minute() as f64 / 1440.0 + now.second() as f64 / 86_400.0;
    let x = (w / 2.0 - w * frac).rem_euclid(w).round_ties_even() as i32;
    x.rem_euclid(width as i32)
}
