//! # Render Orchestrator
//!
//! [`MoonDial`] owns the static layers (base map, clock strip) and the
//! composed frame, and sequences one tick:
//!
//! 1. ephemeris lookup and sub-point projection for every body
//! 2. night overlay (sunset plus three twilight bands) in the Sun's frame
//! 3. moon visibility arc in the Moon's frame
//! 4. compositing: map, night, moon arc, clock strip, body markers
//!
//! Every fallible step runs before the frame is touched, so a failed tick
//! leaves the previous frame intact.

use crate::basemap::{BaseMap, BaseMapError};
use crate::clock::{clock_x, render_clock};
use crate::config::Config;
use crate::ephemeris::{positions, EphemerisError, EphemerisProvider, LowPrecisionEphemeris};
use crate::projection::{
    check_sub_point, lon_to_x, lonlat_to_pixel, wrap_composite, GeometryError, RasterSize,
};
use crate::raster::{fill_polygon, Overlay, Raster};
use crate::terminator::{
    terminator_with_samples, TerminatorCurve, ASTRONOMICAL_TWILIGHT_ALTITUDE,
    CIVIL_TWILIGHT_ALTITUDE, NAUTICAL_TWILIGHT_ALTITUDE, STANDARD_RISE_SET_ALTITUDE,
    SUN_RISE_SET_ALTITUDE,
};
use crate::{Body, SubPoint};
use chrono::{DateTime, Utc};
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Polyline, PrimitiveStyle, Rectangle},
};
use thiserror::Error;

/// Night shading, lightest first; each band overwrites the one before.
pub const NIGHT_BANDS: [(f64, u8); 4] = [
    (SUN_RISE_SET_ALTITUDE, 64),
    (CIVIL_TWILIGHT_ALTITUDE, 96),
    (NAUTICAL_TWILIGHT_ALTITUDE, 128),
    (ASTRONOMICAL_TWILIGHT_ALTITUDE, 160),
];

pub const MOON_ARC_ALPHA: u8 = 160;

const MARKER_DIAMETER: u32 = 5;
const MARKER_SHADOW: Rgb888 = Rgb888::new(0, 0, 0);

/// Errors that abort a tick.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("ephemeris: {0}")]
    Ephemeris(#[from] EphemerisError),

    #[error("geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("base map: {0}")]
    BaseMap(#[from] BaseMapError),

    #[error("ephemeris returned no position for {0:?}")]
    MissingBody(Body),

    #[error("tick requested before the initial draw")]
    NotDrawn,
}

/// Layers kept between ticks for one window size.
struct Frame {
    map_size: RasterSize,
    map: Raster,
    clock: Option<Raster>,
    surface: Raster,
    /// Marker rectangles of the last tick, reported dirty on the next
    marker_rects: Vec<Rectangle>,
    sub_points: Vec<(Body, SubPoint)>,
}

/// Everything one tick computes before it draws.
struct TickPlan {
    sub_points: Vec<(Body, SubPoint)>,
    night: Overlay,
    night_x: i32,
    moon_arc: Overlay,
    moon_x: i32,
    clock_x: i32,
}

/// The live dial.
pub struct MoonDial<E: EphemerisProvider = LowPrecisionEphemeris> {
    provider: E,
    base_map: BaseMap,
    clock_height: u32,
    samples: usize,
    frame: Option<Frame>,
}

impl MoonDial<LowPrecisionEphemeris> {
    pub fn new(base_map: BaseMap, clock_height: u32, samples: usize) -> Self {
        Self::with_provider(LowPrecisionEphemeris, base_map, clock_height, samples)
    }

    /// Load the base map named by `config` and set up the dial.
    pub fn from_config(config: &Config) -> Result<Self, RenderError> {
        let base_map = BaseMap::load(&config.map.continents, &config.map.cities)?;
        Ok(Self::new(
            base_map,
            config.display.clock_rows()?,
            config.terminator.samples,
        ))
    }
}

impl<E: EphemerisProvider> MoonDial<E> {
    pub fn with_provider(provider: E, base_map: BaseMap, clock_height: u32, samples: usize) -> Self {
        Self {
            provider,
            base_map,
            clock_height,
            samples,
            frame: None,
        }
    }

    /// Build the static layers for a window of `size` and draw a full frame
    /// at the current instant.
    pub fn initial_draw(&mut self, size: RasterSize) -> Result<Vec<Rectangle>, RenderError> {
        self.initial_draw_at(size, &Utc::now())
    }

    pub fn initial_draw_at(
        &mut self,
        size: RasterSize,
        now: &DateTime<Utc>,
    ) -> Result<Vec<Rectangle>, RenderError> {
        let map_height = size.height() as i32 - self.clock_height as i32;
        let map_size = RasterSize::new(size.width() as i32, map_height)?;

        let clock = match self.clock_height {
            0 => None,
            h => Some(render_clock(RasterSize::new(size.width() as i32, h as i32)?)),
        };
        let plan = self.plan(map_size, now)?;

        let mut frame = Frame {
            map_size,
            map: self.base_map.render(map_size, now),
            clock,
            surface: Raster::new(size, Rgb888::BLACK),
            marker_rects: Vec::new(),
            sub_points: Vec::new(),
        };
        self.compose(&mut frame, plan);
        self.frame = Some(frame);

        log::info!("initial draw {}x{}", size.width(), size.height());
        Ok(vec![Rectangle::new(Point::zero(), size.into())])
    }

    /// Recompute everything for the current instant and recomposite.
    pub fn tick_update(&mut self) -> Result<Vec<Rectangle>, RenderError> {
        self.tick_update_at(&Utc::now())
    }

    /// Returns the dirty rectangles: the previous tick's markers, the map
    /// and clock bands, and the new markers.
    pub fn tick_update_at(&mut self, now: &DateTime<Utc>) -> Result<Vec<Rectangle>, RenderError> {
        let map_size = self.frame.as_ref().ok_or(RenderError::NotDrawn)?.map_size;
        let plan = self.plan(map_size, now)?;

        let mut frame = self.frame.take().ok_or(RenderError::NotDrawn)?;
        let mut dirty = std::mem::take(&mut frame.marker_rects);
        dirty.extend(self.compose(&mut frame, plan));
        dirty.extend(frame.marker_rects.iter().copied());
        self.frame = Some(frame);

        log::debug!("tick at {now}: {} dirty rectangles", dirty.len());
        Ok(dirty)
    }

    /// The composed frame, once drawn.
    pub fn surface(&self) -> Option<&Raster> {
        self.frame.as_ref().map(|f| &f.surface)
    }

    /// Sub-points used for the current frame, in draw order.
    pub fn sub_points(&self) -> &[(Body, SubPoint)] {
        self.frame.as_ref().map_or(&[], |f| &f.sub_points)
    }

    /// Marker rectangles of the current frame.
    pub fn marker_rects(&self) -> &[Rectangle] {
        self.frame.as_ref().map_or(&[], |f| &f.marker_rects)
    }

    /// Text rendering of the current frame `columns` characters wide.
    pub fn render_ascii(&self, columns: usize) -> Option<String> {
        let frame = self.frame.as_ref()?;
        Some(ascii_preview(
            &frame.surface,
            frame.map_size,
            &frame.sub_points,
            columns,
        ))
    }

    fn plan(&self, map_size: RasterSize, now: &DateTime<Utc>) -> Result<TickPlan, RenderError> {
        let sky = positions(&self.provider, now)?;
        let sub_points = sky.sub_points();
        for (_, point) in &sub_points {
            check_sub_point(point)?;
        }
        let sun = sub_point_of(&sub_points, Body::Sun)?;
        let moon = sub_point_of(&sub_points, Body::Moon)?;

        let mut night = Overlay::new(map_size, Rgb888::BLACK);
        for (altitude, alpha) in NIGHT_BANDS {
            let curve =
                terminator_with_samples(sun.latitude, altitude, map_size, true, self.samples)?;
            if let TerminatorCurve::Ring(ring) = curve {
                fill_polygon(&mut night, &ring, Overlay::ink(alpha)).ok();
            }
        }

        let mut moon_arc = Overlay::new(map_size, Rgb888::WHITE);
        // Traced at the Moon's own sub-latitude rather than the Sun's
        let arc = terminator_with_samples(
            moon.latitude,
            STANDARD_RISE_SET_ALTITUDE,
            map_size,
            false,
            self.samples,
        )?;
        if let TerminatorCurve::Polylines(runs) = arc {
            let stroke = PrimitiveStyle::with_stroke(Overlay::ink(MOON_ARC_ALPHA), 1);
            for run in runs {
                Polyline::new(&run)
                    .into_styled(stroke)
                    .draw(&mut moon_arc)
                    .ok();
            }
        }

        let width = map_size.width();
        Ok(TickPlan {
            night_x: lon_to_x(sun.longitude, width),
            moon_x: lon_to_x(moon.longitude, width),
            clock_x: clock_x(now, width),
            sub_points,
            night,
            moon_arc,
        })
    }

    /// Draw a planned tick into the frame. Returns the map and clock bands.
    fn compose(&self, frame: &mut Frame, plan: TickPlan) -> Vec<Rectangle> {
        let map_band = frame.surface.blit(&frame.map, Point::zero());
        wrap_composite(&mut frame.surface, &plan.night, plan.night_x, 0);
        wrap_composite(&mut frame.surface, &plan.moon_arc, plan.moon_x, 0);

        let mut bands = vec![map_band];
        if let Some(clock) = &frame.clock {
            let clock_top = frame.map_size.height() as i32;
            bands.push(wrap_composite(
                &mut frame.surface,
                clock,
                plan.clock_x,
                clock_top,
            ));
        }

        frame.marker_rects = plan
            .sub_points
            .iter()
            .map(|&(body, point)| draw_marker(&mut frame.surface, frame.map_size, body, point))
            .collect();
        frame.sub_points = plan.sub_points;
        bands
    }
}

fn sub_point_of(points: &[(Body, SubPoint)], body: Body) -> Result<SubPoint, RenderError> {
    points
        .iter()
        .find(|(b, _)| *b == body)
        .map(|&(_, p)| p)
        .ok_or(RenderError::MissingBody(body))
}

/// Draw one body marker with its shadow and return the area it covers.
fn draw_marker(surface: &mut Raster, map_size: RasterSize, body: Body, point: SubPoint) -> Rectangle {
    let center = lonlat_to_pixel(point.longitude, point.latitude, map_size);
    let shadow = Circle::with_center(center + Point::new(1, 1), MARKER_DIAMETER);
    let disc = Circle::with_center(center, MARKER_DIAMETER);

    shadow
        .into_styled(PrimitiveStyle::with_fill(MARKER_SHADOW))
        .draw(surface)
        .ok();
    disc.into_styled(PrimitiveStyle::with_fill(body.color()))
        .draw(surface)
        .ok();

    let covered = Rectangle::new(
        disc.top_left,
        Size::new(MARKER_DIAMETER + 1, MARKER_DIAMETER + 1),
    );
    covered.intersection(&surface.bounding_box())
}

const ASCII_RAMP: &[u8] = b" .,:;=+*#%";

/// Downsample the map area into characters by brightness, with body symbols
/// on top.
fn ascii_preview(
    surface: &Raster,
    map_size: RasterSize,
    sub_points: &[(Body, SubPoint)],
    columns: usize,
) -> String {
    let columns = columns.max(1);
    let w = map_size.width() as usize;
    let h = map_size.height() as usize;
    // Terminal cells are about twice as tall as wide.
    let rows = ((columns * h) / (w * 2)).max(1);

    let mut grid = vec![vec![' '; columns]; rows];
    for (r, row) in grid.iter_mut().enumerate() {
        for (c, cell) in row.iter_mut().enumerate() {
            let x = (c * w / columns) as i32;
            let y = (r * h / rows) as i32;
            let color = surface.pixel(Point::new(x, y)).unwrap_or(Rgb888::BLACK);
            let level = (color.r() as usize + color.g() as usize + color.b() as usize)
                * (ASCII_RAMP.len() - 1)
                / (3 * 255);
            *cell = ASCII_RAMP[level] as char;
        }
    }

    for &(body, point) in sub_points {
        let p = lonlat_to_pixel(point.longitude, point.latitude, map_size);
        let c = (p.x.max(0) as usize * columns / w).min(columns - 1);
        let r = (p.y.max(0) as usize * rows / h).min(rows - 1);
        grid[r][c] = body.symbol();
    }

    let mut out = String::with_capacity(rows * (columns + 1));
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basemap::OCEAN;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 3, 0, 0).unwrap()
    }

    fn dial() -> MoonDial {
        MoonDial::new(BaseMap::default(), 20, 360)
    }

    #[test]
    fn tick_before_initial_draw_fails() {
        let mut dial = dial();
        assert!(matches!(
            dial.tick_update_at(&instant()),
            Err(RenderError::NotDrawn)
        ));
        assert!(dial.surface().is_none());
        assert!(dial.render_ascii(40).is_none());
    }

    #[test]
    fn window_shorter_than_the_clock_is_rejected() {
        let mut dial = dial();
        let size = RasterSize::new(100, 20).unwrap();
        assert!(matches!(
            dial.initial_draw_at(size, &instant()),
            Err(RenderError::Geometry(GeometryError::DegenerateRaster { .. }))
        ));
    }

    #[test]
    fn initial_draw_marks_the_whole_window() {
        let mut dial = dial();
        let size = RasterSize::new(360, 200).unwrap();
        let dirty = dial.initial_draw_at(size, &instant()).unwrap();
        assert_eq!(dirty, vec![Rectangle::new(Point::zero(), Size::new(360, 200))]);
        assert_eq!(dial.sub_points().len(), Body::ALL.len());
        assert_eq!(dial.marker_rects().len(), Body::ALL.len());
    }

    #[test]
    fn tick_reports_previous_and_new_markers() {
        let mut dial = dial();
        let size = RasterSize::new(360, 200).unwrap();
        dial.initial_draw_at(size, &instant()).unwrap();
        let before = dial.marker_rects().to_vec();

        let later = instant() + chrono::Duration::hours(6);
        let dirty = dial.tick_update_at(&later).unwrap();

        for rect in &before {
            assert!(dirty.contains(rect));
        }
        for rect in dial.marker_rects() {
            assert!(dirty.contains(rect));
        }
        // Map band and clock band
        assert!(dirty.contains(&Rectangle::new(Point::zero(), Size::new(360, 180))));
        assert!(dirty.contains(&Rectangle::new(Point::new(0, 180), Size::new(360, 20))));
    }

    #[test]
    fn sun_side_is_lit_and_far_side_is_dark() {
        let mut dial = dial();
        let size = RasterSize::new(360, 200).unwrap();
        dial.initial_draw_at(size, &instant()).unwrap();
        let surface = dial.surface().unwrap();
        let sun = dial.sub_points()[0].1;
        let map_size = RasterSize::new(360, 180).unwrap();

        // Sample a 7x7 grid so a stray marker or the moon arc cannot decide
        // the outcome on its own.
        let grid = |lon: f64, lat: f64| {
            (-3..=3).flat_map(move |i| {
                (-3..=3).map(move |j| {
                    let p = lonlat_to_pixel(lon + 3.0 * i as f64, lat + 3.0 * j as f64, map_size);
                    Point::new(p.x.rem_euclid(360), p.y)
                })
            })
        };

        let lit = grid(sun.longitude, sun.latitude - 20.0)
            .filter(|p| surface.pixel(*p) == Some(OCEAN))
            .count();
        assert!(lit >= 30, "{lit} of 49 lit");

        let anti_lon = if sun.longitude > 0.0 {
            sun.longitude - 180.0
        } else {
            sun.longitude + 180.0
        };
        let dark = grid(anti_lon, -sun.latitude)
            .filter(|p| surface.pixel(*p).is_some_and(|c| c.b() < OCEAN.b() / 2))
            .count();
        assert!(dark >= 30, "{dark} of 49 dark");
    }

    #[test]
    fn ascii_preview_has_requested_width_and_symbols() {
        let mut dial = dial();
        dial.initial_draw_at(RasterSize::new(360, 200).unwrap(), &instant())
            .unwrap();
        let text = dial.render_ascii(72).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 18);
        assert!(lines.iter().all(|l| l.chars().count() == 72));
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 18);
        // Neptune is drawn last, so nothing covers its cell.
        assert!(text.contains(Body::Neptune.symbol()));
    }
}
