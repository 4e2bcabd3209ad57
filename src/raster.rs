//! Pixel buffers for the map, its overlays and the composed frame.
//!
//! [`Raster`] is an opaque RGB buffer; [`Overlay`] is a single-tint alpha
//! mask (night shading, moon arc). Both are `embedded-graphics` draw targets,
//! so lines, polylines and text come from the graphics crate while polygon
//! filling and compositing live here.

use crate::projection::RasterSize;
use embedded_graphics::{
    pixelcolor::{Gray8, Rgb888},
    prelude::*,
    primitives::{Polyline, PrimitiveStyle, Rectangle},
};
use std::convert::Infallible;
use std::path::Path;

/// A buffer that can be blitted onto a [`Raster`].
pub trait Layer: OriginDimensions {
    /// Composite this layer's pixel at `(x, y)` onto `dst`.
    fn composite_onto(&self, x: u32, y: u32, dst: &mut Rgb888);
}

/// Opaque RGB pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl Raster {
    pub fn new(size: RasterSize, fill: Rgb888) -> Self {
        let size: Size = size.into();
        Self {
            size,
            pixels: vec![fill; cells(size)],
        }
    }

    pub fn fill(&mut self, color: Rgb888) {
        self.pixels.fill(color);
    }

    pub fn pixel(&self, point: Point) -> Option<Rgb888> {
        self.index(point).map(|i| self.pixels[i])
    }

    /// Composite `src` with its top-left corner at `dest`, clipped to this
    /// raster. Returns the affected rectangle (zero-sized if fully clipped).
    pub fn blit<L: Layer + ?Sized>(&mut self, src: &L, dest: Point) -> Rectangle {
        let area = Rectangle::new(dest, src.size()).intersection(&self.bounding_box());
        if area.is_zero_sized() {
            return area;
        }
        for point in area.points() {
            let s = point - dest;
            if let Some(i) = self.index(point) {
                src.composite_onto(s.x as u32, s.y as u32, &mut self.pixels[i]);
            }
        }
        area
    }

    /// Packed RGB8 bytes, row-major.
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|c| [c.r(), c.g(), c.b()])
            .collect()
    }

    /// Write the raster as a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), image::ImageError> {
        image::save_buffer(
            path,
            &self.to_rgb_bytes(),
            self.size.width,
            self.size.height,
            image::ColorType::Rgb8,
        )
    }

    fn index(&self, point: Point) -> Option<usize> {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        if point.x < 0 || point.y < 0 || point.x >= w || point.y >= h {
            return None;
        }
        Some(point.y as usize * w as usize + point.x as usize)
    }
}

impl OriginDimensions for Raster {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Raster {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if let Some(i) = self.index(point) {
                self.pixels[i] = color;
            }
        }
        Ok(())
    }
}

impl Layer for Raster {
    fn composite_onto(&self, x: u32, y: u32, dst: &mut Rgb888) {
        *dst = self.pixels[y as usize * self.size.width as usize + x as usize];
    }
}

/// Single-colour translucent layer.
///
/// Drawing stores the `Gray8` luma as the pixel's alpha, replacing what was
/// there, so later shapes overwrite earlier ones instead of accumulating.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    size: Size,
    tint: Rgb888,
    alpha: Vec<u8>,
}

impl Overlay {
    /// Fully transparent overlay.
    pub fn new(size: RasterSize, tint: Rgb888) -> Self {
        let size: Size = size.into();
        Self {
            size,
            tint,
            alpha: vec![0; cells(size)],
        }
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0);
    }

    pub fn alpha_at(&self, point: Point) -> Option<u8> {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        if point.x < 0 || point.y < 0 || point.x >= w || point.y >= h {
            return None;
        }
        Some(self.alpha[point.y as usize * w as usize + point.x as usize])
    }

    /// Alpha value for drawing calls.
    pub fn ink(alpha: u8) -> Gray8 {
        Gray8::new(alpha)
    }
}

impl OriginDimensions for Overlay {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Overlay {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (w, h) = (self.size.width as i32, self.size.height as i32);
        for Pixel(point, color) in pixels {
            if point.x >= 0 && point.y >= 0 && point.x < w && point.y < h {
                self.alpha[point.y as usize * w as usize + point.x as usize] = color.luma();
            }
        }
        Ok(())
    }
}

impl Layer for Overlay {
    fn composite_onto(&self, x: u32, y: u32, dst: &mut Rgb888) {
        let a = self.alpha[y as usize * self.size.width as usize + x as usize] as u32;
        if a == 0 {
            return;
        }
        let mix = |src: u8, base: u8| ((src as u32 * a + base as u32 * (255 - a) + 127) / 255) as u8;
        *dst = Rgb888::new(
            mix(self.tint.r(), dst.r()),
            mix(self.tint.g(), dst.g()),
            mix(self.tint.b(), dst.b()),
        );
    }
}

/// Fill a closed polygon (even-odd rule) and stroke its outline.
///
/// The ring is closed implicitly from the last point back to the first.
/// Fewer than three points degrade to a pixel or a line.
pub fn fill_polygon<D, C>(target: &mut D, points: &[Point], color: C) -> Result<(), D::Error>
where
    D: DrawTarget<Color = C>,
    C: PixelColor,
{
    if points.is_empty() {
        return Ok(());
    }

    let bounds = target.bounding_box();
    let (min_y, max_y) = points
        .iter()
        .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let top = min_y.max(bounds.top_left.y);
    let bottom = max_y.min(bounds.top_left.y + bounds.size.height as i32 - 1);

    let mut crossings: Vec<f64> = Vec::with_capacity(points.len());
    for y in top..=bottom {
        crossings.clear();
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            if (a.y <= y && y < b.y) || (b.y <= y && y < a.y) {
                let t = (y - a.y) as f64 / (b.y - a.y) as f64;
                crossings.push(a.x as f64 + t * (b.x - a.x) as f64);
            }
        }
        crossings.sort_by(|l, r| l.total_cmp(r));

        for span in crossings.chunks_exact(2) {
            let x0 = span[0].ceil() as i32;
            let x1 = span[1].floor() as i32;
            if x1 >= x0 {
                let row = Rectangle::new(Point::new(x0, y), Size::new((x1 - x0 + 1) as u32, 1));
                target.fill_solid(&row, color)?;
            }
        }
    }

    let mut ring = Vec::with_capacity(points.len() + 1);
    ring.extend_from_slice(points);
    ring.push(points[0]);
    Polyline::new(&ring)
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(target)
}

/// Number of pixels in a buffer of `size`.
fn cells(size: Size) -> usize {
    size.width as usize * size.height as usize
}
