//! # Base Map
//!
//! The static layer under every overlay: ocean, continent polygons from a
//! GeoJSON feature collection and a list of marked cities with leader lines
//! to their time zone on the bottom edge.
//!
//! ## City list format
//!
//! One city per line, `#` comments and blank lines ignored:
//!
//! ```text
//! 51.5074 -0.1278 "London" timezone=Europe/London
//! 35.6895 139.6917 "Tokyo" timezone=+09:00
//! -33.87 151.21 "Sydney"
//! ```
//!
//! Latitude comes first. The zone is either an IANA name, resolved with its
//! daylight-saving rules at draw time, or a fixed UTC offset (`UTC`, `±HH`,
//! `±HH:MM`).

use crate::projection::{check_range, lonlat_to_pixel, GeometryError, RasterSize};
use crate::raster::{fill_polygon, Raster};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
};
use serde::Deserialize;
use std::convert::Infallible;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const OCEAN: Rgb888 = Rgb888::new(0, 0, 192);
pub const LAND: Rgb888 = Rgb888::new(0, 192, 0);
pub const ICE: Rgb888 = Rgb888::new(255, 255, 255);
const CITY_INK: Rgb888 = Rgb888::new(0, 0, 0);

/// Errors loading the base map inputs.
#[derive(Error, Debug)]
pub enum BaseMapError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("continent GeoJSON: {0}")]
    GeoJson(#[from] serde_json::Error),

    #[error("city list line {line}: {reason}: {text:?}")]
    CityLine {
        line: usize,
        text: String,
        reason: &'static str,
    },

    #[error("city list line {line}: {source}")]
    CityRange {
        line: usize,
        #[source]
        source: GeometryError,
    },
}

// GeoJSON, only as much as the map needs.

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    #[serde(rename = "CONTINENT", default)]
    continent: Option<String>,
}

/// Positions may carry a third (altitude) ordinate, which is ignored.
type Position = Vec<f64>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    #[serde(other)]
    Unsupported,
}

/// One filled outline: an outer ring in `(longitude, latitude)` degrees with
/// the closing vertex removed.
#[derive(Clone, Debug, PartialEq)]
pub struct Landmass {
    pub continent: Option<String>,
    pub ring: Vec<(f64, f64)>,
}

impl Landmass {
    pub fn color(&self) -> Rgb888 {
        match self.continent.as_deref() {
            Some("Antarctica") => ICE,
            _ => LAND,
        }
    }
}

/// Parse continent outlines. Only outer rings are kept; holes and other
/// geometry types are skipped.
pub fn parse_continents(json: &str) -> Result<Vec<Landmass>, BaseMapError> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let mut landmasses = Vec::new();

    for feature in collection.features {
        let polygons = match feature.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![coordinates],
            Some(Geometry::MultiPolygon { coordinates }) => coordinates,
            Some(Geometry::Unsupported) | None => continue,
        };
        for polygon in polygons {
            let Some(outer) = polygon.into_iter().next() else {
                continue;
            };
            let mut ring: Vec<(f64, f64)> = outer
                .iter()
                .filter_map(|pos| Some((*pos.first()?, *pos.get(1)?)))
                .collect();
            ring.pop();
            if !ring.is_empty() {
                landmasses.push(Landmass {
                    continent: feature.properties.continent.clone(),
                    ring,
                });
            }
        }
    }

    Ok(landmasses)
}

/// A marked city.
#[derive(Clone, Debug, PartialEq)]
pub struct City {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Cities without a zone get no leader line
    pub zone: Option<CityZone>,
}

/// Time zone of a city.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CityZone {
    Fixed(FixedOffset),
    Named(Tz),
}

impl CityZone {
    /// Offset from UTC in effect at `now`.
    pub fn offset_at(&self, now: &DateTime<Utc>) -> FixedOffset {
        match self {
            CityZone::Fixed(offset) => *offset,
            CityZone::Named(tz) => tz.offset_from_utc_datetime(&now.naive_utc()).fix(),
        }
    }
}

impl City {
    /// Horizontal position of the zone's local-noon column on the bottom
    /// edge of a raster `width` wide, with the offset in effect at `now`.
    pub fn zone_x(&self, width: u32, now: &DateTime<Utc>) -> Option<i32> {
        let seconds = self.zone?.offset_at(now).local_minus_utc() as f64;
        let w = width as f64;
        Some((w / 2.0 + seconds * w / 86_400.0).round_ties_even() as i32)
    }
}

/// Parse a city list.
pub fn parse_cities(text: &str) -> Result<Vec<City>, BaseMapError> {
    let mut cities = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        cities.push(parse_city(index + 1, line)?);
    }
    Ok(cities)
}

fn parse_city(number: usize, line: &str) -> Result<City, BaseMapError> {
    let bad = |reason| BaseMapError::CityLine {
        line: number,
        text: line.to_string(),
        reason,
    };

    let mut rest = line;
    let mut coordinate = || -> Option<f64> {
        let trimmed = rest.trim_start();
        let end = trimmed.find(char::is_whitespace)?;
        let value = trimmed[..end].parse().ok()?;
        rest = &trimmed[end..];
        Some(value)
    };
    let latitude = coordinate().ok_or_else(|| bad("expected latitude"))?;
    let longitude = coordinate().ok_or_else(|| bad("expected longitude"))?;

    let quoted = rest
        .trim_start()
        .strip_prefix('"')
        .ok_or_else(|| bad("expected quoted name"))?;
    let close = quoted.find('"').ok_or_else(|| bad("unterminated name"))?;
    let name = &quoted[..close];
    if name.is_empty() {
        return Err(bad("empty name"));
    }

    let tail = quoted[close + 1..].trim();
    let zone = if tail.is_empty() {
        None
    } else {
        let text = tail
            .strip_prefix("timezone=")
            .ok_or_else(|| bad("unexpected trailing text"))?;
        Some(parse_zone(text).ok_or_else(|| bad("timezone must be an IANA name, ±HH or ±HH:MM"))?)
    };

    check_range("latitude", latitude, -90.0, 90.0)
        .and_then(|_| check_range("longitude", longitude, -180.0, 180.0))
        .map_err(|source| BaseMapError::CityRange {
            line: number,
            source,
        })?;

    Ok(City {
        name: name.to_string(),
        latitude,
        longitude,
        zone,
    })
}

fn parse_zone(zone: &str) -> Option<CityZone> {
    match parse_offset(zone) {
        Some(offset) => Some(CityZone::Fixed(offset)),
        None => zone.parse::<Tz>().ok().map(CityZone::Named),
    }
}

fn parse_offset(zone: &str) -> Option<FixedOffset> {
    if zone.eq_ignore_ascii_case("utc") || zone == "Z" {
        return FixedOffset::east_opt(0);
    }
    let (sign, digits) = match zone.as_bytes().first()? {
        b'+' => (1, &zone[1..]),
        b'-' => (-1, &zone[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Everything drawn under the overlays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseMap {
    pub landmasses: Vec<Landmass>,
    pub cities: Vec<City>,
}

impl BaseMap {
    /// Load both inputs. A missing file leaves that part empty (an ocean-only
    /// map, or no cities) with a warning; a malformed file is an error.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(
        continents: P,
        cities: Q,
    ) -> Result<Self, BaseMapError> {
        let landmasses = match read_optional(continents.as_ref())? {
            Some(json) => parse_continents(&json)?,
            None => Vec::new(),
        };
        let cities = match read_optional(cities.as_ref())? {
            Some(text) => parse_cities(&text)?,
            None => Vec::new(),
        };
        log::info!(
            "base map: {} landmasses, {} cities",
            landmasses.len(),
            cities.len()
        );
        Ok(Self { landmasses, cities })
    }

    /// Render the map for a raster of `size`. Leader lines use the zone
    /// offsets in effect at `now`.
    pub fn render(&self, size: RasterSize, now: &DateTime<Utc>) -> Raster {
        let mut raster = Raster::new(size, OCEAN);
        self.draw(&mut raster, size, now);
        raster
    }

    fn draw<D>(&self, target: &mut D, size: RasterSize, now: &DateTime<Utc>)
    where
        D: DrawTarget<Color = Rgb888, Error = Infallible>,
    {
        for landmass in &self.landmasses {
            let points: Vec<Point> = landmass
                .ring
                .iter()
                .map(|&(lon, lat)| lonlat_to_pixel(lon, lat, size))
                .collect();
            fill_polygon(target, &points, landmass.color()).ok();
        }

        let h = size.height() as i32;
        let stroke = PrimitiveStyle::with_stroke(CITY_INK, 1);
        for city in &self.cities {
            let c = lonlat_to_pixel(city.longitude, city.latitude, size);
            let cross = [
                Point::new(c.x - 1, c.y),
                Point::new(c.x + 1, c.y),
                Point::new(c.x, c.y - 1),
                Point::new(c.x, c.y + 1),
            ];
            target
                .draw_iter(cross.into_iter().map(|p| Pixel(p, CITY_INK)))
                .ok();

            if let Some(zx) = city.zone_x(size.width(), now) {
                let knee = Point::new(c.x, h - 10);
                let foot = Point::new(zx, h - 5);
                Line::new(Point::new(c.x, c.y + 2), knee)
                    .into_styled(stroke)
                    .draw(target)
                    .ok();
                Line::new(knee, foot).into_styled(stroke).draw(target).ok();
                Line::new(foot, Point::new(zx, h))
                    .into_styled(stroke)
                    .draw(target)
                    .ok();
            }
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, BaseMapError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("{} not found, drawing without it", path.display());
            Ok(None)
        }
        Err(source) => Err(BaseMapError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}
