//! # Moon Dial Core Library
//!
//! This library renders a live world-map "moon dial": an equirectangular map
//! of the Earth with the sub-solar, sub-lunar and planetary points, the
//! day/night terminator with its twilight bands, and the arc beyond which the
//! Moon is below the horizon.
//!
//! ## Data Flow
//!
//! 1. **Time/Ephemeris Adapter** ([`ephemeris`]): UTC instant → Julian day →
//!    dynamical time → equatorial coordinates for every [`Body`]
//! 2. **Geocentric Projector** ([`coords::equ_to_geo`]): right ascension,
//!    declination and Greenwich sidereal time → [`SubPoint`]
//! 3. **Terminator Generator** ([`terminator`]): sub-latitude + altitude
//!    threshold → boundary curve in pixel space (filled ring or polylines)
//! 4. **Projection & Wrap Compositor** ([`projection`]): geographic → pixel
//!    mapping and the antimeridian-aware "double blit"
//! 5. **Render Orchestrator** ([`renderer::MoonDial`]): sequences the layers
//!    each tick and reports dirty rectangles
//!
//! Every tick is recomputed from the current instant; nothing but the static
//! base map survives from one tick to the next.
//!
//! ## Core Types
//!
//! - [`Body`]: the nine bodies shown on the dial, in draw order
//! - [`SubPoint`]: the geographic point directly beneath a body

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use serde::{Deserialize, Serialize};

// Module declarations
pub mod basemap;
pub mod clock;
pub mod config;
pub mod coords;
pub mod ephemeris;
pub mod lunar;
pub mod planets;
pub mod projection;
pub mod raster;
pub mod renderer;
pub mod terminator;
pub mod time;

use planets::Planet;

/// The point on the Earth's surface directly beneath a body.
///
/// Latitude lies in `[-90, 90]` and longitude in `(-180, 180]`, both degrees,
/// east positive. Recomputed every tick; never persisted.
///
/// # Example
/// ```
/// use moondial_lib::SubPoint;
///
/// let greenwich_noon = SubPoint { latitude: 0.0, longitude: 0.0 };
/// assert_eq!(greenwich_noon.longitude, 0.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubPoint {
    /// Degrees north of the equator
    pub latitude: f64,
    /// Degrees east of Greenwich
    pub longitude: f64,
}

/// A body shown on the dial.
///
/// The discriminant order is the draw order: later bodies are drawn on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
}

impl Body {
    /// Every body, in draw order.
    pub const ALL: [Body; 9] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
    ];

    /// The planet behind this body, if it is one.
    pub fn planet(self) -> Option<Planet> {
        match self {
            Body::Sun | Body::Moon => None,
            Body::Mercury => Some(Planet::Mercury),
            Body::Venus => Some(Planet::Venus),
            Body::Mars => Some(Planet::Mars),
            Body::Jupiter => Some(Planet::Jupiter),
            Body::Saturn => Some(Planet::Saturn),
            Body::Uranus => Some(Planet::Uranus),
            Body::Neptune => Some(Planet::Neptune),
        }
    }

    /// Marker colour.
    pub fn color(self) -> Rgb888 {
        match self {
            Body::Sun | Body::Saturn => Rgb888::YELLOW,
            Body::Moon => Rgb888::WHITE,
            Body::Mercury | Body::Venus | Body::Uranus => Rgb888::GREEN,
            Body::Mars | Body::Jupiter => Rgb888::RED,
            Body::Neptune => Rgb888::BLUE,
        }
    }

    /// One-letter symbol used by the ASCII preview.
    pub fn symbol(self) -> char {
        match self {
            Body::Sun => '@',
            Body::Moon => 'C',
            Body::Mercury => 'h',
            Body::Venus => 'v',
            Body::Mars => 'm',
            Body::Jupiter => 'J',
            Body::Saturn => 'S',
            Body::Uranus => 'U',
            Body::Neptune => 'N',
        }
    }
}

impl From<Planet> for Body {
    fn from(planet: Planet) -> Self {
        match planet {
            Planet::Mercury => Body::Mercury,
            Planet::Venus => Body::Venus,
            Planet::Mars => Body::Mars,
            Planet::Jupiter => Body::Jupiter,
            Planet::Saturn => Body::Saturn,
            Planet::Uranus => Body::Uranus,
            Planet::Neptune => Body::Neptune,
        }
    }
}
