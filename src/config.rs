//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the moondial.toml file.
//! It provides a centralized way to configure the window size, the base map inputs,
//! the terminator resolution and the snapshot output.

use crate::projection::{GeometryError, RasterSize};
use crate::terminator::DEFAULT_SAMPLES;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "moondial.toml";

/// Application configuration loaded from moondial.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Window and refresh settings
    pub display: DisplayConfig,
    /// Base map inputs
    pub map: MapConfig,
    /// Terminator sampling
    #[serde(default)]
    pub terminator: TerminatorConfig,
    /// Where frames go
    pub output: OutputConfig,
}

/// Display and refresh configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Window width in pixels
    pub width: i32,
    /// Window height in pixels, clock strip included
    pub height: i32,
    /// Height of the 24-hour strip under the map; 0 hides it
    pub clock_height: i32,
    /// Seconds between ticks
    pub refresh_seconds: u64,
    /// Width of the ASCII preview in characters
    pub ascii_columns: usize,
}

impl DisplayConfig {
    /// Full window size, clock strip included.
    pub fn window_size(&self) -> Result<RasterSize, GeometryError> {
        RasterSize::new(self.width, self.height)
    }

    /// Clock strip height; negative values are rejected.
    pub fn clock_rows(&self) -> Result<u32, GeometryError> {
        u32::try_from(self.clock_height).map_err(|_| GeometryError::OutOfRange {
            quantity: "clock height",
            value: self.clock_height as f64,
            min: 0.0,
            max: self.height as f64,
        })
    }
}

/// Base map inputs
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MapConfig {
    /// Continent outlines (GeoJSON feature collection)
    pub continents: PathBuf,
    /// City list
    pub cities: PathBuf,
}

/// Terminator sampling
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TerminatorConfig {
    /// Hour-angle samples around each terminator (360 = one per degree)
    pub samples: usize,
}

impl Default for TerminatorConfig {
    fn default() -> Self {
        TerminatorConfig {
            samples: DEFAULT_SAMPLES,
        }
    }
}

/// Snapshot output
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// PNG written after every tick
    pub path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            display: DisplayConfig {
                width: 1024,
                height: 532, // 512 map rows + clock strip
                clock_height: 20,
                refresh_seconds: 10,
                ascii_columns: 96,
            },
            map: MapConfig {
                continents: PathBuf::from("continent.json"),
                cities: PathBuf::from("cities"),
            },
            terminator: TerminatorConfig::default(),
            output: OutputConfig {
                path: PathBuf::from("moondial.png"),
            },
        }
    }
}

impl Config {
    /// Load configuration from moondial.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    log::info!(
                        "loaded {} ({}x{})",
                        path.display(),
                        config.display.width,
                        config.display.height
                    );
                    config
                }
                Err(e) => {
                    log::warn!("invalid config file {}: {}", path.display(), e);
                    log::warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("no config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save current configuration to the given path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.display.clock_height, 20);
        assert_eq!(config.display.refresh_seconds, 10);
        assert_eq!(config.terminator.samples, 360);
        assert_eq!(config.map.continents, PathBuf::from("continent.json"));
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moondial.toml");
        let mut config = Config::default();
        config.display.width = 640;
        config.terminator.samples = 720;

        config.save(&path).unwrap();
        assert_eq!(Config::load_from_path(&path), config);
    }

    #[test]
    fn test_terminator_section_is_optional() {
        let toml_str = r#"
            [display]
            width = 800
            height = 420
            clock_height = 20
            refresh_seconds = 5
            ascii_columns = 80

            [map]
            continents = "land.json"
            cities = "cities.txt"

            [output]
            path = "out.png"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.terminator.samples, DEFAULT_SAMPLES);
        assert_eq!(config.display.refresh_seconds, 5);
    }

    #[test]
    fn test_display_geometry() {
        let mut config = Config::default();
        assert_eq!(config.display.window_size().unwrap().width(), 1024);
        assert_eq!(config.display.clock_rows().unwrap(), 20);

        config.display.clock_height = -1;
        assert!(config.display.clock_rows().is_err());
        config.display.width = 0;
        assert!(config.display.window_size().is_err());
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "display = 3").unwrap();
        assert_eq!(Config::load_from_path(&path), Config::default());
    }
}
