//! Viewer configuration.
//!
//! Defaults are embedded from `config/default.toml`. An override file only
//! needs the keys it changes; everything else keeps its default.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toilet_map_cluster::ClusterOptions;

use crate::LatLon;

/// Environment variable naming an override config file.
pub const CONFIG_ENV: &str = "TOILET_MAP_CONFIG";

const DEFAULT_TOML: &str = include_str!("../config/default.toml");

/// Errors from loading a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid config TOML.
    #[error("Invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Complete viewer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Initial view and zoom limits.
    pub map: MapSettings,
    /// Clustering parameters.
    pub cluster: ClusterOptions,
    /// Cluster marker tiers.
    pub markers: MarkerSettings,
    /// Base map tiles.
    pub tiles: TileSettings,
    /// Device location fallback.
    pub location: LocationSettings,
}

impl ViewerConfig {
    /// Parses the embedded default configuration.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. It is a compile-time
    /// constant covered by tests.
    #[must_use]
    pub fn embedded() -> Self {
        toml::de::from_str(DEFAULT_TOML)
            .unwrap_or_else(|e| panic!("Failed to parse embedded default config: {e}"))
    }

    /// Parses config TOML, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] if `s` is not valid config TOML.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::de::from_str(s)?)
    }

    /// Loads `path` if given, otherwise the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::embedded());
        };

        log::info!("Loading viewer config from {}", path.display());
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&s)
    }

    /// Loads the file named by [`CONFIG_ENV`], if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the named file cannot be read or parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load(path.as_deref())
    }
}

/// Initial view and zoom limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Initial map centre.
    pub center: LatLon,
    /// Initial zoom.
    pub zoom: f64,
    /// Upper bound for click-to-zoom on clusters.
    pub max_expansion_zoom: u8,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center: LatLon::new(62.0, 10.0),
            zoom: 6.0,
            max_expansion_zoom: 16,
        }
    }
}

/// Cluster marker tier thresholds and colours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSettings {
    /// Smallest count drawn as a medium cluster.
    pub medium_threshold: usize,
    /// Smallest count drawn as a large cluster.
    pub large_threshold: usize,
    /// Fill colour of small clusters.
    pub small_color: String,
    /// Fill colour of medium clusters.
    pub medium_color: String,
    /// Fill colour of large clusters.
    pub large_color: String,
}

impl Default for MarkerSettings {
    fn default() -> Self {
        Self {
            medium_threshold: 10,
            large_threshold: 100,
            small_color: "#60a5fa".to_string(),
            medium_color: "#3b82f6".to_string(),
            large_color: "#1d4ed8".to_string(),
        }
    }
}

/// Base map tile source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSettings {
    /// URL template with `{z}`, `{x}`, `{y}` and `{token}` placeholders.
    pub url: String,
    /// Attribution text.
    pub attribution: String,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Zoom offset applied by the client.
    pub zoom_offset: i32,
}

impl TileSettings {
    /// The URL template with the access token filled in.
    #[must_use]
    pub fn url_with_token(&self, token: &str) -> String {
        self.url.replace("{token}", token)
    }
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            url: concat!(
                "https://api.mapbox.com/styles/v1/mapbox/streets-v12/tiles/",
                "{z}/{x}/{y}?access_token={token}",
            )
            .to_string(),
            attribution: "© Mapbox © OpenStreetMap".to_string(),
            tile_size: 512,
            zoom_offset: -1,
        }
    }
}

/// Device location fallback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Position used when geolocation fails.
    pub default: LatLon,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            default: LatLon::new(59.9139, 10.7522),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_config_matches_defaults() {
        assert_eq!(ViewerConfig::embedded(), ViewerConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config = ViewerConfig::from_toml(
            r"
            [cluster]
            radius = 60.0

            [markers]
            large_threshold = 500
            ",
        )
        .unwrap();

        assert!((config.cluster.radius - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.cluster.max_zoom, 16);
        assert_eq!(config.markers.large_threshold, 500);
        assert_eq!(config.markers.medium_threshold, 10);
        assert_eq!(config.map, MapSettings::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(ViewerConfig::from_toml("[map]\nzoom = \"six\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = ViewerConfig::load(Some(Path::new("does/not/exist.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("Failed to read config does/not/exist.toml: "));
    }

    #[test]
    fn fills_tile_token() {
        let tiles = TileSettings::default();
        let url = tiles.url_with_token("pk.abc");
        assert!(url.ends_with("access_token=pk.abc"));
        assert!(url.contains("{z}/{x}/{y}"));
    }
}
