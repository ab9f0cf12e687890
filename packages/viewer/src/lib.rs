#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Everything between the loaded toilet list and what ends up on the map.
//!
//! A [`layer::ToiletLayer`] pairs a filtered toilet list with the cluster
//! index over it. [`session::MapSession`] owns the active layer and
//! recomputes markers whenever the viewport or filters change. Marker
//! appearance comes from the pure functions in [`icon`], popup content from
//! [`popup`], and tunables from [`config::ViewerConfig`].

pub mod config;
pub mod geolocation;
pub mod icon;
pub mod layer;
pub mod marker;
pub mod popup;
pub mod session;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, ViewerConfig};
pub use layer::{ToiletLayer, ViewTarget, Viewport, ViewportResult};
pub use marker::Marker;
pub use session::{MapSession, MapStats};

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
}

impl LatLon {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}
