#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the toilet map server.
//!
//! These types are serialized to JSON for the REST API. They are kept apart
//! from the viewer types so the API contract can evolve on its own.

use std::fmt;

use serde::de::{self, Unexpected, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use toilet_map_dataset::normalize::LoadReport;
use toilet_map_toilet_models::ToiletFilters;
use toilet_map_viewer::{LatLon, Marker, ViewTarget, ViewerConfig};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Always `true` while the server answers.
    pub healthy: bool,
    /// Server crate version.
    pub version: String,
}

/// Filter query parameters shared by the layer-specific endpoints.
///
/// Flags accept `true`/`false`, `1`/`0`, `yes`/`no`, or a bare key
/// (`?freeOnly`), which turns the filter on.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerQueryParams {
    /// Hide toilets tagged `fee=yes`.
    #[serde(default, deserialize_with = "flag")]
    pub free_only: bool,
    /// Keep only wheelchair accessible toilets.
    #[serde(default, deserialize_with = "flag")]
    pub wheelchair_only: bool,
}

impl LayerQueryParams {
    /// The filter combination these parameters select.
    #[must_use]
    pub const fn filters(&self) -> ToiletFilters {
        ToiletFilters {
            free_only: self.free_only,
            wheelchair_only: self.wheelchair_only,
        }
    }
}

/// Query parameters for the clusters endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterQueryParams {
    /// Bounding box as `west,south,east,north`. Whole world when absent.
    pub bbox: Option<String>,
    /// Map zoom. The configured initial zoom when absent.
    pub zoom: Option<f64>,
    /// Hide toilets tagged `fee=yes`.
    #[serde(default, deserialize_with = "flag")]
    pub free_only: bool,
    /// Keep only wheelchair accessible toilets.
    #[serde(default, deserialize_with = "flag")]
    pub wheelchair_only: bool,
}

impl ClusterQueryParams {
    /// The filter combination these parameters select.
    #[must_use]
    pub const fn filters(&self) -> ToiletFilters {
        ToiletFilters {
            free_only: self.free_only,
            wheelchair_only: self.wheelchair_only,
        }
    }
}

struct FlagVisitor;

impl Visitor<'_> for FlagVisitor {
    type Value = bool;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a boolean flag")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<bool, E> {
        Ok(v)
    }

    fn visit_unit<E: de::Error>(self) -> Result<bool, E> {
        Ok(true)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<bool, E> {
        match v.trim().to_ascii_lowercase().as_str() {
            "" | "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(E::invalid_value(Unexpected::Str(v), &self)),
        }
    }
}

/// Reads a query flag. A key present without a value counts as `true`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    deserializer.deserialize_any(FlagVisitor)
}

/// Markers for one viewport.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClustersResponse {
    /// Cluster and toilet markers in drawing order.
    pub markers: Vec<Marker>,
    /// Toilets represented by `markers`.
    pub visible_count: usize,
    /// Toilets passing the filters.
    pub total_count: usize,
}

/// Where to move the map after a cluster click.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpansionResponse {
    /// New centre latitude.
    pub latitude: f64,
    /// New centre longitude.
    pub longitude: f64,
    /// New zoom.
    pub zoom: u8,
}

impl From<ViewTarget> for ExpansionResponse {
    fn from(target: ViewTarget) -> Self {
        Self {
            latitude: target.center.latitude,
            longitude: target.center.longitude,
            zoom: target.zoom,
        }
    }
}

/// Client-side map settings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Initial map centre.
    pub center: LatLon,
    /// Initial zoom.
    pub zoom: f64,
    /// Upper bound for click-to-zoom on clusters.
    pub max_expansion_zoom: u8,
    /// Tile URL template with the access token filled in.
    pub tile_url: String,
    /// Tile attribution.
    pub attribution: String,
    /// Tile size in pixels.
    pub tile_size: u32,
    /// Zoom offset for the tile layer.
    pub zoom_offset: i32,
    /// Where to centre when geolocation fails.
    pub default_location: LatLon,
}

impl ApiConfig {
    /// Builds the client config, filling the tile token.
    #[must_use]
    pub fn new(config: &ViewerConfig, tile_token: &str) -> Self {
        Self {
            center: config.map.center,
            zoom: config.map.zoom,
            max_expansion_zoom: config.map.max_expansion_zoom,
            tile_url: config.tiles.url_with_token(tile_token),
            attribution: config.tiles.attribution.clone(),
            tile_size: config.tiles.tile_size,
            zoom_offset: config.tiles.zoom_offset,
            default_location: config.location.default,
        }
    }
}

/// Dataset counts.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    /// Toilets passing the requested filters.
    pub total: usize,
    /// Toilets loaded from the dataset.
    pub loaded: usize,
    /// Per-element load summary.
    pub report: LoadReport,
}
