//! Turns cluster query results into drawable markers.

use serde::Serialize;
use toilet_map_cluster::ClusterItem;
use toilet_map_toilet_models::Toilet;

use crate::config::MarkerSettings;
use crate::icon::{ClusterIcon, ToiletIcon, cluster_icon, toilet_icon};
use crate::popup::ToiletPopup;

/// A clickable cluster bubble.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMarker {
    /// Stable marker key (`cluster-{id}`).
    pub key: String,
    /// Id to pass to expansion lookups.
    pub cluster_id: usize,
    /// Latitude of the cluster centroid.
    pub latitude: f64,
    /// Longitude of the cluster centroid.
    pub longitude: f64,
    /// Toilets in the cluster.
    pub count: usize,
    /// Abbreviated count shown in the bubble.
    pub label: String,
    /// Bubble appearance.
    pub icon: ClusterIcon,
}

/// A single toilet with its popup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToiletMarker {
    /// Toilet key (`node-123`).
    pub key: String,
    /// Latitude of the toilet.
    pub latitude: f64,
    /// Longitude of the toilet.
    pub longitude: f64,
    /// Marker appearance.
    pub icon: ToiletIcon,
    /// Popup shown on click.
    pub popup: ToiletPopup,
}

/// Anything drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Marker {
    /// Several toilets drawn as one bubble.
    Cluster(ClusterMarker),
    /// One toilet.
    Toilet(ToiletMarker),
}

impl Marker {
    /// Marker key, unique within one render.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Cluster(m) => &m.key,
            Self::Toilet(m) => &m.key,
        }
    }

    /// Toilets this marker stands for.
    #[must_use]
    pub const fn count(&self) -> usize {
        match self {
            Self::Cluster(m) => m.count,
            Self::Toilet(_) => 1,
        }
    }
}

impl From<&Toilet> for ToiletMarker {
    fn from(toilet: &Toilet) -> Self {
        Self {
            key: toilet.key(),
            latitude: toilet.latitude,
            longitude: toilet.longitude,
            icon: toilet_icon(toilet.wheelchair.as_deref(), toilet.fee.as_deref()),
            popup: ToiletPopup::from(toilet),
        }
    }
}

/// Builds one marker per query item, in query order.
#[must_use]
pub fn render(items: &[ClusterItem<'_, Toilet>], settings: &MarkerSettings) -> Vec<Marker> {
    items
        .iter()
        .map(|item| match item {
            ClusterItem::Cluster(cluster) => Marker::Cluster(ClusterMarker {
                key: format!("cluster-{}", cluster.id),
                cluster_id: cluster.id,
                latitude: cluster.latitude,
                longitude: cluster.longitude,
                count: cluster.point_count,
                label: cluster.abbreviated_count(),
                icon: cluster_icon(cluster.point_count, settings),
            }),
            ClusterItem::Point { point, .. } => Marker::Toilet(ToiletMarker::from(*point)),
        })
        .collect()
}
