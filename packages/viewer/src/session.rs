//! Map session state: the active layer, the last viewport and the markers
//! drawn for it.
//!
//! Every trigger (layer rebuilt, map moved, zoom changed) recomputes the
//! markers and stats from scratch. Nothing is patched incrementally.

use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use toilet_map_cluster::ClusterError;
use toilet_map_toilet_models::{Toilet, ToiletFilters};

use crate::config::ViewerConfig;
use crate::layer::{ToiletLayer, ViewTarget, Viewport};
use crate::marker::{Marker, render};

/// Session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    /// Markers are current.
    Idle,
    /// A refresh is running.
    Querying,
}

/// Counts shown in the stats bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MapStats {
    /// Toilets represented by the drawn markers.
    pub visible: usize,
    /// Toilets passing the active filters.
    pub total: usize,
}

/// One user's view of the map.
pub struct MapSession {
    toilets: Vec<Toilet>,
    config: ViewerConfig,
    layer: ToiletLayer,
    viewport: Option<Viewport>,
    state: SessionState,
    markers: Vec<Marker>,
    stats: MapStats,
}

impl MapSession {
    /// Starts a session with no filters and no viewport.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if the configured cluster
    /// options are invalid.
    pub fn new(toilets: Vec<Toilet>, config: ViewerConfig) -> Result<Self, ClusterError> {
        let layer = ToiletLayer::build(&toilets, ToiletFilters::default(), config.cluster)?;
        let mut session = Self {
            toilets,
            config,
            layer,
            viewport: None,
            state: SessionState::Idle,
            markers: Vec::new(),
            stats: MapStats::default(),
        };
        session.refresh();
        Ok(session)
    }

    /// Rebuilds the layer for `filters` and redraws.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if the configured cluster
    /// options are invalid.
    pub fn set_filters(&mut self, filters: ToiletFilters) -> Result<(), ClusterError> {
        if filters == self.layer.filters() {
            return Ok(());
        }
        self.layer = ToiletLayer::build(&self.toilets, filters, self.config.cluster)?;
        self.refresh();
        Ok(())
    }

    /// The map finished panning.
    pub fn move_end(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.refresh();
    }

    /// The map finished zooming.
    pub fn zoom_end(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
        self.refresh();
    }

    /// Where the map should fly when cluster `cluster_id` is clicked.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if the cluster is not part of the
    /// active layer.
    pub fn click_cluster(&self, cluster_id: usize) -> Result<ViewTarget, ClusterError> {
        let cluster = self.layer.cluster(cluster_id)?;
        self.layer
            .expansion_target(&cluster, self.config.map.max_expansion_zoom)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Active filters.
    #[must_use]
    pub const fn filters(&self) -> ToiletFilters {
        self.layer.filters()
    }

    /// Last reported viewport.
    #[must_use]
    pub const fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Markers for the last viewport.
    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Counts for the stats bar.
    #[must_use]
    pub const fn stats(&self) -> MapStats {
        self.stats
    }

    /// The active layer.
    #[must_use]
    pub const fn layer(&self) -> &ToiletLayer {
        &self.layer
    }

    fn refresh(&mut self) {
        self.state = SessionState::Querying;

        let (markers, visible) = self.viewport.as_ref().map_or_else(
            || (Vec::new(), 0),
            |viewport| {
                let result = self.layer.query(viewport);
                (
                    render(&result.items, &self.config.markers),
                    result.visible_count,
                )
            },
        );

        self.markers = markers;
        self.stats = MapStats {
            visible,
            total: self.layer.len(),
        };
        log::debug!(
            "Drew {} markers ({} of {} toilets visible)",
            self.markers.len(),
            self.stats.visible,
            self.stats.total
        );

        self.state = SessionState::Idle;
    }
}
