//! A filtered toilet list and the clustering index built over it.

use serde::{Deserialize, Serialize};
use toilet_map_cluster::{
    BoundingBox, Cluster, ClusterError, ClusterIndex, ClusterItem, ClusterOptions, Located,
};
use toilet_map_toilet_models::{Toilet, ToiletFilters, filter_toilets};

use crate::LatLon;

/// The visible part of the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Visible bounding box.
    pub bbox: BoundingBox,
    /// Current zoom, possibly fractional.
    pub zoom: f64,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(bbox: BoundingBox, zoom: f64) -> Self {
        Self { bbox, zoom }
    }
}

/// Where the map should move after a cluster click.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTarget {
    /// New map centre.
    pub center: LatLon,
    /// New zoom.
    pub zoom: u8,
}

/// Items visible in one viewport.
#[derive(Debug, Clone)]
pub struct ViewportResult<'a> {
    /// Clusters and single toilets.
    pub items: Vec<ClusterItem<'a, Toilet>>,
    /// Toilets represented by `items`.
    pub visible_count: usize,
}

/// Sums cluster sizes plus one per single toilet.
#[must_use]
pub fn visible_count(items: &[ClusterItem<'_, Toilet>]) -> usize {
    items.iter().map(ClusterItem::point_count).sum()
}

/// A toilet as the cluster index sees it.
struct Placed(Toilet);

impl Located for Placed {
    fn lng_lat(&self) -> (f64, f64) {
        (self.0.longitude, self.0.latitude)
    }
}

/// Filtered toilets plus the index over exactly those toilets.
///
/// The index owns the filtered list, so the two can only be replaced
/// together.
pub struct ToiletLayer {
    filters: ToiletFilters,
    index: ClusterIndex<Placed>,
}

impl ToiletLayer {
    /// Filters `toilets` and clusters the result.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if `options` are invalid.
    pub fn build(
        toilets: &[Toilet],
        filters: ToiletFilters,
        options: ClusterOptions,
    ) -> Result<Self, ClusterError> {
        let filtered = filter_toilets(toilets, filters);
        log::debug!(
            "Building layer for {filters:?}: {} of {} toilets",
            filtered.len(),
            toilets.len()
        );

        let points = filtered.into_iter().map(Placed).collect();
        Ok(Self {
            filters,
            index: ClusterIndex::load(options, points)?,
        })
    }

    /// Filters the layer was built with.
    #[must_use]
    pub const fn filters(&self) -> ToiletFilters {
        self.filters
    }

    /// The filtered toilets, in input order.
    pub fn toilets(&self) -> impl ExactSizeIterator<Item = &Toilet> {
        self.index.points().iter().map(|p| &p.0)
    }

    /// Number of filtered toilets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.points().len()
    }

    /// Whether no toilet passed the filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.points().is_empty()
    }

    /// Clusters and toilets visible in `viewport`.
    #[must_use]
    pub fn query(&self, viewport: &Viewport) -> ViewportResult<'_> {
        let items: Vec<_> = self
            .index
            .get_clusters(&viewport.bbox, viewport.zoom)
            .into_iter()
            .map(|item| item.map(|p| &p.0))
            .collect();
        let visible_count = visible_count(&items);
        ViewportResult {
            items,
            visible_count,
        }
    }

    /// Looks a cluster up by id.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] for unknown ids.
    pub fn cluster(&self, cluster_id: usize) -> Result<Cluster, ClusterError> {
        self.index.get_cluster(cluster_id)
    }

    /// Zoom at which the cluster splits into more than one item.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] for unknown ids.
    pub fn expansion_zoom(&self, cluster_id: usize) -> Result<u8, ClusterError> {
        self.index.get_cluster_expansion_zoom(cluster_id)
    }

    /// Where to move the map when `cluster` is clicked: centred on it, at
    /// its expansion zoom but never above `max_zoom`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if the cluster does not belong to
    /// this layer.
    pub fn expansion_target(
        &self,
        cluster: &Cluster,
        max_zoom: u8,
    ) -> Result<ViewTarget, ClusterError> {
        let expansion = self.expansion_zoom(cluster.id)?;
        Ok(ViewTarget {
            center: LatLon::new(cluster.latitude, cluster.longitude),
            zoom: expansion.min(max_zoom),
        })
    }

    /// Finds a toilet by its `"{kind}-{id}"` key.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<&Toilet> {
        self.toilets().find(|t| t.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toilet_map_toilet_models::{ElementKind, Tags};

    fn toilet(id: i64, lat: f64, lon: f64, fee: &str, wheelchair: &str) -> Toilet {
        Toilet {
            id,
            kind: ElementKind::Node,
            latitude: lat,
            longitude: lon,
            access: Some("yes".to_string()),
            fee: Some(fee.to_string()),
            wheelchair: Some(wheelchair.to_string()),
            unisex: None,
            disposal: None,
            building: None,
            changing_table: None,
            cubicles: 1,
            tags: Tags::default(),
        }
    }

    fn oslo_cluster() -> Vec<Toilet> {
        vec![
            toilet(1, 59.910, 10.750, "no", "yes"),
            toilet(2, 59.911, 10.752, "yes", "no"),
            toilet(3, 59.912, 10.751, "no", "no"),
            toilet(4, 60.391, 5.322, "yes", "yes"),
        ]
    }

    #[test]
    fn filtered_layer_only_indexes_matching_toilets() {
        let filters = ToiletFilters {
            wheelchair_only: true,
            ..ToiletFilters::default()
        };
        let layer =
            ToiletLayer::build(&oslo_cluster(), filters, ClusterOptions::default()).unwrap();

        assert_eq!(layer.len(), 2);
        assert!(layer.toilets().all(Toilet::is_wheelchair_accessible));
        let result = layer.query(&Viewport::new(BoundingBox::WORLD, 17.0));
        assert_eq!(result.visible_count, 2);
    }

    #[test]
    fn visible_count_sums_clusters_and_singletons() {
        let layer =
            ToiletLayer::build(&oslo_cluster(), ToiletFilters::default(), ClusterOptions::default())
                .unwrap();

        let result = layer.query(&Viewport::new(BoundingBox::WORLD, 5.0));
        assert_eq!(result.items.len(), 2);
        assert_eq!(result.visible_count, 4);
    }

    #[test]
    fn viewport_limits_results() {
        let layer =
            ToiletLayer::build(&oslo_cluster(), ToiletFilters::default(), ClusterOptions::default())
                .unwrap();
        let bergen = BoundingBox::new(5.0, 60.0, 6.0, 61.0);

        let result = layer.query(&Viewport::new(bergen, 12.0));
        assert_eq!(result.visible_count, 1);
    }

    #[test]
    fn expansion_target_is_capped() {
        let same_spot = vec![
            toilet(1, 59.91, 10.75, "no", "no"),
            toilet(2, 59.91, 10.75, "no", "no"),
        ];
        let layer =
            ToiletLayer::build(&same_spot, ToiletFilters::default(), ClusterOptions::default())
                .unwrap();

        let result = layer.query(&Viewport::new(BoundingBox::WORLD, 10.0));
        let ClusterItem::Cluster(cluster) = result.items[0] else {
            panic!("expected a cluster");
        };

        assert_eq!(layer.expansion_zoom(cluster.id).unwrap(), 17);
        let target = layer.expansion_target(&cluster, 16).unwrap();
        assert_eq!(target.zoom, 16);
        assert!((target.center.latitude - 59.91).abs() < 1e-6);
        assert!((target.center.longitude - 10.75).abs() < 1e-6);
    }

    #[test]
    fn finds_toilet_by_key() {
        let layer =
            ToiletLayer::build(&oslo_cluster(), ToiletFilters::default(), ClusterOptions::default())
                .unwrap();
        assert_eq!(layer.find("node-3").map(|t| t.id), Some(3));
        assert!(layer.find("way-3").is_none());
    }

    #[test]
    fn empty_layer_queries_cleanly() {
        let layer =
            ToiletLayer::build(&[], ToiletFilters::default(), ClusterOptions::default()).unwrap();
        assert!(layer.is_empty());
        let result = layer.query(&Viewport::new(BoundingBox::WORLD, 6.0));
        assert!(result.items.is_empty());
        assert_eq!(result.visible_count, 0);
    }
}
