#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hierarchical greedy clustering of map points.
//!
//! Builds one R-tree per zoom level. The level above `max_zoom` holds the
//! raw points; every level below it is produced from the next one up by
//! merging each unvisited node with all unvisited neighbours inside the
//! clustering radius (in screen pixels, converted to the projected unit
//! square for that zoom). A viewport query then only has to range-search
//! the level for the requested zoom.
//!
//! Cluster ids encode the index of the node the cluster grew from and the
//! level that node lives on, so children and leaves can be found again
//! without storing an explicit tree.

pub mod projection;

use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use projection::{lat_y, lng_x, x_lng, y_lat};

/// Highest supported `max_zoom`. Cluster ids keep the origin level in five
/// bits, so level `max_zoom + 1` must stay below 32.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Anything with a WGS84 position.
pub trait Located {
    /// Returns `(longitude, latitude)`.
    fn lng_lat(&self) -> (f64, f64);
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub west: f64,
    /// Southern latitude boundary.
    pub south: f64,
    /// Eastern longitude boundary.
    pub east: f64,
    /// Northern latitude boundary.
    pub north: f64,
}

impl BoundingBox {
    /// The whole world.
    pub const WORLD: Self = Self::new(-180.0, -90.0, 180.0, 90.0);

    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Whether the point lies inside the box (edges included). Boxes whose
    /// west edge is east of their east edge wrap across the antimeridian.
    #[must_use]
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.east - self.west >= 360.0 {
            return true;
        }
        if self.west <= self.east {
            lng >= self.west && lng <= self.east
        } else {
            lng >= self.west || lng <= self.east
        }
    }
}

/// Clustering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ClusterOptions {
    /// Lowest zoom level at which clusters are generated.
    pub min_zoom: u8,
    /// Highest zoom level at which clusters are generated.
    pub max_zoom: u8,
    /// Minimum number of points needed to form a cluster.
    pub min_points: usize,
    /// Cluster radius in pixels.
    pub radius: f64,
    /// Tile extent the radius is relative to.
    pub extent: f64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            min_zoom: 0,
            max_zoom: 16,
            min_points: 2,
            radius: 80.0,
            extent: 512.0,
        }
    }
}

/// Errors from clustering operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusterError {
    /// The id does not name a cluster of this index.
    #[error("No cluster with id {0}")]
    NotFound(usize),

    /// The options cannot produce a valid index.
    #[error("Invalid cluster options: {message}")]
    InvalidOptions {
        /// What is wrong with the options.
        message: String,
    },
}

/// An aggregate of nearby points at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Cluster id, valid for [`ClusterIndex::get_children`] and friends.
    pub id: usize,
    /// Longitude of the weighted centroid.
    pub longitude: f64,
    /// Latitude of the weighted centroid.
    pub latitude: f64,
    /// Number of points in the cluster.
    pub point_count: usize,
}

impl Cluster {
    /// Short count label: `"42"`, `"1.5k"`, `"12k"`.
    #[must_use]
    pub fn abbreviated_count(&self) -> String {
        abbreviate_count(self.point_count)
    }
}

/// Formats a point count the way cluster bubbles display it.
#[must_use]
pub fn abbreviate_count(count: usize) -> String {
    #[allow(clippy::cast_precision_loss)]
    let n = count as f64;
    if count >= 10_000 {
        format!("{}k", (n / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (n / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

/// One result of a cluster query.
#[derive(Debug)]
pub enum ClusterItem<'a, T> {
    /// An aggregate of several points.
    Cluster(Cluster),
    /// A single input point.
    Point {
        /// Index of the point in the loaded slice.
        index: usize,
        /// The point itself.
        point: &'a T,
    },
}

impl<T> Clone for ClusterItem<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ClusterItem<'_, T> {}

impl<'a, T> ClusterItem<'a, T> {
    /// Maps the point reference, keeping clusters as they are.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(&'a T) -> &'a U) -> ClusterItem<'a, U> {
        match self {
            Self::Cluster(c) => ClusterItem::Cluster(c),
            Self::Point { index, point } => ClusterItem::Point {
                index,
                point: f(point),
            },
        }
    }

    /// Number of input points the item stands for.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        match self {
            Self::Cluster(c) => c.point_count,
            Self::Point { .. } => 1,
        }
    }
}

impl<T: Located> ClusterItem<'_, T> {
    /// Returns `(longitude, latitude)` of the item.
    #[must_use]
    pub fn lng_lat(&self) -> (f64, f64) {
        match self {
            Self::Cluster(c) => (c.longitude, c.latitude),
            Self::Point { point, .. } => point.lng_lat(),
        }
    }
}

/// A node on one zoom level: either an input point or a cluster.
#[derive(Debug, Clone, Copy)]
struct Node {
    x: f64,
    y: f64,
    /// Last zoom this node was visited at; `None` until visited.
    zoom: Option<u8>,
    /// Point index for leaves, cluster id for clusters.
    id: usize,
    parent_id: Option<usize>,
    num_points: usize,
}

impl Node {
    fn unvisited_at(&self, zoom: u8) -> bool {
        self.zoom.is_none_or(|z| z > zoom)
    }
}

struct Level {
    nodes: Vec<Node>,
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl Level {
    fn new(nodes: Vec<Node>) -> Self {
        let entries = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| GeomWithData::new([n.x, n.y], i))
            .collect();
        Self {
            nodes,
            tree: RTree::bulk_load(entries),
        }
    }

    fn within(&self, x: f64, y: f64, r: f64) -> Vec<usize> {
        self.tree
            .locate_within_distance([x, y], r * r)
            .map(|e| e.data)
            .collect()
    }
}

/// A clustering index over a fixed set of points.
///
/// The index is immutable: changing the point set means building a new
/// index.
pub struct ClusterIndex<T> {
    options: ClusterOptions,
    points: Vec<T>,
    /// Indexed by zoom; `None` below `min_zoom`.
    levels: Vec<Option<Level>>,
}

impl<T: Located> ClusterIndex<T> {
    /// Builds the index over `points`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if the zoom range is empty
    /// or too deep, or the radius/extent are not positive.
    pub fn load(options: ClusterOptions, points: Vec<T>) -> Result<Self, ClusterError> {
        validate(&options)?;

        let leaves = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let (lng, lat) = p.lng_lat();
                Node {
                    x: lng_x(lng),
                    y: lat_y(lat),
                    zoom: None,
                    id: i,
                    parent_id: None,
                    num_points: 1,
                }
            })
            .collect();

        let top = usize::from(options.max_zoom) + 1;
        let mut levels: Vec<Option<Level>> = (0..=top).map(|_| None).collect();
        levels[top] = Some(Level::new(leaves));

        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let z = usize::from(zoom);
            let Some(upper) = levels[z + 1].as_mut() else {
                break;
            };
            let nodes = cluster_level(upper, zoom, &options, points.len());
            log::trace!("z{zoom}: {} nodes", nodes.len());
            levels[z] = Some(Level::new(nodes));
        }

        log::debug!(
            "Built cluster index over {} points (z{}..z{})",
            points.len(),
            options.min_zoom,
            options.max_zoom
        );

        Ok(Self {
            options,
            points,
            levels,
        })
    }

    /// The options the index was built with.
    #[must_use]
    pub const fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// The indexed points, in load order.
    #[must_use]
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// Returns clusters and points inside `bbox` at `zoom`.
    ///
    /// Fractional zooms are floored and clamped to
    /// `min_zoom..=max_zoom + 1`. Longitudes wrap; a box crossing the
    /// antimeridian is queried as two halves.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn get_clusters(&self, bbox: &BoundingBox, zoom: f64) -> Vec<ClusterItem<'_, T>> {
        let mut min_lng = ((bbox.west + 180.0) % 360.0 + 360.0) % 360.0 - 180.0;
        let min_lat = bbox.south.clamp(-90.0, 90.0);
        let mut max_lng = if bbox.east == 180.0 {
            180.0
        } else {
            ((bbox.east + 180.0) % 360.0 + 360.0) % 360.0 - 180.0
        };
        let max_lat = bbox.north.clamp(-90.0, 90.0);

        if bbox.east - bbox.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let mut eastern =
                self.get_clusters(&BoundingBox::new(min_lng, min_lat, 180.0, max_lat), zoom);
            let western =
                self.get_clusters(&BoundingBox::new(-180.0, min_lat, max_lng, max_lat), zoom);
            eastern.extend(western);
            return eastern;
        }

        let Some(level) = self.level(self.limit_zoom(zoom)) else {
            return Vec::new();
        };

        let envelope = AABB::from_corners(
            [lng_x(min_lng), lat_y(max_lat)],
            [lng_x(max_lng), lat_y(min_lat)],
        );

        level
            .tree
            .locate_in_envelope(&envelope)
            .map(|e| self.item(&level.nodes[e.data]))
            .collect()
    }

    /// Returns the direct children of a cluster one zoom level up.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if `cluster_id` is not a cluster
    /// of this index.
    pub fn get_children(&self, cluster_id: usize) -> Result<Vec<ClusterItem<'_, T>>, ClusterError> {
        Ok(self
            .child_nodes(cluster_id)?
            .into_iter()
            .map(|n| self.item(n))
            .collect())
    }

    /// Looks a cluster up by id.
    ///
    /// The centroid is recomputed from the cluster's children, which are
    /// exactly the nodes that were merged into it.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if `cluster_id` is not a cluster
    /// of this index.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_cluster(&self, cluster_id: usize) -> Result<Cluster, ClusterError> {
        let children = self.child_nodes(cluster_id)?;
        let point_count: usize = children.iter().map(|n| n.num_points).sum();
        let (wx, wy) = children.iter().fold((0.0, 0.0), |(wx, wy), n| {
            (
                wx + n.x * n.num_points as f64,
                wy + n.y * n.num_points as f64,
            )
        });

        Ok(Cluster {
            id: cluster_id,
            longitude: x_lng(wx / point_count as f64),
            latitude: y_lat(wy / point_count as f64),
            point_count,
        })
    }

    fn child_nodes(&self, cluster_id: usize) -> Result<Vec<&Node>, ClusterError> {
        let (origin_id, origin_zoom) = self.decode(cluster_id)?;
        let level = self
            .level(origin_zoom)
            .ok_or(ClusterError::NotFound(cluster_id))?;
        let origin = level
            .nodes
            .get(origin_id)
            .ok_or(ClusterError::NotFound(cluster_id))?;

        let r = self.options.radius
            / (self.options.extent * 2f64.powi(i32::from(origin_zoom) - 1));

        let children: Vec<&Node> = level
            .within(origin.x, origin.y, r)
            .into_iter()
            .map(|i| &level.nodes[i])
            .filter(|n| n.parent_id == Some(cluster_id))
            .collect();

        if children.is_empty() {
            return Err(ClusterError::NotFound(cluster_id));
        }

        Ok(children)
    }

    /// Returns up to `limit` input points of a cluster, skipping the first
    /// `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if `cluster_id` is not a cluster
    /// of this index.
    pub fn get_leaves(
        &self,
        cluster_id: usize,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<&T>, ClusterError> {
        let mut leaves = Vec::new();
        self.append_leaves(&mut leaves, cluster_id, limit, offset, 0)?;
        Ok(leaves)
    }

    /// Returns the zoom at which a cluster first splits into more than one
    /// child.
    ///
    /// The result can exceed `max_zoom` by one, the level where every
    /// point stands alone; callers that drive a map should cap it.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NotFound`] if `cluster_id` is not a cluster
    /// of this index.
    pub fn get_cluster_expansion_zoom(&self, cluster_id: usize) -> Result<u8, ClusterError> {
        let (_, origin_zoom) = self.decode(cluster_id)?;
        let mut expansion_zoom = origin_zoom - 1;
        let mut id = cluster_id;

        while expansion_zoom <= self.options.max_zoom {
            let children = self.get_children(id)?;
            expansion_zoom += 1;
            match children.as_slice() {
                [ClusterItem::Cluster(only)] => id = only.id,
                _ => break,
            }
        }

        Ok(expansion_zoom)
    }

    fn append_leaves<'a>(
        &'a self,
        result: &mut Vec<&'a T>,
        cluster_id: usize,
        limit: usize,
        offset: usize,
        mut skipped: usize,
    ) -> Result<usize, ClusterError> {
        for child in self.get_children(cluster_id)? {
            match child {
                ClusterItem::Cluster(c) => {
                    if skipped + c.point_count <= offset {
                        skipped += c.point_count;
                    } else {
                        skipped = self.append_leaves(result, c.id, limit, offset, skipped)?;
                    }
                }
                ClusterItem::Point { point, .. } => {
                    if skipped < offset {
                        skipped += 1;
                    } else {
                        result.push(point);
                    }
                }
            }

            if result.len() == limit {
                break;
            }
        }

        Ok(skipped)
    }

    fn item(&self, node: &Node) -> ClusterItem<'_, T> {
        if node.num_points > 1 {
            ClusterItem::Cluster(Cluster {
                id: node.id,
                longitude: x_lng(node.x),
                latitude: y_lat(node.y),
                point_count: node.num_points,
            })
        } else {
            ClusterItem::Point {
                index: node.id,
                point: &self.points[node.id],
            }
        }
    }

    fn level(&self, zoom: u8) -> Option<&Level> {
        self.levels.get(usize::from(zoom)).and_then(Option::as_ref)
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn limit_zoom(&self, zoom: f64) -> u8 {
        let max = f64::from(self.options.max_zoom) + 1.0;
        let min = f64::from(self.options.min_zoom);
        if zoom.is_nan() {
            return self.options.min_zoom;
        }
        zoom.floor().clamp(min, max) as u8
    }

    /// Splits a cluster id into origin node index and origin zoom.
    fn decode(&self, cluster_id: usize) -> Result<(usize, u8), ClusterError> {
        let offset = cluster_id
            .checked_sub(self.points.len())
            .ok_or(ClusterError::NotFound(cluster_id))?;
        #[allow(clippy::cast_possible_truncation)]
        let origin_zoom = (offset % 32) as u8;
        if origin_zoom == 0 || origin_zoom > self.options.max_zoom + 1 {
            return Err(ClusterError::NotFound(cluster_id));
        }
        Ok((offset >> 5, origin_zoom))
    }
}

fn validate(options: &ClusterOptions) -> Result<(), ClusterError> {
    let message = if options.min_zoom > options.max_zoom {
        format!(
            "min_zoom {} is above max_zoom {}",
            options.min_zoom, options.max_zoom
        )
    } else if options.max_zoom > MAX_SUPPORTED_ZOOM {
        format!(
            "max_zoom {} exceeds {MAX_SUPPORTED_ZOOM}",
            options.max_zoom
        )
    } else if options.radius.is_nan() || options.radius <= 0.0 {
        format!("radius must be positive, got {}", options.radius)
    } else if options.extent.is_nan() || options.extent <= 0.0 {
        format!("extent must be positive, got {}", options.extent)
    } else {
        return Ok(());
    };

    Err(ClusterError::InvalidOptions { message })
}

/// Produces the nodes of level `zoom` from the level above it, marking the
/// visited nodes of `upper` along the way.
#[allow(clippy::cast_precision_loss)]
fn cluster_level(
    upper: &mut Level,
    zoom: u8,
    options: &ClusterOptions,
    point_total: usize,
) -> Vec<Node> {
    let r = options.radius / (options.extent * 2f64.powi(i32::from(zoom)));
    let mut next = Vec::new();

    for i in 0..upper.nodes.len() {
        if !upper.nodes[i].unvisited_at(zoom) {
            continue;
        }
        upper.nodes[i].zoom = Some(zoom);

        let Node { x, y, .. } = upper.nodes[i];
        let neighbors = upper.within(x, y, r);

        let num_points_origin = upper.nodes[i].num_points;
        let num_points = num_points_origin
            + neighbors
                .iter()
                .map(|&k| &upper.nodes[k])
                .filter(|n| n.unvisited_at(zoom))
                .map(|n| n.num_points)
                .sum::<usize>();

        if num_points > num_points_origin && num_points >= options.min_points {
            let mut wx = x * num_points_origin as f64;
            let mut wy = y * num_points_origin as f64;
            let id = (i << 5) + usize::from(zoom) + 1 + point_total;

            for &k in &neighbors {
                let neighbor = &mut upper.nodes[k];
                if !neighbor.unvisited_at(zoom) {
                    continue;
                }
                neighbor.zoom = Some(zoom);
                neighbor.parent_id = Some(id);
                wx += neighbor.x * neighbor.num_points as f64;
                wy += neighbor.y * neighbor.num_points as f64;
            }

            upper.nodes[i].parent_id = Some(id);
            next.push(Node {
                x: wx / num_points as f64,
                y: wy / num_points as f64,
                zoom: None,
                id,
                parent_id: None,
                num_points,
            });
        } else {
            next.push(upper.nodes[i]);

            if num_points > 1 {
                for &k in &neighbors {
                    let neighbor = &mut upper.nodes[k];
                    if !neighbor.unvisited_at(zoom) {
                        continue;
                    }
                    neighbor.zoom = Some(zoom);
                    next.push(*neighbor);
                }
            }
        }
    }

    next
}
