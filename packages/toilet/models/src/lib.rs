#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Toilet record types shared across the toilet map system.
//!
//! [`RawElement`] mirrors one entry of the Overpass `out geom` JSON dump.
//! [`Toilet`] is the normalized point record every other package works
//! with, and [`ToiletFilters`] is the user-selected predicate set applied
//! by [`filter_toilets`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// `OpenStreetMap` element type of a raw record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    /// A single tagged coordinate.
    Node,
    /// An outline (usually a building footprint) with vertex geometry.
    Way,
    /// A relation. Present in some dumps but never locatable here.
    Relation,
}

/// A single vertex of a way geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryPoint {
    /// Latitude (WGS84).
    pub lat: f64,
    /// Longitude (WGS84).
    pub lon: f64,
}

/// Bounding box attached to a way by Overpass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBounds {
    /// Southern latitude.
    pub minlat: f64,
    /// Western longitude.
    pub minlon: f64,
    /// Northern latitude.
    pub maxlat: f64,
    /// Eastern longitude.
    pub maxlon: f64,
}

impl ElementBounds {
    /// Returns the `(lat, lon)` centre of the box.
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.minlat + self.maxlat) / 2.0,
            (self.minlon + self.maxlon) / 2.0,
        )
    }
}

/// One entry from the source dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    /// Element type.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// `OpenStreetMap` element ID (unique per kind).
    pub id: i64,
    /// Latitude, present on nodes.
    #[serde(default)]
    pub lat: Option<f64>,
    /// Longitude, present on nodes.
    #[serde(default)]
    pub lon: Option<f64>,
    /// Vertex list, present on ways fetched with `out geom`.
    #[serde(default)]
    pub geometry: Option<Vec<GeometryPoint>>,
    /// Bounding box, present on ways fetched with `out geom`.
    #[serde(default)]
    pub bounds: Option<ElementBounds>,
    /// Free-form `OpenStreetMap` tags. Absent and `null` both mean none.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Open-ended `OpenStreetMap` tag map.
///
/// Known keys have dedicated accessors; every accessor returns `None` for
/// an absent key instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Returns the raw value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Inserts or replaces a tag value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Iterates over all tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `access` (`yes`, `customers`, `no`, `private`, ...).
    #[must_use]
    pub fn access(&self) -> Option<&str> {
        self.get("access")
    }

    /// `fee` (`yes`, `no`, or occasionally an amount).
    #[must_use]
    pub fn fee(&self) -> Option<&str> {
        self.get("fee")
    }

    /// `wheelchair` (`yes`, `no`, `limited`).
    #[must_use]
    pub fn wheelchair(&self) -> Option<&str> {
        self.get("wheelchair")
    }

    /// `unisex`.
    #[must_use]
    pub fn unisex(&self) -> Option<&str> {
        self.get("unisex")
    }

    /// `toilets:disposal` (`flush`, `chemical`, `pitlatrine`, ...).
    #[must_use]
    pub fn disposal(&self) -> Option<&str> {
        self.get("toilets:disposal")
    }

    /// `building`.
    #[must_use]
    pub fn building(&self) -> Option<&str> {
        self.get("building")
    }

    /// `changing_table`.
    #[must_use]
    pub fn changing_table(&self) -> Option<&str> {
        self.get("changing_table")
    }

    /// `opening_hours` in OSM opening-hours syntax.
    #[must_use]
    pub fn opening_hours(&self) -> Option<&str> {
        self.get("opening_hours")
    }

    /// `operator`.
    #[must_use]
    pub fn operator(&self) -> Option<&str> {
        self.get("operator")
    }

    /// `charge`, the price when `fee=yes`.
    #[must_use]
    pub fn charge(&self) -> Option<&str> {
        self.get("charge")
    }

    /// `description`.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    /// `note`.
    #[must_use]
    pub fn note(&self) -> Option<&str> {
        self.get("note")
    }

    /// `image` URL.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.get("image")
    }

    /// `toilets:number`, the cubicle count, when it parses as a positive
    /// integer.
    #[must_use]
    pub fn cubicles(&self) -> Option<u32> {
        self.get("toilets:number")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Tags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A normalized toilet location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toilet {
    /// `OpenStreetMap` element ID.
    pub id: i64,
    /// Element type the record was derived from.
    pub kind: ElementKind,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// `access` tag.
    pub access: Option<String>,
    /// `fee` tag.
    pub fee: Option<String>,
    /// `wheelchair` tag.
    pub wheelchair: Option<String>,
    /// `unisex` tag.
    pub unisex: Option<String>,
    /// `toilets:disposal` tag.
    pub disposal: Option<String>,
    /// `building` tag.
    pub building: Option<String>,
    /// `changing_table` tag.
    pub changing_table: Option<String>,
    /// Number of cubicles (1 unless tagged otherwise).
    pub cubicles: u32,
    /// All source tags, for popup fields without a dedicated column.
    pub tags: Tags,
}

impl Toilet {
    /// Stable key of the form `"{kind}-{id}"`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}-{}", self.kind, self.id)
    }

    /// Whether the toilet is tagged `wheelchair=yes`.
    #[must_use]
    pub fn is_wheelchair_accessible(&self) -> bool {
        self.wheelchair.as_deref() == Some("yes")
    }

    /// Whether the toilet is tagged `fee=yes`.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.fee.as_deref() == Some("yes")
    }
}

/// User-selected filter predicates.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct ToiletFilters {
    /// Hide toilets tagged `fee=yes`. Toilets with unknown fee stay
    /// visible.
    #[serde(default)]
    pub free_only: bool,
    /// Keep only toilets tagged `wheelchair=yes`.
    #[serde(default)]
    pub wheelchair_only: bool,
}

impl ToiletFilters {
    /// Every predicate combination, unfiltered first.
    pub const ALL: [Self; 4] = [
        Self {
            free_only: false,
            wheelchair_only: false,
        },
        Self {
            free_only: true,
            wheelchair_only: false,
        },
        Self {
            free_only: false,
            wheelchair_only: true,
        },
        Self {
            free_only: true,
            wheelchair_only: true,
        },
    ];

    /// Whether `toilet` passes every enabled predicate.
    #[must_use]
    pub fn matches(&self, toilet: &Toilet) -> bool {
        if self.wheelchair_only && !toilet.is_wheelchair_accessible() {
            return false;
        }
        if self.free_only && toilet.is_paid() {
            return false;
        }
        true
    }
}

/// Returns the toilets that pass `filters`, preserving input order.
#[must_use]
pub fn filter_toilets(toilets: &[Toilet], filters: ToiletFilters) -> Vec<Toilet> {
    toilets
        .iter()
        .filter(|t| filters.matches(t))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toilet(id: i64, fee: Option<&str>, wheelchair: Option<&str>) -> Toilet {
        Toilet {
            id,
            kind: ElementKind::Node,
            latitude: 59.9,
            longitude: 10.7,
            access: Some("yes".to_string()),
            fee: fee.map(String::from),
            wheelchair: wheelchair.map(String::from),
            unisex: None,
            disposal: None,
            building: None,
            changing_table: None,
            cubicles: 1,
            tags: Tags::default(),
        }
    }

    #[test]
    fn deserializes_node_element() {
        let raw: RawElement = serde_json::from_value(serde_json::json!({
            "type": "node",
            "id": 1,
            "lat": 59.9,
            "lon": 10.7,
            "tags": { "access": "yes", "wheelchair": "yes", "fee": "no" }
        }))
        .unwrap();

        assert_eq!(raw.kind, ElementKind::Node);
        assert_eq!(raw.tags.wheelchair(), Some("yes"));
        assert_eq!(raw.tags.fee(), Some("no"));
        assert!(raw.geometry.is_none());
    }

    #[test]
    fn deserializes_way_without_tags() {
        let raw: RawElement = serde_json::from_value(serde_json::json!({
            "type": "way",
            "id": 7,
            "bounds": { "minlat": 60.0, "minlon": 10.0, "maxlat": 60.2, "maxlon": 10.4 }
        }))
        .unwrap();

        assert_eq!(raw.kind, ElementKind::Way);
        assert!(raw.tags.is_empty());
        let (lat, lon) = raw.bounds.unwrap().center();
        assert!((lat - 60.1).abs() < 1e-9);
        assert!((lon - 10.2).abs() < 1e-9);
    }

    #[test]
    fn null_tags_are_empty() {
        let raw: RawElement = serde_json::from_value(serde_json::json!({
            "type": "node",
            "id": 3,
            "lat": 59.9,
            "lon": 10.7,
            "tags": null
        }))
        .unwrap();

        assert!(raw.tags.is_empty());
        assert!(raw.tags.access().is_none());
    }

    #[test]
    fn absent_tags_are_none() {
        let tags = Tags::default();
        assert!(tags.access().is_none());
        assert!(tags.opening_hours().is_none());
        assert!(tags.cubicles().is_none());
    }

    #[test]
    fn cubicles_rejects_garbage_and_zero() {
        let tags: Tags = [("toilets:number", "3")].into_iter().collect();
        assert_eq!(tags.cubicles(), Some(3));

        let tags: Tags = [("toilets:number", "0")].into_iter().collect();
        assert_eq!(tags.cubicles(), None);

        let tags: Tags = [("toilets:number", "a few")].into_iter().collect();
        assert_eq!(tags.cubicles(), None);
    }

    #[test]
    fn key_combines_kind_and_id() {
        assert_eq!(toilet(42, None, None).key(), "node-42");
    }

    #[test]
    fn wheelchair_only_requires_yes() {
        let toilets = vec![
            toilet(1, None, Some("yes")),
            toilet(2, None, Some("limited")),
            toilet(3, None, None),
        ];
        let filters = ToiletFilters {
            wheelchair_only: true,
            ..ToiletFilters::default()
        };

        let ids: Vec<i64> = filter_toilets(&toilets, filters)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn free_only_keeps_unknown_fee() {
        let toilets = vec![
            toilet(1, Some("yes"), None),
            toilet(2, Some("no"), None),
            toilet(3, None, None),
        ];
        let filters = ToiletFilters {
            free_only: true,
            ..ToiletFilters::default()
        };

        let ids: Vec<i64> = filter_toilets(&toilets, filters)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let toilets = vec![
            toilet(1, Some("yes"), Some("yes")),
            toilet(2, Some("no"), Some("yes")),
            toilet(3, None, Some("no")),
            toilet(4, None, None),
        ];

        for filters in ToiletFilters::ALL {
            let once = filter_toilets(&toilets, filters);
            let twice = filter_toilets(&once, filters);
            assert_eq!(once, twice, "not idempotent for {filters:?}");
        }
    }

    #[test]
    fn default_filters_keep_everything() {
        let toilets = vec![toilet(1, Some("yes"), None), toilet(2, None, Some("no"))];
        assert_eq!(filter_toilets(&toilets, ToiletFilters::default()), toilets);
    }
}
