//! Dataset inspection reports over raw elements.
//!
//! These work on [`RawElement`]s rather than toilets so that elements the
//! normalizer drops still show up.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use toilet_map_toilet_models::{ElementBounds, ElementKind, RawElement, Tags};

/// Every distinct value seen for one tag key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagValues {
    /// Tag key.
    pub key: String,
    /// Distinct values, sorted.
    pub values: Vec<String>,
}

/// Collects the distinct values of every tag key.
///
/// Keys with the most distinct values come first; ties are in key order.
#[must_use]
pub fn tag_values(elements: &[RawElement]) -> Vec<TagValues> {
    let mut seen: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for element in elements {
        for (key, value) in element.tags.iter() {
            seen.entry(key).or_default().insert(value);
        }
    }

    let mut tags: Vec<TagValues> = seen
        .into_iter()
        .map(|(key, values)| TagValues {
            key: key.to_string(),
            values: values.into_iter().map(String::from).collect(),
        })
        .collect();
    tags.sort_by_key(|t| Reverse(t.values.len()));
    tags
}

/// The way with the largest bounding box.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestWay {
    /// Way ID.
    pub id: i64,
    /// Bounds area in square degrees.
    pub area: f64,
    /// The way's bounds.
    pub bounds: ElementBounds,
    /// The way's tags.
    pub tags: Tags,
}

/// Bounding box statistics for the ways of a dump.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WayAreaReport {
    /// Number of ways.
    pub ways: usize,
    /// The way with the largest non-zero bounds area, if any.
    pub largest: Option<LargestWay>,
    /// IDs of ways that carry no bounds.
    pub without_bounds: Vec<i64>,
}

/// Bounds area in square degrees.
#[must_use]
pub fn bounds_area(bounds: &ElementBounds) -> f64 {
    (bounds.maxlat - bounds.minlat) * (bounds.maxlon - bounds.minlon)
}

/// Finds the largest way and the ways without bounds.
///
/// A very large way usually means a mis-tagged area whose centre is a poor
/// toilet location.
#[must_use]
pub fn way_areas(elements: &[RawElement]) -> WayAreaReport {
    let mut report = WayAreaReport::default();

    for element in elements.iter().filter(|e| e.kind == ElementKind::Way) {
        report.ways += 1;

        let Some(bounds) = element.bounds else {
            report.without_bounds.push(element.id);
            continue;
        };

        let area = bounds_area(&bounds);
        if report.largest.as_ref().map_or(0.0, |l| l.area) < area {
            report.largest = Some(LargestWay {
                id: element.id,
                area,
                bounds,
                tags: element.tags.clone(),
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elements(value: serde_json::Value) -> Vec<RawElement> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn tags_sorted_by_distinct_values() {
        let elements = elements(serde_json::json!([
            { "type": "node", "id": 1, "tags": { "fee": "yes", "access": "yes" } },
            { "type": "node", "id": 2, "tags": { "fee": "no", "access": "yes" } },
            { "type": "way", "id": 3, "tags": { "fee": "20 NOK", "wheelchair": "no" } },
            { "type": "node", "id": 4 }
        ]));

        let tags = tag_values(&elements);
        let keys: Vec<&str> = tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["fee", "access", "wheelchair"]);
        assert_eq!(tags[0].values, vec!["20 NOK", "no", "yes"]);
        assert_eq!(tags[1].values, vec!["yes"]);
    }

    #[test]
    fn no_elements_no_tags() {
        assert!(tag_values(&[]).is_empty());
    }

    #[test]
    fn finds_largest_way_and_missing_bounds() {
        let elements = elements(serde_json::json!([
            {
                "type": "way", "id": 10,
                "bounds": { "minlat": 60.0, "minlon": 10.0, "maxlat": 60.1, "maxlon": 10.1 }
            },
            {
                "type": "way", "id": 11,
                "bounds": { "minlat": 60.0, "minlon": 10.0, "maxlat": 60.5, "maxlon": 10.2 },
                "tags": { "building": "yes" }
            },
            { "type": "way", "id": 12 },
            {
                "type": "node", "id": 13, "lat": 0.0, "lon": 0.0,
                "bounds": { "minlat": 0.0, "minlon": 0.0, "maxlat": 9.0, "maxlon": 9.0 }
            }
        ]));

        let report = way_areas(&elements);
        assert_eq!(report.ways, 3);
        assert_eq!(report.without_bounds, vec![12]);

        let largest = report.largest.unwrap();
        assert_eq!(largest.id, 11);
        assert!((largest.area - 0.1).abs() < 1e-9);
        assert_eq!(largest.tags.building(), Some("yes"));
    }

    #[test]
    fn zero_area_ways_are_never_largest() {
        let elements = elements(serde_json::json!([{
            "type": "way", "id": 20,
            "bounds": { "minlat": 60.0, "minlon": 10.0, "maxlat": 60.0, "maxlon": 10.0 }
        }]));

        let report = way_areas(&elements);
        assert_eq!(report.ways, 1);
        assert!(report.largest.is_none());
        assert!(report.without_bounds.is_empty());
    }
}
