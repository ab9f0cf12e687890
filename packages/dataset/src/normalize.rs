//! Raw element to [`Toilet`] normalization.

use serde::Serialize;
use toilet_map_toilet_models::{ElementKind, RawElement, Toilet};

/// Counters describing what happened to each element of a dump.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Entries in the `elements` array.
    pub elements: usize,
    /// Entries typed `node`.
    pub nodes: usize,
    /// Entries typed `way`.
    pub ways: usize,
    /// Toilets produced.
    pub kept: usize,
    /// Dropped because `access` is `no` or `private`.
    pub dropped_private: usize,
    /// Dropped because no coordinate could be derived.
    pub dropped_no_location: usize,
    /// Dropped because the entry did not match the element shape or had an
    /// unsupported type.
    pub dropped_malformed: usize,
}

impl LoadReport {
    /// Total number of dropped entries.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped_private + self.dropped_no_location + self.dropped_malformed
    }
}

/// Why a single element produced no toilet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    /// `access=no` or `access=private`.
    Private,
    /// No coordinates, geometry or bounds.
    NoLocation,
    /// Element type that never carries a toilet location.
    Unsupported,
}

/// Returns whether the access tag closes the toilet to the public.
#[must_use]
pub fn is_restricted(access: Option<&str>) -> bool {
    matches!(access, Some("no" | "private"))
}

/// Derives the `(lat, lon)` of an element.
///
/// Nodes use their own coordinates. Ways use the arithmetic mean of their
/// geometry vertices. Either kind falls back to the centre of its bounds.
#[must_use]
pub fn locate(element: &RawElement) -> Option<(f64, f64)> {
    match element.kind {
        ElementKind::Node => {
            if let (Some(lat), Some(lon)) = (element.lat, element.lon) {
                return Some((lat, lon));
            }
        }
        ElementKind::Way => {
            if let Some(geometry) = element.geometry.as_deref().filter(|g| !g.is_empty()) {
                #[allow(clippy::cast_precision_loss)]
                let n = geometry.len() as f64;
                let lat = geometry.iter().map(|p| p.lat).sum::<f64>() / n;
                let lon = geometry.iter().map(|p| p.lon).sum::<f64>() / n;
                return Some((lat, lon));
            }
        }
        ElementKind::Relation => return None,
    }

    element.bounds.map(|b| b.center())
}

/// Converts one raw element into a [`Toilet`].
///
/// # Errors
///
/// Returns the [`Skip`] reason when the element cannot be shown on the
/// map.
pub fn normalize_element(element: &RawElement) -> Result<Toilet, Skip> {
    if element.kind == ElementKind::Relation {
        return Err(Skip::Unsupported);
    }

    let tags = &element.tags;
    if is_restricted(tags.access()) {
        return Err(Skip::Private);
    }

    let (latitude, longitude) = locate(element).ok_or(Skip::NoLocation)?;

    Ok(Toilet {
        id: element.id,
        kind: element.kind,
        latitude,
        longitude,
        access: tags.access().map(String::from),
        fee: tags.fee().map(String::from),
        wheelchair: tags.wheelchair().map(String::from),
        unisex: tags.unisex().map(String::from),
        disposal: tags.disposal().map(String::from),
        building: tags.building().map(String::from),
        changing_table: tags.changing_table().map(String::from),
        cubicles: tags.cubicles().unwrap_or(1),
        tags: tags.clone(),
    })
}

/// Normalizes a batch of elements, dropping the ones that cannot be shown.
///
/// `report.elements` and the per-kind counters are accumulated; callers
/// that already counted malformed entries keep their count.
pub fn normalize(elements: &[RawElement], report: &mut LoadReport) -> Vec<Toilet> {
    let mut toilets = Vec::with_capacity(elements.len());

    for element in elements {
        report.elements += 1;
        match element.kind {
            ElementKind::Node => report.nodes += 1,
            ElementKind::Way => report.ways += 1,
            ElementKind::Relation => {}
        }

        match normalize_element(element) {
            Ok(toilet) => toilets.push(toilet),
            Err(reason) => {
                log::debug!("Dropping {}-{}: {reason:?}", element.kind, element.id);
                match reason {
                    Skip::Private => report.dropped_private += 1,
                    Skip::NoLocation => report.dropped_no_location += 1,
                    Skip::Unsupported => report.dropped_malformed += 1,
                }
            }
        }
    }

    report.kept += toilets.len();
    toilets
}
