//! Detail popup content for a single toilet.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use toilet_map_toilet_models::Toilet;

static NOK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)nok").unwrap_or_else(|_| unreachable!()));

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// Builds a walking-directions link to the given destination.
#[must_use]
pub fn walking_directions_url(latitude: f64, longitude: f64) -> String {
    format!("{DIRECTIONS_URL}&destination={latitude},{longitude}&travelmode=walking")
}

/// One labelled line of the popup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupRow {
    /// Field label.
    pub label: &'static str,
    /// Display value.
    pub value: String,
}

/// Everything the popup for one toilet shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToiletPopup {
    /// Toilet key (`node-123`).
    pub key: String,
    /// Heading.
    pub title: &'static str,
    /// Known attributes, in display order. Unknown values are left out.
    pub rows: Vec<PopupRow>,
    /// Photo link, if tagged.
    pub image_url: Option<String>,
    /// Coordinates rounded to four decimals.
    pub location: String,
    /// Walking directions to the toilet.
    pub directions_url: String,
}

impl From<&Toilet> for ToiletPopup {
    fn from(toilet: &Toilet) -> Self {
        let tags = &toilet.tags;
        let mut rows = Vec::new();
        let mut push = |label: &'static str, value: Option<String>| {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                rows.push(PopupRow { label, value });
            }
        };

        push("Access", toilet.access.as_deref().map(capitalize));
        push("Fee", toilet.fee.as_deref().map(format_currency));
        push("Wheelchair", toilet.wheelchair.as_deref().map(capitalize));
        push(
            "Changing Table",
            toilet.changing_table.as_deref().map(capitalize),
        );
        push(
            "Cubicles",
            (toilet.cubicles > 1).then(|| toilet.cubicles.to_string()),
        );
        push("Unisex", toilet.unisex.as_deref().map(capitalize));
        push("Disposal", toilet.disposal.as_deref().map(capitalize));
        push("Opening Hours", tags.opening_hours().map(String::from));
        push("Operator", tags.operator().map(capitalize));
        push("Charge", tags.charge().map(format_currency));
        push("Description", tags.description().map(String::from));
        push("Note", tags.note().map(capitalize));

        Self {
            key: toilet.key(),
            title: "Public Toilet",
            rows,
            image_url: tags.image().map(String::from),
            location: format!("{:.4}, {:.4}", toilet.latitude, toilet.longitude),
            directions_url: walking_directions_url(toilet.latitude, toilet.longitude),
        }
    }
}

/// Upper-cases the first character.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Normalizes any spelling of `nok` to `NOK`; other values are capitalized.
fn format_currency(s: &str) -> String {
    if NOK_RE.is_match(s) {
        NOK_RE.replace_all(s, "NOK").into_owned()
    } else {
        capitalize(s)
    }
}
