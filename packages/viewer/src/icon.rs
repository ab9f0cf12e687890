//! Marker icon descriptors.
//!
//! Both functions are pure: the same attributes always give the same
//! descriptor, and nothing is cached between calls.

use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::config::MarkerSettings;

/// Cluster bubble edge length in pixels.
pub const CLUSTER_ICON_SIZE: u32 = 40;

/// Toilet marker edge length in pixels.
pub const TOILET_ICON_SIZE: u32 = 24;

/// Size tier of a cluster bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClusterTier {
    /// Below the medium threshold.
    Small,
    /// From the medium threshold up to the large threshold.
    Medium,
    /// At or above the large threshold.
    Large,
}

/// How a cluster bubble is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIcon {
    /// Size tier.
    pub tier: ClusterTier,
    /// CSS class for the tier (`cluster-small`, ...).
    pub class_name: String,
    /// Fill colour.
    pub color: String,
    /// Edge length in pixels.
    pub size: u32,
    /// Anchor offset in pixels from the top-left corner.
    pub anchor: u32,
}

/// Picks the tier for a cluster of `count` points.
#[must_use]
pub const fn cluster_tier(count: usize, settings: &MarkerSettings) -> ClusterTier {
    if count >= settings.large_threshold {
        ClusterTier::Large
    } else if count >= settings.medium_threshold {
        ClusterTier::Medium
    } else {
        ClusterTier::Small
    }
}

/// Describes the bubble for a cluster of `count` points.
#[must_use]
pub fn cluster_icon(count: usize, settings: &MarkerSettings) -> ClusterIcon {
    let tier = cluster_tier(count, settings);
    let color = match tier {
        ClusterTier::Small => &settings.small_color,
        ClusterTier::Medium => &settings.medium_color,
        ClusterTier::Large => &settings.large_color,
    };

    ClusterIcon {
        tier,
        class_name: format!("cluster-{tier}"),
        color: color.clone(),
        size: CLUSTER_ICON_SIZE,
        anchor: CLUSTER_ICON_SIZE / 2,
    }
}

/// Which toilet icon to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ToiletIconKind {
    /// `wheelchair=yes`.
    Accessible,
    /// `fee=yes` and not wheelchair accessible.
    Paid,
    /// Everything else.
    Standard,
}

/// How a single toilet marker is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToiletIcon {
    /// Icon variant.
    pub kind: ToiletIconKind,
    /// Glyph shown inside the marker.
    pub glyph: &'static str,
    /// Background colour.
    pub background: &'static str,
    /// Edge length in pixels.
    pub size: u32,
    /// Anchor offset in pixels from the top-left corner.
    pub anchor: u32,
}

/// Picks the toilet icon. Wheelchair access outranks a fee, which outranks
/// the default.
#[must_use]
pub fn toilet_icon(wheelchair: Option<&str>, fee: Option<&str>) -> ToiletIcon {
    let (kind, glyph, background) = if wheelchair == Some("yes") {
        (ToiletIconKind::Accessible, "♿", "#bfdbfe")
    } else if fee == Some("yes") {
        (ToiletIconKind::Paid, "💰", "#fde68a")
    } else {
        (ToiletIconKind::Standard, "🚽", "#3b82f6")
    };

    ToiletIcon {
        kind,
        glyph,
        background,
        size: TOILET_ICON_SIZE,
        anchor: TOILET_ICON_SIZE / 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_thresholds() {
        let settings = MarkerSettings::default();
        assert_eq!(cluster_tier(2, &settings), ClusterTier::Small);
        assert_eq!(cluster_tier(9, &settings), ClusterTier::Small);
        assert_eq!(cluster_tier(10, &settings), ClusterTier::Medium);
        assert_eq!(cluster_tier(99, &settings), ClusterTier::Medium);
        assert_eq!(cluster_tier(100, &settings), ClusterTier::Large);
        assert_eq!(cluster_tier(3400, &settings), ClusterTier::Large);
    }

    #[test]
    fn tiers_use_configured_thresholds() {
        let settings = MarkerSettings {
            medium_threshold: 5,
            large_threshold: 50,
            ..MarkerSettings::default()
        };
        assert_eq!(cluster_tier(5, &settings), ClusterTier::Medium);
        assert_eq!(cluster_tier(50, &settings), ClusterTier::Large);
    }

    #[test]
    fn cluster_icon_carries_colour_and_class() {
        let icon = cluster_icon(150, &MarkerSettings::default());
        assert_eq!(icon.class_name, "cluster-large");
        assert_eq!(icon.color, "#1d4ed8");
        assert_eq!(icon.size, 40);
        assert_eq!(icon.anchor, 20);
    }

    #[test]
    fn wheelchair_outranks_fee() {
        let icon = toilet_icon(Some("yes"), Some("yes"));
        assert_eq!(icon.kind, ToiletIconKind::Accessible);
        assert_eq!(icon.glyph, "♿");
    }

    #[test]
    fn fee_outranks_default() {
        assert_eq!(toilet_icon(Some("no"), Some("yes")).kind, ToiletIconKind::Paid);
        assert_eq!(toilet_icon(None, Some("yes")).kind, ToiletIconKind::Paid);
    }

    #[test]
    fn unknown_attributes_get_default_icon() {
        let icon = toilet_icon(None, None);
        assert_eq!(icon.kind, ToiletIconKind::Standard);
        assert_eq!(icon.background, "#3b82f6");
        assert_eq!(toilet_icon(Some("limited"), Some("no")).kind, ToiletIconKind::Standard);
    }
}
