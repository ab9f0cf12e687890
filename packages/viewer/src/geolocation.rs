//! Resolving the user's position, falling back to a configured default.

use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;
use thiserror::Error;

use crate::LatLon;

/// A position fix reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePosition {
    /// Reported position.
    pub position: LatLon,
    /// Accuracy radius in metres.
    pub accuracy: f64,
}

/// Why no device position is available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum GeolocationError {
    /// The user refused the permission prompt.
    #[error("location permission denied")]
    PermissionDenied,
    /// No position source exists.
    #[error("location unavailable")]
    Unavailable,
    /// The device did not answer in time.
    #[error("location request timed out")]
    Timeout,
}

/// The position the map centres on and marks as "you are here".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    /// Where to put the marker.
    pub position: LatLon,
    /// Accuracy circle radius in metres. `None` for the fallback position.
    pub accuracy: Option<f64>,
}

impl UserLocation {
    /// Uses the device fix when there is one, otherwise `default` without an
    /// accuracy circle.
    #[must_use]
    pub fn resolve(result: Result<DevicePosition, GeolocationError>, default: LatLon) -> Self {
        match result {
            Ok(fix) => Self {
                position: fix.position,
                accuracy: Some(fix.accuracy),
            },
            Err(e) => {
                log::warn!("Geolocation failed: {e}; using default location");
                Self {
                    position: default,
                    accuracy: None,
                }
            }
        }
    }

    /// Whether this is the configured fallback rather than a device fix.
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        self.accuracy.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OSLO: LatLon = LatLon::new(59.9139, 10.7522);

    #[test]
    fn device_fix_wins() {
        let fix = DevicePosition {
            position: LatLon::new(63.43, 10.39),
            accuracy: 25.0,
        };
        let location = UserLocation::resolve(Ok(fix), OSLO);

        assert_eq!(location.position, fix.position);
        assert_eq!(location.accuracy, Some(25.0));
        assert!(!location.is_fallback());
    }

    #[test]
    fn every_failure_falls_back_to_default() {
        for error in [
            GeolocationError::PermissionDenied,
            GeolocationError::Unavailable,
            GeolocationError::Timeout,
        ] {
            let location = UserLocation::resolve(Err(error), OSLO);
            assert_eq!(location.position, OSLO);
            assert!(location.is_fallback());
        }
    }

    #[test]
    fn error_names() {
        assert_eq!(
            GeolocationError::PermissionDenied.to_string(),
            "location permission denied"
        );
        assert_eq!(GeolocationError::Timeout.as_ref(), "timeout");
    }
}
