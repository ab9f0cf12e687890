//! Spherical Mercator projection onto the unit square.
//!
//! `x` grows eastwards from 0 at -180° to 1 at 180°; `y` grows southwards
//! from 0 near the north pole to 1 near the south pole.

use std::f64::consts::PI;

/// Projects a longitude to `x` in `[0, 1]`.
#[must_use]
pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Projects a latitude to `y` in `[0, 1]`, clamping near the poles.
#[must_use]
pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Inverse of [`lng_x`].
#[must_use]
pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Inverse of [`lat_y`].
#[must_use]
pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_centre() {
        assert!((lng_x(0.0) - 0.5).abs() < f64::EPSILON);
        assert!((lat_y(0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn inverse_recovers_coordinates() {
        for (lng, lat) in [(10.75, 59.91), (-73.98, 40.75), (179.0, -45.0)] {
            assert!((x_lng(lng_x(lng)) - lng).abs() < 1e-9);
            assert!((y_lat(lat_y(lat)) - lat).abs() < 1e-9);
        }
    }

    #[test]
    fn poles_are_clamped() {
        assert!(lat_y(90.0).abs() < f64::EPSILON);
        assert!((lat_y(-90.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn north_is_up() {
        assert!(lat_y(70.0) < lat_y(58.0));
    }
}
