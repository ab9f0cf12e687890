//! Terminal map explorer.
//!
//! Drives a [`MapSession`] from menu choices instead of pointer events, and
//! prints what the map would draw after every change.

use dialoguer::{Input, Select};
use toilet_map_cli_utils::MultiProgress;
use toilet_map_cluster::BoundingBox;
use toilet_map_cluster::projection::{lat_y, lng_x, x_lng, y_lat};
use toilet_map_viewer::geolocation::{DevicePosition, GeolocationError, UserLocation};
use toilet_map_viewer::{LatLon, MapSession, Marker, ViewerConfig, Viewport};

/// Rendered map size in screen pixels.
const SCREEN_WIDTH: f64 = 1024.0;
const SCREEN_HEIGHT: f64 = 768.0;

/// Pixel size of the world at zoom 0.
const WORLD_PX: f64 = 256.0;

/// Markers printed per refresh.
const MARKER_PREVIEW: usize = 10;

enum Action {
    ZoomIn,
    ZoomOut,
    ToggleFree,
    ToggleWheelchair,
    ExpandCluster,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::ZoomIn,
        Self::ZoomOut,
        Self::ToggleFree,
        Self::ToggleWheelchair,
        Self::ExpandCluster,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::ZoomIn => "Zoom in",
            Self::ZoomOut => "Zoom out",
            Self::ToggleFree => "Toggle free only",
            Self::ToggleWheelchair => "Toggle wheelchair only",
            Self::ExpandCluster => "Open the largest cluster",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the explorer until the user quits.
///
/// # Errors
///
/// Returns an error if a prompt fails or the configured cluster options
/// are invalid.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let config = ViewerConfig::from_env()?;
    let dataset = crate::prompt_and_load(multi).await?;

    let location = UserLocation::resolve(prompt_position()?, config.location.default);
    if location.is_fallback() {
        println!("Starting at the default location.");
    }

    let max_zoom = f64::from(config.cluster.max_zoom) + 1.0;
    let mut center = location.position;
    let mut zoom = config.map.zoom;
    let mut session = MapSession::new(dataset.toilets, config)?;
    session.move_end(viewport_around(center, zoom));
    print_session(&session, center, zoom);

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("Map action")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::ZoomIn => {
                zoom = (zoom + 1.0).min(max_zoom);
                session.zoom_end(viewport_around(center, zoom));
            }
            Action::ZoomOut => {
                zoom = (zoom - 1.0).max(0.0);
                session.zoom_end(viewport_around(center, zoom));
            }
            Action::ToggleFree => {
                let mut filters = session.filters();
                filters.free_only = !filters.free_only;
                session.set_filters(filters)?;
            }
            Action::ToggleWheelchair => {
                let mut filters = session.filters();
                filters.wheelchair_only = !filters.wheelchair_only;
                session.set_filters(filters)?;
            }
            Action::ExpandCluster => {
                let largest = session
                    .markers()
                    .iter()
                    .filter_map(|m| match m {
                        Marker::Cluster(c) => Some(c),
                        Marker::Toilet(_) => None,
                    })
                    .max_by_key(|c| c.count);

                let Some(cluster) = largest else {
                    println!("No clusters in view.");
                    continue;
                };

                let target = session.click_cluster(cluster.cluster_id)?;
                center = target.center;
                zoom = f64::from(target.zoom);
                session.move_end(viewport_around(center, zoom));
            }
            Action::Quit => break,
        }

        print_session(&session, center, zoom);
    }

    Ok(())
}

/// Asks for a position in place of a device fix. A blank answer means no
/// fix is available.
fn prompt_position() -> Result<Result<DevicePosition, GeolocationError>, Box<dyn std::error::Error>>
{
    let input: String = Input::new()
        .with_prompt("Your position as lat,lon (blank to skip)")
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        return Ok(Err(GeolocationError::Unavailable));
    }

    let parts: Vec<f64> = input
        .split(',')
        .filter_map(|p| p.trim().parse().ok())
        .collect();

    Ok(match parts.as_slice() {
        [lat, lon] if (-90.0..=90.0).contains(lat) && (-180.0..=180.0).contains(lon) => {
            Ok(DevicePosition {
                position: LatLon::new(*lat, *lon),
                accuracy: 0.0,
            })
        }
        _ => {
            log::warn!("Could not read position {input:?}");
            Err(GeolocationError::Unavailable)
        }
    })
}

/// The viewport of a fixed-size screen centred on `center`.
fn viewport_around(center: LatLon, zoom: f64) -> Viewport {
    let scale = WORLD_PX * 2f64.powf(zoom);
    let x = lng_x(center.longitude);
    let y = lat_y(center.latitude);
    let half_w = SCREEN_WIDTH / 2.0 / scale;
    let half_h = SCREEN_HEIGHT / 2.0 / scale;

    let bbox = if half_w >= 0.5 {
        BoundingBox::new(
            -180.0,
            y_lat((y + half_h).min(1.0)),
            180.0,
            y_lat((y - half_h).max(0.0)),
        )
    } else {
        BoundingBox::new(
            x_lng(x - half_w),
            y_lat((y + half_h).min(1.0)),
            x_lng(x + half_w),
            y_lat((y - half_h).max(0.0)),
        )
    };

    Viewport::new(bbox, zoom)
}

fn print_session(session: &MapSession, center: LatLon, zoom: f64) {
    let stats = session.stats();
    let filters = session.filters();

    println!();
    println!(
        "Centre {:.4}, {:.4} at zoom {zoom:.0} (free only: {}, wheelchair only: {})",
        center.latitude, center.longitude, filters.free_only, filters.wheelchair_only
    );
    println!("{} of {} toilets visible", stats.visible, stats.total);

    for marker in session.markers().iter().take(MARKER_PREVIEW) {
        match marker {
            Marker::Cluster(c) => println!(
                "  [{}] cluster of {} at {:.4}, {:.4}",
                c.icon.tier, c.label, c.latitude, c.longitude
            ),
            Marker::Toilet(t) => println!(
                "  {} {} at {}",
                t.icon.glyph, t.key, t.popup.location
            ),
        }
    }

    let hidden = session.markers().len().saturating_sub(MARKER_PREVIEW);
    if hidden > 0 {
        println!("  ... and {hidden} more markers");
    }
    println!();
}
