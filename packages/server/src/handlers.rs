//! HTTP handler functions for the toilet map API.

use actix_web::{HttpResponse, web};
use toilet_map_cluster::{BoundingBox, ClusterError};
use toilet_map_server_models::{
    ApiConfig, ApiHealth, ClusterQueryParams, ClustersResponse, ExpansionResponse,
    LayerQueryParams, StatsResponse,
};
use toilet_map_toilet_models::ToiletFilters;
use toilet_map_viewer::marker::render;
use toilet_map_viewer::popup::ToiletPopup;
use toilet_map_viewer::{ToiletLayer, Viewport};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/config`
///
/// Map settings the frontend needs before drawing anything.
pub async fn config(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiConfig::new(&state.config, &state.tile_token))
}

/// `GET /api/clusters`
///
/// Clusters and toilets inside a bounding box at a zoom level.
pub async fn clusters(
    state: web::Data<AppState>,
    params: web::Query<ClusterQueryParams>,
) -> HttpResponse {
    let bbox = match params.bbox.as_deref() {
        None => BoundingBox::WORLD,
        Some(s) => match parse_bbox(s) {
            Some(bbox) => bbox,
            None => return bad_request(&format!("Invalid bbox: {s}")),
        },
    };

    let zoom = params.zoom.unwrap_or(state.config.map.zoom);
    if !zoom.is_finite() {
        return bad_request("Invalid zoom");
    }

    let layer = match layer_for(&state, params.filters()) {
        Ok(layer) => layer,
        Err(response) => return response,
    };

    let result = layer.query(&Viewport::new(bbox, zoom));
    HttpResponse::Ok().json(ClustersResponse {
        markers: render(&result.items, &state.config.markers),
        visible_count: result.visible_count,
        total_count: layer.len(),
    })
}

/// `GET /api/clusters/{id}/expansion`
///
/// Where the map should move when a cluster is clicked.
pub async fn cluster_expansion(
    state: web::Data<AppState>,
    path: web::Path<usize>,
    params: web::Query<LayerQueryParams>,
) -> HttpResponse {
    let cluster_id = path.into_inner();
    let layer = match layer_for(&state, params.filters()) {
        Ok(layer) => layer,
        Err(response) => return response,
    };

    let max_zoom = state.config.map.max_expansion_zoom;
    let target = layer
        .cluster(cluster_id)
        .and_then(|cluster| layer.expansion_target(&cluster, max_zoom));

    match target {
        Ok(target) => HttpResponse::Ok().json(ExpansionResponse::from(target)),
        Err(ClusterError::NotFound(id)) => HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("Cluster {id} not found")
        })),
        Err(e) => {
            log::error!("Failed to expand cluster {cluster_id}: {e}");
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Failed to expand cluster"
            }))
        }
    }
}

/// `GET /api/toilets/{key}`
///
/// Popup content for one toilet, looked up by its `{kind}-{id}` key.
pub async fn toilet(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let key = path.into_inner();
    let layer = match layer_for(&state, ToiletFilters::default()) {
        Ok(layer) => layer,
        Err(response) => return response,
    };

    layer.find(&key).map_or_else(
        || {
            HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Toilet {key} not found")
            }))
        },
        |toilet| HttpResponse::Ok().json(ToiletPopup::from(toilet)),
    )
}

/// `GET /api/stats`
///
/// Dataset counts for the requested filter combination.
pub async fn stats(
    state: web::Data<AppState>,
    params: web::Query<LayerQueryParams>,
) -> HttpResponse {
    match layer_for(&state, params.filters()) {
        Ok(layer) => HttpResponse::Ok().json(StatsResponse {
            total: layer.len(),
            loaded: state.report.kept,
            report: state.report,
        }),
        Err(response) => response,
    }
}

fn layer_for(state: &AppState, filters: ToiletFilters) -> Result<&ToiletLayer, HttpResponse> {
    state.layer(filters).ok_or_else(|| {
        log::error!("No layer built for {filters:?}");
        HttpResponse::InternalServerError().json(serde_json::json!({
            "error": "Layer not available"
        }))
    })
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({ "error": message }))
}

/// Parses a bounding box string `"west,south,east,north"` into a
/// [`BoundingBox`].
fn parse_bbox(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    if parts.len() == 4 && parts.iter().all(|p| p.is_finite()) {
        Some(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, http::StatusCode, test as actix_test};
    use serde_json::{Value, json};
    use toilet_map_dataset::{LoadReport, LoadedDataset};
    use toilet_map_toilet_models::{ElementKind, Tags, Toilet};
    use toilet_map_viewer::ViewerConfig;

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

    fn state() -> web::Data<AppState> {
        let dataset = LoadedDataset {
            toilets: vec![
                toilet(1, 59.9139, 10.7522, "no", "yes"),
                toilet(2, 59.9139, 10.7522, "yes", "no"),
                toilet(3, 60.3913, 5.3221, "no", "no"),
            ],
            report: LoadReport {
                elements: 4,
                nodes: 4,
                kept: 3,
                dropped_private: 1,
                ..LoadReport::default()
            },
        };
        let state = AppState::build(ViewerConfig::default(), &dataset, "pk.test".to_string());
        web::Data::new(state.unwrap())
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let app = actix_test::init_service(
            App::new().app_data(state()).configure(crate::configure),
        )
        .await;
        let req = actix_test::TestRequest::get().uri(uri).to_request();
        let resp = actix_test::call_service(&app, req).await;
        let status = resp.status();
        let body = actix_test::read_body(resp).await;
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    #[test]
    fn parses_bbox() {
        assert_eq!(
            parse_bbox("4.5, 58, 12, 64.25"),
            Some(BoundingBox::new(4.5, 58.0, 12.0, 64.25))
        );
        assert_eq!(parse_bbox("4,58,12"), None);
        assert_eq!(parse_bbox("4,58,x,64"), None);
        assert_eq!(parse_bbox("4,58,NaN,64"), None);
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], json!(true));
    }

    #[actix_web::test]
    async fn clusters_cover_world_by_default() {
        let (status, body) = get("/api/clusters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["visibleCount"], json!(3));
        assert_eq!(body["totalCount"], json!(3));
    }

    #[actix_web::test]
    async fn clusters_respect_filters_and_bbox() {
        let (_, body) = get("/api/clusters?bbox=10,59,11,60&zoom=17&wheelchairOnly=true").await;
        assert_eq!(body["visibleCount"], json!(1));
        assert_eq!(body["totalCount"], json!(1));
        assert_eq!(body["markers"][0]["type"], json!("toilet"));
        assert_eq!(body["markers"][0]["icon"]["kind"], json!("accessible"));
    }

    #[actix_web::test]
    async fn bare_flag_turns_filter_on() {
        let (status, body) = get("/api/clusters?freeOnly").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalCount"], json!(2));

        let (_, body) = get("/api/clusters?freeOnly=1&wheelchairOnly=yes").await;
        assert_eq!(body["totalCount"], json!(1));

        let (_, body) = get("/api/clusters?freeOnly=0").await;
        assert_eq!(body["totalCount"], json!(3));
    }

    #[actix_web::test]
    async fn numeric_flag_filters_stats() {
        let (status, body) = get("/api/stats?wheelchairOnly=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], json!(1));
    }

    #[actix_web::test]
    async fn unknown_flag_value_is_rejected() {
        let (status, _) = get("/api/stats?freeOnly=maybe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_bbox_is_rejected() {
        let (status, body) = get("/api/clusters?bbox=1,2,3").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("bbox"));
    }

    #[actix_web::test]
    async fn expansion_is_capped() {
        let (_, body) = get("/api/clusters?zoom=12").await;
        let cluster = body["markers"]
            .as_array()
            .unwrap()
            .iter()
            .find(|m| m["type"] == json!("cluster"))
            .unwrap();
        let id = cluster["clusterId"].as_u64().unwrap();

        let (status, body) = get(&format!("/api/clusters/{id}/expansion")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["zoom"], json!(16));
    }

    #[actix_web::test]
    async fn unknown_cluster_is_not_found() {
        let (status, _) = get("/api/clusters/999999/expansion").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn toilet_popup_by_key() {
        let (status, body) = get("/api/toilets/node-1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], json!("node-1"));
        assert_eq!(body["location"], json!("59.9139, 10.7522"));

        let (status, _) = get("/api/toilets/way-1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn stats_follow_filters() {
        let (_, body) = get("/api/stats?freeOnly=true").await;
        assert_eq!(body["total"], json!(2));
        assert_eq!(body["loaded"], json!(3));
        assert_eq!(body["report"]["droppedPrivate"], json!(1));
    }

    #[actix_web::test]
    async fn config_contains_tile_url() {
        let (_, body) = get("/api/config").await;
        assert!(body["tileUrl"].as_str().unwrap().ends_with("access_token=pk.test"));
        assert_eq!(body["zoom"], json!(6.0));
    }
}
