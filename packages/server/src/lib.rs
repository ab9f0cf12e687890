#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the toilet map.
//!
//! Loads the toilet dataset once at startup, builds one clustered layer per
//! filter combination, and answers viewport queries from those layers. The
//! frontend bundle is served from `app/dist`.

mod handlers;
pub mod interactive;

use std::collections::BTreeMap;
use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use toilet_map_cluster::ClusterError;
use toilet_map_dataset::progress::null_progress;
use toilet_map_dataset::{DatasetSource, LoadReport, LoadedDataset};
use toilet_map_toilet_models::ToiletFilters;
use toilet_map_viewer::{ToiletLayer, ViewerConfig};

/// Environment variable holding the map tile access token.
pub const TILE_TOKEN_ENV: &str = "MAPBOX_TOKEN";

/// Startup options, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Viewer config override file.
    pub config: Option<PathBuf>,
    /// Dataset path or URL.
    pub dataset: Option<DatasetSource>,
}

/// Shared application state.
///
/// Built once before the server starts and never mutated afterwards.
pub struct AppState {
    /// Viewer configuration.
    pub config: ViewerConfig,
    /// One layer per filter combination.
    pub layers: BTreeMap<ToiletFilters, ToiletLayer>,
    /// Summary of the dataset load.
    pub report: LoadReport,
    /// Map tile access token.
    pub tile_token: String,
}

impl AppState {
    /// Builds a layer for every filter combination.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidOptions`] if the configured cluster
    /// options are invalid.
    pub fn build(
        config: ViewerConfig,
        dataset: &LoadedDataset,
        tile_token: String,
    ) -> Result<Self, ClusterError> {
        let layers = ToiletFilters::ALL
            .into_iter()
            .map(|filters| {
                ToiletLayer::build(&dataset.toilets, filters, config.cluster)
                    .map(|layer| (filters, layer))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        for (filters, layer) in &layers {
            log::info!("Layer {filters:?}: {} toilets", layer.len());
        }

        Ok(Self {
            config,
            layers,
            report: dataset.report,
            tile_token,
        })
    }

    /// The layer for `filters`.
    #[must_use]
    pub fn layer(&self, filters: ToiletFilters) -> Option<&ToiletLayer> {
        self.layers.get(&filters)
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/config", web::get().to(handlers::config))
            .route("/clusters", web::get().to(handlers::clusters))
            .route(
                "/clusters/{id}/expansion",
                web::get().to(handlers::cluster_expansion),
            )
            .route("/toilets/{key}", web::get().to(handlers::toilet))
            .route("/stats", web::get().to(handlers::stats)),
    );
}

/// Starts the toilet map API server.
///
/// Loads the viewer config and the dataset, builds the layers and starts
/// the Actix-Web HTTP server. A dataset that fails to load leaves the map
/// empty rather than stopping the server. The caller provides the async
/// runtime and the logger.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the config file is unreadable or
/// invalid, the cluster options are invalid, or the HTTP server fails to
/// bind.
#[allow(clippy::future_not_send)]
pub async fn run_server(options: ServerOptions) -> std::io::Result<()> {
    let config = match &options.config {
        Some(path) => ViewerConfig::load(Some(path.as_path())),
        None => ViewerConfig::from_env(),
    }
    .map_err(std::io::Error::other)?;

    let source = DatasetSource::resolve(options.dataset);
    log::info!("Loading toilets from {source}...");
    let dataset = toilet_map_dataset::load_or_empty(&source, &null_progress()).await;

    let tile_token = std::env::var(TILE_TOKEN_ENV).unwrap_or_else(|_| {
        log::warn!("{TILE_TOKEN_ENV} is not set, map tiles will not load");
        String::new()
    });

    let state = web::Data::new(
        AppState::build(config, &dataset, tile_token).map_err(std::io::Error::other)?,
    );

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
