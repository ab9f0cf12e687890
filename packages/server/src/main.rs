#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Toilet map API server binary.

use std::path::PathBuf;

use clap::Parser;
use toilet_map_dataset::DatasetSource;
use toilet_map_server::ServerOptions;

/// Serves the Norway toilet map.
#[derive(Parser, Debug)]
#[command(name = "toilet_map_server")]
struct Args {
    /// Viewer config file overriding the built-in defaults. Falls back to
    /// `TOILET_MAP_CONFIG`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dataset path or http(s) URL. Falls back to `TOILET_MAP_DATASET`.
    #[arg(long)]
    dataset: Option<DatasetSource>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let args = Args::parse();

    toilet_map_server::run_server(ServerOptions {
        config: args.config,
        dataset: args.dataset,
    })
    .await
}
