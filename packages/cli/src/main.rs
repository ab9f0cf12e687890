#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Interactive CLI for the toilet map tools.
//!
//! Lets users pick a tool (server, dataset summary, terminal map explorer)
//! and guides them through its configuration.
//!
//! Uses `indicatif-log-bridge` (via [`toilet_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod explore;
mod summary;

use dialoguer::{Input, Select};
use toilet_map_cli_utils::{IndicatifProgress, MultiProgress};
use toilet_map_dataset::{DatasetSource, LoadedDataset};

/// Top-level tool selection.
enum Tool {
    Server,
    Summary,
    Explore,
}

impl Tool {
    const ALL: &[Self] = &[Self::Server, Self::Summary, Self::Explore];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Server => "Start server",
            Self::Summary => "Dataset summary",
            Self::Explore => "Explore the map",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = toilet_map_cli_utils::init_logger();

    println!("Toilet Map Tools");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Server => {
            // The server uses actix-web's runtime, so we need to run it
            // in a blocking task to avoid nesting tokio runtimes.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(toilet_map_server::interactive::run())
            })
            .await??;
        }
        Tool::Summary => summary::run(&multi).await?,
        Tool::Explore => explore::run(&multi).await?,
    }

    Ok(())
}

/// Asks for a dataset location.
fn prompt_source() -> Result<DatasetSource, Box<dyn std::error::Error>> {
    let default = DatasetSource::resolve(None).to_string();
    let input: String = Input::new()
        .with_prompt("Dataset path or URL")
        .default(default)
        .interact_text()?;

    Ok(input.parse::<DatasetSource>().unwrap_or_default())
}

/// Asks for a dataset location and loads it behind a progress bar.
///
/// A dataset that fails to load is reported and treated as empty.
async fn prompt_and_load(
    multi: &MultiProgress,
) -> Result<LoadedDataset, Box<dyn std::error::Error>> {
    let source = prompt_source()?;
    let progress = IndicatifProgress::elements_bar(multi, "Reading dataset...");

    Ok(toilet_map_dataset::load_or_empty(&source, &progress).await)
}
