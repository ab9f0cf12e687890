#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset loader for the toilet map.
//!
//! Reads the pre-fetched Overpass dump (`{ "elements": [...] }`) from a
//! local path or an `http(s)` URL, parses each element individually and
//! normalizes it into a [`Toilet`]. A broken element is dropped on its own;
//! a broken document fails [`load`], and [`load_or_empty`] turns that
//! failure into an empty dataset so the map still comes up.

pub mod analysis;
pub mod normalize;
pub mod progress;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use toilet_map_toilet_models::{RawElement, Toilet};

pub use normalize::LoadReport;
use progress::ProgressCallback;

/// Default dataset location, relative to the working directory.
pub const DEFAULT_DATASET_PATH: &str = "data/toilets.json";

/// Environment variable naming the dataset path or URL.
pub const DATASET_ENV: &str = "TOILET_MAP_DATASET";

/// Where the dataset document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    /// A file on the local filesystem.
    Path(PathBuf),
    /// An `http://` or `https://` URL.
    Url(String),
}

impl DatasetSource {
    /// Picks `explicit` if given, then [`DATASET_ENV`], then
    /// [`DEFAULT_DATASET_PATH`].
    #[must_use]
    pub fn resolve(explicit: Option<Self>) -> Self {
        explicit
            .or_else(|| {
                std::env::var(DATASET_ENV)
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_default()
    }
}

impl FromStr for DatasetSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::Path(PathBuf::from(s)))
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self::Path(PathBuf::from(DEFAULT_DATASET_PATH))
    }
}

/// Errors from dataset loading.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Unexpected HTTP status {status} from {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// Reading the local file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is valid JSON but not an element dump.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// The normalized dataset together with its load summary.
#[derive(Debug, Clone, Default)]
pub struct LoadedDataset {
    /// Toilets in document order.
    pub toilets: Vec<Toilet>,
    /// What happened to every element of the document.
    pub report: LoadReport,
}

/// Elements of a dump document that deserialized, with a count of the ones
/// that did not.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    /// Well-formed elements in document order.
    pub elements: Vec<RawElement>,
    /// Entries that did not match the element shape.
    pub malformed: usize,
}

impl ParsedDocument {
    /// Normalizes the elements into toilets and a load report.
    #[must_use]
    pub fn normalize(&self) -> LoadedDataset {
        let mut report = LoadReport {
            elements: self.malformed,
            dropped_malformed: self.malformed,
            ..LoadReport::default()
        };
        let toilets = normalize::normalize(&self.elements, &mut report);
        LoadedDataset { toilets, report }
    }
}

/// Fetches the dataset and parses its elements without normalizing them.
///
/// # Errors
///
/// Returns [`DatasetError`] if the document cannot be read, is not JSON,
/// or has no `elements` array.
pub async fn load_elements(
    source: &DatasetSource,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ParsedDocument, DatasetError> {
    progress.set_message(format!("Reading elements from {source}..."));
    let bytes = fetch(source).await?;
    log::debug!("Read {} bytes from {source}", bytes.len());

    let document = parse_elements(&bytes, progress)?;
    progress.finish(format!(
        "Read {} elements ({} malformed)",
        document.elements.len() + document.malformed,
        document.malformed
    ));

    Ok(document)
}

/// Fetches and normalizes the dataset.
///
/// # Errors
///
/// Returns [`DatasetError`] if the document cannot be read, is not JSON,
/// or has no `elements` array.
pub async fn load(
    source: &DatasetSource,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadedDataset, DatasetError> {
    progress.set_message(format!("Loading toilets from {source}..."));
    let bytes = fetch(source).await?;
    log::debug!("Read {} bytes from {source}", bytes.len());

    let dataset = parse_document(&bytes, progress)?;
    progress.finish(format!(
        "Loaded {} toilets ({} dropped)",
        dataset.report.kept,
        dataset.report.dropped()
    ));

    Ok(dataset)
}

/// Like [`load`], but logs any failure and returns an empty dataset.
pub async fn load_or_empty(
    source: &DatasetSource,
    progress: &Arc<dyn ProgressCallback>,
) -> LoadedDataset {
    match load(source, progress).await {
        Ok(dataset) => {
            log::info!(
                "Loaded {} toilets from {source} ({} nodes, {} ways, {} dropped)",
                dataset.report.kept,
                dataset.report.nodes,
                dataset.report.ways,
                dataset.report.dropped()
            );
            dataset
        }
        Err(e) => {
            log::error!("Error loading toilet data from {source}: {e}");
            progress.finish("No toilet data loaded".to_string());
            LoadedDataset::default()
        }
    }
}

async fn fetch(source: &DatasetSource) -> Result<Vec<u8>, DatasetError> {
    match source {
        DatasetSource::Path(path) => Ok(tokio::fs::read(path).await?),
        DatasetSource::Url(url) => {
            let resp = reqwest::get(url).await?;
            if !resp.status().is_success() {
                return Err(DatasetError::Status {
                    url: url.clone(),
                    status: resp.status().as_u16(),
                });
            }
            Ok(resp.bytes().await?.to_vec())
        }
    }
}

/// Parses a dump document and normalizes its elements.
///
/// # Errors
///
/// Returns [`DatasetError`] if `bytes` is not JSON or lacks an `elements`
/// array.
pub fn parse_document(
    bytes: &[u8],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<LoadedDataset, DatasetError> {
    Ok(parse_elements(bytes, progress)?.normalize())
}

/// Parses the `elements` array of a dump document.
///
/// Elements that do not deserialize as [`RawElement`] are counted as
/// malformed and skipped.
///
/// # Errors
///
/// Returns [`DatasetError`] if `bytes` is not JSON or lacks an `elements`
/// array.
pub fn parse_elements(
    bytes: &[u8],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<ParsedDocument, DatasetError> {
    let body: serde_json::Value = serde_json::from_slice(bytes)?;
    let values = body["elements"]
        .as_array()
        .ok_or_else(|| DatasetError::Parse {
            message: "Document has no \"elements\" array".to_string(),
        })?;

    progress.set_total(values.len() as u64);

    let mut document = ParsedDocument {
        elements: Vec::with_capacity(values.len()),
        malformed: 0,
    };
    for value in values {
        match RawElement::deserialize(value) {
            Ok(element) => document.elements.push(element),
            Err(e) => {
                log::debug!("Skipping malformed element: {e}");
                document.malformed += 1;
            }
        }
        progress.inc(1);
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;

    #[test]
    fn parses_source_kinds() {
        assert_eq!(
            "https://example.org/toilets.json".parse::<DatasetSource>(),
            Ok(DatasetSource::Url("https://example.org/toilets.json".to_string()))
        );
        assert_eq!(
            "public/toilets.json".parse::<DatasetSource>(),
            Ok(DatasetSource::Path(PathBuf::from("public/toilets.json")))
        );
    }

    #[test]
    fn explicit_source_wins() {
        let source = DatasetSource::Path(PathBuf::from("fixtures/toilets.json"));
        assert_eq!(DatasetSource::resolve(Some(source.clone())), source);
    }

    #[test]
    fn parses_single_node_document() {
        let doc = serde_json::json!({
            "elements": [{
                "type": "node", "id": 1, "lat": 59.9, "lon": 10.7,
                "tags": { "access": "yes", "wheelchair": "yes", "fee": "no" }
            }]
        });

        let dataset = parse_document(doc.to_string().as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.toilets.len(), 1);
        assert_eq!(dataset.toilets[0].key(), "node-1");
        assert_eq!(dataset.report.kept, 1);
    }

    #[test]
    fn empty_elements_is_empty_dataset() {
        let dataset = parse_document(br#"{"elements": []}"#, &null_progress()).unwrap();
        assert!(dataset.toilets.is_empty());
        assert_eq!(dataset.report, LoadReport::default());
    }

    #[test]
    fn malformed_element_does_not_fail_batch() {
        let doc = serde_json::json!({
            "elements": [
                { "type": "node", "lat": 59.9, "lon": 10.7 },
                { "type": "node", "id": 2, "lat": 59.9, "lon": 10.7 }
            ]
        });

        let dataset = parse_document(doc.to_string().as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.toilets.len(), 1);
        assert_eq!(dataset.report.elements, 2);
        assert_eq!(dataset.report.dropped_malformed, 1);
    }

    #[test]
    fn null_tags_do_not_make_an_element_malformed() {
        let doc = serde_json::json!({
            "elements": [{ "type": "node", "id": 4, "lat": 59.9, "lon": 10.7, "tags": null }]
        });

        let dataset = parse_document(doc.to_string().as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.report.kept, 1);
        assert_eq!(dataset.report.dropped_malformed, 0);
    }

    #[test]
    fn parsed_elements_keep_raw_shape() {
        let doc = serde_json::json!({
            "elements": [
                { "type": "way", "id": 1, "tags": { "access": "private" } },
                { "type": "node" }
            ]
        });

        let document = parse_elements(doc.to_string().as_bytes(), &null_progress()).unwrap();
        assert_eq!(document.elements.len(), 1);
        assert_eq!(document.elements[0].tags.access(), Some("private"));
        assert_eq!(document.malformed, 1);

        let report = document.normalize().report;
        assert_eq!(report.elements, 2);
        assert_eq!(report.dropped_private, 1);
        assert_eq!(report.dropped_malformed, 1);
    }

    #[test]
    fn rejects_document_without_elements() {
        let err = parse_document(br#"{"version": 0.6}"#, &null_progress()).unwrap_err();
        assert!(matches!(err, DatasetError::Parse { .. }));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = parse_document(b"<html>", &null_progress()).unwrap_err();
        assert!(matches!(err, DatasetError::Json(_)));
    }

    #[tokio::test]
    async fn missing_file_degrades_to_empty() {
        let source = DatasetSource::Path(PathBuf::from("does/not/exist/toilets.json"));
        let dataset = load_or_empty(&source, &null_progress()).await;
        assert!(dataset.toilets.is_empty());
        assert_eq!(dataset.report.elements, 0);
    }

    #[tokio::test]
    async fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "toilet_map_dataset_{}.json",
            std::process::id()
        ));
        let doc = serde_json::json!({
            "elements": [{
                "type": "way", "id": 9,
                "geometry": [{ "lat": 60.0, "lon": 10.0 }, { "lat": 60.2, "lon": 10.2 }]
            }]
        });
        tokio::fs::write(&path, doc.to_string()).await.unwrap();

        let dataset = load(&DatasetSource::Path(path.clone()), &null_progress())
            .await
            .unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(dataset.toilets.len(), 1);
        assert!((dataset.toilets[0].latitude - 60.1).abs() < 1e-9);
        assert!((dataset.toilets[0].longitude - 10.1).abs() < 1e-9);
    }
}
