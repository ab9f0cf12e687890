//! Prints what the loader made of a dataset.

use toilet_map_cli_utils::{IndicatifProgress, MultiProgress};
use toilet_map_dataset::ParsedDocument;
use toilet_map_dataset::analysis::{TagValues, WayAreaReport, tag_values, way_areas};
use toilet_map_toilet_models::{ToiletFilters, filter_toilets};

/// Tags with at most this many values are listed in full.
const FULL_VALUE_LIST: usize = 10;

/// Values shown for tags with more than [`FULL_VALUE_LIST`] values.
const VALUE_PREVIEW: usize = 8;

/// Loads a dataset and prints its load report, per-filter counts, tag
/// values and way bounds.
///
/// # Errors
///
/// Returns an error if a prompt fails.
pub async fn run(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let source = crate::prompt_source()?;
    let progress = IndicatifProgress::elements_bar(multi, "Reading dataset...");

    let document = match toilet_map_dataset::load_elements(&source, &progress).await {
        Ok(document) => document,
        Err(e) => {
            log::error!("Error loading toilet data from {source}: {e}");
            progress.finish("No toilet data loaded".to_string());
            ParsedDocument::default()
        }
    };

    let dataset = document.normalize();
    let report = dataset.report;

    println!();
    println!("Elements:            {}", report.elements);
    println!("  nodes:             {}", report.nodes);
    println!("  ways:              {}", report.ways);
    println!("Toilets kept:        {}", report.kept);
    println!("Dropped (private):   {}", report.dropped_private);
    println!("Dropped (no coords): {}", report.dropped_no_location);
    println!("Dropped (malformed): {}", report.dropped_malformed);
    println!();

    for filters in ToiletFilters::ALL {
        let count = filter_toilets(&dataset.toilets, filters).len();
        println!(
            "free only: {:<5}  wheelchair only: {:<5}  -> {count}",
            filters.free_only, filters.wheelchair_only
        );
    }

    print_tags(&tag_values(&document.elements));
    print_way_areas(&way_areas(&document.elements));

    Ok(())
}

fn print_tags(tags: &[TagValues]) {
    println!();
    println!("Distinct tag keys: {}", tags.len());

    for tag in tags {
        println!();
        println!("{}: ({} distinct values)", tag.key, tag.values.len());

        let shown = if tag.values.len() <= FULL_VALUE_LIST {
            tag.values.len()
        } else {
            VALUE_PREVIEW
        };
        for value in &tag.values[..shown] {
            println!("  - {value}");
        }
        if shown < tag.values.len() {
            println!("  ... and {} more values", tag.values.len() - shown);
        }
    }
}

fn print_way_areas(report: &WayAreaReport) {
    println!();
    println!("Ways:                {}", report.ways);
    println!("Ways without bounds: {}", report.without_bounds.len());

    match &report.largest {
        Some(largest) => {
            let b = largest.bounds;
            println!(
                "Largest way:         way-{} ({:.10} square degrees)",
                largest.id, largest.area
            );
            println!("  lat {} to {}", b.minlat, b.maxlat);
            println!("  lon {} to {}", b.minlon, b.maxlon);
            for (key, value) in largest.tags.iter() {
                println!("  {key}={value}");
            }
        }
        None => println!("No ways with bounds."),
    }

    for id in &report.without_bounds {
        println!("  way-{id} has no bounds");
    }
}
