use tracing::info;

use crate::catalog::Catalog;
use crate::config::DownloadPlan;
use crate::sequence::{generate, SequenceItem};

/// Prints the tiles a download would fetch without touching the network or disk.
pub fn list_tiles(catalog: &Catalog, plan: &DownloadPlan, frame_naming: bool) -> Vec<SequenceItem> {
    let items = generate(plan.start, plan.end, plan.region, plan.resolution);
    for item in &items {
        println!(
            "{}\t{}\t{}\t{}",
            item.index,
            item.timestamp.format("%Y-%m-%d %H:%M"),
            catalog.tile_url(&item.remote_filename),
            item.local_filename(frame_naming)
        );
    }
    info!("would download {} tiles", items.len());
    items
}
