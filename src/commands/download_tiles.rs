use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::config::DownloadPlan;
use crate::scheduler::{self, FetchOptions, RunSummary};
use crate::sequence::generate;
use crate::source::HttpSource;

pub async fn download_tiles(
    catalog: &Catalog,
    plan: &DownloadPlan,
    dir: &str,
    frame_naming: bool,
) -> Result<RunSummary> {
    let items = generate(plan.start, plan.end, plan.region, plan.resolution);
    if items.is_empty() {
        warn!(start = %plan.start, end = %plan.end, "end is before start, nothing to download");
    }
    info!(
        tiles = items.len(),
        start = %plan.start,
        end = %plan.end,
        resolution = %plan.resolution,
        max_requests = plan.max_requests,
        "downloading tile sequence from {}",
        catalog.base_url()
    );

    let source = Arc::new(HttpSource::new()?);
    let options = FetchOptions {
        dir: PathBuf::from(dir),
        max_requests: plan.max_requests,
        frame_naming,
    };
    let summary = scheduler::run(source, catalog, items, &options).await?;
    info!(
        "saved {} of {} tiles to {} in {:.1?}",
        summary.saved(),
        summary.outcomes.len(),
        dir,
        summary.elapsed
    );
    Ok(summary)
}
