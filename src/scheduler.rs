use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::StatusCode;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::AcquireError;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::limiter::ConcurrencyLimiter;
use crate::sequence::SequenceItem;
use crate::source::TileSource;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub dir: PathBuf,
    pub max_requests: usize,
    pub frame_naming: bool,
}

#[derive(Debug, Error)]
pub enum TileFailure {
    #[error("request failed: {0:#}")]
    Transport(anyhow::Error),
    #[error("bad http response: {0}")]
    Status(StatusCode),
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no fetch slot available: {0}")]
    Slot(#[from] AcquireError),
}

#[derive(Debug)]
pub struct TileOutcome {
    pub item: SequenceItem,
    /// Path of the saved tile.
    pub result: Result<PathBuf, TileFailure>,
}

#[derive(Debug)]
pub struct RunSummary {
    /// One entry per item, in sequence order.
    pub outcomes: Vec<TileOutcome>,
    pub elapsed: Duration,
    pub peak_in_flight: usize,
}

impl RunSummary {
    pub fn saved(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.saved()
    }
}

/// Fetches every item and saves the successful ones into `options.dir`.
///
/// The directory is created here and must not exist yet; failing to create it is the only error
/// this returns. Each item gets its own task, at most `options.max_requests` of which hold a
/// fetch slot at any time. Per-tile failures are logged and reported in the summary. Returns once
/// every task has finished.
#[instrument(skip(source, catalog, items, options), fields(tiles = items.len(), dir = %options.dir.display()))]
pub async fn run<S: TileSource>(
    source: Arc<S>,
    catalog: &Catalog,
    items: Vec<SequenceItem>,
    options: &FetchOptions,
) -> Result<RunSummary> {
    let started = Instant::now();
    tokio::fs::create_dir(&options.dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create output directory {}",
                options.dir.display()
            )
        })?;

    let limiter = ConcurrencyLimiter::new(options.max_requests);
    let mut tasks: FuturesUnordered<_> = items
        .into_iter()
        .map(|item| {
            let source = Arc::clone(&source);
            let limiter = limiter.clone();
            let url = catalog.tile_url(&item.remote_filename);
            let path = options.dir.join(item.local_filename(options.frame_naming));
            tokio::spawn(async move {
                let result = fetch_tile(source.as_ref(), &limiter, &url, path).await;
                TileOutcome { item, result }
            })
        })
        .collect();

    let mut outcomes = Vec::with_capacity(tasks.len());
    let mut panicked = None;
    while let Some(joined) = tasks.next().await {
        match joined {
            Ok(outcome) => {
                log_outcome(&outcome);
                outcomes.push(outcome);
            }
            Err(join_err) => {
                error!(error = %join_err, "tile fetch task panicked");
                if panicked.is_none() {
                    panicked = Some(join_err);
                }
            }
        }
    }
    if let Some(join_err) = panicked {
        return Err(join_err).context("Tile fetch task panicked");
    }
    outcomes.sort_by_key(|outcome| outcome.item.index);

    let summary = RunSummary {
        outcomes,
        elapsed: started.elapsed(),
        peak_in_flight: limiter.peak(),
    };
    info!(
        saved = summary.saved(),
        failed = summary.failed(),
        peak_in_flight = summary.peak_in_flight,
        max_requests = limiter.max(),
        elapsed = ?summary.elapsed,
        "finished downloading tiles"
    );
    Ok(summary)
}

async fn fetch_tile<S: TileSource>(
    source: &S,
    limiter: &ConcurrencyLimiter,
    url: &str,
    path: PathBuf,
) -> Result<PathBuf, TileFailure> {
    let _slot = limiter.acquire().await?;
    debug!(url, in_flight = limiter.in_flight(), "fetching tile");
    let res = source.fetch(url).await.map_err(TileFailure::Transport)?;
    if !res.status.is_success() {
        return Err(TileFailure::Status(res.status));
    }

    match tokio::fs::write(&path, &res.body).await {
        Ok(()) => Ok(path),
        Err(source) => Err(TileFailure::Write { path, source }),
    }
}

fn log_outcome(outcome: &TileOutcome) {
    let index = outcome.item.index;
    let name = outcome.item.remote_filename.as_str();
    match &outcome.result {
        Ok(path) => info!(index, name, path = %path.display(), "saved tile"),
        Err(TileFailure::Status(status)) => {
            warn!(index, name, status = %status, "bad http response, skipping tile")
        }
        Err(err) => error!(index, name, error = %err, "failed to fetch tile"),
    }
}
