use anyhow::Result;
use argh::FromArgs;
use chrono::Utc;
use dotenv::dotenv;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod catalog;
mod commands;
mod config;
mod limiter;
mod scheduler;
mod sequence;
mod source;

use catalog::Catalog;
use commands::{download_tiles, list_tiles};
use config::TimeBounds;

#[derive(FromArgs)]
/// Downloads a time sequence of weather radar tiles from the image cache. All times are UTC.
struct Args {
    /// start date in the form "2006-01-20", default is today
    #[argh(option)]
    start_date: Option<String>,

    /// start time in the form "15:04", default is 2 hours ago
    #[argh(option)]
    start_time: Option<String>,

    /// end date in the form "2006-01-20", default is today
    #[argh(option)]
    end_date: Option<String>,

    /// end time in the form "15:04", default is 15 minutes ago
    #[argh(option)]
    end_time: Option<String>,

    /// download the last N hours before the end time, ignoring the start flags
    #[argh(option)]
    last_hours: Option<u32>,

    /// directory for saving the results, must not exist yet
    #[argh(option, short = 'd', default = "String::from(\"./radar_tiles\")")]
    dir: String,

    /// which region map to use
    #[argh(option, short = 'r', default = "String::from(\"germany\")")]
    region: String,

    /// time resolution in minutes, a multiple of 5 (minimum 5)
    #[argh(option, default = "5")]
    res: u32,

    /// name files 00000.png, 00001.png, ... for frame encoders
    #[argh(switch, short = 'f')]
    frames: bool,

    /// maximum number of concurrent requests
    #[argh(option, short = 'n', default = "8")]
    max_requests: usize,

    /// fetch tiles from this URL instead of the default image cache
    #[argh(option)]
    base_url: Option<String>,

    /// print the tiles that would be downloaded and exit
    #[argh(switch)]
    dry_run: bool,

    /// write logs to a daily rolling file in this directory instead of stderr
    #[argh(option)]
    log_dir: Option<String>,
}

fn init_tracing(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "radar-tiles.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

#[tokio::main]
pub async fn main() -> Result<()> {
    dotenv().ok();
    let args: Args = argh::from_env();
    let _guard = init_tracing(args.log_dir.as_deref());

    let catalog = match &args.base_url {
        Some(base_url) => Catalog::default().with_base_url(base_url),
        None => Catalog::default(),
    };
    let bounds = TimeBounds {
        start_date: args.start_date.as_deref(),
        start_time: args.start_time.as_deref(),
        end_date: args.end_date.as_deref(),
        end_time: args.end_time.as_deref(),
        last_hours: args.last_hours,
    };
    let plan = config::plan(
        &catalog,
        &bounds,
        &args.region,
        args.res,
        args.max_requests,
        Utc::now().naive_utc(),
    )?;

    if args.dry_run {
        list_tiles(&catalog, &plan, args.frames);
        return Ok(());
    }

    download_tiles(&catalog, &plan, &args.dir, args.frames).await?;
    Ok(())
}
