//! Climate statistics warmer.
//!
//! `warm` fills the shared cache with every remote computation the
//! statistics depend on. `compute` reads them back (computing whatever is
//! still missing) and writes one raster per statistic. `plan` prints the
//! default warming plan as YAML so it can be split across machines.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use climate_common::DateRange;
use statistics::{CatalogConfig, StatisticContext, DEFAULT_SEED};
use storage::MemoCache;
use tiling::{HttpRasterService, HttpServiceConfig};
use warmer::warming::DEFAULT_CONCURRENCY;
use warmer::{open_store, write_stat, CacheBackend, CacheWarmer, StoreConfig, WarmPlan};

#[derive(Parser, Debug)]
#[command(name = "warmer")]
#[command(about = "Warm the statistic cache and compute climate statistics")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Concurrent warming tasks
    #[arg(long, env = "WARMER_WORKERS", default_value_t = DEFAULT_CONCURRENCY)]
    workers: usize,

    /// Cache backend
    #[arg(long, env = "CACHE_BACKEND", value_enum, default_value = "disk")]
    cache_backend: CacheBackend,

    /// Directory for the disk cache
    #[arg(long, env = "CACHE_DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Redis URL for the redis cache backend
    #[arg(long, env = "REDIS_URL")]
    redis_url: Option<String>,

    /// Remote raster service root URL
    #[arg(long, env = "RASTER_SERVICE_URL", default_value = "http://localhost:8080")]
    service_url: String,

    /// Per-request timeout for the raster service, in seconds
    #[arg(long, default_value = "600")]
    request_timeout_secs: u64,

    /// First day of the analysis range
    #[arg(long, default_value = "1990-01-01")]
    start: NaiveDate,

    /// Last day of the analysis range (inclusive)
    #[arg(long, default_value = "2019-12-31")]
    end: NaiveDate,

    /// Output resolution in degrees
    #[arg(long, default_value = "0.25")]
    resolution: f64,

    /// Sampled days for the high-wind frequency
    #[arg(long, default_value = "2000")]
    wind_samples: usize,

    /// Sampled days for high dewpoints
    #[arg(long, default_value = "2000")]
    dewpoint_samples: usize,

    /// Date sampling seed
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pre-compute remote results into the cache
    Warm {
        /// YAML plan to warm instead of the default plan
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Compute every statistic and write it to disk
    Compute {
        #[arg(long, default_value = "output")]
        output_dir: PathBuf,
    },
    /// Print the default warming plan
    Plan,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let catalog = CatalogConfig {
        range: DateRange::new(args.start, args.end).context("invalid analysis range")?,
        resolution: args.resolution,
        seed: args.seed,
        wind_samples: args.wind_samples,
        dewpoint_samples: args.dewpoint_samples,
    };

    info!(
        range = %catalog.range,
        resolution = catalog.resolution,
        backend = ?args.cache_backend,
        "Starting climate statistics warmer"
    );

    let ctx = build_context(&args, catalog).await?;

    match &args.command {
        Command::Warm { plan } => warm(&ctx, plan.as_deref(), args.workers).await,
        Command::Compute { output_dir } => compute(&ctx, output_dir).await,
        Command::Plan => {
            print!("{}", WarmPlan::full(&ctx)?.to_yaml()?);
            Ok(())
        }
    }
}

async fn build_context(args: &Args, catalog: CatalogConfig) -> Result<StatisticContext> {
    let service = HttpRasterService::new(&HttpServiceConfig {
        base_url: args.service_url.clone(),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
    })
    .context("failed to create raster service client")?;

    let store = open_store(&StoreConfig {
        backend: args.cache_backend,
        cache_dir: args.cache_dir.clone(),
        redis_url: args.redis_url.clone(),
    })
    .await?;

    Ok(StatisticContext::new(
        Arc::new(service),
        Arc::new(MemoCache::new(store)),
        catalog,
    ))
}

async fn warm(ctx: &StatisticContext, plan_path: Option<&Path>, workers: usize) -> Result<()> {
    let plan = match plan_path {
        Some(path) => WarmPlan::load(path).await?,
        None => WarmPlan::full(ctx)?,
    };

    let summary = CacheWarmer::new(ctx.clone(), workers).warm(plan.computations).await;
    if !summary.is_success() {
        bail!("{} of {} computations failed", summary.failed, summary.total);
    }
    Ok(())
}

async fn compute(ctx: &StatisticContext, output_dir: &Path) -> Result<()> {
    let stats = ctx.all_stats().await.context("failed to compute statistics")?;

    for stat in &stats {
        write_stat(output_dir, stat).await?;
    }

    let memo = ctx.memo().stats();
    if memo.misses > 0 {
        warn!(misses = memo.misses, "Some results were computed during output; the cache was not fully warm");
    }
    info!(
        statistics = stats.len(),
        output_dir = %output_dir.display(),
        hit_rate = memo.hit_rate(),
        "Statistics written"
    );
    Ok(())
}
