pub mod daily_factor;
pub mod forex_tester;
pub mod intraday_factor;
pub mod price;

use crate::cli::InstrumentArgs;
use crate::error::{Error, Result};
use crate::models::{AppConfig, AssetClassDirs, Universe};
use crate::services::BatchStats;
use crate::utils::get_data_dir;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` wins over `--debug`
pub fn init_logging(debug: bool) {
    let fallback = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .try_init();
}

/// Instruments and folders resolved from the command line and config file
#[derive(Debug, Clone)]
pub struct RunContext {
    pub universe: Universe,
    pub dirs: AssetClassDirs,
    pub indir: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
}

impl RunContext {
    pub fn resolve(args: &InstrumentArgs) -> Result<Self> {
        let config = match &args.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        let universe = match (&args.ticker, &args.universe) {
            (Some(ticker), _) => Universe::single(ticker),
            (None, Some(name)) => Universe::from_file(config.resolve_universe(name))?,
            (None, None) => {
                return Err(Error::Config(
                    "Either --ticker or --universe must be given".to_string(),
                ))
            }
        };

        let dirs = match &args.asset_class {
            Some(name) => config.asset_class(name)?.clone(),
            None => AssetClassDirs::default(),
        };

        Ok(Self {
            universe,
            dirs,
            indir: args.indir.clone(),
            outdir: args.outdir.clone(),
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.universe.tickers
    }
}

/// Explicit flag, then asset-class folder, then `<data dir>/<fallback>`
pub fn pick_dir(explicit: &Option<PathBuf>, configured: &Option<PathBuf>, fallback: &str) -> PathBuf {
    explicit
        .clone()
        .or_else(|| configured.clone())
        .unwrap_or_else(|| get_data_dir().join(fallback))
}

/// Resolve the run context or exit with a configuration error
pub fn resolve_or_exit(args: &InstrumentArgs) -> RunContext {
    match RunContext::resolve(args) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

pub fn print_summary(action: &str, stats: &BatchStats) {
    println!("\n📊 {} summary:", action);
    println!("   ✅ Successful: {}", stats.successful);
    println!("   📝 Rows written: {}", stats.total_rows);
    if stats.failed > 0 {
        println!("   ❌ Failed: {}", stats.failed);
        for (ticker, error) in &stats.failures {
            println!("      {} - {}", ticker, error);
        }
    }
    println!("   ⏱️  Took {:.2}s", stats.elapsed.as_secs_f64());
}
