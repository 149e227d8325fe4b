//! Command line and logging setup.

use std::path::PathBuf;

use callmatch_types::{EngineConfig, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(name = "callmatch-node")]
#[command(version)]
#[command(about = "Periodic call-auction matching engine", long_about = None)]
pub struct CliArgs {
    /// JSON engine config; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Seconds between auctions, overrides the config file
    #[arg(short, long)]
    pub interval_secs: Option<u64>,

    /// Log level used when RUST_LOG is unset
    #[arg(short = 'l', long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, default_value_t = false)]
    pub json_logs: bool,
}

impl CliArgs {
    /// Load the config file (if any) and apply command line overrides.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)?,
            None => EngineConfig::default(),
        };
        if let Some(secs) = self.interval_secs {
            config.auction_interval_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
