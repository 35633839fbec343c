//! smartscan
//!
//! Collects SMART telemetry for every device on the host and prints it to
//! stdout as JSON.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            smartscan                             │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐        │
//! │  │   Version    │───▶│    Query     │───▶│   Output     │        │
//! │  │    Gate      │    │   Runner     │    │   (JSON)     │        │
//! │  └──────────────┘    └──────────────┘    └──────────────┘        │
//! │                             │                                    │
//! │                      ┌──────┴───────┐                            │
//! │                      │   smartctl   │                            │
//! │                      └──────────────┘                            │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smartscan::adapters::{SmartctlConfig, SmartctlExecutor};
use smartscan::smart::{discover_attributes, discover_devices, OutputMode, ResultSet};
use smartscan::{RunnerConfig, SmartCollector};

// =============================================================================
// CLI Arguments
// =============================================================================

/// What to print on stdout
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Parsed device records
    Records,
    /// Raw smartctl responses keyed by device name
    Raw,
    /// Device discovery listing
    Devices,
    /// Attribute discovery listing
    Attributes,
}

impl OutputFormat {
    fn mode(&self) -> OutputMode {
        match self {
            OutputFormat::Raw => OutputMode::Raw,
            _ => OutputMode::Records,
        }
    }
}

/// smartscan - SMART telemetry for every disk, including RAID members
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the smartctl binary
    #[arg(long, env = "SMARTCTL_PATH", default_value = "smartctl")]
    smartctl_path: String,

    /// Per-invocation timeout in seconds
    #[arg(long, env = "SMARTCTL_TIMEOUT_SECONDS", default_value = "30")]
    timeout_seconds: u64,

    /// Run smartctl through `sudo -n`
    #[arg(long, env = "SMARTCTL_SUDO")]
    sudo: bool,

    /// Workers per pool (defaults to available CPUs)
    #[arg(long, env = "SMARTSCAN_WORKERS")]
    workers: Option<usize>,

    /// Output format
    #[arg(long, value_enum, env = "SMARTSCAN_OUTPUT", default_value = "records")]
    output: OutputFormat,

    /// Skip the smartctl version check
    #[arg(long, env = "SKIP_VERSION_CHECK")]
    skip_version_check: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let smartctl_config = SmartctlConfig {
        path: args.smartctl_path.clone(),
        timeout: Duration::from_secs(args.timeout_seconds),
        use_sudo: args.sudo,
    };
    let runner_config = match args.workers {
        Some(pool_size) => RunnerConfig { pool_size },
        None => RunnerConfig::default(),
    };

    info!("Starting smartscan");
    info!("  smartctl: {}", smartctl_config.path);
    info!("  Timeout: {}s", args.timeout_seconds);
    info!("  Workers: {}", runner_config.pool_size);
    info!("  Output: {:?}", args.output);

    let executor = Arc::new(SmartctlExecutor::new(smartctl_config)?);
    let mut collector = SmartCollector::new(executor, runner_config)?;
    if args.skip_version_check {
        collector = collector.without_version_check();
    }

    let results = collector
        .collect(args.output.mode())
        .await
        .map_err(|e| {
            error!("Collection failed: {}", e);
            e
        })?;

    let json = render(args.output, &results).context("failed to encode output")?;
    println!("{}", json);

    Ok(())
}

fn render(format: OutputFormat, results: &ResultSet) -> serde_json::Result<String> {
    let records = results.records().unwrap_or_default();
    match format {
        OutputFormat::Records | OutputFormat::Raw => serde_json::to_string(results),
        OutputFormat::Devices => serde_json::to_string(&discover_devices(records)),
        OutputFormat::Attributes => serde_json::to_string(&discover_attributes(records)),
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // stdout carries the JSON payload
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
