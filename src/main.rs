//! HeatRelay main entry point
//!
//! Closed-loop heat controller for a terrarium gateway.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  RedisStore      RelayBank         InfluxClient    SystemClock │
//! │  (ReadingStore)  (RelayOutputPort) (EventSink +    (TimePort)  │
//! │                                     SensorCatalog)             │
//! │  JsonConfigFile  LogEventSink      StaticCatalog               │
//! │  (ConfigPort)    (EventSink)       (SensorCatalog)             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             ControlLoop (pure logic)                   │    │
//! │  │  decide · circuit breakers · stats                     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tracing_subscriber::EnvFilter;

use heatrelay::adapters::config_file::JsonConfigFile;
use heatrelay::adapters::hardware::RelayBank;
use heatrelay::adapters::influx::InfluxClient;
use heatrelay::adapters::log_sink::LogEventSink;
use heatrelay::adapters::memory::StaticCatalog;
use heatrelay::adapters::redis_store::RedisStore;
use heatrelay::adapters::time::SystemClock;
use heatrelay::app::ports::{ConfigError, ConfigPort, EventSink, RelayOutputPort, SensorCatalog};
use heatrelay::app::service::{discover_sensors, ControlLoop};
use heatrelay::config::SystemConfig;

/// First catalog retry delay; doubles per attempt.
const DISCOVERY_BASE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "heatrelay", version, about = "Closed-loop relay controller for terrarium heat sources")]
struct Cli {
    /// JSON configuration file. Missing file means built-in defaults.
    #[arg(long, default_value = "/etc/heatrelay/config.json")]
    config: PathBuf,

    /// Simulate the relay lines and log telemetry instead of writing it.
    #[arg(long)]
    dry_run: bool,

    /// Run a single tick and exit.
    #[arg(long)]
    once: bool,

    /// Log filter (e.g. `debug`, `heatrelay=trace`). Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Logging ────────────────────────────────────────────
    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("HeatRelay v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config(&cli.config)?;
    info!("Config: {:?}", config.sink);

    // ── 3. Sensor catalog (once) ──────────────────────────────
    let sensors = {
        let mut catalog = build_catalog(&config)?;
        discover_sensors(&mut catalog, config.startup_retries, DISCOVERY_BASE_DELAY)
            .context("sensor discovery failed")?
    };

    // ── 4. Collaborators ──────────────────────────────────────
    let store = RedisStore::new(&config.store, config.call_timeout()).context("invalid store endpoint")?;
    let relays = build_relays(&config, cli.dry_run)?;
    let sink = build_sink(&config, cli.dry_run)?;

    let mut control = ControlLoop::new(&config, sensors, store, relays, sink, SystemClock);

    if let Some(level) = config.startup_level {
        control
            .apply_startup_level(level)
            .context("driving relays to startup level")?;
    }

    // ── 5. Control loop ───────────────────────────────────────
    if cli.once {
        let report = control.tick()?;
        info!(
            "Single tick done: {} evaluated, {} commands, {} failed",
            report.outcomes.len(),
            report.commands().count(),
            report.failures.len()
        );
        return Ok(());
    }

    let Err(e) = control.run();
    Err(e).context("control loop stopped")
}

fn load_config(path: &Path) -> Result<SystemConfig> {
    match JsonConfigFile::new(path).load() {
        Ok(config) => Ok(config),
        Err(ConfigError::NotFound(p)) => {
            warn!("Config: {} not found, using defaults", p);
            let config = SystemConfig::default();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(e).context("loading configuration"),
    }
}

fn build_catalog(config: &SystemConfig) -> Result<Box<dyn SensorCatalog>> {
    if let Some(sensors) = &config.sensors {
        info!("Catalog: static list of {} sensors", sensors.len());
        return Ok(Box::new(StaticCatalog::new(sensors.iter().cloned())));
    }
    if !config.sink.enabled {
        info!("Catalog: InfluxDB disabled, using bound sensors");
        return Ok(Box::new(StaticCatalog::new(
            config.bindings.iter().map(|b| b.sensor_id.clone()),
        )));
    }
    let client = InfluxClient::new(&config.sink, config.call_timeout()).context("building InfluxDB client")?;
    Ok(Box::new(client))
}

fn build_relays(config: &SystemConfig, dry_run: bool) -> Result<Box<dyn RelayOutputPort>> {
    #[cfg(feature = "rpi")]
    if !dry_run {
        let bank = heatrelay::drivers::rpi::open_bank(&config.relays).context("claiming GPIO lines")?;
        return Ok(Box::new(bank));
    }

    if !dry_run && !cfg!(feature = "rpi") {
        warn!("Built without the `rpi` feature: relay lines are simulated");
    }
    Ok(Box::new(RelayBank::simulated(&config.relays)))
}

fn build_sink(config: &SystemConfig, dry_run: bool) -> Result<Box<dyn EventSink>> {
    if dry_run || !config.sink.enabled {
        info!("Telemetry: logging only");
        return Ok(Box::new(LogEventSink::new()));
    }
    let client = InfluxClient::new(&config.sink, config.call_timeout()).context("building InfluxDB client")?;
    Ok(Box::new(client))
}
