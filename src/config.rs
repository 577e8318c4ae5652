//! System configuration parameters
//!
//! All tunable parameters for the relay controller, loaded once at startup
//! from a JSON file.  Every field has a default matching the stock
//! single-board deployment, so a config file only needs the sections that
//! differ.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::events::Tags;
use crate::app::ports::ConfigError;
use crate::control::RelayLevel;
use crate::pins;
use crate::sensors::ReadingPrecision;

/// A sensor whose readings drive one relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayBinding {
    pub sensor_id: String,
    pub relay_id: String,
}

impl RelayBinding {
    pub fn new(sensor_id: impl Into<String>, relay_id: impl Into<String>) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            relay_id: relay_id.into(),
        }
    }
}

/// One GPIO output line driving a relay coil.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayLine {
    pub id: String,
    /// BCM GPIO number.
    pub pin: u8,
    /// Relay energises when the pin is LOW.
    #[serde(default)]
    pub active_low: bool,
}

/// Reading store (Redis) endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 6379,
            db: 0,
        }
    }
}

impl StoreConfig {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Time-series sink (InfluxDB 1.x) endpoint and credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// `false` logs telemetry instead of writing it.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".into(),
            port: 8086,
            username: String::new(),
            password: String::new(),
            database: "snakedb".into(),
        }
    }
}

impl SinkConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// Keep the password out of debug logs.
impl core::fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SinkConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .field("database", &self.database)
            .finish()
    }
}

/// Circuit-breaker tuning shared by every collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failed calls before the breaker opens.
    pub failure_threshold: u32,
    /// Ticks the breaker stays open after the first trip.
    pub base_cooldown_ticks: u32,
    /// Upper bound for the doubling cooldown.
    pub max_cooldown_ticks: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            base_cooldown_ticks: 1,
            max_cooldown_ticks: 8,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Collaborators ---
    pub store: StoreConfig,
    pub sink: SinkConfig,

    // --- Relays ---
    pub bindings: Vec<RelayBinding>,
    pub relays: Vec<RelayLine>,
    /// Level every relay is driven to before the first tick. `None` leaves
    /// the lines as they are.
    pub startup_level: Option<RelayLevel>,

    // --- Control ---
    pub tick_interval_secs: u64,
    pub reading_precision: ReadingPrecision,
    /// Also write each bound sensor's setpoint as `<sensor>Desired`.
    pub publish_setpoints: bool,
    /// Fixed sensor list; skips catalog discovery when set.
    pub sensors: Option<Vec<String>>,

    // --- Telemetry identity ---
    pub tags: Tags,

    // --- Resilience ---
    /// Timeout for every network call (milliseconds).
    pub call_timeout_ms: u64,
    pub breaker: BreakerConfig,
    /// Consecutive ticks an essential collaborator may be down before the
    /// loop gives up.
    pub max_unavailable_ticks: u32,
    /// Catalog discovery attempts at startup.
    pub startup_retries: u32,

    // --- Diagnostics ---
    /// Log a stats summary every N ticks (0 disables).
    pub summary_every_ticks: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sink: SinkConfig::default(),

            bindings: pins::DEFAULT_BOUND_SENSORS
                .iter()
                .map(|s| RelayBinding::new(*s, *s))
                .collect(),
            relays: pins::DEFAULT_RELAYS
                .iter()
                .map(|(id, pin)| RelayLine {
                    id: (*id).into(),
                    pin: *pin,
                    active_low: false,
                })
                .collect(),
            startup_level: None,

            tick_interval_secs: 15,
            reading_precision: ReadingPrecision::Exact,
            publish_setpoints: false,
            sensors: None,

            tags: Tags::default(),

            call_timeout_ms: 2_000,
            breaker: BreakerConfig::default(),
            max_unavailable_ticks: 20, // 5 min at 15 s
            startup_retries: 5,

            summary_every_ticks: 240, // hourly at 15 s
        }
    }
}

impl SystemConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Binding for `sensor_id`, if any.
    pub fn binding_for(&self, sensor_id: &str) -> Option<&RelayBinding> {
        self.bindings.iter().find(|b| b.sensor_id == sensor_id)
    }

    /// Reject configurations the loop cannot run safely.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bindings.is_empty() {
            return Err(ConfigError::ValidationFailed("bindings: at least one binding required"));
        }
        for (i, b) in self.bindings.iter().enumerate() {
            if b.sensor_id.is_empty() || b.relay_id.is_empty() {
                return Err(ConfigError::ValidationFailed("bindings: empty sensor or relay id"));
            }
            let rest = &self.bindings[i + 1..];
            if rest.iter().any(|o| o.sensor_id == b.sensor_id) {
                return Err(ConfigError::ValidationFailed("bindings: sensor bound twice"));
            }
            if rest.iter().any(|o| o.relay_id == b.relay_id) {
                return Err(ConfigError::ValidationFailed("bindings: relay bound to two sensors"));
            }
            if !self.relays.iter().any(|r| r.id == b.relay_id) {
                return Err(ConfigError::ValidationFailed("bindings: relay not declared in relays"));
            }
        }
        for (i, r) in self.relays.iter().enumerate() {
            if r.id.is_empty() {
                return Err(ConfigError::ValidationFailed("relays: empty id"));
            }
            if r.pin > pins::MAX_BCM_GPIO {
                return Err(ConfigError::ValidationFailed("relays: pin outside BCM 0-27"));
            }
            let rest = &self.relays[i + 1..];
            if rest.iter().any(|o| o.id == r.id) {
                return Err(ConfigError::ValidationFailed("relays: duplicate id"));
            }
            if rest.iter().any(|o| o.pin == r.pin) {
                return Err(ConfigError::ValidationFailed("relays: pin used twice"));
            }
        }
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_secs: must be > 0"));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed("call_timeout_ms: must be > 0"));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(ConfigError::ValidationFailed("breaker.failure_threshold: must be > 0"));
        }
        if self.breaker.max_cooldown_ticks < self.breaker.base_cooldown_ticks {
            return Err(ConfigError::ValidationFailed(
                "breaker.max_cooldown_ticks: below base_cooldown_ticks",
            ));
        }
        if self.max_unavailable_ticks == 0 {
            return Err(ConfigError::ValidationFailed("max_unavailable_ticks: must be > 0"));
        }
        if self.tags.gateway.is_empty() || self.tags.location.is_empty() {
            return Err(ConfigError::ValidationFailed("tags: gateway and location required"));
        }
        if self.sink.enabled && self.sink.database.is_empty() {
            return Err(ConfigError::ValidationFailed("sink.database: required when sink enabled"));
        }
        Ok(())
    }
}
