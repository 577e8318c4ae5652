//! Port traits: the hexagonal boundary between the control loop and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Driven adapters (Redis, InfluxDB, GPIO relays, clocks) implement these
//! traits.  The [`ControlLoop`](super::service::ControlLoop) owns its
//! collaborators through generics, so the domain core never touches a
//! socket or a pin directly.
//!
//! All port errors are typed.  The loop decides per variant whether a
//! failure skips one binding or takes the process down.

use chrono::{DateTime, Utc};

use crate::config::SystemConfig;
use crate::control::RelayLevel;

use super::events::TelemetryEvent;

// ───────────────────────────────────────────────────────────────
// Reading store (driven adapter: key-value store → domain)
// ───────────────────────────────────────────────────────────────

/// Read side of the shared key-value store.
pub trait ReadingStore {
    /// Latest raw value for `key`.  A missing key is `Ok(None)`, never an error.
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError>;
}

// ───────────────────────────────────────────────────────────────
// Relay output port (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Named binary output lines.
///
/// Writing the level a line already has must be harmless.
pub trait RelayOutputPort {
    /// Current logical level of `relay_id`, read from the line itself.
    fn read(&mut self, relay_id: &str) -> Result<RelayLevel, RelayError>;

    /// Drive `relay_id` to `level`.
    fn write(&mut self, relay_id: &str, level: RelayLevel) -> Result<(), RelayError>;

    /// Every relay this port controls, in configuration order.
    fn relay_ids(&self) -> Vec<String>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → time-series store)
// ───────────────────────────────────────────────────────────────

/// Best-effort telemetry output.  The loop logs failures and carries on.
pub trait EventSink {
    fn record(&mut self, event: &TelemetryEvent) -> Result<(), SinkError>;
}

// ───────────────────────────────────────────────────────────────
// Sensor catalog port (driven adapter: time-series store → domain)
// ───────────────────────────────────────────────────────────────

/// Enumerates known metric names.  Queried once at startup.
pub trait SensorCatalog {
    fn list(&mut self) -> Result<Vec<String>, CatalogError>;
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Wall-clock source for telemetry timestamps.
pub trait TimePort {
    fn now_utc(&self) -> DateTime<Utc>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads system configuration.
///
/// Implementations MUST run [`SystemConfig::validate`] before returning;
/// an invalid file is a [`ConfigError::ValidationFailed`], never a
/// silently-patched config.
pub trait ConfigPort {
    fn load(&self) -> Result<SystemConfig, ConfigError>;
}

// ── Boxed adapters (runtime adapter selection in main) ────────

impl<T: ReadingStore + ?Sized> ReadingStore for Box<T> {
    fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }
}

impl<T: RelayOutputPort + ?Sized> RelayOutputPort for Box<T> {
    fn read(&mut self, relay_id: &str) -> Result<RelayLevel, RelayError> {
        (**self).read(relay_id)
    }

    fn write(&mut self, relay_id: &str, level: RelayLevel) -> Result<(), RelayError> {
        (**self).write(relay_id, level)
    }

    fn relay_ids(&self) -> Vec<String> {
        (**self).relay_ids()
    }
}

impl<T: EventSink + ?Sized> EventSink for Box<T> {
    fn record(&mut self, event: &TelemetryEvent) -> Result<(), SinkError> {
        (**self).record(event)
    }
}

impl<T: SensorCatalog + ?Sized> SensorCatalog for Box<T> {
    fn list(&mut self) -> Result<Vec<String>, CatalogError> {
        (**self).list()
    }
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ReadingStore`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Could not connect, or the connection dropped.
    Unavailable(String),
    /// The call did not complete within the configured timeout.
    Timeout,
}

/// Errors from [`RelayOutputPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// No output line is configured under this id.
    UnknownRelay(String),
    /// The GPIO layer refused the read or write.
    Line { relay: String, detail: String },
}

/// Errors from [`EventSink`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    Unavailable(String),
    Timeout,
    /// The server answered with a non-success HTTP status.
    Rejected(u16),
}

/// Errors from [`SensorCatalog`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    Unavailable(String),
    Timeout,
    Rejected(u16),
    /// The listing could not be decoded.
    Malformed(String),
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file does not exist.
    NotFound(String),
    /// The file exists but could not be read or decoded.
    Corrupted(String),
    /// A config field failed validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl core::fmt::Display for StoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "reading store unavailable: {}", msg),
            Self::Timeout => write!(f, "reading store timed out"),
        }
    }
}

impl core::fmt::Display for RelayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownRelay(id) => write!(f, "unknown relay '{}'", id),
            Self::Line { relay, detail } => write!(f, "relay '{}' line error: {}", relay, detail),
        }
    }
}

impl core::fmt::Display for SinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "event sink unavailable: {}", msg),
            Self::Timeout => write!(f, "event sink timed out"),
            Self::Rejected(status) => write!(f, "event sink rejected write (HTTP {})", status),
        }
    }
}

impl core::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "sensor catalog unavailable: {}", msg),
            Self::Timeout => write!(f, "sensor catalog timed out"),
            Self::Rejected(status) => write!(f, "sensor catalog query rejected (HTTP {})", status),
            Self::Malformed(msg) => write!(f, "sensor catalog malformed: {}", msg),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "config not found: {}", path),
            Self::Corrupted(msg) => write!(f, "config corrupted: {}", msg),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}
impl std::error::Error for RelayError {}
impl std::error::Error for SinkError {}
impl std::error::Error for CatalogError {}
impl std::error::Error for ConfigError {}
