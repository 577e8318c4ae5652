//! Unified error type for the relay controller.
//!
//! Every port error converts into [`Error`], keeping the top-level
//! startup path and the control loop's fatal exit uniform.  Most port
//! failures never reach this type: the loop absorbs them per binding and
//! only escalates once a collaborator has been down for too long.

use core::fmt;

use crate::app::ports::{CatalogError, ConfigError, RelayError, SinkError, StoreError};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external collaborators the control loop depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    ReadingStore,
    RelayOutput,
    EventSink,
    SensorCatalog,
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadingStore => write!(f, "reading store"),
            Self::RelayOutput => write!(f, "relay outputs"),
            Self::EventSink => write!(f, "event sink"),
            Self::SensorCatalog => write!(f, "sensor catalog"),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    Store(StoreError),
    Relay(RelayError),
    Sink(SinkError),
    Catalog(CatalogError),
    Config(ConfigError),
    /// A collaborator stayed unreachable past the configured tolerance.
    Unavailable { collaborator: Collaborator, ticks: u32 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Store(e) => write!(f, "store: {e}"),
            Self::Relay(e) => write!(f, "relay: {e}"),
            Self::Sink(e) => write!(f, "sink: {e}"),
            Self::Catalog(e) => write!(f, "catalog: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Unavailable { collaborator, ticks } => {
                write!(f, "{collaborator} unavailable for {ticks} consecutive ticks")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<RelayError> for Error {
    fn from(e: RelayError) -> Self {
        Self::Relay(e)
    }
}

impl From<SinkError> for Error {
    fn from(e: SinkError) -> Self {
        Self::Sink(e)
    }
}

impl From<CatalogError> for Error {
    fn from(e: CatalogError) -> Self {
        Self::Catalog(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
