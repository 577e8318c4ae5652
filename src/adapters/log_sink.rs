//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing each telemetry point to the log.
//! Used when `sink.enabled` is false and for dry runs, so the relay
//! decisions stay visible without an InfluxDB server.

use log::info;

use crate::app::events::{FieldValue, TelemetryEvent};
use crate::app::ports::{EventSink, SinkError};

/// Adapter that logs every [`TelemetryEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn record(&mut self, event: &TelemetryEvent) -> Result<(), SinkError> {
        let value = match event.value {
            FieldValue::Int(v) => format!("{}i", v),
            FieldValue::Float(v) => format!("{}", v),
        };
        info!(
            "TELEM | {} State={} | gateway={} location={} | {}",
            event.measurement,
            value,
            event.tags.gateway,
            event.tags.location,
            event.timestamp.to_rfc3339(),
        );
        Ok(())
    }
}
