//! Outbound telemetry events.
//!
//! The [`ControlLoop`](super::service::ControlLoop) hands these to the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them, e.g. write InfluxDB points or log them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::control::RelayLevel;
use crate::sensors;

/// Process identity attached to every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tags {
    pub gateway: String,
    pub location: String,
}

impl Default for Tags {
    fn default() -> Self {
        Self {
            gateway: "snakePi2".into(),
            location: "Tokyo".into(),
        }
    }
}

/// Value of the single `State` field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
}

impl FieldValue {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }
}

/// One time-series point.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent {
    pub measurement: String,
    pub value: FieldValue,
    pub tags: Tags,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryEvent {
    /// `Relay_<relay_id>` point carrying the relay level as 0/1.
    pub fn relay_state(
        relay_id: &str,
        level: RelayLevel,
        tags: &Tags,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            measurement: sensors::relay_metric(relay_id),
            value: FieldValue::Int(level.as_state()),
            tags: tags.clone(),
            timestamp,
        }
    }

    /// `<sensor_id>Desired` point carrying the setpoint.
    pub fn setpoint(sensor_id: &str, desired: f64, tags: &Tags, timestamp: DateTime<Utc>) -> Self {
        Self {
            measurement: sensors::desired_key(sensor_id),
            value: FieldValue::Float(desired),
            tags: tags.clone(),
            timestamp,
        }
    }
}
