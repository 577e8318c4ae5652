//! Sensor naming and reading normalisation.
//!
//! Sensors are identified by their metric name in the time-series store.
//! The same name is the key of the current reading in the reading store;
//! the setpoint lives under `<name>Desired`.  Relay telemetry written by
//! this process shows up in the catalog as `Relay_<relay>` and must never
//! be treated as a sensor.

use serde::{Deserialize, Serialize};

/// Prefix of every relay-state measurement written by the control loop.
pub const RELAY_METRIC_PREFIX: &str = "Relay_";

/// Suffix of the setpoint key for a sensor.
pub const DESIRED_SUFFIX: &str = "Desired";

/// How raw readings are compared against setpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingPrecision {
    /// Compare the parsed value as-is.
    #[default]
    Exact,
    /// Truncate toward zero before comparing (whole-degree control).
    Truncate,
}

/// Reading-store key holding the setpoint for `sensor_id`.
pub fn desired_key(sensor_id: &str) -> String {
    format!("{sensor_id}{DESIRED_SUFFIX}")
}

/// Measurement name for the state of `relay_id`.
pub fn relay_metric(relay_id: &str) -> String {
    format!("{RELAY_METRIC_PREFIX}{relay_id}")
}

/// `true` if `name` is relay telemetry rather than a sensor.
pub fn is_relay_metric(name: &str) -> bool {
    name.starts_with(RELAY_METRIC_PREFIX)
}

/// Parse a raw store value into a number.
///
/// Missing, empty, unparseable and non-finite values all become `0.0`,
/// which never demands heat against a positive setpoint.
pub fn normalize(raw: Option<&str>, precision: ReadingPrecision) -> f64 {
    let Some(text) = raw else {
        return 0.0;
    };
    let value = match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        Ok(_) | Err(_) => {
            log::debug!("unparseable reading {:?}, using 0", text);
            return 0.0;
        }
    };
    match precision {
        ReadingPrecision::Exact => value,
        ReadingPrecision::Truncate => value.trunc(),
    }
}

/// Turn a raw catalog listing into the per-tick sensor set.
///
/// Drops relay telemetry and duplicate names, keeping discovery order.
pub fn sensor_set<I, S>(catalog: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut sensors: Vec<String> = Vec::new();
    for name in catalog {
        let name = name.into();
        if name.is_empty() || is_relay_metric(&name) || sensors.contains(&name) {
            continue;
        }
        sensors.push(name);
    }
    sensors
}
