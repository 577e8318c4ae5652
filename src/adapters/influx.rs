//! InfluxDB 1.x HTTP adapter.
//!
//! One client serves two ports:
//!
//! | Port            | Call                                   |
//! |-----------------|----------------------------------------|
//! | `EventSink`     | `POST /write?db=<db>&precision=ms`     |
//! | `SensorCatalog` | `GET /query?db=<db>&q=SHOW MEASUREMENTS` |
//!
//! Points are encoded as line protocol, one field named `State`:
//!
//! ```text
//! Relay_DHT22_AirTemp,gateway=snakePi2,location=Tokyo State=1i 1709294400000
//! ```

use std::time::Duration;

use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::app::events::{FieldValue, TelemetryEvent};
use crate::app::ports::{CatalogError, EventSink, SensorCatalog, SinkError};
use crate::config::SinkConfig;

pub struct InfluxClient {
    http: Client,
    base_url: String,
    database: String,
    username: String,
    password: String,
}

impl InfluxClient {
    pub fn new(config: &SinkConfig, timeout: Duration) -> Result<Self, SinkError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        info!("InfluxDB: {} db={}", config.base_url(), config.database);
        Ok(Self {
            http,
            base_url: config.base_url(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }
}

impl EventSink for InfluxClient {
    fn record(&mut self, event: &TelemetryEvent) -> Result<(), SinkError> {
        let line = line_protocol(event);
        debug!("InfluxDB: write {}", line);
        let request = self
            .http
            .post(format!("{}/write", self.base_url))
            .query(&[("db", self.database.as_str()), ("precision", "ms")])
            .body(line);
        let response = self.authed(request).send().map_err(|e| {
            if e.is_timeout() {
                SinkError::Timeout
            } else {
                SinkError::Unavailable(e.to_string())
            }
        })?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected(status.as_u16()))
        }
    }
}

impl SensorCatalog for InfluxClient {
    fn list(&mut self) -> Result<Vec<String>, CatalogError> {
        let request = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&[("db", self.database.as_str()), ("q", "SHOW MEASUREMENTS")]);
        let response: Response = self.authed(request).send().map_err(|e| {
            if e.is_timeout() {
                CatalogError::Timeout
            } else {
                CatalogError::Unavailable(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Rejected(status.as_u16()));
        }
        let body = response
            .text()
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        parse_measurements(&body)
    }
}

// ── Line protocol ─────────────────────────────────────────────

/// Encode one point with millisecond precision.
pub fn line_protocol(event: &TelemetryEvent) -> String {
    let value = match event.value {
        FieldValue::Int(v) => format!("{}i", v),
        FieldValue::Float(v) => format!("{}", v),
    };
    format!(
        "{},gateway={},location={} State={} {}",
        escape(&event.measurement, &[',', ' ']),
        escape(&event.tags.gateway, &[',', '=', ' ']),
        escape(&event.tags.location, &[',', '=', ' ']),
        value,
        event.timestamp.timestamp_millis(),
    )
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ── SHOW MEASUREMENTS response ────────────────────────────────

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

/// Measurement names from a `SHOW MEASUREMENTS` JSON body.
/// An empty database yields an empty list.
pub fn parse_measurements(body: &str) -> Result<Vec<String>, CatalogError> {
    let response: QueryResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Malformed(e.to_string()))?;
    if let Some(error) = response.error {
        return Err(CatalogError::Malformed(error));
    }
    let mut names = Vec::new();
    for result in response.results {
        if let Some(error) = result.error {
            return Err(CatalogError::Malformed(error));
        }
        for series in result.series {
            for row in series.values {
                match row.first().and_then(serde_json::Value::as_str) {
                    Some(name) => names.push(name.to_owned()),
                    None => return Err(CatalogError::Malformed("non-string measurement name".into())),
                }
            }
        }
    }
    Ok(names)
}
