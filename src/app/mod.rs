//! Application core: the control loop and the ports it talks through.
//!
//! This module holds the rules of the relay controller: per-tick
//! orchestration, circuit breaking and telemetry construction.  All
//! interaction with Redis, InfluxDB and GPIO happens through the **port
//! traits** in [`ports`], keeping this layer fully testable without real
//! peripherals or servers.

pub mod breaker;
pub mod events;
pub mod ports;
pub mod service;
