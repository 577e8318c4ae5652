//! HeatRelay controller library.
//!
//! Exposes the control core, the adapters and the relay drivers for the
//! binary and for integration testing.  Real GPIO is only compiled with
//! the `rpi` feature; everything else runs on any host.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod diagnostics;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod sensors;

pub use error::{Error, Result};
