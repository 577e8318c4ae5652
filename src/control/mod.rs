//! Relay control logic.
//!
//! On/off threshold control for relay-switched heat sources. Pure
//! functions only; the [`ControlLoop`](crate::app::service::ControlLoop)
//! feeds them fresh readings and relay levels every tick.

pub mod threshold;

pub use threshold::{decide, RelayCommand, RelayLevel};
