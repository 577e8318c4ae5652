//! Hardware drivers for the relay outputs.

pub mod relay;
#[cfg(feature = "rpi")]
pub mod rpi;
pub mod sim_pin;
