//! Relay coil driver over a single `embedded-hal` output line.
//!
//! Translates between the logical relay level and the electrical pin
//! level, so active-low relay boards look the same to the rest of the
//! system.  The level is always read back from the pin, never from a
//! shadow copy.
//!
//! ## Dual-target design
//!
//! On a Raspberry Pi: `P` is an `rppal` output pin (feature `rpi`).
//! On host/test: `P` is a [`SimPin`](super::sim_pin::SimPin).

use embedded_hal::digital::StatefulOutputPin;

use crate::control::RelayLevel;

pub struct RelayDriver<P> {
    pin: P,
    active_low: bool,
}

impl<P: StatefulOutputPin> RelayDriver<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// Logical level, read from the pin.
    pub fn level(&mut self) -> Result<RelayLevel, P::Error> {
        let high = self.pin.is_set_high()?;
        Ok(RelayLevel::from(high != self.active_low))
    }

    /// Energise or release the relay.
    pub fn set(&mut self, level: RelayLevel) -> Result<(), P::Error> {
        if level.is_on() != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}
