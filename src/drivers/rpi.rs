//! Raspberry Pi GPIO lines via `rppal` (feature `rpi`).
//!
//! Pins are taken as outputs without forcing a level, and are left as
//! they are when the process exits, so a restart does not blip the heaters.

use log::info;
use rppal::gpio::{Gpio, OutputPin};

use crate::adapters::hardware::RelayBank;
use crate::app::ports::RelayError;
use crate::config::RelayLine;
use crate::drivers::relay::RelayDriver;

/// Claim every configured line on the SoC GPIO controller.
pub fn open_bank(relays: &[RelayLine]) -> Result<RelayBank<OutputPin>, RelayError> {
    let gpio = Gpio::new().map_err(|e| RelayError::Line {
        relay: "*".into(),
        detail: e.to_string(),
    })?;

    let mut lines = Vec::with_capacity(relays.len());
    for relay in relays {
        let pin = gpio.get(relay.pin).map_err(|e| RelayError::Line {
            relay: relay.id.clone(),
            detail: e.to_string(),
        })?;
        let mut out = pin.into_output();
        out.set_reset_on_drop(false);
        info!("GPIO: relay '{}' on BCM {}{}", relay.id, relay.pin, if relay.active_low { " (active low)" } else { "" });
        lines.push((relay.id.clone(), RelayDriver::new(out, relay.active_low)));
    }
    Ok(RelayBank::new(lines))
}
