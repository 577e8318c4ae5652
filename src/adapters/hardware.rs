//! Hardware adapter: bridges relay output lines to the domain port.
//!
//! [`RelayBank`] owns one [`RelayDriver`] per configured relay and exposes
//! them by id through [`RelayOutputPort`].  This is the only module in the
//! system that touches output pins.  Host builds use simulated pins; the
//! `rpi` feature swaps in real SoC GPIO lines.

use embedded_hal::digital::{Error as _, StatefulOutputPin};

use crate::app::ports::{RelayError, RelayOutputPort};
use crate::config::RelayLine;
use crate::control::RelayLevel;
use crate::drivers::relay::RelayDriver;
use crate::drivers::sim_pin::{SimLine, SimPin};

/// Concrete adapter that maps relay ids to output lines.
pub struct RelayBank<P> {
    lines: Vec<(String, RelayDriver<P>)>,
}

impl<P: StatefulOutputPin> RelayBank<P> {
    pub fn new(lines: Vec<(String, RelayDriver<P>)>) -> Self {
        Self { lines }
    }

    fn driver(&mut self, relay_id: &str) -> Result<&mut RelayDriver<P>, RelayError> {
        self.lines
            .iter_mut()
            .find(|(id, _)| id == relay_id)
            .map(|(_, driver)| driver)
            .ok_or_else(|| RelayError::UnknownRelay(relay_id.to_owned()))
    }
}

impl RelayBank<SimPin> {
    /// Bank of simulated lines, all released (relay off).
    pub fn simulated(relays: &[RelayLine]) -> Self {
        let lines = relays
            .iter()
            .map(|r| {
                // Released means electrically high on an active-low board.
                let pin = SimPin::new(r.active_low);
                (r.id.clone(), RelayDriver::new(pin, r.active_low))
            })
            .collect();
        Self::new(lines)
    }
}

impl<P> RelayBank<P> {
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ── RelayOutputPort implementation ────────────────────────────

impl<P: StatefulOutputPin> RelayOutputPort for RelayBank<P> {
    fn read(&mut self, relay_id: &str) -> Result<RelayLevel, RelayError> {
        self.driver(relay_id)?.level().map_err(|e| RelayError::Line {
            relay: relay_id.to_owned(),
            detail: format!("read failed ({:?})", e.kind()),
        })
    }

    fn write(&mut self, relay_id: &str, level: RelayLevel) -> Result<(), RelayError> {
        self.driver(relay_id)?.set(level).map_err(|e| RelayError::Line {
            relay: relay_id.to_owned(),
            detail: format!("write failed ({:?})", e.kind()),
        })
    }

    fn relay_ids(&self) -> Vec<String> {
        self.lines.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Outside handles on a simulated bank, for tests and `--dry-run` inspection.
pub struct SimulatedLines {
    lines: Vec<(String, SimLine, bool)>,
}

impl SimulatedLines {
    /// Build a simulated bank together with handles on its lines.
    pub fn bank(relays: &[RelayLine]) -> (RelayBank<SimPin>, Self) {
        let mut drivers = Vec::with_capacity(relays.len());
        let mut lines = Vec::with_capacity(relays.len());
        for r in relays {
            let pin = SimPin::new(r.active_low);
            lines.push((r.id.clone(), pin.line(), r.active_low));
            drivers.push((r.id.clone(), RelayDriver::new(pin, r.active_low)));
        }
        (RelayBank::new(drivers), Self { lines })
    }

    pub fn line(&self, relay_id: &str) -> Option<&SimLine> {
        self.lines.iter().find(|(id, ..)| id == relay_id).map(|(_, line, _)| line)
    }

    /// Logical level of `relay_id` as seen from outside.
    pub fn level(&self, relay_id: &str) -> Option<RelayLevel> {
        self.lines
            .iter()
            .find(|(id, ..)| id == relay_id)
            .map(|(_, line, active_low)| RelayLevel::from(line.is_high() != *active_low))
    }

    /// Flip `relay_id` to `level` as an operator would.
    pub fn force(&self, relay_id: &str, level: RelayLevel) {
        if let Some((_, line, active_low)) = self.lines.iter().find(|(id, ..)| id == relay_id) {
            line.set_level(level.is_on() != *active_low);
        }
    }
}
