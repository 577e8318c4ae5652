//! Tick reports and runtime statistics.
//!
//! Every [`ControlLoop::tick`](crate::app::service::ControlLoop::tick)
//! returns a [`TickReport`] describing what happened to each bound sensor.
//! [`LoopStats`] folds those reports into counters that are logged as a
//! `STATS |` line every `summary_every_ticks` ticks.

use crate::control::{RelayCommand, RelayLevel};
use crate::error::Collaborator;

/// What the loop did for one bound sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingOutcome {
    pub sensor_id: String,
    pub relay_id: String,
    pub current: f64,
    pub desired: f64,
    /// Level read from the line before deciding.
    pub observed: RelayLevel,
    pub command: RelayCommand,
}

/// A bound sensor skipped this tick because a collaborator failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingFailure {
    pub sensor_id: String,
    pub collaborator: Collaborator,
    pub reason: String,
}

/// Result of one control tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// 1-based tick number.
    pub tick: u64,
    pub outcomes: Vec<BindingOutcome>,
    pub failures: Vec<BindingFailure>,
    /// Catalog sensors without a binding (ignored).
    pub unbound: usize,
    pub telemetry_written: u32,
    /// Events not written (sink error or breaker open).
    pub telemetry_dropped: u32,
}

impl TickReport {
    /// Relay commands actually issued this tick, as `(relay, command)`.
    pub fn commands(&self) -> impl Iterator<Item = (&str, RelayCommand)> {
        self.outcomes
            .iter()
            .filter(|o| o.command != RelayCommand::NoOp)
            .map(|o| (o.relay_id.as_str(), o.command))
    }

    pub fn outcome_for(&self, sensor_id: &str) -> Option<&BindingOutcome> {
        self.outcomes.iter().find(|o| o.sensor_id == sensor_id)
    }
}

/// Cumulative counters since startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub turned_on: u64,
    pub turned_off: u64,
    pub store_failures: u64,
    pub relay_failures: u64,
    pub telemetry_written: u64,
    pub telemetry_dropped: u64,
}

impl LoopStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        for (_, command) in report.commands() {
            match command {
                RelayCommand::TurnOn => self.turned_on += 1,
                RelayCommand::TurnOff => self.turned_off += 1,
                RelayCommand::NoOp => {}
            }
        }
        for failure in &report.failures {
            match failure.collaborator {
                Collaborator::ReadingStore => self.store_failures += 1,
                Collaborator::RelayOutput => self.relay_failures += 1,
                Collaborator::EventSink | Collaborator::SensorCatalog => {}
            }
        }
        self.telemetry_written += u64::from(report.telemetry_written);
        self.telemetry_dropped += u64::from(report.telemetry_dropped);
    }

    pub fn summary_line(&self) -> String {
        format!(
            "STATS | ticks={} on={} off={} store_fail={} relay_fail={} telem={}/{} dropped",
            self.ticks,
            self.turned_on,
            self.turned_off,
            self.store_failures,
            self.relay_failures,
            self.telemetry_written,
            self.telemetry_dropped,
        )
    }
}
