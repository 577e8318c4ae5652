//! Control loop: the hexagonal core.
//!
//! [`ControlLoop`] owns its collaborators (injected at construction) and
//! a circuit breaker for each of them.  Every tick it walks the sensor
//! catalog in discovery order and, for each sensor bound to a relay:
//!
//! 1. reads the current value and the setpoint (missing → 0),
//! 2. reads the relay line and records its observed level,
//! 3. decides, and only if the decision changes the line, writes the
//!    relay and records the commanded level.
//!
//! ```text
//!  ReadingStore ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                   │      ControlLoop        │
//!  RelayOutput  ◀──▶│  decide · breakers      │
//!                   └────────────────────────┘
//! ```
//!
//! The relay level is never cached between ticks: someone flipping a
//! relay by hand is seen on the next tick.  Failures are isolated per
//! binding; telemetry is best-effort and never blocks relay control.
//!
//! Relay availability is judged per line.  The loop only gives up on the
//! relay outputs once every bound relay has been down for
//! `max_unavailable_ticks`; one dead line is skipped and logged each tick.

use std::collections::HashMap;
use std::convert::Infallible;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::config::{RelayBinding, SystemConfig};
use crate::control::{decide, RelayLevel};
use crate::diagnostics::{BindingFailure, BindingOutcome, LoopStats, TickReport};
use crate::error::{Collaborator, Error, Result};
use crate::sensors::{self, ReadingPrecision};

use super::breaker::CircuitBreaker;
use super::events::{Tags, TelemetryEvent};
use super::ports::{EventSink, ReadingStore, RelayError, RelayOutputPort, SensorCatalog, TimePort};

// ───────────────────────────────────────────────────────────────
// Startup
// ───────────────────────────────────────────────────────────────

const MAX_DISCOVERY_BACKOFF: Duration = Duration::from_secs(60);

/// List the catalog once, retrying with exponential backoff
/// (`base_delay`, doubling, capped at 60 s) up to `attempts` times.
///
/// Returns the filtered sensor set: relay telemetry and duplicates removed.
pub fn discover_sensors(
    catalog: &mut impl SensorCatalog,
    attempts: u32,
    base_delay: Duration,
) -> Result<Vec<String>> {
    let attempts = attempts.max(1);
    let mut delay = base_delay;
    let mut attempt = 1;
    loop {
        match catalog.list() {
            Ok(names) => {
                let sensors = sensors::sensor_set(names);
                info!("Catalog: {} sensors discovered", sensors.len());
                return Ok(sensors);
            }
            Err(e) if attempt < attempts => {
                warn!(
                    "Catalog: attempt {}/{} failed ({}), retrying in {:?}",
                    attempt, attempts, e, delay
                );
                std::thread::sleep(delay);
                delay = (delay * 2).min(MAX_DISCOVERY_BACKOFF);
                attempt += 1;
            }
            Err(e) => {
                log::error!("Catalog: giving up after {} attempts ({})", attempts, e);
                return Err(e.into());
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ControlLoop
// ───────────────────────────────────────────────────────────────

pub struct ControlLoop<S, R, E, T> {
    store: S,
    relays: R,
    sink: E,
    clock: T,

    /// Sensor set fixed at startup, in discovery order.
    sensors: Vec<String>,
    bindings: Vec<RelayBinding>,
    tags: Tags,
    precision: ReadingPrecision,
    publish_setpoints: bool,
    tick_interval: Duration,
    max_unavailable_ticks: u32,
    summary_every_ticks: u64,

    store_breaker: CircuitBreaker,
    relay_breaker: CircuitBreaker,
    sink_breaker: CircuitBreaker,
    /// Consecutive failed ticks per bound relay.
    relay_down: HashMap<String, u32>,
    /// Per-tick relay record: `true` once a call on the line succeeded.
    relay_tick: HashMap<String, bool>,
    stats: LoopStats,
}

impl<S, R, E, T> ControlLoop<S, R, E, T>
where
    S: ReadingStore,
    R: RelayOutputPort,
    E: EventSink,
    T: TimePort,
{
    /// Build the loop from a validated config and the discovered sensors.
    pub fn new(
        config: &SystemConfig,
        sensors: Vec<String>,
        store: S,
        relays: R,
        sink: E,
        clock: T,
    ) -> Self {
        let sensors = sensors::sensor_set(sensors);
        for b in &config.bindings {
            if !sensors.contains(&b.sensor_id) {
                warn!(
                    "Binding {} -> {} has no catalog entry; relay will not be controlled",
                    b.sensor_id, b.relay_id
                );
            }
        }

        Self {
            store,
            relays,
            sink,
            clock,
            sensors,
            bindings: config.bindings.clone(),
            tags: config.tags.clone(),
            precision: config.reading_precision,
            publish_setpoints: config.publish_setpoints,
            tick_interval: config.tick_interval(),
            max_unavailable_ticks: config.max_unavailable_ticks,
            summary_every_ticks: config.summary_every_ticks,
            store_breaker: CircuitBreaker::new(Collaborator::ReadingStore, config.breaker),
            relay_breaker: CircuitBreaker::new(Collaborator::RelayOutput, config.breaker),
            sink_breaker: CircuitBreaker::new(Collaborator::EventSink, config.breaker),
            relay_down: config.bindings.iter().map(|b| (b.relay_id.clone(), 0)).collect(),
            relay_tick: HashMap::new(),
            stats: LoopStats::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every relay the port knows about to `level`.
    pub fn apply_startup_level(&mut self, level: RelayLevel) -> core::result::Result<(), RelayError> {
        for relay_id in self.relays.relay_ids() {
            self.relays.write(&relay_id, level)?;
        }
        info!("Relays: all driven {} at startup", level);
        Ok(())
    }

    /// Tick forever, sleeping `tick_interval` after each tick.
    /// Only returns when a collaborator is declared unavailable.
    pub fn run(&mut self) -> Result<Infallible> {
        info!(
            "Control loop running: {} sensors, {} bindings, every {:?}",
            self.sensors.len(),
            self.bindings.len(),
            self.tick_interval
        );
        loop {
            self.tick()?;
            std::thread::sleep(self.tick_interval);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one pass over every catalog sensor.
    pub fn tick(&mut self) -> Result<TickReport> {
        self.store_breaker.begin_tick();
        self.relay_breaker.begin_tick();
        self.sink_breaker.begin_tick();
        self.relay_tick.clear();

        let mut report = TickReport {
            tick: self.stats.ticks + 1,
            ..TickReport::default()
        };

        for i in 0..self.sensors.len() {
            let sensor_id = &self.sensors[i];
            let Some(binding) = self.bindings.iter().find(|b| &b.sensor_id == sensor_id).cloned()
            else {
                report.unbound += 1;
                continue;
            };

            match self.process_binding(&binding, &mut report) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(failure) => {
                    warn!(
                        "TICK | {} skipped: {} {}",
                        failure.sensor_id, failure.collaborator, failure.reason
                    );
                    report.failures.push(failure);
                }
            }
        }

        let store_down = self.store_breaker.end_tick();
        self.relay_breaker.end_tick();
        let relay_down = self.end_relay_tick();
        self.sink_breaker.end_tick();
        self.stats.absorb(&report);

        debug!(
            "TICK | #{} evaluated={} failed={} unbound={}",
            report.tick,
            report.outcomes.len(),
            report.failures.len(),
            report.unbound
        );
        if self.summary_every_ticks > 0 && self.stats.ticks % self.summary_every_ticks == 0 {
            info!("{}", self.stats.summary_line());
        }

        for (collaborator, down) in [
            (Collaborator::ReadingStore, store_down),
            (Collaborator::RelayOutput, relay_down),
        ] {
            if down >= self.max_unavailable_ticks {
                log::error!("{} down for {} ticks, stopping control loop", collaborator, down);
                return Err(Error::Unavailable {
                    collaborator,
                    ticks: down,
                });
            }
        }

        Ok(report)
    }

    fn process_binding(
        &mut self,
        binding: &RelayBinding,
        report: &mut TickReport,
    ) -> core::result::Result<BindingOutcome, BindingFailure> {
        let sensor_id = binding.sensor_id.as_str();
        let relay_id = binding.relay_id.as_str();

        let current = self.read_value(sensor_id, sensor_id)?;
        let desired = self.read_value(sensor_id, &sensors::desired_key(sensor_id))?;

        let observed = self.read_relay(sensor_id, relay_id)?;
        let observed_at = self.clock.now_utc();
        let event = TelemetryEvent::relay_state(relay_id, observed, &self.tags, observed_at);
        self.emit(&event, report);

        if self.publish_setpoints {
            let event = TelemetryEvent::setpoint(sensor_id, desired, &self.tags, self.clock.now_utc());
            self.emit(&event, report);
        }

        let command = decide(current, desired, observed);
        if let Some(target) = command.target_level() {
            self.write_relay(sensor_id, relay_id, target)?;
            info!(
                "RELAY | {} {} -> {} (current {} desired {})",
                relay_id, observed, target, current, desired
            );
            let event = TelemetryEvent::relay_state(relay_id, target, &self.tags, self.after(observed_at));
            self.emit(&event, report);
        }

        debug!(
            "Sensor {}: currently {}, desired {}, relay {} ({:?})",
            sensor_id, current, desired, observed, command
        );

        Ok(BindingOutcome {
            sensor_id: sensor_id.to_owned(),
            relay_id: relay_id.to_owned(),
            current,
            desired,
            observed,
            command,
        })
    }

    // ── Guarded collaborator calls ────────────────────────────

    fn read_value(&mut self, sensor_id: &str, key: &str) -> core::result::Result<f64, BindingFailure> {
        if !self.store_breaker.allow() {
            return Err(failure(sensor_id, Collaborator::ReadingStore, "breaker open"));
        }
        match self.store.get(key) {
            Ok(raw) => {
                self.store_breaker.record_success();
                Ok(sensors::normalize(raw.as_deref(), self.precision))
            }
            Err(e) => {
                self.store_breaker.record_failure();
                Err(failure(sensor_id, Collaborator::ReadingStore, &e.to_string()))
            }
        }
    }

    fn read_relay(&mut self, sensor_id: &str, relay_id: &str) -> core::result::Result<RelayLevel, BindingFailure> {
        if !self.relay_breaker.allow() {
            self.note_relay(relay_id, false);
            return Err(failure(sensor_id, Collaborator::RelayOutput, "breaker open"));
        }
        match self.relays.read(relay_id) {
            Ok(level) => {
                self.relay_breaker.record_success();
                self.note_relay(relay_id, true);
                Ok(level)
            }
            Err(e) => {
                self.relay_breaker.record_failure();
                self.note_relay(relay_id, false);
                Err(failure(sensor_id, Collaborator::RelayOutput, &e.to_string()))
            }
        }
    }

    fn write_relay(
        &mut self,
        sensor_id: &str,
        relay_id: &str,
        level: RelayLevel,
    ) -> core::result::Result<(), BindingFailure> {
        if !self.relay_breaker.allow() {
            self.note_relay(relay_id, false);
            return Err(failure(sensor_id, Collaborator::RelayOutput, "breaker open"));
        }
        match self.relays.write(relay_id, level) {
            Ok(()) => {
                self.relay_breaker.record_success();
                self.note_relay(relay_id, true);
                Ok(())
            }
            Err(e) => {
                self.relay_breaker.record_failure();
                self.note_relay(relay_id, false);
                Err(failure(sensor_id, Collaborator::RelayOutput, &e.to_string()))
            }
        }
    }

    fn note_relay(&mut self, relay_id: &str, ok: bool) {
        let seen = self.relay_tick.entry(relay_id.to_owned()).or_insert(false);
        *seen |= ok;
    }

    /// Fold this tick's relay record into the per-line streaks.  Returns
    /// the number of ticks the relay outputs have been down as a whole:
    /// the shortest streak among bound relays.
    fn end_relay_tick(&mut self) -> u32 {
        for (relay_id, ok) in self.relay_tick.drain() {
            if let Some(streak) = self.relay_down.get_mut(&relay_id) {
                *streak = if ok { 0 } else { streak.saturating_add(1) };
            }
        }
        self.relay_down.values().copied().min().unwrap_or(0)
    }

    /// Clock reading strictly later than `earlier`, so two points of one
    /// series never share a timestamp.
    fn after(&self, earlier: DateTime<Utc>) -> DateTime<Utc> {
        self.clock
            .now_utc()
            .max(earlier + chrono::Duration::milliseconds(1))
    }

    fn emit(&mut self, event: &TelemetryEvent, report: &mut TickReport) {
        if !self.sink_breaker.allow() {
            report.telemetry_dropped += 1;
            debug!("Telemetry {} dropped: sink breaker open", event.measurement);
            return;
        }
        match self.sink.record(event) {
            Ok(()) => {
                self.sink_breaker.record_success();
                report.telemetry_written += 1;
            }
            Err(e) => {
                self.sink_breaker.record_failure();
                report.telemetry_dropped += 1;
                warn!("Telemetry {} dropped: {}", event.measurement, e);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Sensor set walked every tick.
    pub fn sensors(&self) -> &[String] {
        &self.sensors
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Consecutive down ticks of `relay_id`, `None` if it is not bound.
    pub fn relay_down_streak(&self, relay_id: &str) -> Option<u32> {
        self.relay_down.get(relay_id).copied()
    }

    pub fn breaker(&self, collaborator: Collaborator) -> Option<&CircuitBreaker> {
        match collaborator {
            Collaborator::ReadingStore => Some(&self.store_breaker),
            Collaborator::RelayOutput => Some(&self.relay_breaker),
            Collaborator::EventSink => Some(&self.sink_breaker),
            Collaborator::SensorCatalog => None,
        }
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn relays(&self) -> &R {
        &self.relays
    }

    pub fn relays_mut(&mut self) -> &mut R {
        &mut self.relays
    }

    pub fn sink(&self) -> &E {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }
}

fn failure(sensor_id: &str, collaborator: Collaborator, reason: &str) -> BindingFailure {
    BindingFailure {
        sensor_id: sensor_id.to_owned(),
        collaborator,
        reason: reason.to_owned(),
    }
}
