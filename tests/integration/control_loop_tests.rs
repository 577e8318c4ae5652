//! Integration tests for the ControlLoop → relays / telemetry pipeline.
//!
//! These run on the host and drive whole ticks through mock collaborators,
//! asserting on relay writes and on the telemetry stream in order.

use heatrelay::adapters::hardware::SimulatedLines;
use heatrelay::adapters::influx::line_protocol;
use heatrelay::adapters::memory::MemoryStore;
use heatrelay::adapters::time::{FixedClock, SystemClock};
use heatrelay::app::breaker::BreakerState;
use heatrelay::app::service::ControlLoop;
use heatrelay::config::RelayLine;
use heatrelay::control::{RelayCommand, RelayLevel};
use heatrelay::error::{Collaborator, Error};
use heatrelay::sensors::ReadingPrecision;

use crate::mock_hw::{config_for, epoch, make_loop, MockRelays, RecordingSink, RelayCall};

const AIR: &str = "DHT22_AirTemp";
const RELAY_AIR: &str = "Relay_DHT22_AirTemp";

fn air_loop(current: Option<&str>, desired: Option<&str>, level: RelayLevel) -> crate::mock_hw::TestLoop {
    let mut store = MemoryStore::new();
    if let Some(v) = current {
        store.set(AIR, v);
    }
    if let Some(v) = desired {
        store.set("DHT22_AirTempDesired", v);
    }
    let mut control = make_loop(&config_for(&[AIR]), &[AIR], store);
    control.relays_mut().set_level(AIR, level);
    control
}

// ── End-to-end scenarios ─────────────────────────────────────

#[test]
fn cold_sensor_turns_relay_on() {
    let mut control = air_loop(Some("18"), Some("22"), RelayLevel::Off);
    let report = control.tick().unwrap();

    assert_eq!(report.outcome_for(AIR).unwrap().command, RelayCommand::TurnOn);
    assert_eq!(control.relays().writes(), vec![(AIR.to_owned(), RelayLevel::On)]);
    // Observed state first, then the commanded state.
    assert_eq!(control.sink().values(RELAY_AIR), vec![0.0, 1.0]);
}

#[test]
fn hot_sensor_turns_relay_off() {
    let mut control = air_loop(Some("25"), Some("22"), RelayLevel::On);
    control.tick().unwrap();

    assert_eq!(control.relays().writes(), vec![(AIR.to_owned(), RelayLevel::Off)]);
    assert_eq!(control.sink().values(RELAY_AIR), vec![1.0, 0.0]);
}

#[test]
fn at_setpoint_only_reports_observed_state() {
    let mut control = air_loop(Some("22"), Some("22"), RelayLevel::On);
    let report = control.tick().unwrap();

    assert_eq!(report.outcome_for(AIR).unwrap().command, RelayCommand::NoOp);
    assert!(control.relays().writes().is_empty());
    assert_eq!(control.sink().values(RELAY_AIR), vec![1.0]);
}

#[test]
fn missing_values_normalize_to_zero() {
    let mut control = air_loop(None, None, RelayLevel::Off);
    let report = control.tick().unwrap();

    let outcome = report.outcome_for(AIR).unwrap();
    assert_eq!((outcome.current, outcome.desired), (0.0, 0.0));
    assert_eq!(outcome.command, RelayCommand::NoOp);
    assert!(control.relays().writes().is_empty());
    assert_eq!(control.sink().values(RELAY_AIR), vec![0.0]);
}

#[test]
fn garbage_value_is_treated_as_zero() {
    let mut control = air_loop(Some("n/a"), Some("22"), RelayLevel::Off);
    let report = control.tick().unwrap();
    assert_eq!(report.outcome_for(AIR).unwrap().current, 0.0);
    assert_eq!(report.outcome_for(AIR).unwrap().command, RelayCommand::TurnOn);
}

// ── Idempotence and external override ────────────────────────

#[test]
fn repeated_ticks_issue_one_command() {
    let mut control = air_loop(Some("18"), Some("22"), RelayLevel::Off);
    for _ in 0..3 {
        control.tick().unwrap();
    }
    assert_eq!(control.relays().writes().len(), 1);
    assert_eq!(control.sink().values(RELAY_AIR), vec![0.0, 1.0, 1.0, 1.0]);
    assert_eq!(control.stats().turned_on, 1);
}

#[test]
fn manual_override_is_seen_next_tick() {
    let mut control = air_loop(Some("18"), Some("22"), RelayLevel::Off);
    control.tick().unwrap();

    // Someone switches the heater off by hand.
    control.relays_mut().set_level(AIR, RelayLevel::Off);
    control.relays_mut().clear_calls();
    control.tick().unwrap();

    assert_eq!(
        control.relays().calls,
        vec![
            RelayCall::Read(AIR.to_owned()),
            RelayCall::Write(AIR.to_owned(), RelayLevel::On),
        ]
    );
}

// ── Sensor set ───────────────────────────────────────────────

#[test]
fn unbound_sensor_never_touches_relays_or_telemetry() {
    let store = MemoryStore::new().with("Humidity", "80").with(AIR, "22").with("DHT22_AirTempDesired", "22");
    let mut control = make_loop(&config_for(&[AIR]), &["Humidity", AIR], store);
    let report = control.tick().unwrap();

    assert_eq!(report.unbound, 1);
    assert!(control
        .relays()
        .calls
        .iter()
        .all(|c| matches!(c, RelayCall::Read(id) | RelayCall::Write(id, _) if id == AIR)));
    assert!(control.sink().events.iter().all(|e| e.measurement != "Relay_Humidity"));
    // Two reads for the bound sensor, none for Humidity.
    assert_eq!(control.store_mut().reads(), 2);
}

#[test]
fn relay_telemetry_is_not_a_sensor() {
    let control = make_loop(
        &config_for(&[AIR]),
        &[AIR, RELAY_AIR, "Relay_DS18b20_midBack", AIR],
        MemoryStore::new(),
    );
    assert_eq!(control.sensors(), [AIR.to_owned()]);
}

#[test]
fn bindings_follow_catalog_order() {
    let config = config_for(&["a", "b", "c"]);
    let store = MemoryStore::new().with("a", "1").with("aDesired", "5");
    let mut control = make_loop(&config, &["c", "a", "b"], store);
    let report = control.tick().unwrap();

    let order: Vec<&str> = report.outcomes.iter().map(|o| o.sensor_id.as_str()).collect();
    assert_eq!(order, ["c", "a", "b"]);
}

// ── Failure isolation ────────────────────────────────────────

#[test]
fn store_failure_skips_only_that_binding() {
    let config = config_for(&["a", "b"]);
    let mut store = MemoryStore::new().with("b", "10").with("bDesired", "20");
    store.fail_key("a");
    let mut control = make_loop(&config, &["a", "b"], store);
    let report = control.tick().unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].sensor_id, "a");
    assert_eq!(report.failures[0].collaborator, Collaborator::ReadingStore);
    assert_eq!(report.outcome_for("b").unwrap().command, RelayCommand::TurnOn);
    assert_eq!(control.relays().writes(), vec![("b".to_owned(), RelayLevel::On)]);
    assert!(control.sink().values("Relay_a").is_empty());
}

#[test]
fn relay_failure_skips_only_that_binding() {
    let config = config_for(&["a", "b"]);
    let store = MemoryStore::new().with("aDesired", "20").with("bDesired", "20");
    let mut control = make_loop(&config, &["a", "b"], store);
    control.relays_mut().fail("a");
    let report = control.tick().unwrap();

    assert_eq!(report.failures[0].collaborator, Collaborator::RelayOutput);
    assert_eq!(control.relays().level("b"), Some(RelayLevel::On));
    assert_eq!(control.stats().relay_failures, 1);
}

#[test]
fn telemetry_outage_does_not_block_control() {
    let mut control = air_loop(Some("18"), Some("22"), RelayLevel::Off);
    control.sink_mut().offline = true;
    let report = control.tick().unwrap();

    assert_eq!(control.relays().level(AIR), Some(RelayLevel::On));
    assert_eq!(report.telemetry_written, 0);
    assert_eq!(report.telemetry_dropped, 2);
}

#[test]
fn open_breaker_skips_store_until_cooldown_elapses() {
    let mut config = config_for(&[AIR]);
    config.breaker.failure_threshold = 1;
    config.breaker.base_cooldown_ticks = 1;
    let mut control = make_loop(&config, &[AIR], MemoryStore::new());

    control.store_mut().set_offline(true);
    control.tick().unwrap();
    assert!(matches!(
        control.breaker(Collaborator::ReadingStore).unwrap().state(),
        BreakerState::Open { .. }
    ));

    // Back online, but the breaker is still cooling down.
    control.store_mut().set_offline(false);
    control.tick().unwrap();
    assert_eq!(control.store_mut().reads(), 1);

    // Probe goes through and closes the breaker.
    let report = control.tick().unwrap();
    assert!(report.failures.is_empty());
    assert_eq!(control.breaker(Collaborator::ReadingStore).unwrap().state(), BreakerState::Closed);
    assert_eq!(control.store_mut().reads(), 3);
}

#[test]
fn store_down_too_long_is_fatal() {
    let mut config = config_for(&[AIR]);
    config.tick_interval_secs = 0;
    config.max_unavailable_ticks = 3;
    let mut control = make_loop(&config, &[AIR], MemoryStore::new());
    control.store_mut().set_offline(true);

    let Err(err) = control.run();
    assert_eq!(
        err,
        Error::Unavailable {
            collaborator: Collaborator::ReadingStore,
            ticks: 3
        }
    );
    assert_eq!(control.stats().ticks, 3);
    assert_eq!(control.breaker(Collaborator::ReadingStore).unwrap().down_streak(), 3);
}

#[test]
fn dead_relay_line_does_not_condemn_healthy_ones() {
    let mut config = config_for(&["a", "b"]);
    config.max_unavailable_ticks = 3;
    let mut store = MemoryStore::new().with("aDesired", "20");
    store.fail_key("b");
    let mut control = make_loop(&config, &["a", "b"], store);
    control.relays_mut().fail("a");

    for _ in 0..6 {
        control.tick().unwrap();
    }
    assert!(control.relay_down_streak("a").unwrap() >= 3);
    assert_eq!(control.relay_down_streak("b"), Some(0));
}

#[test]
fn every_bound_relay_down_is_fatal() {
    let mut config = config_for(&[AIR]);
    config.tick_interval_secs = 0;
    config.max_unavailable_ticks = 3;
    let mut control = make_loop(&config, &[AIR], MemoryStore::new());
    control.relays_mut().fail(AIR);

    let Err(err) = control.run();
    assert_eq!(
        err,
        Error::Unavailable {
            collaborator: Collaborator::RelayOutput,
            ticks: 3
        }
    );
}

#[test]
fn sink_outage_is_never_fatal() {
    let mut config = config_for(&[AIR]);
    config.max_unavailable_ticks = 2;
    let mut control = make_loop(&config, &[AIR], MemoryStore::new());
    control.sink_mut().offline = true;
    for _ in 0..5 {
        control.tick().unwrap();
    }
    // Breaker opened, so the sink saw fewer calls than events produced.
    assert!(control.sink().attempts < 5);
}

// ── Options ──────────────────────────────────────────────────

#[test]
fn setpoints_are_published_when_enabled() {
    let mut config = config_for(&[AIR]);
    config.publish_setpoints = true;
    let store = MemoryStore::new().with(AIR, "18").with("DHT22_AirTempDesired", "22.5");
    let mut control = make_loop(&config, &[AIR], store);
    control.tick().unwrap();

    let order: Vec<&str> = control.sink().events.iter().map(|e| e.measurement.as_str()).collect();
    assert_eq!(order, [RELAY_AIR, "DHT22_AirTempDesired", RELAY_AIR]);
    assert_eq!(control.sink().values("DHT22_AirTempDesired"), vec![22.5]);
}

#[test]
fn truncate_precision_compares_whole_numbers() {
    let store = || MemoryStore::new().with(AIR, "21.4").with("DHT22_AirTempDesired", "21.9");

    let mut exact = make_loop(&config_for(&[AIR]), &[AIR], store());
    assert_eq!(exact.tick().unwrap().outcome_for(AIR).unwrap().command, RelayCommand::TurnOn);

    let mut config = config_for(&[AIR]);
    config.reading_precision = ReadingPrecision::Truncate;
    let mut truncated = make_loop(&config, &[AIR], store());
    assert_eq!(truncated.tick().unwrap().outcome_for(AIR).unwrap().command, RelayCommand::NoOp);
}

#[test]
fn telemetry_carries_tags_and_clock_time() {
    let mut config = config_for(&[AIR]);
    config.tags.gateway = "snakePi3".into();
    let mut control = make_loop(&config, &[AIR], MemoryStore::new());
    control.tick().unwrap();

    let event = &control.sink().events[0];
    assert_eq!(event.tags.gateway, "snakePi3");
    assert_eq!(event.tags.location, "Tokyo");
    assert_eq!(event.timestamp, epoch());
}

#[test]
fn startup_level_drives_every_relay() {
    let mut control = make_loop(&config_for(&["a", "b"]), &["a", "b"], MemoryStore::new());
    control.apply_startup_level(RelayLevel::On).unwrap();
    assert_eq!(control.relays().level("a"), Some(RelayLevel::On));
    assert_eq!(control.relays().level("b"), Some(RelayLevel::On));
}

#[test]
fn commanded_state_is_stamped_after_observed_state() {
    // The clock stands still, so both points would otherwise collide.
    let mut control = air_loop(Some("18"), Some("22"), RelayLevel::Off);
    control.tick().unwrap();

    let relay_points: Vec<_> = control
        .sink()
        .events
        .iter()
        .filter(|e| e.measurement == RELAY_AIR)
        .collect();
    assert_eq!(relay_points.len(), 2);
    assert_eq!(relay_points[0].timestamp, epoch());
    assert_eq!(relay_points[1].timestamp, epoch() + chrono::Duration::milliseconds(1));
}

#[test]
fn wall_clock_points_of_one_series_never_collide() {
    let store = MemoryStore::new().with(AIR, "18").with("DHT22_AirTempDesired", "22");
    let config = config_for(&[AIR]);
    let mut control = ControlLoop::new(
        &config,
        vec![AIR.into()],
        store,
        MockRelays::new(&[AIR]),
        RecordingSink::new(),
        SystemClock,
    );
    control.tick().unwrap();

    let keys: Vec<(String, String)> = control
        .sink()
        .events
        .iter()
        .map(line_protocol)
        .map(|line| {
            // series = measurement + tags, then the field set, then time
            let mut parts = line.split(' ');
            let series = parts.next().unwrap_or_default().to_owned();
            let time = parts.nth(1).unwrap_or_default().to_owned();
            (series, time)
        })
        .collect();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].0, keys[1].0);
    assert_ne!(keys[0].1, keys[1].1);
}

// ── Through the simulated GPIO bank ──────────────────────────

#[test]
fn active_low_relay_pulls_line_low_when_on() {
    let mut config = config_for(&[AIR]);
    config.relays = vec![RelayLine {
        id: AIR.into(),
        pin: 24,
        active_low: true,
    }];
    let (bank, lines) = SimulatedLines::bank(&config.relays);
    let store = MemoryStore::new().with(AIR, "18").with("DHT22_AirTempDesired", "22");
    let mut control = ControlLoop::new(
        &config,
        vec![AIR.into()],
        store,
        bank,
        RecordingSink::new(),
        FixedClock::new(epoch()),
    );

    control.tick().unwrap();
    assert_eq!(lines.level(AIR), Some(RelayLevel::On));
    assert!(!lines.line(AIR).unwrap().is_high());

    // Forced off externally, corrected on the next tick.
    lines.force(AIR, RelayLevel::Off);
    let report = control.tick().unwrap();
    assert_eq!(report.outcome_for(AIR).unwrap().observed, RelayLevel::Off);
    assert_eq!(lines.level(AIR), Some(RelayLevel::On));
}
