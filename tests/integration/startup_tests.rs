//! Startup path: config file → catalog discovery → first tick.

use std::time::Duration;

use heatrelay::adapters::config_file::JsonConfigFile;
use heatrelay::adapters::memory::{MemoryStore, StaticCatalog};
use heatrelay::app::ports::ConfigPort;
use heatrelay::app::service::discover_sensors;
use heatrelay::control::RelayLevel;

use crate::mock_hw::make_loop;

const CONFIG: &str = r#"{
    "bindings": [
        { "sensor_id": "DS18b20_hotZoneMat", "relay_id": "mat" },
        { "sensor_id": "DHT22_AirTemp", "relay_id": "lamp" }
    ],
    "relays": [
        { "id": "mat", "pin": 17 },
        { "id": "lamp", "pin": 24, "active_low": true }
    ],
    "tick_interval_secs": 30,
    "tags": { "gateway": "snakePi2", "location": "Tokyo" }
}"#;

#[test]
fn file_config_drives_first_tick() {
    let path = std::env::temp_dir().join(format!("heatrelay-startup-{}.json", std::process::id()));
    std::fs::write(&path, CONFIG).unwrap();
    let config = JsonConfigFile::new(&path).load().unwrap();
    std::fs::remove_file(&path).ok();

    let mut catalog = StaticCatalog::new([
        "DHT22_AirTemp",
        "Relay_lamp",
        "DS18b20_hotZoneMat",
        "Humidity",
        "DHT22_AirTempDesired",
    ]);
    let sensors = discover_sensors(&mut catalog, 1, Duration::ZERO).unwrap();
    assert_eq!(sensors.len(), 4);

    let store = MemoryStore::new()
        .with("DHT22_AirTemp", "21.0")
        .with("DHT22_AirTempDesired", "26.0")
        .with("DS18b20_hotZoneMat", "33.5")
        .with("DS18b20_hotZoneMatDesired", "32");
    let names: Vec<&str> = sensors.iter().map(String::as_str).collect();
    let mut control = make_loop(&config, &names, store);
    control.relays_mut().set_level("mat", RelayLevel::On);

    let report = control.tick().unwrap();
    assert_eq!(report.unbound, 2);
    assert_eq!(
        control.relays().writes(),
        vec![("lamp".to_owned(), RelayLevel::On), ("mat".to_owned(), RelayLevel::Off)]
    );
    assert_eq!(control.tick_interval(), Duration::from_secs(30));
}
