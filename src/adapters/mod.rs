//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements       | Connects to                  |
//! |---------------|------------------|------------------------------|
//! | `config_file` | ConfigPort       | JSON file on disk            |
//! | `hardware`    | RelayOutputPort  | GPIO lines (rppal or sim)    |
//! | `influx`      | EventSink        | InfluxDB 1.x `/write`        |
//! |               | SensorCatalog    | InfluxDB 1.x `/query`        |
//! | `log_sink`    | EventSink        | Log output                   |
//! | `memory`      | ReadingStore     | In-process map (sim / tests) |
//! |               | SensorCatalog    | Fixed list                   |
//! | `redis_store` | ReadingStore     | Redis `GET`                  |
//! | `time`        | TimePort         | Host clock / fixed instant   |

pub mod config_file;
pub mod hardware;
pub mod influx;
pub mod log_sink;
pub mod memory;
pub mod redis_store;
pub mod time;
