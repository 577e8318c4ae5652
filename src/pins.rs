//! GPIO pin assignments for the four-channel relay HAT.
//!
//! Single source of truth for the default relay map; config files only
//! need a `relays` section when the board is wired differently.
//!
//! Pin numbers are BCM (Broadcom SoC) numbers, not header positions.

// ---------------------------------------------------------------------------
// Relay channels
// ---------------------------------------------------------------------------

/// R1: hot-zone heat mat.
pub const RELAY_1_GPIO: u8 = 17;
/// R2: heat lamp (air temperature).
pub const RELAY_2_GPIO: u8 = 24;
/// R3: side and bottom heat mats.
pub const RELAY_3_GPIO: u8 = 8;
/// R4: light switch (no sensor bound).
pub const RELAY_4_GPIO: u8 = 7;

/// Default `(relay id, pin)` map.  The first three ids double as the
/// sensor ids that drive them.
pub const DEFAULT_RELAYS: [(&str, u8); 4] = [
    ("DS18b20_hotZoneMat", RELAY_1_GPIO),
    ("DHT22_AirTemp", RELAY_2_GPIO),
    ("DS18b20_midBack", RELAY_3_GPIO),
    ("r4", RELAY_4_GPIO),
];

/// Sensors bound to a relay of the same name in the default map.
pub const DEFAULT_BOUND_SENSORS: [&str; 3] =
    ["DS18b20_hotZoneMat", "DHT22_AirTemp", "DS18b20_midBack"];

/// Highest BCM GPIO number on the 40-pin header.
pub const MAX_BCM_GPIO: u8 = 27;
