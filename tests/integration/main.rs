//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host with no Redis,
//! InfluxDB or GPIO required.

mod control_loop_tests;
mod startup_tests;
