//! Wall-clock adapters.
//!
//! - [`SystemClock`]: host clock at millisecond resolution, matching the
//!   `precision=ms` the InfluxDB adapter writes with.
//! - [`FixedClock`]: a stopped clock for tests and replay.

use std::cell::Cell;

use chrono::{DateTime, SubsecRound, Utc};

use crate::app::ports::TimePort;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimePort for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl TimePort for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
