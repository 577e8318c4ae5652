//! Per-collaborator circuit breaker.
//!
//! Every call the control loop makes to a collaborator goes through a
//! [`CircuitBreaker`].  After `failure_threshold` consecutive failures the
//! breaker opens and further calls are refused without touching the
//! network, so a dead dependency costs one timeout per call only until it
//! trips.  While open, the breaker counts down its cooldown in ticks; then
//! it lets a single probe through (half-open).  A failed probe re-opens it
//! with a doubled cooldown (1 → 2 → 4 … capped), a successful one closes it.
//!
//! The breaker also keeps a per-tick availability record.  A tick in which
//! a collaborator produced no successful call but had at least one failed
//! or refused call extends its *down streak*; the loop treats a long
//! enough streak on the reading store as fatal.  Relay outputs are judged
//! per line by the loop instead, since one dead relay must not condemn
//! the others.

use log::{info, warn};

use crate::config::BreakerConfig;
use crate::error::Collaborator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    /// Refusing calls; `remaining_ticks` full ticks left before probing.
    Open { remaining_ticks: u32 },
    /// Cooldown elapsed; the next call is a probe.
    HalfOpen,
}

pub struct CircuitBreaker {
    collaborator: Collaborator,
    config: BreakerConfig,
    state: BreakerState,
    consecutive_failures: u32,
    /// Cooldown applied on the next trip.
    next_cooldown: u32,
    trips: u32,
    // Per-tick accounting.
    tick_successes: u32,
    tick_failures: u32,
    down_streak: u32,
}

impl CircuitBreaker {
    pub fn new(collaborator: Collaborator, config: BreakerConfig) -> Self {
        Self {
            collaborator,
            config,
            state: BreakerState::Closed,
            consecutive_failures: 0,
            next_cooldown: config.base_cooldown_ticks,
            trips: 0,
            tick_successes: 0,
            tick_failures: 0,
            down_streak: 0,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Times this breaker has opened since startup.
    pub fn trips(&self) -> u32 {
        self.trips
    }

    /// Consecutive ticks without a successful call.
    pub fn down_streak(&self) -> u32 {
        self.down_streak
    }

    // ── Tick lifecycle ────────────────────────────────────────

    /// Advance the cooldown and reset the per-tick record.
    pub fn begin_tick(&mut self) {
        self.tick_successes = 0;
        self.tick_failures = 0;
        if let BreakerState::Open { remaining_ticks } = self.state {
            if remaining_ticks == 0 {
                info!("{}: cooldown elapsed, probing", self.collaborator);
                self.state = BreakerState::HalfOpen;
            } else {
                self.state = BreakerState::Open {
                    remaining_ticks: remaining_ticks - 1,
                };
            }
        }
    }

    /// Close the per-tick record and return the updated down streak.
    /// Ticks with no calls at all leave the streak unchanged.
    pub fn end_tick(&mut self) -> u32 {
        if self.tick_successes > 0 {
            self.down_streak = 0;
        } else if self.tick_failures > 0 {
            self.down_streak = self.down_streak.saturating_add(1);
        }
        self.down_streak
    }

    // ── Call gating ───────────────────────────────────────────

    /// Whether a call may go out now.  A refusal counts against the tick.
    pub fn allow(&mut self) -> bool {
        match self.state {
            BreakerState::Closed | BreakerState::HalfOpen => true,
            BreakerState::Open { .. } => {
                self.tick_failures += 1;
                false
            }
        }
    }

    pub fn record_success(&mut self) {
        self.tick_successes += 1;
        self.consecutive_failures = 0;
        if self.state != BreakerState::Closed {
            info!("{}: recovered, breaker closed", self.collaborator);
            self.state = BreakerState::Closed;
            self.next_cooldown = self.config.base_cooldown_ticks;
        }
    }

    pub fn record_failure(&mut self) {
        self.tick_failures += 1;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        match self.state {
            BreakerState::HalfOpen => self.trip(),
            BreakerState::Closed if self.consecutive_failures >= self.config.failure_threshold => {
                self.trip();
            }
            _ => {}
        }
    }

    fn trip(&mut self) {
        let cooldown = self.next_cooldown;
        warn!(
            "{}: breaker open after {} consecutive failures (cooldown {} ticks)",
            self.collaborator, self.consecutive_failures, cooldown
        );
        self.state = BreakerState::Open {
            remaining_ticks: cooldown,
        };
        self.next_cooldown = cooldown
            .saturating_mul(2)
            .max(1)
            .min(self.config.max_cooldown_ticks);
        self.trips += 1;
    }
}
