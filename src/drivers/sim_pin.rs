//! Simulated GPIO output pin for host builds and tests.
//!
//! The pin level lives in a shared atomic so a [`SimLine`] handle can
//! inspect it or flip it from outside (manual override), and can inject
//! line faults.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::digital::{ErrorKind, ErrorType, OutputPin, StatefulOutputPin};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimPinError;

impl embedded_hal::digital::Error for SimPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug, Default)]
struct LineState {
    high: AtomicBool,
    faulted: AtomicBool,
}

/// In-memory output pin.
pub struct SimPin {
    state: Arc<LineState>,
}

/// Outside handle on a [`SimPin`].
#[derive(Clone)]
pub struct SimLine {
    state: Arc<LineState>,
}

impl SimPin {
    pub fn new(high: bool) -> Self {
        let state = Arc::new(LineState::default());
        state.high.store(high, Ordering::Relaxed);
        Self { state }
    }

    pub fn line(&self) -> SimLine {
        SimLine {
            state: Arc::clone(&self.state),
        }
    }

    fn check(&self) -> Result<(), SimPinError> {
        if self.state.faulted.load(Ordering::Relaxed) {
            Err(SimPinError)
        } else {
            Ok(())
        }
    }
}

impl SimLine {
    pub fn is_high(&self) -> bool {
        self.state.high.load(Ordering::Relaxed)
    }

    /// Change the level behind the driver's back.
    pub fn set_level(&self, high: bool) {
        self.state.high.store(high, Ordering::Relaxed);
    }

    /// Make every subsequent pin operation fail (or succeed again).
    pub fn set_faulted(&self, faulted: bool) {
        self.state.faulted.store(faulted, Ordering::Relaxed);
    }
}

impl ErrorType for SimPin {
    type Error = SimPinError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.check()?;
        self.state.high.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.check()?;
        self.state.high.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        self.check()?;
        Ok(self.state.high.load(Ordering::Relaxed))
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        self.is_set_high().map(|high| !high)
    }
}
