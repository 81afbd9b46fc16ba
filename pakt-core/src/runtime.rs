// pakt-core/src/runtime.rs

//! Process state shared between the command flow and the interrupt handler.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::errors::{PaktError, Result};
use crate::exit_code::ExitCode;

/// State an interrupt handler may observe while a command is running.
#[derive(Debug, Default)]
pub struct RuntimeState {
    waiting_for_input: AtomicBool,
    exit_requested: AtomicUsize,
}

/// What the interrupt handler should do with a received signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    /// Leave the process now.
    ExitNow,
    /// Remembered; the next [`RuntimeState::immediate_exit_check`] ends the run.
    Deferred,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waiting_for_input(&self) -> bool {
        self.waiting_for_input.load(Ordering::SeqCst)
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested.load(Ordering::SeqCst) > 0
    }

    /// Marks the process as blocked on user input until the guard is dropped.
    pub fn begin_input(&self) -> WaitingForInput<'_> {
        self.waiting_for_input.store(true, Ordering::SeqCst);
        WaitingForInput { state: self }
    }

    /// Records an interrupt. A prompt waiting for input, or a repeated
    /// interrupt, means the process should end immediately.
    pub fn on_interrupt(&self) -> InterruptAction {
        let previous = self.exit_requested.fetch_add(1, Ordering::SeqCst);
        if self.waiting_for_input() || previous > 0 {
            InterruptAction::ExitNow
        } else {
            InterruptAction::Deferred
        }
    }

    /// Fails with an [`ExitCode::OnSignal`] exit request if an interrupt is pending.
    pub fn immediate_exit_check(&self) -> Result<()> {
        if self.exit_requested() {
            warn!("Exit request pending, leaving.");
            return Err(PaktError::exit_request(
                ExitCode::OnSignal,
                "Interrupted by user request.",
            ));
        }
        Ok(())
    }
}

/// Clears the "waiting for input" flag when dropped.
#[must_use = "the flag is cleared as soon as the guard is dropped"]
pub struct WaitingForInput<'a> {
    state: &'a RuntimeState,
}

impl Drop for WaitingForInput<'_> {
    fn drop(&mut self) {
        self.state.waiting_for_input.store(false, Ordering::SeqCst);
        debug!("No longer waiting for input.");
    }
}
