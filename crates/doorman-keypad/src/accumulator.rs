//! Entry accumulation state machine.
//!
//! Turns a stream of resolved keypad symbols into completed code
//! submissions. Entries are framed `*` ... `#`; anything between
//! accumulates into the buffer, subject to the inter-key timeout. The
//! close-helper key is routed around the buffer entirely.
//!
//! # States
//!
//! - `Idle`: buffer empty, no timing marker.
//! - `Accumulating`: an entry is underway (the buffer may still be empty
//!   right after `*`).
//!
//! # Transitions
//!
//! - `*` (any state): clear the buffer, enter `Accumulating`.
//! - digit / letter: if the gap since the previous symbol exceeds the
//!   inter-key timeout, the stale buffer is discarded, the late symbol is
//!   dropped with it, and the machine returns to `Idle`; otherwise the
//!   symbol is appended.
//! - `#`: a non-empty buffer is submitted and the machine resets; an
//!   empty buffer is a no-op.
//! - close-helper key: emitted immediately, buffer and timing untouched.
//!
//! The first symbol after a reset has no timing marker to compare against
//! and is never considered too slow.

use crate::layout::Key;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Accumulator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Buffer empty, waiting for input.
    Idle,

    /// An entry is underway.
    Accumulating,
}

/// Event produced by feeding a key to the accumulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeEvent {
    /// A complete code was terminated with `#`.
    Submit(String),

    /// The close-helper shortcut was pressed.
    CloseHelper,
}

/// The entry accumulation state machine.
///
/// Single-owner, no interior locking; the access controller drives it
/// from the one event-processing context.
#[derive(Debug)]
pub struct CodeAccumulator {
    buffer: String,
    state: EntryState,
    last_key_at: Option<Instant>,
    interkey_timeout: Duration,
}

impl CodeAccumulator {
    /// Create an accumulator with the given inter-key timeout.
    #[must_use]
    pub fn new(interkey_timeout: Duration) -> Self {
        CodeAccumulator {
            buffer: String::new(),
            state: EntryState::Idle,
            last_key_at: None,
            interkey_timeout,
        }
    }

    /// Current machine state.
    #[must_use]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Feed one key at the given instant.
    ///
    /// `now` is injected rather than sampled so the controller can stamp
    /// all decisions for one input consistently (and so tests can replay
    /// sequences with exact gaps).
    pub fn handle_key(&mut self, key: Key, now: Instant) -> Option<CodeEvent> {
        match key {
            Key::CLOSE_HELPER => Some(CodeEvent::CloseHelper),
            Key::Star => {
                self.buffer.clear();
                self.state = EntryState::Accumulating;
                self.last_key_at = Some(now);
                None
            }
            Key::Hash => {
                if self.buffer.is_empty() {
                    return None;
                }
                let code = std::mem::take(&mut self.buffer);
                info!(len = code.len(), "entry complete");
                self.reset();
                Some(CodeEvent::Submit(code))
            }
            Key::Digit(_) | Key::Letter(_) => {
                self.push_symbol(key, now);
                None
            }
        }
    }

    fn push_symbol(&mut self, key: Key, now: Instant) {
        if let Some(last) = self.last_key_at {
            let gap = now.saturating_duration_since(last);
            if gap > self.interkey_timeout {
                info!(
                    gap_ms = gap.as_millis() as u64,
                    discarded = self.buffer.len(),
                    "inter-key timeout, entry discarded"
                );
                self.reset();
                return;
            }
        }

        self.buffer.push(key.as_char());
        self.state = EntryState::Accumulating;
        self.last_key_at = Some(now);
        debug!(len = self.buffer.len(), "symbol accumulated");
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.state = EntryState::Idle;
        self.last_key_at = None;
    }
}
