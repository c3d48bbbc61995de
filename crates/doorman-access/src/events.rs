//! Controller event type.
//!
//! Everything that can change controller state arrives as one of these,
//! over one channel, processed by one owner. Timer tasks send
//! `TestModeDeadline` and `PurgeExpired` back into the channel instead of
//! mutating anything themselves.

use doorman_keypad::Key;

/// An input for the access controller's single event-processing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A resolved keypad symbol.
    Key(Key),

    /// The test-mode auto-deactivation deadline fired.
    ///
    /// Carries the arming generation that scheduled it; the controller
    /// ignores the event if test mode has been re-armed (or disarmed)
    /// since.
    TestModeDeadline { generation: u64 },

    /// Periodic sweep of expired temporary entries.
    PurgeExpired,
}
