//! Core constants for the doorman access controller.
//!
//! This module defines the policy constants used throughout the controller:
//! keypad geometry, entry-code constraints, and the default values for every
//! configurable threshold. Config files may override the thresholds; the
//! defaults here match the behavior the controller was tuned for in the
//! field.
//!
//! # Usage
//!
//! ```
//! use doorman_core::constants::*;
//! use std::time::Duration;
//!
//! let timeout = Duration::from_millis(DEFAULT_INTERKEY_TIMEOUT_MS);
//! assert_eq!(timeout.as_secs(), 4);
//! ```

// ============================================================================
// Keypad Geometry
// ============================================================================

/// Number of rows on the matrix keypad.
pub const KEYPAD_ROWS: usize = 4;

/// Number of columns on the matrix keypad.
pub const KEYPAD_COLS: usize = 4;

// ============================================================================
// Entry Code Constraints
// ============================================================================

/// Minimum entry code length (characters).
///
/// A single symbol is a valid (if unwise) code; the registry performs no
/// strength checks beyond format.
pub const MIN_CODE_LENGTH: usize = 1;

/// Maximum entry code length (characters).
///
/// Codes longer than this are rejected at load time. The bound exists to
/// keep the accumulating buffer and notification text predictable.
pub const MAX_CODE_LENGTH: usize = 20;

/// Length of generated temporary codes (digits).
pub const TEMP_CODE_LENGTH: usize = 5;

// ============================================================================
// Timing Defaults
// ============================================================================

/// Default inter-key timeout (milliseconds).
///
/// If the gap between two symbols of an entry exceeds this, the partial
/// entry is discarded and the late symbol is dropped with it.
///
/// # Value: 4000ms (4 seconds)
pub const DEFAULT_INTERKEY_TIMEOUT_MS: u64 = 4000;

/// Test-mode auto-deactivation delay (milliseconds).
///
/// Test mode always self-expires after this long; the duration is fixed
/// rather than per-entry so a forgotten test session cannot leave the
/// relay disabled indefinitely.
///
/// # Value: 120000ms (2 minutes)
pub const TESTMODE_TIMEOUT_MS: u64 = 120_000;

/// Default relay pulse duration (milliseconds).
///
/// The relay output is held active for this long per trigger, then
/// released. Matches the momentary-contact input of common garage door
/// openers.
///
/// # Value: 500ms
pub const DEFAULT_RELAY_PULSE_MS: u64 = 500;

/// Default close-helper window (seconds).
///
/// The close-helper shortcut only fires within this long after the last
/// successful code entry.
///
/// # Value: 90 seconds
pub const DEFAULT_CLOSE_HELPER_SECS: u64 = 90;

/// Default minimum interval between temporary-code issuances (seconds).
///
/// Repeated denials inside this window do not mint new temporary codes.
///
/// # Value: 120 seconds
pub const DEFAULT_TEMP_CODE_MIN_INTERVAL_SECS: u64 = 120;

/// Default temporary-code time-to-live (minutes).
///
/// # Value: 15 minutes
pub const DEFAULT_TEMP_CODE_TTL_MINUTES: i64 = 15;
