//! GPIO driver trait definition.
//!
//! This is the contract between the controller core and the pin hardware.
//! It is deliberately narrow: configure, read, write, and gate rising-edge
//! delivery. Everything stateful about the door (debounce, matrix
//! resolution, pulse timing) lives above this boundary so that a mock
//! driver exercises the exact same code paths a real board would.

use crate::error::Result;
use crate::types::{Level, PinId, PinMode};

/// Pin-level GPIO driver.
///
/// All methods are synchronous: a pin read on the platforms this targets
/// is a bounded register access, not I/O worth suspending over. The trait
/// is object-safe; the scanner and relay share one driver as
/// `Arc<dyn GpioDriver>`.
///
/// Rising edges for armed pins are delivered out-of-band through the mpsc
/// receiver handed out at driver construction (see
/// [`MockGpio::new`](crate::mock::MockGpio::new)). `set_edge_armed(pin,
/// false)` guarantees no further events for that pin are queued until it
/// is re-armed; events already in the channel may still be observed and
/// must be tolerated by the consumer.
pub trait GpioDriver: Send + Sync {
    /// Configure a pin's direction and pull resistor.
    ///
    /// Reconfiguring an already-configured pin is allowed and is the
    /// normal mode of operation for the keypad matrix, which flips its
    /// pins between idle and resolution wiring on every press.
    ///
    /// # Errors
    /// Returns an error if the backend rejects the pin or mode.
    fn configure_pin(&self, pin: PinId, mode: PinMode) -> Result<()>;

    /// Read the current level of a configured pin.
    ///
    /// # Errors
    /// Returns [`HardwareError::Unconfigured`](crate::HardwareError::Unconfigured)
    /// if the pin was never configured.
    fn read_pin(&self, pin: PinId) -> Result<Level>;

    /// Drive an output pin to the given level.
    ///
    /// # Errors
    /// Returns an error if the pin is unconfigured or configured as input.
    fn write_pin(&self, pin: PinId, level: Level) -> Result<()>;

    /// Arm or disarm rising-edge delivery for a pin.
    ///
    /// Disarming is how the scanner suppresses re-entrant resolution while
    /// it is rewiring the matrix.
    ///
    /// # Errors
    /// Returns an error if the pin was never configured.
    fn set_edge_armed(&self, pin: PinId, armed: bool) -> Result<()>;
}
