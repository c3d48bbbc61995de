//! Door position sensor.

use doorman_hardware::{GpioDriver, PinId, PinMode, Pull, Result};
use std::sync::Arc;
use tracing::debug;

/// Magnetic door-contact sensor.
///
/// The reed switch is wired so the line reads low when the contact is
/// separated, i.e. when the door is open. Pure query, no state.
#[derive(Clone)]
pub struct DoorSensor {
    gpio: Arc<dyn GpioDriver>,
    pin: PinId,
}

impl DoorSensor {
    pub fn new(gpio: Arc<dyn GpioDriver>, pin: PinId) -> Self {
        DoorSensor { gpio, pin }
    }

    /// One-time startup configuration: input with pull-up.
    ///
    /// # Errors
    /// Propagates driver errors.
    pub fn configure(&self) -> Result<()> {
        self.gpio.configure_pin(self.pin, PinMode::Input(Pull::Up))
    }

    /// Whether the door currently reads open.
    ///
    /// # Errors
    /// Propagates driver errors from the pin read.
    pub fn is_open(&self) -> Result<bool> {
        let open = !self.gpio.read_pin(self.pin)?.is_high();
        debug!(state = if open { "OPENED" } else { "CLOSED" }, "door sensor");
        Ok(open)
    }
}
