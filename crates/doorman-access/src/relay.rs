//! Door relay actuation.
//!
//! The relay input of a garage door opener expects a momentary contact:
//! drive the line active for a fixed pulse, then release it. The off
//! timer runs as a detached tokio task. Overlapping triggers are
//! coalesced: while a pulse is in flight, further triggers do nothing
//! (they neither extend the pulse nor queue another one).

use doorman_hardware::{GpioDriver, Level, PinId, PinMode, Pull, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Pulses the door relay.
///
/// Cheap to clone; clones share the in-flight guard, so coalescing works
/// across owners.
#[derive(Clone)]
pub struct RelayActuator {
    gpio: Arc<dyn GpioDriver>,
    pin: PinId,
    pulse: Duration,
    in_flight: Arc<AtomicBool>,
}

impl RelayActuator {
    /// Create an actuator for the given relay pin and pulse duration.
    pub fn new(gpio: Arc<dyn GpioDriver>, pin: PinId, pulse: Duration) -> Self {
        RelayActuator {
            gpio,
            pin,
            pulse,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// One-time startup configuration: leave the relay line released.
    ///
    /// # Errors
    /// Propagates driver errors.
    pub fn configure(&self) -> Result<()> {
        self.gpio.configure_pin(self.pin, PinMode::Input(Pull::None))
    }

    /// Pulse the relay for the configured duration.
    ///
    /// Returns `Ok(true)` if a pulse was started, `Ok(false)` if an
    /// earlier pulse is still in flight and this trigger was coalesced.
    ///
    /// # Errors
    /// Propagates driver errors from the activation write; the in-flight
    /// guard is cleared on failure so a transient fault does not wedge
    /// the relay.
    pub fn trigger_pulse(&self) -> Result<bool> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("relay pulse already in flight, trigger coalesced");
            return Ok(false);
        }

        if let Err(e) = self.activate() {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(e);
        }

        info!(pin = %self.pin, pulse_ms = self.pulse.as_millis() as u64, "relay pulse");

        let gpio = Arc::clone(&self.gpio);
        let pin = self.pin;
        let pulse = self.pulse;
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            tokio::time::sleep(pulse).await;

            if let Err(e) = gpio.write_pin(pin, Level::Low) {
                warn!(error = %e, %pin, "relay release write failed");
            }
            if let Err(e) = gpio.configure_pin(pin, PinMode::Input(Pull::None)) {
                warn!(error = %e, %pin, "relay release failed");
            }
            in_flight.store(false, Ordering::SeqCst);
        });

        Ok(true)
    }

    fn activate(&self) -> Result<()> {
        self.gpio.configure_pin(self.pin, PinMode::Output)?;
        self.gpio.write_pin(self.pin, Level::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorman_hardware::MockGpio;

    const RELAY: PinId = PinId::new(16);
    const PULSE: Duration = Duration::from_millis(500);

    fn actuator() -> (RelayActuator, doorman_hardware::MockGpioHandle) {
        let (gpio, handle, _edges) = MockGpio::new();
        let relay = RelayActuator::new(Arc::new(gpio), RELAY, PULSE);
        relay.configure().unwrap();
        (relay, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_drives_then_releases() {
        let (relay, handle) = actuator();

        assert!(relay.trigger_pulse().unwrap());
        assert_eq!(handle.level(RELAY).unwrap(), Level::High);

        // Past the pulse duration the line is released and floats low.
        tokio::time::sleep(PULSE + Duration::from_millis(50)).await;
        assert_eq!(handle.level(RELAY).unwrap(), Level::Low);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_triggers_coalesce() {
        let (relay, handle) = actuator();

        assert!(relay.trigger_pulse().unwrap());
        assert!(!relay.trigger_pulse().unwrap());
        assert_eq!(handle.level(RELAY).unwrap(), Level::High);

        tokio::time::sleep(PULSE + Duration::from_millis(50)).await;
        assert_eq!(handle.level(RELAY).unwrap(), Level::Low);

        // After release a new pulse starts normally.
        assert!(relay.trigger_pulse().unwrap());
        assert_eq!(handle.level(RELAY).unwrap(), Level::High);
    }
}
