//! Mock GPIO driver for testing and development.
//!
//! `MockGpio` simulates just enough pin electricity to run the whole
//! controller stack without a board: outputs hold their driven level,
//! inputs read their pull resistor default, and a single key "contact"
//! can short two pins together the way a held matrix key shorts its row
//! and column lines. Tests (and the daemon's simulation mode) drive it
//! through a [`MockGpioHandle`].

use crate::{
    Result,
    error::HardwareError,
    traits::GpioDriver,
    types::{EdgeEvent, Level, PinId, PinMode, Pull},
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct PinState {
    mode: PinMode,
    /// Driven level; meaningful only while the pin is an output.
    level: Level,
}

#[derive(Debug)]
struct Inner {
    pins: Mutex<HashMap<PinId, PinState>>,
    armed: Mutex<HashSet<PinId>>,
    /// The currently held key, as the (row, column) pin pair it shorts.
    contact: Mutex<Option<(PinId, PinId)>>,
    /// Externally forced input levels (e.g. the door sensor line).
    forced: Mutex<HashMap<PinId, Level>>,
    edge_tx: mpsc::UnboundedSender<EdgeEvent>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// Compute the level a pin reads right now.
    fn level_of(&self, pin: PinId, pins: &HashMap<PinId, PinState>) -> Result<Level> {
        let state = pins.get(&pin).ok_or(HardwareError::unconfigured(pin))?;

        match state.mode {
            PinMode::Output => Ok(state.level),
            PinMode::Input(pull) => {
                if let Some(level) = lock(&self.forced).get(&pin) {
                    return Ok(*level);
                }

                // A held key shorts its two pins; the input side reads
                // high when the other side of the contact is high.
                if let Some((a, b)) = *lock(&self.contact) {
                    let other = if pin == a {
                        Some(b)
                    } else if pin == b {
                        Some(a)
                    } else {
                        None
                    };

                    if let Some(other) = other
                        && let Some(other_state) = pins.get(&other)
                    {
                        let other_high = match other_state.mode {
                            PinMode::Output => other_state.level.is_high(),
                            PinMode::Input(other_pull) => other_pull == Pull::Up,
                        };
                        if other_high {
                            return Ok(Level::High);
                        }
                    }
                }

                Ok(match pull {
                    Pull::Up => Level::High,
                    Pull::Down | Pull::None => Level::Low,
                })
            }
        }
    }

    /// Emit a rising edge for `pin` if it is armed.
    fn emit_edge(&self, pin: PinId) {
        if lock(&self.armed).contains(&pin) {
            trace!(%pin, "mock edge");
            // A dropped receiver just means nobody is listening anymore.
            let _ = self.edge_tx.send(EdgeEvent { pin });
        }
    }
}

/// Mock GPIO driver.
///
/// # Examples
///
/// ```
/// use doorman_hardware::{GpioDriver, Level, MockGpio, PinId, PinMode, Pull};
///
/// let (gpio, handle, _edges) = MockGpio::new();
///
/// let pin = PinId::new(31);
/// gpio.configure_pin(pin, PinMode::Input(Pull::Down)).unwrap();
/// assert_eq!(gpio.read_pin(pin).unwrap(), Level::Low);
///
/// handle.set_input_level(pin, Level::High);
/// assert_eq!(gpio.read_pin(pin).unwrap(), Level::High);
/// ```
#[derive(Debug, Clone)]
pub struct MockGpio {
    inner: Arc<Inner>,
}

impl MockGpio {
    /// Create a mock driver, its control handle, and the edge-event
    /// receiver that armed rising edges are delivered on.
    pub fn new() -> (Self, MockGpioHandle, mpsc::UnboundedReceiver<EdgeEvent>) {
        let (edge_tx, edge_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(Inner {
            pins: Mutex::new(HashMap::new()),
            armed: Mutex::new(HashSet::new()),
            contact: Mutex::new(None),
            forced: Mutex::new(HashMap::new()),
            edge_tx,
        });

        let gpio = MockGpio {
            inner: Arc::clone(&inner),
        };
        let handle = MockGpioHandle { inner };

        (gpio, handle, edge_rx)
    }
}

impl GpioDriver for MockGpio {
    fn configure_pin(&self, pin: PinId, mode: PinMode) -> Result<()> {
        let mut pins = lock(&self.inner.pins);
        let state = pins.entry(pin).or_insert(PinState {
            mode,
            level: Level::Low,
        });
        state.mode = mode;
        if matches!(mode, PinMode::Input(_)) {
            state.level = Level::Low;
        }
        Ok(())
    }

    fn read_pin(&self, pin: PinId) -> Result<Level> {
        let pins = lock(&self.inner.pins);
        self.inner.level_of(pin, &pins)
    }

    fn write_pin(&self, pin: PinId, level: Level) -> Result<()> {
        let mut pins = lock(&self.inner.pins);
        let state = pins.get_mut(&pin).ok_or(HardwareError::unconfigured(pin))?;

        if !matches!(state.mode, PinMode::Output) {
            return Err(HardwareError::direction_mismatch(
                pin,
                "write to input pin",
            ));
        }

        state.level = level;
        Ok(())
    }

    fn set_edge_armed(&self, pin: PinId, armed: bool) -> Result<()> {
        if !lock(&self.inner.pins).contains_key(&pin) {
            return Err(HardwareError::unconfigured(pin));
        }

        let mut set = lock(&self.inner.armed);
        if armed {
            set.insert(pin);
        } else {
            set.remove(&pin);
        }
        Ok(())
    }
}

/// Handle for driving a [`MockGpio`] from tests or the daemon's
/// simulation loop.
///
/// The handle can be cloned and used from any task.
#[derive(Debug, Clone)]
pub struct MockGpioHandle {
    inner: Arc<Inner>,
}

impl MockGpioHandle {
    /// Hold down the key that shorts `row` and `col`.
    ///
    /// If the row pin is an armed input that transitions low to high, a
    /// rising edge is emitted, exactly what a physical press does to the
    /// idle matrix.
    pub fn press(&self, row: PinId, col: PinId) {
        let was_high = {
            let pins = lock(&self.inner.pins);
            self.inner
                .level_of(row, &pins)
                .map(|l| l.is_high())
                .unwrap_or(false)
        };

        *lock(&self.inner.contact) = Some((row, col));

        let is_high = {
            let pins = lock(&self.inner.pins);
            self.inner
                .level_of(row, &pins)
                .map(|l| l.is_high())
                .unwrap_or(false)
        };

        if !was_high && is_high {
            self.inner.emit_edge(row);
        }
    }

    /// Release the held key, if any.
    pub fn release(&self) {
        *lock(&self.inner.contact) = None;
    }

    /// Force an input pin to read a fixed level (door sensor line).
    pub fn set_input_level(&self, pin: PinId, level: Level) {
        let was_high = {
            let pins = lock(&self.inner.pins);
            self.inner
                .level_of(pin, &pins)
                .map(|l| l.is_high())
                .unwrap_or(false)
        };

        lock(&self.inner.forced).insert(pin, level);

        if !was_high && level.is_high() {
            self.inner.emit_edge(pin);
        }
    }

    /// Observe the level a pin currently reads (outputs included).
    pub fn level(&self, pin: PinId) -> Result<Level> {
        let pins = lock(&self.inner.pins);
        self.inner.level_of(pin, &pins)
    }

    /// Whether a pin currently has edge delivery armed.
    #[must_use]
    pub fn is_armed(&self, pin: PinId) -> bool {
        lock(&self.inner.armed).contains(&pin)
    }
}
