//! GPIO abstraction layer for the doorman access controller.
//!
//! This crate provides the narrow pin-level interface the controller
//! consumes: configure a pin, read it, write it, and arm rising-edge
//! delivery on it. A mock implementation with full electrical simulation
//! of the keypad matrix lives in [`mock`] so the whole stack can be
//! developed and tested without a board.
//!
//! # Design Philosophy
//!
//! - **Synchronous pin ops**: a GPIO register read is bounded and
//!   effectively instantaneous, so `read_pin`/`write_pin` are plain
//!   synchronous calls with no async ceremony at this layer.
//! - **Edges as a channel**: rising edges are delivered over a tokio mpsc
//!   channel created at driver construction, not through registered
//!   callbacks. Arming and disarming a pin gates what the driver feeds
//!   into that channel.
//! - **Object-safe**: drivers are shared as `Arc<dyn GpioDriver>` between
//!   the scanner and the relay task.
//!
//! Real-board backends (rppal, sysfs) are feature-gated stubs for now;
//! the mock driver is the only in-tree implementation.

pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use traits::GpioDriver;
pub use types::{EdgeEvent, Level, PinId, PinMode, Pull};

pub use mock::{MockGpio, MockGpioHandle};
