//! Authorization engine for the doorman access controller.
//!
//! This crate owns every piece of real state in the system: the live
//! entry registry, the entry accumulation buffer, test mode, and the
//! recency markers the close-helper depends on. All of it is mutated
//! from exactly one place, the [`AccessController`], which consumes
//! [`ControllerEvent`]s from a single mpsc channel. Timer tasks
//! (test-mode deadline, registry sweep) never touch state directly; they
//! send events back into the same channel.
//!
//! The relay and door sensor are thin wrappers over the GPIO boundary,
//! and notifications leave through the [`NotificationPort`] trait, which
//! the core treats as fire-and-forget.

pub mod controller;
pub mod events;
pub mod notify;
pub mod relay;
pub mod sensor;

pub use controller::{AccessController, ControllerConfig, Decision};
pub use events::ControllerEvent;
pub use notify::{LogNotifier, MockNotifier, MockNotifierHandle, NotificationPort, NullNotifier};
pub use relay::RelayActuator;
pub use sensor::DoorSensor;
