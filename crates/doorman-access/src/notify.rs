//! Notification boundary.
//!
//! The controller addresses messages to named alert groups; what a group
//! means (a list of phone numbers, a webhook, nothing at all) is the
//! transport's business. Delivery is best-effort and the controller never
//! learns whether it worked; an unreachable transport must not change an
//! authorization outcome.

use doorman_core::AlertGroupId;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

/// Fire-and-forget message delivery to a named alert group.
///
/// Implementations must not block the caller for longer than it takes to
/// enqueue the message; a transport doing real I/O should hand the send
/// off to its own task.
pub trait NotificationPort: Send + Sync {
    /// Send `message` to every recipient of `group`. Best-effort; errors
    /// are the implementation's to log.
    fn send(&self, group: &AlertGroupId, message: &str);
}

/// Notifier used when no transport is configured: drops everything
/// silently.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationPort for NullNotifier {
    fn send(&self, _group: &AlertGroupId, _message: &str) {}
}

/// Notifier that logs each message instead of delivering it.
///
/// The daemon falls back to this when the SMS transport is not
/// configured, so operators still see what would have gone out.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn send(&self, group: &AlertGroupId, message: &str) {
        info!(%group, message, "notification (no transport configured)");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock notifier for tests.
///
/// Records every message sent; the paired [`MockNotifierHandle`] reads
/// them back.
///
/// # Examples
///
/// ```
/// use doorman_access::{MockNotifier, NotificationPort};
/// use doorman_core::AlertGroupId;
///
/// let (notifier, handle) = MockNotifier::new();
/// notifier.send(&AlertGroupId::from("admins"), "hello");
///
/// assert_eq!(handle.sent().len(), 1);
/// assert_eq!(handle.sent()[0].1, "hello");
/// ```
#[derive(Debug, Clone)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<(AlertGroupId, String)>>>,
}

impl MockNotifier {
    /// Create a mock notifier and its inspection handle.
    pub fn new() -> (Self, MockNotifierHandle) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            MockNotifier {
                sent: Arc::clone(&sent),
            },
            MockNotifierHandle { sent },
        )
    }
}

impl NotificationPort for MockNotifier {
    fn send(&self, group: &AlertGroupId, message: &str) {
        lock(&self.sent).push((group.clone(), message.to_string()));
    }
}

/// Handle for inspecting what a [`MockNotifier`] has sent.
#[derive(Debug, Clone)]
pub struct MockNotifierHandle {
    sent: Arc<Mutex<Vec<(AlertGroupId, String)>>>,
}

impl MockNotifierHandle {
    /// Snapshot of all messages sent so far, in order.
    #[must_use]
    pub fn sent(&self) -> Vec<(AlertGroupId, String)> {
        lock(&self.sent).clone()
    }

    /// Number of messages sent so far.
    #[must_use]
    pub fn count(&self) -> usize {
        lock(&self.sent).len()
    }

    /// Forget everything sent so far.
    pub fn clear(&self) {
        lock(&self.sent).clear();
    }
}
