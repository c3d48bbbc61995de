//! Error types for GPIO operations.

use crate::types::PinId;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during GPIO operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// Pin has not been configured before use.
    #[error("Pin {pin} not configured")]
    Unconfigured { pin: PinId },

    /// Operation does not match the pin's configured direction.
    #[error("Pin {pin} direction mismatch: {message}")]
    DirectionMismatch { pin: PinId, message: String },

    /// The edge-event channel is gone (receiver dropped).
    #[error("Edge channel closed")]
    EdgeChannelClosed,

    /// Generic I/O error from a real-hardware backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl HardwareError {
    /// Create a new unconfigured-pin error.
    pub fn unconfigured(pin: PinId) -> Self {
        Self::Unconfigured { pin }
    }

    /// Create a new direction-mismatch error.
    pub fn direction_mismatch(pin: PinId, message: impl Into<String>) -> Self {
        Self::DirectionMismatch {
            pin,
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_error_display() {
        let error = HardwareError::unconfigured(PinId::new(31));
        assert_eq!(error.to_string(), "Pin P31 not configured");
    }

    #[test]
    fn test_direction_mismatch_display() {
        let error = HardwareError::direction_mismatch(PinId::new(7), "write to input");
        assert_eq!(
            error.to_string(),
            "Pin P7 direction mismatch: write to input"
        );
    }
}
