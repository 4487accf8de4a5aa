//! ESC/POS receipt printer library for BLE-connected thermal printers.
//!
//! Provides the raster/QR/text command encoders, print job assembly, and a
//! transport session that discovers, connects to, and streams jobs to a
//! printer over Bluetooth Low Energy in paced chunks.

pub mod ble;
pub mod matcher;
pub mod options;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use ble::BtleplugBackend;
pub use matcher::{DEFAULT_NAME_PATTERNS, DeviceMatcher, select_device};
pub use options::TransportOptions;
pub use protocol::job::{JobBuilder, PrintJob};
pub use session::{SessionState, TransportSession};
pub use transport::{BleBackend, Channel, DisconnectEvents, DiscoveredDevice, WriteMode};

/// Coarse classification of a [`PrinterError`], for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    DeviceNotFound,
    NoWritableChannel,
    ConnectionFailed,
    ConnectionLost,
    TransmissionInterrupted,
    Cancelled,
    NotConnected,
    AdapterUnavailable,
    Scan,
    MalformedInput,
}

/// Errors that can occur during printer operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PrinterError {
    #[error("No matching printer found within {timeout_secs}s scan")]
    DeviceNotFound { timeout_secs: u64 },

    #[error("Device {0} exposes no writable characteristic")]
    NoWritableChannel(String),

    #[error("BLE connection error: {0}")]
    ConnectionFailed(String),

    #[error("Connection to printer lost: {0}")]
    ConnectionLost(String),

    #[error("Transmission interrupted after {sent}/{total} bytes: {reason}")]
    TransmissionInterrupted {
        sent: usize,
        total: usize,
        reason: String,
    },

    #[error("Transmission cancelled after {sent} bytes")]
    Cancelled { sent: usize },

    #[error("Not connected to any device")]
    NotConnected,

    #[error("Bluetooth adapter unavailable: {0}")]
    AdapterUnavailable(String),

    #[error("BLE scan error: {0}")]
    Scan(String),

    #[error("Malformed input: {0}")]
    MalformedInput(String),
}

impl PrinterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceNotFound { .. } => ErrorKind::DeviceNotFound,
            Self::NoWritableChannel(_) => ErrorKind::NoWritableChannel,
            Self::ConnectionFailed(_) => ErrorKind::ConnectionFailed,
            Self::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Self::TransmissionInterrupted { .. } => ErrorKind::TransmissionInterrupted,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::AdapterUnavailable(_) => ErrorKind::AdapterUnavailable,
            Self::Scan(_) => ErrorKind::Scan,
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
        }
    }

    /// Whether reconnecting and retrying could plausibly succeed.
    ///
    /// The session never retries on its own; this is a hint for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConnectionFailed
                | ErrorKind::ConnectionLost
                | ErrorKind::TransmissionInterrupted
                | ErrorKind::NotConnected
                | ErrorKind::Scan
        )
    }
}

/// Result type alias for thermal-printer operations.
pub type Result<T> = std::result::Result<T, PrinterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(PrinterError::ConnectionLost("link dropped".into()).is_retryable());
        assert!(
            PrinterError::TransmissionInterrupted {
                sent: 300,
                total: 1000,
                reason: "write failed".into()
            }
            .is_retryable()
        );
        assert!(!PrinterError::DeviceNotFound { timeout_secs: 10 }.is_retryable());
        assert!(!PrinterError::NoWritableChannel("AA:BB".into()).is_retryable());
        assert!(!PrinterError::MalformedInput("gray pixel".into()).is_retryable());
    }

    #[test]
    fn error_messages_carry_detail() {
        let err = PrinterError::TransmissionInterrupted {
            sent: 450,
            total: 1000,
            reason: "chunk 4/7: gatt error".into(),
        };
        assert_eq!(err.kind(), ErrorKind::TransmissionInterrupted);
        assert_eq!(
            err.to_string(),
            "Transmission interrupted after 450/1000 bytes: chunk 4/7: gatt error"
        );
    }
}
