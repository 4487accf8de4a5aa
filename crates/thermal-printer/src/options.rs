//! Transport tuning options.
//!
//! Chunk size and pacing delay are calibrated per printer model; the
//! defaults sit in the middle of the range that has worked on common
//! 58mm/80mm BLE printers (100..=180 byte chunks, 15..=25 ms pacing).

use std::time::Duration;

/// Default bytes per BLE write.
pub const DEFAULT_CHUNK_SIZE: usize = 150;

/// Default pause after every chunk.
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(20);

/// Default BLE scan window.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Default limit for connect + service discovery.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Configuration for a [`crate::TransportSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    /// Maximum bytes per write.
    pub chunk_size: usize,

    /// Pause after each chunk so the printer's receive buffer can drain.
    pub chunk_delay: Duration,

    /// How long discovery may run before giving up.
    pub scan_timeout: Duration,

    /// How long connecting and enumerating services may take.
    pub connect_timeout: Duration,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl TransportOptions {
    /// Create options with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set chunk size.
    ///
    /// # Panics
    /// Panics if `size` is zero.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        assert!(size > 0, "Chunk size must be greater than 0");
        self.chunk_size = size;
        self
    }

    /// Builder: set pacing delay between chunks.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Builder: set discovery timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Builder: set connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
