//! Platform-neutral BLE transport interface.
//!
//! A backend knows how to scan, connect, write and disconnect on one
//! platform's Bluetooth stack. Everything above it (device selection,
//! chunking, pacing, state) lives in [`crate::session`] and is shared.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::Result;

/// A device seen during a scan. Scan results are read-only snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Advertised name (may be empty if not advertised).
    pub name: String,
    /// Platform-specific identifier (address on Linux/Windows, UUID on macOS).
    pub id: String,
    /// Signal strength at discovery time, when reported.
    pub rssi: Option<i16>,
}

impl DiscoveredDevice {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            rssi: None,
        }
    }
}

/// How a chunk is written to the characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// ATT write command; no acknowledgement, higher throughput.
    WithoutResponse,
    /// ATT write request; each write is acknowledged.
    WithResponse,
}

/// A GATT characteristic and its write capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub service: Uuid,
    pub characteristic: Uuid,
    pub write: bool,
    pub write_without_response: bool,
}

impl Channel {
    pub fn is_writable(&self) -> bool {
        self.write || self.write_without_response
    }

    /// Write-without-response when supported, else write-with-response.
    pub fn preferred_mode(&self) -> WriteMode {
        if self.write_without_response {
            WriteMode::WithoutResponse
        } else {
            WriteMode::WithResponse
        }
    }
}

/// Pick the characteristic print data is written to.
///
/// The first characteristic supporting write-without-response wins;
/// failing that, the first supporting acknowledged writes.
pub fn select_channel(channels: &[Channel]) -> Option<Channel> {
    channels
        .iter()
        .find(|c| c.write_without_response)
        .or_else(|| channels.iter().find(|c| c.write))
        .copied()
}

/// Stop condition evaluated on every device as it is discovered.
pub type StopWhen<'a> = &'a (dyn Fn(&DiscoveredDevice) -> bool + Send + Sync);

/// Ids of devices the platform reports as disconnected.
pub type DisconnectEvents = BoxStream<'static, String>;

/// One platform's BLE binding.
#[async_trait]
pub trait BleBackend: Send + Sync {
    /// Scan for up to `window`, returning every device seen.
    ///
    /// Returns early once `stop_when` accepts a device.
    async fn scan(&self, window: Duration, stop_when: StopWhen<'_>) -> Result<Vec<DiscoveredDevice>>;

    /// Connect to `device` and enumerate its characteristics.
    async fn connect(&self, device: &DiscoveredDevice) -> Result<Vec<Channel>>;

    /// Write one chunk to `channel` on the connected device.
    async fn write(&self, channel: &Channel, data: &[u8], mode: WriteMode) -> Result<()>;

    /// Whether the link to the connected device is still up.
    async fn is_connected(&self) -> bool;

    /// Close the link. Disconnecting when not connected is a no-op.
    async fn disconnect(&self) -> Result<()>;

    /// Stop a scan that was abandoned before it finished.
    async fn stop_scan(&self) -> Result<()> {
        Ok(())
    }

    /// Link-loss notifications. Backends without them never yield.
    async fn disconnections(&self) -> Result<DisconnectEvents> {
        Ok(futures::stream::pending::<String>().boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(n: u128, write: bool, wwr: bool) -> Channel {
        Channel {
            service: Uuid::from_u128(0x18f0),
            characteristic: Uuid::from_u128(n),
            write,
            write_without_response: wwr,
        }
    }

    #[test]
    fn prefers_write_without_response() {
        let chans = [channel(1, false, false), channel(2, true, false), channel(3, true, true)];
        let picked = select_channel(&chans).unwrap();
        assert_eq!(picked.characteristic, Uuid::from_u128(3));
        assert_eq!(picked.preferred_mode(), WriteMode::WithoutResponse);
    }

    #[test]
    fn falls_back_to_acknowledged_write() {
        let chans = [channel(1, false, false), channel(2, true, false)];
        let picked = select_channel(&chans).unwrap();
        assert_eq!(picked.characteristic, Uuid::from_u128(2));
        assert_eq!(picked.preferred_mode(), WriteMode::WithResponse);
    }

    #[test]
    fn no_writable_characteristic() {
        assert!(select_channel(&[channel(1, false, false)]).is_none());
        assert!(select_channel(&[]).is_none());
    }
}
