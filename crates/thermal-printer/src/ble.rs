//! BLE backend using btleplug.
//!
//! Provides scanning, connecting, disconnecting, and single-chunk writes
//! on the desktop platforms btleplug supports (BlueZ, CoreBluetooth,
//! WinRT). Chunking and pacing are done by the session.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use tokio::sync::Mutex;

use crate::transport::{BleBackend, Channel, DisconnectEvents, DiscoveredDevice, StopWhen, WriteMode};
use crate::{PrinterError, Result};

struct Connected {
    peripheral: Peripheral,
    characteristics: Vec<Characteristic>,
}

/// btleplug binding for [`crate::TransportSession`].
pub struct BtleplugBackend {
    adapter: Adapter,
    seen: Mutex<HashMap<String, Peripheral>>,
    connected: Mutex<Option<Connected>>,
}

impl BtleplugBackend {
    /// Initialize the platform BLE adapter (first available).
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|e| PrinterError::AdapterUnavailable(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| PrinterError::AdapterUnavailable(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| PrinterError::AdapterUnavailable("No BLE adapter found".into()))?;

        Ok(Self {
            adapter,
            seen: Mutex::new(HashMap::new()),
            connected: Mutex::new(None),
        })
    }

    async fn describe(&self, id: &PeripheralId) -> Option<(DiscoveredDevice, Peripheral)> {
        let peripheral = self.adapter.peripheral(id).await.ok()?;
        let props = peripheral.properties().await.ok()??;
        let device = DiscoveredDevice {
            name: props.local_name.unwrap_or_default(),
            id: id.to_string(),
            rssi: props.rssi,
        };
        Some((device, peripheral))
    }
}

fn channel_of(c: &Characteristic) -> Channel {
    Channel {
        service: c.service_uuid,
        characteristic: c.uuid,
        write: c.properties.contains(CharPropFlags::WRITE),
        write_without_response: c.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
    }
}

#[async_trait]
impl BleBackend for BtleplugBackend {
    async fn scan(&self, window: Duration, stop_when: StopWhen<'_>) -> Result<Vec<DiscoveredDevice>> {
        tracing::info!("Starting BLE scan ({}s timeout)", window.as_secs());

        // No service filter: many printers advertise no service UUIDs.
        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(|e| PrinterError::Scan(e.to_string()))?;

        // Listen for discovery events with timeout
        let mut events = match self.adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                if let Err(stop) = self.stop_scan().await {
                    tracing::warn!(error = %stop, "Failed to stop scan");
                }
                return Err(PrinterError::Scan(e.to_string()));
            }
        };

        let deadline = tokio::time::sleep(window);
        tokio::pin!(deadline);

        let mut found: Vec<DiscoveredDevice> = Vec::new();
        let mut peripherals = HashMap::new();

        loop {
            tokio::select! {
                _ = &mut deadline => break,
                event = events.next() => {
                    let id = match event {
                        Some(CentralEvent::DeviceDiscovered(id)) | Some(CentralEvent::DeviceUpdated(id)) => id,
                        Some(_) => continue,
                        None => break,
                    };
                    let Some((device, peripheral)) = self.describe(&id).await else {
                        continue;
                    };

                    // Names often arrive in a later advertisement; keep the latest view.
                    match found.iter_mut().find(|d| d.id == device.id) {
                        Some(existing) => *existing = device.clone(),
                        None => {
                            tracing::debug!(name = %device.name, id = %device.id, "Found device");
                            found.push(device.clone());
                        }
                    }
                    peripherals.insert(device.id.clone(), peripheral);

                    if stop_when(&device) {
                        tracing::info!(name = %device.name, id = %device.id, "Target seen, ending scan early");
                        break;
                    }
                }
            }
        }

        self.stop_scan().await?;

        found.sort_by(|a, b| {
            let a_has_name = !a.name.is_empty();
            let b_has_name = !b.name.is_empty();
            b_has_name
                .cmp(&a_has_name)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });

        *self.seen.lock().await = peripherals;
        tracing::info!(count = found.len(), "BLE scan complete");
        Ok(found)
    }

    async fn connect(&self, device: &DiscoveredDevice) -> Result<Vec<Channel>> {
        let peripheral = self
            .seen
            .lock()
            .await
            .get(&device.id)
            .cloned()
            .ok_or_else(|| PrinterError::ConnectionFailed(format!("{} was not seen in the last scan", device.id)))?;

        peripheral
            .connect()
            .await
            .map_err(|e| PrinterError::ConnectionFailed(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| PrinterError::ConnectionFailed(e.to_string()))?;

        let characteristics: Vec<Characteristic> = peripheral.characteristics().into_iter().collect();
        let channels = characteristics.iter().map(channel_of).collect();
        tracing::debug!(count = characteristics.len(), "Discovered characteristics");

        *self.connected.lock().await = Some(Connected {
            peripheral,
            characteristics,
        });
        Ok(channels)
    }

    async fn write(&self, channel: &Channel, data: &[u8], mode: WriteMode) -> Result<()> {
        let guard = self.connected.lock().await;
        let conn = guard.as_ref().ok_or(PrinterError::NotConnected)?;
        let characteristic = conn
            .characteristics
            .iter()
            .find(|c| c.uuid == channel.characteristic && c.service_uuid == channel.service)
            .ok_or_else(|| PrinterError::NoWritableChannel(channel.characteristic.to_string()))?;

        let write_type = match mode {
            WriteMode::WithoutResponse => WriteType::WithoutResponse,
            WriteMode::WithResponse => WriteType::WithResponse,
        };
        conn.peripheral
            .write(characteristic, data, write_type)
            .await
            .map_err(|e| PrinterError::ConnectionLost(e.to_string()))
    }

    async fn is_connected(&self) -> bool {
        match self.connected.lock().await.as_ref() {
            Some(conn) => conn.peripheral.is_connected().await.unwrap_or(false),
            None => false,
        }
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(conn) = self.connected.lock().await.take() {
            tracing::info!("Disconnecting BLE device");
            conn.peripheral
                .disconnect()
                .await
                .map_err(|e| PrinterError::ConnectionFailed(e.to_string()))?;
        }
        Ok(())
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter
            .stop_scan()
            .await
            .map_err(|e| PrinterError::Scan(e.to_string()))
    }

    async fn disconnections(&self) -> Result<DisconnectEvents> {
        let events = self
            .adapter
            .events()
            .await
            .map_err(|e| PrinterError::AdapterUnavailable(e.to_string()))?;

        Ok(events
            .filter_map(|event| async move {
                match event {
                    CentralEvent::DeviceDisconnected(id) => Some(id.to_string()),
                    _ => None,
                }
            })
            .boxed())
    }
}
