//! Printer access: session construction, device listing, dry-run output.

use std::path::Path;

use anyhow::Context;
use thermal_printer::matcher::matchers_for;
use thermal_printer::{BleBackend, BtleplugBackend, DiscoveredDevice, PrintJob, TransportSession};

use crate::config::AppConfig;

/// Open the platform adapter and wrap it in a session configured from
/// `config`.
pub async fn open_session(config: &AppConfig) -> anyhow::Result<TransportSession<BtleplugBackend>> {
    let backend = BtleplugBackend::new()
        .await
        .context("failed to initialize Bluetooth")?;
    Ok(session_with_backend(backend, config))
}

pub fn session_with_backend<B: BleBackend>(backend: B, config: &AppConfig) -> TransportSession<B> {
    TransportSession::new(backend, config.transport_options())
        .with_name_patterns(config.printer_name_patterns.clone())
}

/// A device seen during a scan and whether the session would pick it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub device: DiscoveredDevice,
    pub matches: bool,
}

/// Scan for the full window and report every device seen.
pub async fn scan_devices<B: BleBackend>(session: &TransportSession<B>, config: &AppConfig) -> anyhow::Result<Vec<ScanEntry>> {
    let window = session.options().scan_timeout;
    let keep_scanning = |_: &DiscoveredDevice| false;
    let devices = session
        .backend()
        .scan(window, &keep_scanning)
        .await
        .context("BLE scan failed")?;

    let matchers = matchers_for(config.printer_address.as_deref(), &config.printer_name_patterns);
    Ok(devices
        .into_iter()
        .map(|device| ScanEntry {
            matches: matchers.iter().any(|m| m.matches(&device)),
            device,
        })
        .collect())
}

/// Write the job's wire bytes to `path` instead of a printer.
pub async fn write_dry_run(job: &PrintJob, path: &Path) -> anyhow::Result<()> {
    tokio::fs::write(path, job.to_bytes())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = job.len(), pages = job.image_blocks(), "Print job (dry run)");
    Ok(())
}
