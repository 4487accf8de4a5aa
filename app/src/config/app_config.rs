//! Runtime application configuration loaded from the environment.

use std::time::Duration;

use anyhow::{Context, bail};
use image_processor::{PAPER_WIDTH_58MM, PAPER_WIDTH_80MM, TrimOptions};
use serde::Serialize;
use thermal_printer::{DEFAULT_NAME_PATTERNS, TransportOptions};

use super::validation::validate_setting;

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    /// Previously selected device identity (MAC or platform UUID).
    pub printer_address: Option<String>,
    pub printer_name_patterns: Vec<String>,
    pub print_width_dots: u32,
    pub render_dpi: u32,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub scan_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub trim_threshold: u8,
    pub dry_run_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            printer_address: None,
            printer_name_patterns: DEFAULT_NAME_PATTERNS.iter().map(|p| p.to_string()).collect(),
            print_width_dots: PAPER_WIDTH_58MM,
            render_dpi: 203,
            chunk_size: 150,
            chunk_delay_ms: 20,
            scan_timeout_secs: 10,
            connect_timeout_secs: 15,
            trim_threshold: 240,
            dry_run_mode: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn load() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Unset and empty keys keep their
    /// defaults; a set key with an invalid value is an error naming the key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Result<Option<String>, anyhow::Error> {
            match lookup(key) {
                Some(v) if !v.trim().is_empty() => {
                    let v = v.trim().to_string();
                    if let Err(msg) = validate_setting(key, &v) {
                        bail!("invalid {key}={v:?}: {msg}");
                    }
                    Ok(Some(v))
                }
                _ => Ok(None),
            }
        };

        let mut config = Self::default();

        config.printer_address = get("PRINTER_ADDRESS")?;
        if let Some(v) = get("PRINTER_NAME_PATTERNS")? {
            config.printer_name_patterns = v
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }
        if let Some(v) = get("PRINT_WIDTH_DOTS")? {
            config.print_width_dots = parse("PRINT_WIDTH_DOTS", &v)?;
        }
        if let Some(v) = get("RENDER_DPI")? {
            config.render_dpi = parse("RENDER_DPI", &v)?;
        }
        if let Some(v) = get("CHUNK_SIZE")? {
            config.chunk_size = parse("CHUNK_SIZE", &v)?;
        }
        if let Some(v) = get("CHUNK_DELAY_MS")? {
            config.chunk_delay_ms = parse("CHUNK_DELAY_MS", &v)?;
        }
        if let Some(v) = get("SCAN_TIMEOUT_SECS")? {
            config.scan_timeout_secs = parse("SCAN_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout_secs = parse("CONNECT_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TRIM_THRESHOLD")? {
            config.trim_threshold = parse("TRIM_THRESHOLD", &v)?;
        }
        if let Some(v) = get("DRY_RUN_MODE")? {
            config.dry_run_mode = v == "true";
        }

        config.warn_unusual_width();
        Ok(config)
    }

    /// Override the print width, re-checking the documented presets.
    pub fn set_print_width(&mut self, width: u32) -> Result<(), anyhow::Error> {
        validate_setting("PRINT_WIDTH_DOTS", &width.to_string())
            .map_err(|msg| anyhow::anyhow!("invalid width {width}: {msg}"))?;
        self.print_width_dots = width;
        self.warn_unusual_width();
        Ok(())
    }

    fn warn_unusual_width(&self) {
        if self.print_width_dots != PAPER_WIDTH_58MM && self.print_width_dots != PAPER_WIDTH_80MM {
            tracing::warn!(
                width = self.print_width_dots,
                "Print width is not a 58mm (384) or 80mm (576) preset"
            );
        }
    }

    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::new()
            .with_chunk_size(self.chunk_size)
            .with_chunk_delay(Duration::from_millis(self.chunk_delay_ms))
            .with_scan_timeout(Duration::from_secs(self.scan_timeout_secs))
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
    }

    pub fn trim_options(&self) -> TrimOptions {
        TrimOptions::default().with_threshold(self.trim_threshold)
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, anyhow::Error> {
    value
        .parse()
        .ok()
        .with_context(|| format!("invalid {key}={value:?}: out of range"))
}
