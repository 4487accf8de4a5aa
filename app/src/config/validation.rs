//! Setting value validation.

use regex::Regex;
use std::sync::LazyLock;

static RE_MAC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9A-Fa-f]{2}[:\-]){5}([0-9A-Fa-f]{2})$").expect("valid MAC regex"));
static RE_UUID_NO_HYPHEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-Fa-f]{32}$").expect("valid UUID regex"));
static RE_UUID_HYPHEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}$")
        .expect("valid UUID regex")
});

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "PRINTER_ADDRESS" => {
            if !value.is_empty()
                && !RE_MAC.is_match(value)
                && !RE_UUID_NO_HYPHEN.is_match(value)
                && !RE_UUID_HYPHEN.is_match(value)
            {
                return Err("invalid address format (expected MAC or UUID)".into());
            }
        }
        "PRINTER_NAME_PATTERNS" => {
            if value.split(',').all(|p| p.trim().is_empty()) {
                return Err("must list at least one name fragment".into());
            }
        }
        "PRINT_WIDTH_DOTS" => validate_int_range(value, 8, 2048)?,
        "RENDER_DPI" => validate_int_range(value, 72, 600)?,
        "CHUNK_SIZE" => validate_int_range(value, 20, 512)?,
        "CHUNK_DELAY_MS" => validate_int_range(value, 0, 1000)?,
        "SCAN_TIMEOUT_SECS" => validate_int_range(value, 1, 120)?,
        "CONNECT_TIMEOUT_SECS" => validate_int_range(value, 1, 120)?,
        "TRIM_THRESHOLD" => validate_int_range(value, 1, 255)?,
        "DRY_RUN_MODE" => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}
