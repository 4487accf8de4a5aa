//! Printer selection among scan results.
//!
//! Matchers are tried in priority order: a persisted device identity
//! first, then advertised-name fragments of known printer families.

use crate::transport::DiscoveredDevice;

/// Name fragments (lowercase) used by common BLE receipt printers.
pub const DEFAULT_NAME_PATTERNS: &[&str] = &[
    "printer", "pos", "mtp", "mpt", "rpp", "xp-", "pt-", "innerprinter",
];

/// One way of recognizing the target printer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceMatcher {
    /// Exact platform identity (MAC address or UUID), separators ignored.
    Identity(String),
    /// Case-insensitive substring match on the advertised name.
    NamePattern(Vec<String>),
}

impl DeviceMatcher {
    pub fn identity(id: impl Into<String>) -> Self {
        Self::Identity(id.into())
    }

    pub fn name_patterns<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::NamePattern(
            patterns
                .into_iter()
                .map(|p| p.as_ref().trim().to_ascii_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        )
    }

    pub fn default_names() -> Self {
        Self::name_patterns(DEFAULT_NAME_PATTERNS)
    }

    pub fn matches(&self, device: &DiscoveredDevice) -> bool {
        match self {
            Self::Identity(target) => {
                device.id.eq_ignore_ascii_case(target)
                    || normalize_device_id(&device.id) == normalize_device_id(target)
            }
            Self::NamePattern(patterns) => {
                if device.name.is_empty() {
                    return false;
                }
                let name = device.name.to_ascii_lowercase();
                patterns.iter().any(|p| name.contains(p.as_str()))
            }
        }
    }
}

/// Build the matcher chain for an optional persisted identity.
pub fn matchers_for(identity: Option<&str>, name_patterns: &[String]) -> Vec<DeviceMatcher> {
    let mut matchers = Vec::with_capacity(2);
    if let Some(id) = identity.map(str::trim).filter(|id| !id.is_empty()) {
        matchers.push(DeviceMatcher::identity(id));
    }
    if name_patterns.is_empty() {
        matchers.push(DeviceMatcher::default_names());
    } else {
        matchers.push(DeviceMatcher::name_patterns(name_patterns));
    }
    matchers
}

/// Pick the first device accepted by the highest-priority matcher.
pub fn select_device(devices: &[DiscoveredDevice], matchers: &[DeviceMatcher]) -> Option<DiscoveredDevice> {
    matchers
        .iter()
        .find_map(|m| devices.iter().find(|d| m.matches(d)))
        .cloned()
}

/// Lowercase alphanumerics only, so `AA:BB:..` equals `aabb..`.
pub fn normalize_device_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
