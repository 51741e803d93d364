//! Configuration for the specter-scan daemon.

use serde::Deserialize;

/// Top-level scan configuration.
///
/// Loaded from `specter.toml` `[scan]` section or
/// `SPECTER_SCAN__` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// CIDR override for the probe target. When unset, the local /24 is
    /// inferred from the machine's own address.
    #[serde(default)]
    pub subnet: Option<String>,

    /// Seconds between scheduled scan cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// How long to collect ARP replies after the sweep, in milliseconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,

    /// Number of recent scan log entries the anomaly model trains on.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Assumed proportion of outliers in the training window.
    #[serde(default = "default_contamination")]
    pub contamination: f64,

    /// Absence policy: when true (the default), every inventory device not
    /// observed in a cycle is marked inactive. Setting this false elects to
    /// never demote an existing device.
    #[serde(default = "default_true")]
    pub deactivate_unseen: bool,

    /// Broadcast channel capacity for dashboard events.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Whether to run the geo-coordinate enrichment after each cycle.
    #[serde(default)]
    pub geo_enabled: bool,

    /// VirusTotal API key for IP reputation lookups.
    #[serde(default)]
    pub vt_api_key: Option<String>,
}

fn default_interval() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    2000
}

fn default_history_window() -> usize {
    50
}

fn default_contamination() -> f64 {
    0.1
}

fn default_event_capacity() -> usize {
    64
}

fn default_true() -> bool {
    true
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            subnet: None,
            interval_secs: default_interval(),
            probe_timeout_ms: default_probe_timeout(),
            history_window: default_history_window(),
            contamination: default_contamination(),
            deactivate_unseen: default_true(),
            event_capacity: default_event_capacity(),
            geo_enabled: false,
            vt_api_key: None,
        }
    }
}
