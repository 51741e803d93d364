//! Core domain types for the Specter device inventory.
//!
//! A `Device` is one physical network interface, keyed by its hardware
//! address. A `ScanLog` is one immutable entry per completed discovery
//! cycle, used for the population time series the anomaly model trains on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vendor classification for an address with no resolvable prefix.
pub const VENDOR_UNKNOWN: &str = "Unknown Vendor";

/// Vendor classification for a locally-administered (randomized) address.
pub const VENDOR_PRIVATE: &str = "Private/Randomized Device";

/// Vendor classification when the lookup mechanism itself errored.
pub const VENDOR_LOOKUP_FAILED: &str = "Lookup Failed";

/// Default classification before any lookup has been attempted, or when
/// the vendor table never initialized.
pub const VENDOR_UNRESOLVED: &str = "Unknown";

/// A physical device on the network, identified uniquely by MAC address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Canonical uppercase colon-delimited MAC (e.g., `00:1A:2B:3C:4D:5E`).
    pub mac: String,
    /// Current IP address.
    pub ip: String,
    /// Resolved hostname, if a collaborator has filled it in.
    pub hostname: Option<String>,
    /// Hardware manufacturer (e.g., "Apple, Inc.") or a degradation marker.
    pub vendor: String,
    /// Whether the device answered the most recent probe.
    pub is_active: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// User-friendly name (e.g., "Dad's iPhone").
    pub alias: Option<String>,
    /// If true, collaborators suppress anomaly attribution for this device.
    pub is_trusted: bool,
}

impl Device {
    /// Best human-readable label: alias, then hostname, then the MAC itself.
    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .or(self.hostname.as_deref())
            .unwrap_or(&self.mac)
    }
}

/// Historical record of one completed discovery cycle.
///
/// Append-only and ordered by `timestamp`; never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanLog {
    /// Assigned by the store at insert time.
    pub timestamp: DateTime<Utc>,
    /// Devices observed active in that cycle.
    pub devices_online: u32,
}

/// One responding device from a single discovery cycle, after identity
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub mac: String,
    pub ip: String,
    pub vendor: String,
}

/// Geo coordinates for one successfully resolved public address,
/// attached to events as optional enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub ip: String,
    pub lat: f64,
    pub lon: f64,
    pub city: String,
    pub country: String,
}

/// Reputation verdict for one public address. The default benign zero
/// verdict is what every enrichment failure path degrades to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreatVerdict {
    pub malicious: bool,
    pub score: u32,
}

/// Normalize a raw hardware address to canonical uppercase colon form.
///
/// Accepts colon- or hyphen-delimited input in any case.
pub fn canonical_mac(raw: &str) -> String {
    raw.trim().replace('-', ":").to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_mac_uppercases_and_recolons() {
        assert_eq!(canonical_mac("aa:bb:cc:dd:ee:ff"), "AA:BB:CC:DD:EE:FF");
        assert_eq!(canonical_mac("00-1a-2b-3c-4d-5e"), "00:1A:2B:3C:4D:5E");
        assert_eq!(canonical_mac(" 00:1A:2B:3C:4D:5E "), "00:1A:2B:3C:4D:5E");
    }

    #[test]
    fn display_name_prefers_alias() {
        let now = Utc::now();
        let mut device = Device {
            mac: "AA:BB:CC:DD:EE:FF".to_string(),
            ip: "10.0.0.5".to_string(),
            hostname: Some("printer.lan".to_string()),
            vendor: VENDOR_UNRESOLVED.to_string(),
            is_active: true,
            first_seen: now,
            last_seen: now,
            alias: Some("Office Printer".to_string()),
            is_trusted: false,
        };
        assert_eq!(device.display_name(), "Office Printer");

        device.alias = None;
        assert_eq!(device.display_name(), "printer.lan");

        device.hostname = None;
        assert_eq!(device.display_name(), "AA:BB:CC:DD:EE:FF");
    }
}
