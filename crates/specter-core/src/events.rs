//! Event types broadcast to dashboard subscribers.
//!
//! One `ScanEvent` is published per completed discovery cycle, fanned out
//! over a broadcast channel so every subscriber receives an identical copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{GeoLocation, Observation};

/// Status string for a normal cycle.
pub const STATUS_SCAN_COMPLETE: &str = "Scan Complete";

/// Status string when the population count was classified an outlier.
pub const STATUS_ANOMALY: &str = "Anomaly Detected";

/// The per-cycle notification delivered to all dashboard subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Unique ID for the scan cycle that produced this event.
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// Human-readable status line.
    pub status: String,
    pub is_anomaly: bool,
    /// Devices observed active this cycle.
    pub count: u32,
    /// Per-device observations from this cycle.
    pub devices: Vec<Observation>,
    /// Optional geo enrichment for public addresses; empty when disabled
    /// or when the lookup degraded to no data.
    #[serde(default)]
    pub locations: Vec<GeoLocation>,
}

impl ScanEvent {
    pub fn new(scan_id: Uuid, is_anomaly: bool, devices: Vec<Observation>) -> Self {
        let status = if is_anomaly {
            STATUS_ANOMALY
        } else {
            STATUS_SCAN_COMPLETE
        };
        Self {
            scan_id,
            timestamp: Utc::now(),
            status: status.to_string(),
            is_anomaly,
            count: devices.len() as u32,
            devices,
            locations: Vec::new(),
        }
    }

    pub fn with_locations(mut self, locations: Vec<GeoLocation>) -> Self {
        self.locations = locations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(mac: &str, ip: &str) -> Observation {
        Observation {
            mac: mac.to_string(),
            ip: ip.to_string(),
            vendor: "Unknown".to_string(),
        }
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = ScanEvent::new(
            Uuid::new_v4(),
            false,
            vec![observation("AA:BB:CC:DD:EE:01", "10.0.0.5")],
        );

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: ScanEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.scan_id, deserialized.scan_id);
        assert_eq!(deserialized.count, 1);
        assert_eq!(deserialized.status, STATUS_SCAN_COMPLETE);
    }

    #[test]
    fn anomaly_sets_alert_status() {
        let event = ScanEvent::new(Uuid::new_v4(), true, vec![]);
        assert_eq!(event.status, STATUS_ANOMALY);
        assert!(event.is_anomaly);
        assert_eq!(event.count, 0);
    }
}
