//! Inventory storage — trait over the device table and scan log.
//!
//! All mutations use upsert semantics keyed by MAC address so idempotent
//! re-discovery never duplicates a device. The scan log is append-only and
//! retrievable by recency for the anomaly model's training window.

use chrono::{DateTime, Utc};
use specter_core::{Device, Observation, ScanLog};

/// Errors that can occur during inventory storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Backend failure: {0}")]
    Backend(String),
}

/// Whether an upsert created a new row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Trait for inventory persistence backends.
///
/// Writer discipline is last-write-wins per MAC key; each method call is
/// atomic with respect to concurrent readers.
pub trait InventoryStore: Send + Sync {
    /// Upsert one observed device keyed by MAC address.
    ///
    /// An existing row gets its IP, vendor, activity flag (true), and
    /// `last_seen` overwritten; alias, trusted flag, hostname, and
    /// `first_seen` are preserved. A missing row is inserted with those
    /// fields and activity true.
    fn upsert_device(
        &self,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError>;

    /// Mark every device whose MAC is not in `seen_macs` inactive.
    /// Returns the number of devices deactivated.
    fn deactivate_except(&self, seen_macs: &[String]) -> Result<usize, StoreError>;

    /// Append one scan log entry with a store-assigned timestamp.
    fn append_log(&self, devices_online: u32) -> Result<ScanLog, StoreError>;

    /// The most recent `limit` scan log entries, newest first.
    fn recent_logs(&self, limit: usize) -> Result<Vec<ScanLog>, StoreError>;

    /// Fetch a single device by canonical MAC.
    fn get_device(&self, mac: &str) -> Result<Option<Device>, StoreError>;

    /// All devices ordered by `last_seen` descending (dashboard view).
    fn list_devices(&self) -> Result<Vec<Device>, StoreError>;

    /// Total number of devices ever observed.
    fn device_count(&self) -> Result<usize, StoreError>;
}
