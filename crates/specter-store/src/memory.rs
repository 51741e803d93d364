//! In-memory inventory backend.
//!
//! Backs the `InventoryStore` trait with a `parking_lot::RwLock` so
//! dashboard readers proceed concurrently while the (single) scan task
//! writes. Suitable for tests and single-process deployments; a database
//! backend implements the same trait.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use specter_core::{Device, Observation, ScanLog};

use crate::store::{InventoryStore, StoreError, UpsertOutcome};

#[derive(Default)]
struct Inner {
    devices: HashMap<String, Device>,
    logs: Vec<ScanLog>,
}

/// Thread-safe in-memory device table and scan log.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user-assigned alias on a device (dashboard write path).
    pub fn set_alias(&self, mac: &str, alias: Option<String>) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let device = inner
            .devices
            .get_mut(mac)
            .ok_or_else(|| StoreError::NotFound(mac.to_string()))?;
        device.alias = alias;
        Ok(())
    }

    /// Set the trusted flag on a device (dashboard write path).
    pub fn set_trusted(&self, mac: &str, trusted: bool) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let device = inner
            .devices
            .get_mut(mac)
            .ok_or_else(|| StoreError::NotFound(mac.to_string()))?;
        device.is_trusted = trusted;
        Ok(())
    }
}

impl InventoryStore for MemoryStore {
    fn upsert_device(
        &self,
        observation: &Observation,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.inner.write();
        match inner.devices.get_mut(&observation.mac) {
            Some(device) => {
                device.ip = observation.ip.clone();
                device.vendor = observation.vendor.clone();
                device.is_active = true;
                device.last_seen = now;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                inner.devices.insert(
                    observation.mac.clone(),
                    Device {
                        mac: observation.mac.clone(),
                        ip: observation.ip.clone(),
                        hostname: None,
                        vendor: observation.vendor.clone(),
                        is_active: true,
                        first_seen: now,
                        last_seen: now,
                        alias: None,
                        is_trusted: false,
                    },
                );
                Ok(UpsertOutcome::Created)
            }
        }
    }

    fn deactivate_except(&self, seen_macs: &[String]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        let mut deactivated = 0;
        for device in inner.devices.values_mut() {
            if device.is_active && !seen_macs.contains(&device.mac) {
                device.is_active = false;
                deactivated += 1;
            }
        }
        Ok(deactivated)
    }

    fn append_log(&self, devices_online: u32) -> Result<ScanLog, StoreError> {
        let mut inner = self.inner.write();
        let entry = ScanLog {
            timestamp: Utc::now(),
            devices_online,
        };
        inner.logs.push(entry.clone());
        Ok(entry)
    }

    fn recent_logs(&self, limit: usize) -> Result<Vec<ScanLog>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.logs.iter().rev().take(limit).cloned().collect())
    }

    fn get_device(&self, mac: &str) -> Result<Option<Device>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.devices.get(mac).cloned())
    }

    fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let inner = self.inner.read();
        let mut devices: Vec<Device> = inner.devices.values().cloned().collect();
        devices.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        Ok(devices)
    }

    fn device_count(&self) -> Result<usize, StoreError> {
        let inner = self.inner.read();
        Ok(inner.devices.len())
    }
}
