//! Inventory reconciliation.
//!
//! Merges one cycle's observation set into the device table: upsert per
//! observed device, bulk absence marking per the configured policy, and
//! exactly one scan log append. A single device failing to persist never
//! aborts the rest of the batch.

use chrono::Utc;

use specter_core::Observation;
use specter_store::{InventoryStore, UpsertOutcome};

use crate::error::Result;

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleSummary {
    /// Devices observed active this cycle.
    pub observed: u32,
    /// Rows created (first-ever observation).
    pub created: u32,
    /// Rows overwritten in place.
    pub updated: u32,
    /// Per-device upsert failures (logged, not fatal).
    pub failed: u32,
    /// Devices demoted by the absence policy.
    pub deactivated: u32,
}

/// Reconcile one cycle's observations into the inventory.
///
/// When `deactivate_unseen` is set, every inventory device absent from
/// `observations` is marked inactive. The scan log entry records the
/// observed count regardless of individual upsert failures.
pub fn reconcile(
    store: &dyn InventoryStore,
    observations: &[Observation],
    deactivate_unseen: bool,
) -> Result<CycleSummary> {
    let now = Utc::now();
    let mut summary = CycleSummary {
        observed: observations.len() as u32,
        ..Default::default()
    };

    let mut seen_macs = Vec::with_capacity(observations.len());
    for observation in observations {
        // Observed is observed: a failed upsert must not get the device
        // demoted by the absence pass below.
        seen_macs.push(observation.mac.clone());

        match store.upsert_device(observation, now) {
            Ok(UpsertOutcome::Created) => {
                summary.created += 1;
                tracing::info!(
                    mac = %observation.mac,
                    ip = %observation.ip,
                    vendor = %observation.vendor,
                    "New device discovered"
                );
            }
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(mac = %observation.mac, error = %e, "Device upsert failed");
            }
        }
    }

    if deactivate_unseen {
        summary.deactivated = store.deactivate_except(&seen_macs)? as u32;
        if summary.deactivated > 0 {
            tracing::debug!(deactivated = summary.deactivated, "Marked unseen devices inactive");
        }
    }

    store.append_log(summary.observed)?;

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use specter_core::{Device, ScanLog};
    use specter_store::{MemoryStore, StoreError};

    fn observation(mac: &str, ip: &str) -> Observation {
        Observation {
            mac: mac.to_string(),
            ip: ip.to_string(),
            vendor: "Unknown".to_string(),
        }
    }

    #[test]
    fn reconcile_is_idempotent_on_identical_input() {
        let store = MemoryStore::new();
        let observations = vec![
            observation("AA:BB:CC:DD:EE:01", "10.0.0.5"),
            observation("AA:BB:CC:DD:EE:02", "10.0.0.6"),
        ];

        let first = reconcile(&store, &observations, true).unwrap();
        assert_eq!(first.created, 2);

        let second = reconcile(&store, &observations, true).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(second.deactivated, 0);
        assert_eq!(store.device_count().unwrap(), 2);
    }

    #[test]
    fn unseen_devices_are_deactivated_not_deleted() {
        let store = MemoryStore::new();
        let initial = vec![
            observation("AA:BB:CC:DD:EE:01", "10.0.0.1"),
            observation("AA:BB:CC:DD:EE:02", "10.0.0.2"),
            observation("AA:BB:CC:DD:EE:03", "10.0.0.3"),
        ];
        reconcile(&store, &initial, true).unwrap();

        let partial = vec![observation("AA:BB:CC:DD:EE:02", "10.0.0.2")];
        let summary = reconcile(&store, &partial, true).unwrap();

        assert_eq!(summary.observed, 1);
        assert_eq!(summary.deactivated, 2);
        assert_eq!(store.device_count().unwrap(), 3);

        let logs = store.recent_logs(1).unwrap();
        assert_eq!(logs[0].devices_online, 1);
    }

    #[test]
    fn never_deactivate_policy_leaves_absent_devices_active() {
        let store = MemoryStore::new();
        reconcile(&store, &[observation("AA:BB:CC:DD:EE:01", "10.0.0.1")], false).unwrap();

        let summary = reconcile(&store, &[], false).unwrap();
        assert_eq!(summary.deactivated, 0);

        let device = store.get_device("AA:BB:CC:DD:EE:01").unwrap().unwrap();
        assert!(device.is_active);
    }

    #[test]
    fn each_cycle_appends_exactly_one_log() {
        let store = MemoryStore::new();
        reconcile(&store, &[observation("AA:BB:CC:DD:EE:01", "10.0.0.1")], true).unwrap();
        reconcile(&store, &[], true).unwrap();

        let logs = store.recent_logs(10).unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].devices_online, 0);
        assert_eq!(logs[1].devices_online, 1);
    }

    /// Store that rejects upserts for one poisoned MAC.
    struct FlakyStore {
        inner: MemoryStore,
        poisoned: String,
    }

    impl InventoryStore for FlakyStore {
        fn upsert_device(
            &self,
            observation: &Observation,
            now: DateTime<Utc>,
        ) -> std::result::Result<UpsertOutcome, StoreError> {
            if observation.mac == self.poisoned {
                return Err(StoreError::Backend("constraint violation".to_string()));
            }
            self.inner.upsert_device(observation, now)
        }

        fn deactivate_except(&self, seen: &[String]) -> std::result::Result<usize, StoreError> {
            self.inner.deactivate_except(seen)
        }

        fn append_log(&self, count: u32) -> std::result::Result<ScanLog, StoreError> {
            self.inner.append_log(count)
        }

        fn recent_logs(&self, limit: usize) -> std::result::Result<Vec<ScanLog>, StoreError> {
            self.inner.recent_logs(limit)
        }

        fn get_device(&self, mac: &str) -> std::result::Result<Option<Device>, StoreError> {
            self.inner.get_device(mac)
        }

        fn list_devices(&self) -> std::result::Result<Vec<Device>, StoreError> {
            self.inner.list_devices()
        }

        fn device_count(&self) -> std::result::Result<usize, StoreError> {
            self.inner.device_count()
        }
    }

    #[test]
    fn one_failing_upsert_does_not_abort_the_batch() {
        let store = FlakyStore {
            inner: MemoryStore::new(),
            poisoned: "AA:BB:CC:DD:EE:02".to_string(),
        };
        let observations = vec![
            observation("AA:BB:CC:DD:EE:01", "10.0.0.1"),
            observation("AA:BB:CC:DD:EE:02", "10.0.0.2"),
            observation("AA:BB:CC:DD:EE:03", "10.0.0.3"),
        ];

        let summary = reconcile(&store, &observations, true).unwrap();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.failed, 1);

        // The cycle still logs what was actually observed.
        let logs = store.recent_logs(1).unwrap();
        assert_eq!(logs[0].devices_online, 3);
    }
}
