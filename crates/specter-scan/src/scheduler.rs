//! Scan scheduling and the per-cycle pipeline.
//!
//! One cycle runs: subnet → probe → identity → reconcile → score → publish.
//! The daemon loop triggers a cycle at a fixed interval; a single-permit
//! semaphore guarantees at most one scan is in flight, so a slow cycle
//! causes skipped ticks rather than overlap.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::time::interval;
use uuid::Uuid;

use specter_core::{canonical_mac, Observation, ScanEvent};
use specter_store::InventoryStore;

use crate::config::ScanConfig;
use crate::enrich::GeoLocator;
use crate::error::{Result, ScanError};
use crate::probe::ArpScanner;
use crate::publish::ScanPublisher;
use crate::vendor::VendorDb;
use crate::{anomaly, reconcile, subnet};

/// What one completed cycle produced.
#[derive(Debug)]
pub struct CycleOutcome {
    pub scan_id: Uuid,
    pub count: u32,
    pub is_anomaly: bool,
    pub created: u32,
    pub deactivated: u32,
    pub duration: Duration,
}

/// Execute one full scan cycle against the live network.
pub async fn run_cycle(
    scanner: &ArpScanner,
    vendor_db: &VendorDb,
    store: &dyn InventoryStore,
    publisher: &ScanPublisher,
    config: &ScanConfig,
) -> Result<CycleOutcome> {
    let scan_id = Uuid::new_v4();
    let start = Instant::now();

    let network = match &config.subnet {
        Some(cidr) => cidr
            .parse()
            .map_err(|e| ScanError::Config(format!("invalid subnet {cidr}: {e}")))?,
        None => subnet::resolve_local_subnet(),
    };

    tracing::info!(scan_id = %scan_id, cidr = %network, "Starting discovery scan");

    let replies = scanner.sweep(network).await?;
    let observations: Vec<Observation> = replies
        .iter()
        .map(|reply| {
            let mac = canonical_mac(&reply.mac.to_string());
            let vendor = vendor_db.classify(&mac);
            Observation {
                mac,
                ip: reply.ip.to_string(),
                vendor,
            }
        })
        .collect();

    let locations = if config.geo_enabled {
        let ips: Vec<IpAddr> = observations.iter().filter_map(|o| o.ip.parse().ok()).collect();
        GeoLocator::new().locate(&ips).await
    } else {
        Vec::new()
    };

    let outcome = process_observations(scan_id, observations, locations, store, publisher, config)?;
    let outcome = CycleOutcome {
        duration: start.elapsed(),
        ..outcome
    };

    tracing::info!(
        scan_id = %scan_id,
        count = outcome.count,
        new = outcome.created,
        deactivated = outcome.deactivated,
        anomaly = outcome.is_anomaly,
        duration_ms = outcome.duration.as_millis() as u64,
        "Scan complete"
    );

    Ok(outcome)
}

/// Reconcile → score → publish.
///
/// Split from the probe so the persistence and model stages are drivable
/// with fabricated observations.
pub fn process_observations(
    scan_id: Uuid,
    observations: Vec<Observation>,
    locations: Vec<specter_core::GeoLocation>,
    store: &dyn InventoryStore,
    publisher: &ScanPublisher,
    config: &ScanConfig,
) -> Result<CycleOutcome> {
    let summary = reconcile::reconcile(store, &observations, config.deactivate_unseen)?;
    let is_anomaly = anomaly::assess(store, summary.observed, config)?;

    if is_anomaly {
        tracing::warn!(
            scan_id = %scan_id,
            count = summary.observed,
            "Device count is unusual for this segment"
        );
    }

    publisher.publish(ScanEvent::new(scan_id, is_anomaly, observations).with_locations(locations));

    Ok(CycleOutcome {
        scan_id,
        count: summary.observed,
        is_anomaly,
        created: summary.created,
        deactivated: summary.deactivated,
        duration: Duration::ZERO,
    })
}

/// The daemon loop: periodic scans with a non-overlap guard.
pub struct ScanScheduler {
    config: ScanConfig,
    scanner: ArpScanner,
    vendor_db: VendorDb,
    store: Arc<dyn InventoryStore>,
    publisher: ScanPublisher,
    in_flight: Arc<Semaphore>,
}

impl ScanScheduler {
    pub fn new(
        config: ScanConfig,
        scanner: ArpScanner,
        vendor_db: VendorDb,
        store: Arc<dyn InventoryStore>,
        publisher: ScanPublisher,
    ) -> Self {
        Self {
            config,
            scanner,
            vendor_db,
            store,
            publisher,
            in_flight: Arc::new(Semaphore::new(1)),
        }
    }

    /// Run scheduled scans forever. Cycle errors are logged and the loop
    /// continues on the next tick.
    pub async fn run(&self) -> Result<()> {
        let mut ticker = interval(Duration::from_secs(self.config.interval_secs));
        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Scheduler started"
        );

        loop {
            ticker.tick().await;

            let Ok(_permit) = self.in_flight.try_acquire() else {
                tracing::warn!("Previous scan still in flight; skipping this tick");
                continue;
            };

            if let Err(e) = run_cycle(
                &self.scanner,
                &self.vendor_db,
                self.store.as_ref(),
                &self.publisher,
                &self.config,
            )
            .await
            {
                tracing::error!(error = %e, "Scan cycle failed");
            }
        }
    }
}
