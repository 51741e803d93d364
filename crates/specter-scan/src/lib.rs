//! specter-scan: LAN discovery scanner for the Specter device inventory.
//!
//! Runs periodic layer-2 ARP sweeps of the local segment, resolves device
//! identities against the OUI vendor table, reconciles results into the
//! inventory store, scores the population count with a freshly-fit outlier
//! model, and broadcasts one event per cycle to dashboard subscribers.

pub mod anomaly;
pub mod config;
pub mod enrich;
pub mod error;
pub mod probe;
pub mod publish;
pub mod reconcile;
pub mod scheduler;
pub mod subnet;
pub mod vendor;
