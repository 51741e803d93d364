//! specter-core: Shared types and events for Specter.
//!
//! This crate provides the foundational types used across all Specter
//! components:
//! - Inventory types (Device, ScanLog) for the device table
//! - Observation and enrichment types produced by the scan pipeline
//! - Event types broadcast to dashboard subscribers

pub mod events;
pub mod types;

pub use events::ScanEvent;
pub use types::{canonical_mac, Device, GeoLocation, Observation, ScanLog, ThreatVerdict};
