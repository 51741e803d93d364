//! specter-store: Inventory persistence boundary for Specter.
//!
//! The scan pipeline talks to the device table and scan log exclusively
//! through the `InventoryStore` trait, keeping the core free of storage
//! concerns. The in-memory backend supports concurrent dashboard readers
//! while a single scan writes.

pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{InventoryStore, StoreError, UpsertOutcome};
