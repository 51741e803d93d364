//! Device identity resolution.
//!
//! Classifies a hardware address as vendor-identified, privacy-randomized,
//! or unknown. Classification degrades gracefully: a missing or stale OUI
//! table must never abort discovery.

use mac_oui::Oui;

use specter_core::types::{
    canonical_mac, VENDOR_LOOKUP_FAILED, VENDOR_PRIVATE, VENDOR_UNKNOWN, VENDOR_UNRESOLVED,
};

/// OUI vendor table, possibly absent when the bundled database failed to
/// load.
pub struct VendorDb {
    db: Option<Oui>,
}

impl VendorDb {
    /// Load the bundled IEEE OUI database. A load failure disables vendor
    /// lookups but never fails the caller.
    pub fn load() -> Self {
        match Oui::default() {
            Ok(db) => Self { db: Some(db) },
            Err(e) => {
                tracing::warn!(error = ?e, "OUI database failed to load; vendor lookups disabled");
                Self { db: None }
            }
        }
    }

    /// A resolver with no table at all; every non-randomized address
    /// classifies as the unresolved default.
    pub fn unavailable() -> Self {
        Self { db: None }
    }

    /// Classify a hardware address into a vendor string.
    ///
    /// Locally-administered addresses short-circuit before any table
    /// lookup: their prefix carries no vendor information.
    pub fn classify(&self, raw_mac: &str) -> String {
        let mac = canonical_mac(raw_mac);
        if is_locally_administered(&mac) {
            return VENDOR_PRIVATE.to_string();
        }

        let Some(db) = &self.db else {
            return VENDOR_UNRESOLVED.to_string();
        };

        match db.lookup_by_mac(&mac) {
            Ok(Some(entry)) => entry.company_name.clone(),
            Ok(None) => VENDOR_UNKNOWN.to_string(),
            Err(e) => {
                tracing::debug!(mac = %mac, error = ?e, "OUI lookup errored");
                VENDOR_LOOKUP_FAILED.to_string()
            }
        }
    }
}

/// True when the second hex digit of the first octet is 2, 6, A, or E —
/// the locally-administered bit reserved for randomized addresses.
fn is_locally_administered(mac: &str) -> bool {
    matches!(mac.as_bytes().get(1), Some(b'2' | b'6' | b'A' | b'E'))
}
