//! # Inventory Projection
//!
//! Joins the shared catalog with one account's overrides into the
//! [`Medicine`] view the rest of the system consumes.
//!
//! ```text
//! definitions: [A, B, C]        overrides: { A: {...}, C: {...} }
//!        │                               │
//!        └──────────── project ──────────┘
//!                         │
//!                         ▼
//!     [A + A's data, B + defaults, C + C's data]
//! ```
//!
//! The join is one pass over definitions with a map lookup each, so it is
//! cheap enough to call after every mutation instead of caching.

use std::collections::BTreeMap;

use crate::identity::normalize_name;
use crate::types::{Medicine, MedicineDefinition, UserMedicineData};

/// Per-account overrides keyed by definition id.
///
/// Ordered so that serialization, and therefore diffed persistence, is
/// deterministic.
pub type OverrideMap = BTreeMap<String, UserMedicineData>;

/// Produces exactly one [`Medicine`] per definition, in catalog order.
pub fn project(definitions: &[MedicineDefinition], overrides: &OverrideMap) -> Vec<Medicine> {
    definitions
        .iter()
        .map(|def| Medicine::from_parts(def, overrides.get(&def.id)))
        .collect()
}

/// Sorts medicines by name, case-insensitively, for display.
pub fn sort_for_display(medicines: &mut [Medicine]) {
    medicines.sort_by_cached_key(|m| normalize_name(&m.name));
}

/// Filters by a case-insensitive substring of name, company or a tag.
///
/// An empty query matches everything.
pub fn search<'a>(medicines: &'a [Medicine], query: &str) -> Vec<&'a Medicine> {
    let needle = normalize_name(query);
    if needle.is_empty() {
        return medicines.iter().collect();
    }
    medicines
        .iter()
        .filter(|m| {
            m.name.to_lowercase().contains(&needle)
                || m.company.to_lowercase().contains(&needle)
                || m.tags.iter().any(|t| t.to_lowercase().contains(&needle))
        })
        .collect()
}
