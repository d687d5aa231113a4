//! # Medicine Identity
//!
//! The shared catalog and the rules that keep one definition per medicine.
//!
//! ## Resolve-or-Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_or_create("  Dolo 650 ", ...)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  normalize: trim + lowercase → "dolo 650"                               │
//! │       │                                                                 │
//! │       ├── in by_name index? ──► return existing id (fields untouched)   │
//! │       │                                                                 │
//! │       └── not found ──► new id from IdGenerator                         │
//! │                         push definition, index it, return new id        │
//! │                                                                         │
//! │  The lookup and the insert happen under one `&mut Catalog` borrow, so  │
//! │  two additions of the same name can never both miss the index.         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, CoreResult};
use crate::ids::IdGenerator;
use crate::types::MedicineDefinition;

/// Returns the deduplication key for a medicine name.
///
/// ## Example
/// ```rust
/// use pharmadesk_core::identity::normalize_name;
///
/// assert_eq!(normalize_name("  Dolo 650 "), "dolo 650");
/// ```
#[inline]
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Result of [`Catalog::resolve_or_create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: String,
    /// `true` when a new definition was appended.
    pub created: bool,
}

/// Result of [`Catalog::merge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    /// A definition with the same id is already present; skipped.
    IdExists,
    /// Another definition already owns the normalized name; skipped.
    /// Carries the id of the existing definition.
    NameTaken(String),
}

/// The medicine catalog shared by all accounts.
///
/// ## Invariants
/// - At most one definition per normalized name
/// - Ids are unique
/// - Definitions are never removed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<MedicineDefinition>", into = "Vec<MedicineDefinition>")]
pub struct Catalog {
    definitions: Vec<MedicineDefinition>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
    /// Ids of definitions dropped on load, mapped to the kept definition
    /// with the same normalized name.
    aliases: HashMap<String, String>,
}

impl PartialEq for Catalog {
    fn eq(&self, other: &Self) -> bool {
        self.definitions == other.definitions
    }
}

impl From<Vec<MedicineDefinition>> for Catalog {
    /// Builds the catalog from persisted definitions.
    ///
    /// Persisted data that breaks the invariants (repeated ids or names) keeps
    /// the first occurrence and logs the rest. A dropped definition whose
    /// name was taken is recorded as an alias of the kept one, so account
    /// data that refers to it can be re-pointed.
    fn from(definitions: Vec<MedicineDefinition>) -> Self {
        let mut catalog = Catalog::new();
        for def in definitions {
            let (id, name) = (def.id.clone(), def.name.clone());
            match catalog.merge(def) {
                MergeOutcome::Inserted => {}
                MergeOutcome::IdExists => {
                    warn!(%id, %name, "Dropping catalog definition with a repeated id");
                }
                MergeOutcome::NameTaken(kept) => {
                    warn!(%id, %name, %kept, "Dropping duplicate catalog definition");
                    catalog.aliases.insert(id, kept);
                }
            }
        }
        catalog
    }
}

impl From<Catalog> for Vec<MedicineDefinition> {
    fn from(catalog: Catalog) -> Self {
        catalog.definitions
    }
}

impl Catalog {
    pub fn new() -> Self {
        Catalog::default()
    }

    pub fn definitions(&self) -> &[MedicineDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&MedicineDefinition> {
        self.by_id.get(id).map(|&i| &self.definitions[i])
    }

    /// Dropped duplicate ids and the definitions that replaced them.
    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    /// Case-insensitive lookup on the trimmed name.
    pub fn find_by_name(&self, name: &str) -> Option<&MedicineDefinition> {
        self.by_name
            .get(&normalize_name(name))
            .map(|&i| &self.definitions[i])
    }

    /// Returns the id of the definition for `name`, creating it if needed.
    ///
    /// An existing definition keeps its company, type and tags. The caller
    /// must have validated `name` (see
    /// [`validate_medicine_name`](crate::validation::validate_medicine_name)).
    pub fn resolve_or_create(
        &mut self,
        ids: &dyn IdGenerator,
        name: &str,
        company: &str,
        medicine_type: &str,
        tags: &BTreeSet<String>,
    ) -> Resolution {
        let key = normalize_name(name);
        debug_assert!(!key.is_empty(), "resolve_or_create called with an empty name");

        if let Some(&i) = self.by_name.get(&key) {
            return Resolution {
                id: self.definitions[i].id.clone(),
                created: false,
            };
        }

        let id = ids.next_id();
        self.push(MedicineDefinition {
            id: id.clone(),
            name: name.trim().to_string(),
            company: company.trim().to_string(),
            medicine_type: medicine_type.trim().to_string(),
            tags: tags.clone(),
        });
        Resolution { id, created: true }
    }

    /// Replaces the shared fields of an existing definition.
    ///
    /// ## Errors
    /// - `MedicineNotFound` if `id` is unknown
    /// - `DuplicateMedicineName` if the new name belongs to another definition
    pub fn update(
        &mut self,
        id: &str,
        name: &str,
        company: &str,
        medicine_type: &str,
        tags: &BTreeSet<String>,
    ) -> CoreResult<()> {
        let index = *self
            .by_id
            .get(id)
            .ok_or_else(|| CoreError::MedicineNotFound(id.to_string()))?;

        let key = normalize_name(name);
        if let Some(&other) = self.by_name.get(&key) {
            if other != index {
                return Err(CoreError::DuplicateMedicineName { name: key });
            }
        }

        let old_key = self.definitions[index].normalized_name();
        let def = &mut self.definitions[index];
        def.name = name.trim().to_string();
        def.company = company.trim().to_string();
        def.medicine_type = medicine_type.trim().to_string();
        def.tags = tags.clone();

        if old_key != key {
            self.by_name.remove(&old_key);
            self.by_name.insert(key, index);
        }
        Ok(())
    }

    /// Adds a definition from an external source (backup import) unless its
    /// id or normalized name is already present.
    pub fn merge(&mut self, definition: MedicineDefinition) -> MergeOutcome {
        if self.by_id.contains_key(&definition.id) {
            return MergeOutcome::IdExists;
        }
        if let Some(existing) = self.find_by_name(&definition.name) {
            return MergeOutcome::NameTaken(existing.id.clone());
        }
        self.push(definition);
        MergeOutcome::Inserted
    }

    fn push(&mut self, definition: MedicineDefinition) {
        let index = self.definitions.len();
        self.by_id.insert(definition.id.clone(), index);
        self.by_name.insert(definition.normalized_name(), index);
        self.definitions.push(definition);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;

    fn no_tags() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn test_resolve_creates_then_reuses() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();

        let first = catalog.resolve_or_create(&ids, "Dolo 650", "Micro Labs", "Tablet", &no_tags());
        assert!(first.created);
        assert_eq!(first.id, "med-1");

        let second = catalog.resolve_or_create(&ids, "  DOLO 650  ", "Other", "Syrup", &no_tags());
        assert!(!second.created);
        assert_eq!(second.id, "med-1");
        assert_eq!(catalog.len(), 1);

        // Existing fields are not overwritten by a resolve
        let def = catalog.get("med-1").unwrap();
        assert_eq!(def.company, "Micro Labs");
        assert_eq!(def.medicine_type, "Tablet");
    }

    #[test]
    fn test_equivalent_names_in_any_order_share_one_definition() {
        let names = ["Azithral 500", "azithral 500 ", " AZITHRAL 500"];
        for rotation in 0..names.len() {
            let ids = SequentialIds::new("med");
            let mut catalog = Catalog::new();
            let resolved: Vec<String> = (0..names.len())
                .map(|i| names[(i + rotation) % names.len()])
                .map(|n| catalog.resolve_or_create(&ids, n, "", "", &no_tags()).id)
                .collect();
            assert!(resolved.iter().all(|id| id == &resolved[0]));
            assert_eq!(catalog.len(), 1);
        }
    }

    #[test]
    fn test_created_name_is_trimmed() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();
        let r = catalog.resolve_or_create(&ids, "  Pan 40 ", " Alkem ", "Tablet", &no_tags());
        let def = catalog.get(&r.id).unwrap();
        assert_eq!(def.name, "Pan 40");
        assert_eq!(def.company, "Alkem");
    }

    #[test]
    fn test_update_rejects_name_of_other_definition() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();
        let a = catalog.resolve_or_create(&ids, "Pan 40", "", "", &no_tags()).id;
        catalog.resolve_or_create(&ids, "Pan D", "", "", &no_tags());

        let err = catalog.update(&a, "pan d", "", "", &no_tags()).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateMedicineName { .. }));
        assert_eq!(catalog.get(&a).unwrap().name, "Pan 40");
    }

    #[test]
    fn test_update_reindexes_renamed_definition() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();
        let a = catalog.resolve_or_create(&ids, "Pan 40", "", "", &no_tags()).id;

        // Renaming to a different case of its own name is allowed
        catalog.update(&a, "PAN 40", "Alkem", "Tablet", &no_tags()).unwrap();
        catalog.update(&a, "Pantop 40", "Aristo", "Tablet", &no_tags()).unwrap();

        assert!(catalog.find_by_name("pan 40").is_none());
        assert_eq!(catalog.find_by_name("pantop 40").unwrap().id, a);
    }

    #[test]
    fn test_update_unknown_id() {
        let mut catalog = Catalog::new();
        let err = catalog.update("nope", "X", "", "", &no_tags()).unwrap_err();
        assert!(matches!(err, CoreError::MedicineNotFound(_)));
    }

    #[test]
    fn test_merge_skips_existing_id_and_name() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();
        let a = catalog.resolve_or_create(&ids, "Pan 40", "", "", &no_tags()).id;

        let same_id = MedicineDefinition {
            id: a.clone(),
            name: "Other".to_string(),
            company: String::new(),
            medicine_type: String::new(),
            tags: no_tags(),
        };
        assert_eq!(catalog.merge(same_id), MergeOutcome::IdExists);

        let same_name = MedicineDefinition {
            id: "imported-9".to_string(),
            name: "pan 40".to_string(),
            company: String::new(),
            medicine_type: String::new(),
            tags: no_tags(),
        };
        assert_eq!(catalog.merge(same_name), MergeOutcome::NameTaken(a));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_serde_round_trips_as_plain_array() {
        let ids = SequentialIds::new("med");
        let mut catalog = Catalog::new();
        catalog.resolve_or_create(&ids, "Pan 40", "Alkem", "Tablet", &no_tags());

        let json = serde_json::to_value(&catalog).unwrap();
        assert!(json.is_array());

        let back: Catalog = serde_json::from_value(json).unwrap();
        assert_eq!(back, catalog);
        assert!(back.find_by_name("PAN 40").is_some());
    }

    #[test]
    fn test_loading_drops_duplicate_names() {
        let json = r#"[
            {"id": "a", "name": "Pan 40"},
            {"id": "b", "name": "pan 40 "}
        ]"#;
        let catalog: Catalog = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_name("pan 40").unwrap().id, "a");
    }

    #[test]
    fn test_duplicate_names_on_load_become_aliases() {
        let def = |id: &str, name: &str| MedicineDefinition {
            id: id.to_string(),
            name: name.to_string(),
            company: String::new(),
            medicine_type: String::new(),
            tags: no_tags(),
        };
        let catalog = Catalog::from(vec![
            def("m1", "Pan 40"),
            def("m2", " PAN 40"),
            def("m1", "Other"),
        ]);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.aliases().get("m2").map(String::as_str), Some("m1"));
        assert_eq!(catalog.aliases().len(), 1);
    }
}
