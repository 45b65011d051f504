//! Registry of configured entries and their schedulers.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use crate::model::{ConfigEntry, EntryId, UniqueId};
use crate::scheduler::PickupScheduler;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Errors raised when changing the set of configured entries.
pub enum RegistryError {
    /// Another entry already covers this jurisdiction.
    #[error("Jurisdiction {0} is already configured")]
    DuplicateJurisdiction(UniqueId),
    /// Another entry already uses this entry id.
    #[error("Entry {0} already exists")]
    DuplicateEntry(EntryId),
    /// The entry selects no waste streams.
    #[error("Entry for {0} has no waste types")]
    NoWasteTypes(UniqueId),
    /// No entry with this id exists.
    #[error("Unknown entry {0}")]
    UnknownEntry(EntryId),
}

/// A configuration entry together with its live scheduler.
pub struct RegisteredEntry {
    /// Persisted configuration.
    pub entry: ConfigEntry,
    /// Scheduler built from the configuration.
    pub scheduler: Arc<PickupScheduler>,
}

/// Host-owned set of configured jurisdictions, keyed by entry id.
#[derive(Default)]
pub struct EntryRegistry {
    entries: BTreeMap<EntryId, RegisteredEntry>,
}

impl EntryRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier for the next entry, one past the highest in use.
    #[must_use]
    pub fn next_id(&self) -> EntryId {
        EntryId(
            self.entries
                .keys()
                .next_back()
                .map_or(1, |last| last.0.saturating_add(1)),
        )
    }

    /// Add an entry and its scheduler.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::DuplicateJurisdiction`] when an entry with the same
    ///   unique id exists.
    /// - [`RegistryError::DuplicateEntry`] when the entry id is taken.
    pub fn insert(
        &mut self,
        entry: ConfigEntry,
        scheduler: PickupScheduler,
    ) -> Result<EntryId, RegistryError> {
        if self.contains(&entry.unique_id) {
            return Err(RegistryError::DuplicateJurisdiction(entry.unique_id));
        }
        let id = entry.entry_id;
        match self.entries.entry(id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateEntry(id)),
            Entry::Vacant(slot) => {
                slot.insert(RegisteredEntry {
                    entry,
                    scheduler: Arc::new(scheduler),
                });
                Ok(id)
            }
        }
    }

    /// Remove an entry, dropping its scheduler and all tracker state.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEntry`] when the id is not registered.
    pub fn remove(&mut self, id: EntryId) -> Result<ConfigEntry, RegistryError> {
        self.entries
            .remove(&id)
            .map(|registered| registered.entry)
            .ok_or(RegistryError::UnknownEntry(id))
    }

    /// Whether an entry uses this unique id.
    #[must_use]
    pub fn contains(&self, unique_id: &UniqueId) -> bool {
        self.entries
            .values()
            .any(|registered| registered.entry.unique_id == *unique_id)
    }

    /// Unique ids of all entries.
    #[must_use]
    pub fn unique_ids(&self) -> Vec<UniqueId> {
        self.entries
            .values()
            .map(|registered| registered.entry.unique_id.clone())
            .collect()
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: EntryId) -> Option<&RegisteredEntry> {
        self.entries.get(&id)
    }

    /// Scheduler of an entry.
    #[must_use]
    pub fn scheduler(&self, id: EntryId) -> Option<Arc<PickupScheduler>> {
        self.entries
            .get(&id)
            .map(|registered| Arc::clone(&registered.scheduler))
    }

    /// Iterator over entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredEntry> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
