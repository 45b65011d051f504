//! High-level service facade tying the wizard, registry and schedulers together.

use std::sync::Arc;

use tracing::{info, warn};

use crate::model::{ConfigEntry, EntryId, PickupOccurrence, StreamKey};
use crate::ports::CatalogPort;
use crate::registry::{EntryRegistry, RegistryError};
use crate::resolver;
use crate::scheduler::{PickupScheduler, RefreshError};
use crate::wizard::{WizardEngine, WizardResult};

/// Per-stream results of refreshing one entry.
pub type RefreshReport = Vec<(StreamKey, Result<Option<PickupOccurrence>, RefreshError>)>;

/// Public entry point for hosts configuring jurisdictions and polling pickups.
pub struct OpenErzService {
    catalog: Arc<dyn CatalogPort>,
    registry: EntryRegistry,
    lookahead_days: u32,
}

impl OpenErzService {
    /// Create a service bound to a catalog. Schedulers it builds search
    /// `lookahead_days` forward.
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogPort>, lookahead_days: u32) -> Self {
        Self {
            catalog,
            registry: EntryRegistry::new(),
            lookahead_days,
        }
    }

    /// Begin a wizard session aware of every configured jurisdiction.
    #[must_use]
    pub fn start_wizard(&self) -> WizardEngine {
        WizardEngine::new(Arc::clone(&self.catalog), self.registry.unique_ids())
    }

    /// Turn a finished wizard session into a configured entry.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateJurisdiction`] if the jurisdiction was
    /// configured while the session was running, or any error of
    /// [`OpenErzService::add_entry`].
    pub fn configure(&mut self, result: WizardResult) -> Result<EntryId, RegistryError> {
        let entry = ConfigEntry::new(self.registry.next_id(), result.selection, result.canonical);
        self.add_entry(entry)
    }

    /// Register an entry, e.g. one restored from persisted configuration.
    ///
    /// The unique id is re-derived from region and area, so a hand-edited id
    /// cannot sidestep the duplicate check.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::NoWasteTypes`] if the entry selects no streams.
    /// - [`RegistryError::DuplicateJurisdiction`] if another entry has the
    ///   same unique id.
    /// - [`RegistryError::DuplicateEntry`] if the entry id is taken.
    pub fn add_entry(&mut self, mut entry: ConfigEntry) -> Result<EntryId, RegistryError> {
        let derived = resolver::unique_id(&entry.region, entry.area.as_deref());
        if derived != entry.unique_id {
            warn!(stored = %entry.unique_id, %derived, "replacing stale unique id");
            entry.unique_id = derived;
        }
        if entry.waste_types.is_empty() {
            return Err(RegistryError::NoWasteTypes(entry.unique_id));
        }

        let scheduler = PickupScheduler::new(&entry, Arc::clone(&self.catalog), self.lookahead_days);
        let unique_id = entry.unique_id.clone();
        let id = self.registry.insert(entry, scheduler)?;
        info!(entry = %id, %unique_id, "entry configured");
        Ok(id)
    }

    /// Remove an entry and discard its scheduler.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEntry`] if the id is not registered.
    pub fn remove_entry(&mut self, id: EntryId) -> Result<ConfigEntry, RegistryError> {
        let entry = self.registry.remove(id)?;
        info!(entry = %id, unique_id = %entry.unique_id, "entry removed");
        Ok(entry)
    }

    /// Registry of configured entries.
    #[must_use]
    pub fn registry(&self) -> &EntryRegistry {
        &self.registry
    }

    /// Copies of all configured entries, for persistence.
    #[must_use]
    pub fn entries(&self) -> Vec<ConfigEntry> {
        self.registry
            .iter()
            .map(|registered| registered.entry.clone())
            .collect()
    }

    /// Refresh every stream of an entry concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownEntry`] if the id is not registered.
    pub async fn refresh_entry(&self, id: EntryId) -> Result<RefreshReport, RegistryError> {
        let scheduler = self
            .registry
            .scheduler(id)
            .ok_or(RegistryError::UnknownEntry(id))?;
        Ok(scheduler.refresh_all().await)
    }
}
