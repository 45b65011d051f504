//! In-memory catalog used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Semaphore;

use crate::model::{DateRange, Jurisdiction, PickupOccurrence, StreamKey};
use crate::ports::{CatalogPort, PortError};

#[derive(Default)]
pub(crate) struct FakeCatalog {
    pub(crate) regions: Vec<String>,
    pub(crate) areas: HashMap<String, Vec<String>>,
    pub(crate) types: HashMap<String, Vec<String>>,
    pub(crate) pickups: HashMap<String, Vec<PickupOccurrence>>,
    /// Calls named here (`regions`, `areas`, `types` or a stream key) fail.
    pub(crate) failing: Mutex<HashSet<String>>,
    /// When set, occurrence lookups wait for a permit before answering.
    pub(crate) gate: Option<Arc<Semaphore>>,
    pub(crate) occurrence_calls: AtomicUsize,
    pub(crate) catalog_calls: AtomicUsize,
    pub(crate) last_range: Mutex<Option<DateRange>>,
}

impl FakeCatalog {
    pub(crate) fn fail(&self, call: &str) {
        self.failing.lock().unwrap().insert(call.to_owned());
    }

    pub(crate) fn recover(&self, call: &str) {
        self.failing.lock().unwrap().remove(call);
    }

    fn check(&self, call: &str) -> Result<(), PortError> {
        if self.failing.lock().unwrap().contains(call) {
            return Err(PortError::Unavailable(format!("{call} offline")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogPort for FakeCatalog {
    async fn regions(&self) -> Result<Vec<String>, PortError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.check("regions")?;
        Ok(self.regions.clone())
    }

    async fn areas(&self, region: &str) -> Result<Vec<String>, PortError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.check("areas")?;
        Ok(self.areas.get(region).cloned().unwrap_or_default())
    }

    async fn waste_types(&self, region: &str) -> Result<Vec<String>, PortError> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.check("types")?;
        Ok(self.types.get(region).cloned().unwrap_or_default())
    }

    async fn occurrences(
        &self,
        _jurisdiction: &Jurisdiction,
        stream: &StreamKey,
        range: DateRange,
    ) -> Result<Vec<PickupOccurrence>, PortError> {
        self.occurrence_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_range.lock().unwrap() = Some(range);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        self.check(stream.as_str())?;
        // Unfiltered: the range is recorded, not applied.
        Ok(self.pickups.get(stream.as_str()).cloned().unwrap_or_default())
    }
}

pub(crate) fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_owned()).collect()
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn pickup(on: NaiveDate) -> PickupOccurrence {
    PickupOccurrence {
        date: on,
        station: None,
        description: None,
    }
}
