//! Per-jurisdiction pickup scheduler with one tracker per waste stream.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Local, NaiveDate, Utc};
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::model::{ConfigEntry, DateRange, Jurisdiction, PickupOccurrence, StreamKey, UniqueId};
use crate::ports::{CatalogPort, PortError};
use crate::streams;

/// Days searched forward for the next pickup unless configured otherwise.
pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 31;

#[derive(thiserror::Error, Debug)]
/// Errors scoped to the refresh of a single stream.
pub enum RefreshError {
    /// The catalog lookup failed; the cached value was kept.
    #[error("Refresh of {stream_key} failed: {source}")]
    RefreshFailed {
        /// Stream whose refresh failed.
        stream_key: StreamKey,
        /// Underlying catalog error.
        #[source]
        source: PortError,
    },
    /// Another refresh of the same stream has not finished yet.
    #[error("Refresh of {stream_key} already in progress")]
    RefreshInProgress {
        /// Stream that is busy.
        stream_key: StreamKey,
    },
    /// The scheduler does not track this stream.
    #[error("Unknown stream: {0}")]
    UnknownStream(StreamKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Cached state of one waste stream.
pub struct StreamTracker {
    stream_key: StreamKey,
    last_known: Option<PickupOccurrence>,
    last_refresh: Option<DateTime<Utc>>,
}

impl StreamTracker {
    fn new(stream_key: StreamKey) -> Self {
        Self {
            stream_key,
            last_known: None,
            last_refresh: None,
        }
    }

    /// Stream this tracker belongs to.
    #[must_use]
    pub fn stream_key(&self) -> &StreamKey {
        &self.stream_key
    }

    /// Latest pickup found by a successful refresh.
    #[must_use]
    pub fn last_known(&self) -> Option<&PickupOccurrence> {
        self.last_known.as_ref()
    }

    /// Time of the latest successful refresh.
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Presentation-facing view of a tracker.
pub struct SensorReading {
    /// Stable sensor id, `"{unique_id}_{stream}"` in lowercase.
    pub sensor_id: String,
    /// Stream token.
    pub stream_key: StreamKey,
    /// Presentation key of the stream.
    pub display_key: String,
    /// Date of the next pickup, if one is scheduled.
    pub state: Option<NaiveDate>,
    /// `station` and `description` when the catalog supplied them.
    pub attributes: BTreeMap<String, String>,
    /// Time of the latest successful refresh.
    pub last_refresh: Option<DateTime<Utc>>,
}

struct TrackerSlot {
    // held for the whole refresh, including the catalog call
    in_flight: Mutex<()>,
    tracker: RwLock<StreamTracker>,
}

/// Resolves the next pickup of every selected stream of one jurisdiction.
pub struct PickupScheduler {
    unique_id: UniqueId,
    jurisdiction: Jurisdiction,
    catalog: Arc<dyn CatalogPort>,
    lookahead_days: u32,
    slots: BTreeMap<StreamKey, TrackerSlot>,
}

impl PickupScheduler {
    /// Create a scheduler for a configuration entry, one tracker per stream.
    #[must_use]
    pub fn new(entry: &ConfigEntry, catalog: Arc<dyn CatalogPort>, lookahead_days: u32) -> Self {
        let slots = entry
            .waste_types
            .iter()
            .map(|key| {
                let slot = TrackerSlot {
                    in_flight: Mutex::new(()),
                    tracker: RwLock::new(StreamTracker::new(key.clone())),
                };
                (key.clone(), slot)
            })
            .collect();

        Self {
            unique_id: entry.unique_id.clone(),
            jurisdiction: entry.jurisdiction(),
            catalog,
            lookahead_days,
            slots,
        }
    }

    /// Jurisdiction this scheduler was built for.
    #[must_use]
    pub fn jurisdiction(&self) -> &Jurisdiction {
        &self.jurisdiction
    }

    /// Configured lookahead window in days.
    #[must_use]
    pub fn lookahead_days(&self) -> u32 {
        self.lookahead_days
    }

    /// Streams tracked by this scheduler, in key order.
    pub fn stream_keys(&self) -> impl Iterator<Item = &StreamKey> {
        self.slots.keys()
    }

    /// Snapshot of the tracker for a stream.
    #[must_use]
    pub fn tracker(&self, key: &StreamKey) -> Option<StreamTracker> {
        self.slots.get(key).map(|slot| {
            slot.tracker
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        })
    }

    /// Presentation view of a stream's cached state.
    #[must_use]
    pub fn reading(&self, key: &StreamKey) -> Option<SensorReading> {
        let tracker = self.tracker(key)?;
        let mut attributes = BTreeMap::new();
        if let Some(pickup) = tracker.last_known() {
            if let Some(station) = &pickup.station {
                attributes.insert("station".to_owned(), station.clone());
            }
            if let Some(description) = &pickup.description {
                attributes.insert("description".to_owned(), description.clone());
            }
        }

        Some(SensorReading {
            sensor_id: format!("{}_{}", self.unique_id, key).to_lowercase(),
            stream_key: key.clone(),
            display_key: streams::display_key(key.as_str()).to_owned(),
            state: tracker.last_known().map(|pickup| pickup.date),
            attributes,
            last_refresh: tracker.last_refresh(),
        })
    }

    /// Refresh one stream relative to today's local date.
    ///
    /// # Errors
    ///
    /// See [`PickupScheduler::refresh_from`].
    pub async fn refresh(&self, key: &StreamKey) -> Result<Option<PickupOccurrence>, RefreshError> {
        self.refresh_from(key, Local::now().date_naive()).await
    }

    /// Look up the earliest pickup of a stream within the lookahead window
    /// starting at `today` and cache it.
    ///
    /// Finding no pickup is a success and clears the cached value.
    ///
    /// # Errors
    ///
    /// - [`RefreshError::UnknownStream`] if the stream is not tracked.
    /// - [`RefreshError::RefreshInProgress`] if the stream is already refreshing.
    /// - [`RefreshError::RefreshFailed`] if the catalog call failed; the cached
    ///   value is left untouched.
    #[instrument(skip(self), fields(unique_id = %self.unique_id))]
    pub async fn refresh_from(
        &self,
        key: &StreamKey,
        today: NaiveDate,
    ) -> Result<Option<PickupOccurrence>, RefreshError> {
        let slot = self
            .slots
            .get(key)
            .ok_or_else(|| RefreshError::UnknownStream(key.clone()))?;

        let _in_flight = slot
            .in_flight
            .try_lock()
            .map_err(|_busy| RefreshError::RefreshInProgress {
                stream_key: key.clone(),
            })?;

        let range = DateRange::forward(today, self.lookahead_days);
        let occurrences = match self
            .catalog
            .occurrences(&self.jurisdiction, key, range)
            .await
        {
            Ok(occurrences) => occurrences,
            Err(source) => {
                warn!(error = %source, "pickup lookup failed, keeping cached value");
                return Err(RefreshError::RefreshFailed {
                    stream_key: key.clone(),
                    source,
                });
            }
        };

        let next = earliest(occurrences, range);
        info!(next = ?next.as_ref().map(|pickup| pickup.date), "pickup refreshed");

        let mut tracker = slot
            .tracker
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tracker.last_known.clone_from(&next);
        tracker.last_refresh = Some(Utc::now());

        Ok(next)
    }

    /// Refresh every stream concurrently. One stream failing does not affect
    /// the others.
    pub async fn refresh_all(
        &self,
    ) -> Vec<(StreamKey, Result<Option<PickupOccurrence>, RefreshError>)> {
        let today = Local::now().date_naive();
        join_all(self.slots.keys().map(|key| async move {
            (key.clone(), self.refresh_from(key, today).await)
        }))
        .await
    }
}

fn earliest(occurrences: Vec<PickupOccurrence>, range: DateRange) -> Option<PickupOccurrence> {
    occurrences
        .into_iter()
        .filter(|pickup| range.contains(pickup.date))
        .min_by_key(|pickup| pickup.date)
}
