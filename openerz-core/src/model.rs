//! Domain data structures for jurisdictions, waste streams, and pickups.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Deduplication key of a configured jurisdiction, e.g. `zurich-8001`.
pub struct UniqueId(pub String);

impl fmt::Display for UniqueId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Catalog token identifying a waste stream, e.g. `paper`.
pub struct StreamKey(pub String);

impl StreamKey {
    /// Borrow the raw catalog token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for StreamKey {
    fn from(key: &str) -> Self {
        StreamKey(key.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Region and optional sub-area whose schedule applies.
pub struct Jurisdiction {
    /// Region token as reported by the catalog.
    pub region: String,
    /// Sub-area token; absent when the region has no sub-areas.
    pub area: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Finalized output of a wizard session.
pub struct JurisdictionSelection {
    /// Region token.
    pub region: String,
    /// Sub-area token, if the region has sub-areas.
    pub area: Option<String>,
    /// Selected waste streams, deduplicated and in lexical key order rather
    /// than submission order. Never empty once finalized.
    pub waste_types: BTreeSet<StreamKey>,
}

impl JurisdictionSelection {
    /// The (region, area) pair of this selection.
    #[must_use]
    pub fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction {
            region: self.region.clone(),
            area: self.area.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Canonical identity derived from a selection.
pub struct CanonicalJurisdiction {
    /// Lowercase, hyphen-joined region and area.
    pub unique_id: UniqueId,
    /// Normalized, space-joined region and area labels.
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A scheduled pickup returned by the catalog.
pub struct PickupOccurrence {
    /// Date of the pickup.
    pub date: NaiveDate,
    /// Collection station, for drop-off style streams.
    pub station: Option<String>,
    /// Free-text note from the catalog.
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Inclusive start/end range for requested schedules.
pub struct DateRange {
    /// Start date (inclusive).
    pub start: NaiveDate,
    /// End date (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering `days` days forward from `start`.
    #[must_use]
    pub fn forward(start: NaiveDate, days: u32) -> Self {
        let end = start
            .checked_add_days(chrono::Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    /// Whether `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Opaque identifier of a configuration entry held by the host.
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Persisted configuration entry for one jurisdiction.
pub struct ConfigEntry {
    /// Host-assigned identifier.
    pub entry_id: EntryId,
    /// Deduplication key.
    pub unique_id: UniqueId,
    /// Human-readable title, the canonical display name.
    pub title: String,
    /// Region token.
    pub region: String,
    /// Sub-area token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    /// Tracked waste streams, in lexical key order when written by the wizard.
    pub waste_types: Vec<StreamKey>,
}

impl ConfigEntry {
    /// Build an entry from a finished wizard session.
    #[must_use]
    pub fn new(
        entry_id: EntryId,
        selection: JurisdictionSelection,
        canonical: CanonicalJurisdiction,
    ) -> Self {
        Self {
            entry_id,
            unique_id: canonical.unique_id,
            title: canonical.display_name,
            region: selection.region,
            area: selection.area,
            waste_types: selection.waste_types.into_iter().collect(),
        }
    }

    /// The (region, area) pair of this entry.
    #[must_use]
    pub fn jurisdiction(&self) -> Jurisdiction {
        Jurisdiction {
            region: self.region.clone(),
            area: self.area.clone(),
        }
    }
}
