//! Trait describing the remote catalog and shared error type.

use async_trait::async_trait;
use chrono::ParseError as ChronoParseError;
use reqwest::Error as ReqwestError;

use crate::model::{DateRange, Jurisdiction, PickupOccurrence, StreamKey};

#[derive(thiserror::Error, Debug)]
/// Errors that can occur while talking to the catalog backend.
pub enum PortError {
    /// Network layer failed.
    #[error("Network error: {0}")]
    Network(#[from] ReqwestError),
    /// Failed to parse a date from the catalog response.
    #[error("Parse error: {0}")]
    Parse(#[from] ChronoParseError),
    /// The catalog answered but reported a failure.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
/// Remote catalog of regions, areas, waste streams and pickup dates.
pub trait CatalogPort: Send + Sync {
    /// List all regions, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the catalog request fails.
    async fn regions(&self) -> Result<Vec<String>, PortError>;

    /// List the sub-areas of a region. An empty list means the region has none.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the catalog request fails.
    async fn areas(&self, region: &str) -> Result<Vec<String>, PortError>;

    /// List the waste streams collected in a region.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the catalog request fails.
    async fn waste_types(&self, region: &str) -> Result<Vec<String>, PortError>;

    /// Fetch pickups of one stream for a jurisdiction within the given range.
    ///
    /// # Errors
    ///
    /// Returns a [`PortError`] when the catalog request fails.
    async fn occurrences(
        &self,
        jurisdiction: &Jurisdiction,
        stream: &StreamKey,
        range: DateRange,
    ) -> Result<Vec<PickupOccurrence>, PortError>;
}
