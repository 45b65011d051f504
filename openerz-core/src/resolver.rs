//! Canonical identity of a jurisdiction.

use crate::model::{CanonicalJurisdiction, JurisdictionSelection, UniqueId};
use crate::normalize::normalize;

/// Freeze a selection into its canonical id and display name.
#[must_use]
pub fn resolve(selection: &JurisdictionSelection) -> CanonicalJurisdiction {
    canonical(&selection.region, selection.area.as_deref())
}

/// Canonical identity of a (region, area) pair.
///
/// Used both by [`resolve`] and by the wizard's duplicate check so both agree.
#[must_use]
pub fn canonical(region: &str, area: Option<&str>) -> CanonicalJurisdiction {
    CanonicalJurisdiction {
        unique_id: unique_id(region, area),
        display_name: parts(region, area)
            .iter()
            .map(|part| normalize(part))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

/// Deduplication key of a (region, area) pair.
#[must_use]
pub fn unique_id(region: &str, area: Option<&str>) -> UniqueId {
    UniqueId(parts(region, area).join("-").to_lowercase())
}

fn parts<'a>(region: &'a str, area: Option<&'a str>) -> Vec<&'a str> {
    [Some(region), area]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect()
}
