//! Static catalog of the waste streams OpenERZ knows about.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Describes a recognized waste stream and its presentation key.
pub struct WasteStreamDescriptor {
    /// Catalog token used in API requests.
    pub key: &'static str,
    /// Presentation key used for translations and labels.
    pub display_key: &'static str,
}

/// All waste streams the OpenERZ API reports, in catalog order.
pub const WASTE_STREAMS: &[WasteStreamDescriptor] = &[
    WasteStreamDescriptor {
        key: "bulky_goods",
        display_key: "bulky_goods",
    },
    WasteStreamDescriptor {
        key: "cardboard",
        display_key: "cardboard",
    },
    WasteStreamDescriptor {
        key: "cargotram",
        display_key: "cargotram",
    },
    WasteStreamDescriptor {
        key: "chipping",
        display_key: "chipping_service",
    },
    WasteStreamDescriptor {
        key: "etram",
        display_key: "etram",
    },
    WasteStreamDescriptor {
        key: "incombustibles",
        display_key: "incombustibles",
    },
    WasteStreamDescriptor {
        key: "metal",
        display_key: "metal",
    },
    WasteStreamDescriptor {
        key: "oekibus",
        display_key: "oekibus",
    },
    WasteStreamDescriptor {
        key: "organic",
        display_key: "organic",
    },
    WasteStreamDescriptor {
        key: "paper",
        display_key: "paper",
    },
    WasteStreamDescriptor {
        key: "special",
        display_key: "special",
    },
    WasteStreamDescriptor {
        key: "textile",
        display_key: "textile",
    },
    WasteStreamDescriptor {
        key: "waste",
        display_key: "waste",
    },
];

/// Look up the descriptor for a catalog token.
#[must_use]
pub fn descriptor(key: &str) -> Option<&'static WasteStreamDescriptor> {
    WASTE_STREAMS.iter().find(|stream| stream.key == key)
}

/// Presentation key for a stream, falling back to the raw token for streams
/// the catalog has added since this list was written.
#[must_use]
pub fn display_key(key: &str) -> &str {
    descriptor(key).map_or(key, |stream| stream.display_key)
}
