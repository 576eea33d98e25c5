//! Which record fields are worth inspecting for addresses.

use crate::config::SchemaMode;
use crate::record::{Record, INTERNAL_FIELD_PREFIX};

/// Well-known schema fields that carry addresses, with the prefix their derived fields
/// are written under in strict mode.
pub static FIELD_MAPPING: &[(&str, &str)] = &[
    ("source_ip", "source"),
    ("host_ip", "host"),
    ("destination_ip", "destination"),
];

/// Output prefix for a well-known address field.
#[inline]
pub fn mapped_prefix(field: &str) -> Option<&'static str> {
    FIELD_MAPPING
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, prefix)| *prefix)
}

/// Selects candidate address fields from a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldSelector {
    mode: SchemaMode,
}

impl FieldSelector {
    pub fn new(mode: SchemaMode) -> Self {
        Self { mode }
    }

    /// Lazily yield candidate field names in the record's own enumeration order.
    ///
    /// Strict mode keeps only fields from [`FIELD_MAPPING`]; legacy mode keeps every
    /// field. Internal fields are never candidates.
    pub fn candidates<'r, R: Record>(
        &self,
        record: &'r R,
    ) -> impl Iterator<Item = &'r str> + 'r {
        let mode = self.mode;
        record.field_names().filter(move |name| {
            !name.starts_with(INTERNAL_FIELD_PREFIX)
                && (mode == SchemaMode::Legacy || mapped_prefix(name).is_some())
        })
    }
}
