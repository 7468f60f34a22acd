use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the attribute carrying the preserve flag in ingested documents.
pub const PRESERVE_FIELD: &str = "preserve";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldPolicy {
    pub included: bool,
}

/// Per-field encoding table: which field names reach the text encoder.
///
/// Fields absent from the table are included. Excluded fields are treated as
/// absent by the collapser, so a branch holding only excluded fields
/// collapses like an empty one. The default table excludes
/// [`PRESERVE_FIELD`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SerializationPolicy {
    fields: BTreeMap<String, FieldPolicy>,
}

impl SerializationPolicy {
    /// A table with no entries; every field is included.
    pub fn empty() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    /// Table excluding the attribute that carries the preserve flag under
    /// `preserve_key`.
    pub fn for_preserve_key(preserve_key: &str) -> Self {
        Self::empty().exclude(preserve_key)
    }

    pub fn exclude(mut self, field: &str) -> Self {
        self.fields
            .insert(field.to_string(), FieldPolicy { included: false });
        self
    }

    pub fn include(mut self, field: &str) -> Self {
        self.fields
            .insert(field.to_string(), FieldPolicy { included: true });
        self
    }

    pub fn is_included(&self, field: &str) -> bool {
        self.fields.get(field).is_none_or(|p| p.included)
    }

    /// Overlay `other` onto `self`; entries in `other` win.
    pub fn merge(mut self, other: &SerializationPolicy) -> Self {
        for (name, policy) in &other.fields {
            self.fields.insert(name.clone(), *policy);
        }
        self
    }
}

impl Default for SerializationPolicy {
    fn default() -> Self {
        Self::for_preserve_key(PRESERVE_FIELD)
    }
}
