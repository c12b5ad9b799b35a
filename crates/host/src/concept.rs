//! The host concept dictionary entries form attributes resolve against.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The datatype of a concept, which decides what kind of value an obs for
/// that concept carries and what kind of input control a form renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConceptDatatype {
    Numeric,
    Text,
    Date,
    Coded,
    Boolean,
}

/// A mapping-source qualified code attached to a concept, e.g. `CIEL:5089`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptMapping {
    pub source: String,
    pub code: String,
}

/// One entry in the host concept dictionary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub datatype: ConceptDatatype,
    /// Mapping-source qualified codes this concept answers to.
    #[serde(default)]
    pub mappings: Vec<ConceptMapping>,
}

impl Concept {
    /// A concept with no mappings; convenient for fixtures.
    pub fn new(id: i64, name: impl Into<String>, datatype: ConceptDatatype) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            name: name.into(),
            datatype,
            mappings: Vec::new(),
        }
    }

    /// Whether this concept carries the given mapping.
    pub fn has_mapping(&self, source: &str, code: &str) -> bool {
        self.mappings
            .iter()
            .any(|m| m.source.eq_ignore_ascii_case(source) && m.code.eq_ignore_ascii_case(code))
    }
}
