//! References to host-platform entities as written in form attributes.

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when parsing an [`EntityRef`].
#[derive(Debug, Error)]
pub enum EntityRefError {
    /// The input was empty or contained only whitespace.
    #[error("entity reference cannot be empty")]
    Empty,
    /// A mapping reference was missing its source or code part.
    #[error("mapping reference '{0}' must take the form SOURCE:CODE")]
    MalformedMapping(String),
}

/// How a form attribute refers to a host entity (concept, drug, provider...).
///
/// Attribute values are either a numeric internal id, a mapping-source
/// qualified code (`"CIEL:5089"`), or a UUID. Anything else is treated as a
/// plain name, which some lookups (drugs, locations) also accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityRef {
    /// A numeric internal id, e.g. `5089`.
    Id(i64),
    /// A mapping-source qualified code, e.g. `CIEL:5089`.
    Mapping { source: String, code: String },
    /// A UUID, e.g. `a3e12268-74bf-11df-9768-17cfc9833272`.
    Uuid(Uuid),
    /// A bare name, used by lookups that support it.
    Name(String),
}

impl EntityRef {
    /// Parses an attribute value into an `EntityRef`.
    ///
    /// Resolution precedence mirrors the lookup order of the concept
    /// dictionary: numeric id first, then `SOURCE:CODE` mapping, then UUID,
    /// then bare name.
    pub fn parse(input: &str) -> Result<Self, EntityRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EntityRefError::Empty);
        }
        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(EntityRef::Id(id));
        }
        if let Some((source, code)) = trimmed.split_once(':') {
            let source = source.trim();
            let code = code.trim();
            if source.is_empty() || code.is_empty() {
                return Err(EntityRefError::MalformedMapping(trimmed.to_owned()));
            }
            return Ok(EntityRef::Mapping {
                source: source.to_owned(),
                code: code.to_owned(),
            });
        }
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(EntityRef::Uuid(uuid));
        }
        Ok(EntityRef::Name(trimmed.to_owned()))
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityRef::Id(id) => write!(f, "{}", id),
            EntityRef::Mapping { source, code } => write!(f, "{}:{}", source, code),
            EntityRef::Uuid(uuid) => write!(f, "{}", uuid),
            EntityRef::Name(name) => write!(f, "{}", name),
        }
    }
}
