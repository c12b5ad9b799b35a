//! Template-assigned control identifiers.

use thiserror::Error;

/// Errors that can occur when creating a [`ControlId`].
#[derive(Debug, Error)]
pub enum ControlIdError {
    /// The input was empty or contained only whitespace.
    #[error("control id cannot be empty")]
    Empty,
    /// The input contained a character outside the allowed set.
    #[error("control id '{0}' contains invalid characters (only alphanumeric, '.', '-', '_' allowed)")]
    InvalidCharacters(String),
}

/// A stable identifier a form author assigns to a tag instance.
///
/// Control ids re-associate a rendered field with its underlying clinical
/// record across render/submit cycles. They are restricted to a conservative
/// character set because they are embedded in generated markup attributes and
/// in stored form field paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlId(String);

impl ControlId {
    /// Creates a new `ControlId` from the given input.
    ///
    /// The input is trimmed; an empty result or a disallowed character is an
    /// error.
    pub fn new(input: impl AsRef<str>) -> Result<Self, ControlIdError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ControlIdError::Empty);
        }
        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));
        if !ok {
            return Err(ControlIdError::InvalidCharacters(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Extracts the control id embedded in a stored obs form field path.
    ///
    /// Paths take the shape `FormEntry^FormName.1.0/my_control-0`: the second
    /// `/`-segment carries the control id, optionally suffixed with a
    /// `-<digits>` repetition counter which is stripped. Returns `None` when
    /// the path has no such segment.
    pub fn from_field_path(path: &str) -> Option<Self> {
        let segment = path.split('/').nth(1)?;
        let base = match segment.rsplit_once('-') {
            Some((head, tail)) if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) => {
                head
            }
            _ => segment,
        };
        Self::new(base).ok()
    }

    /// Returns the inner identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for ControlId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for ControlId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ControlId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ControlId::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_accepts_valid_input() {
        assert_eq!(ControlId::new("my_condition_tag").unwrap().as_str(), "my_condition_tag");
        assert_eq!(ControlId::new("  vitals.weight ").unwrap().as_str(), "vitals.weight");
    }

    #[test]
    fn test_control_id_rejects_empty_input() {
        assert!(matches!(ControlId::new("   "), Err(ControlIdError::Empty)));
    }

    #[test]
    fn test_control_id_rejects_invalid_characters() {
        assert!(matches!(
            ControlId::new("bad id"),
            Err(ControlIdError::InvalidCharacters(_))
        ));
        assert!(matches!(
            ControlId::new("bad/id"),
            Err(ControlIdError::InvalidCharacters(_))
        ));
    }

    #[test]
    fn test_from_field_path_strips_repetition_suffix() {
        let id = ControlId::from_field_path("FormEntry^Vitals.1.0/weight_tag-0").unwrap();
        assert_eq!(id.as_str(), "weight_tag");
    }

    #[test]
    fn test_from_field_path_keeps_non_numeric_suffix() {
        let id = ControlId::from_field_path("FormEntry^Vitals.1.0/weight-tag").unwrap();
        assert_eq!(id.as_str(), "weight-tag");
    }

    #[test]
    fn test_from_field_path_without_segment_is_none() {
        assert!(ControlId::from_field_path("no-slash-here").is_none());
    }
}
