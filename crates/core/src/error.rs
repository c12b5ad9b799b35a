//! Error types for template processing, form design and submission.

use formentry_compat::CompatError;
use formentry_host::HostError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A defect in the form design itself, as opposed to bad user input.
///
/// These surface at parse or render time and are addressed to the form
/// designer, not the person filling the form in.
#[derive(Debug, Error)]
pub enum DesignError {
    #[error("template markup error at offset {offset}: {message}")]
    TemplateParse { offset: usize, message: String },

    #[error("tag <{0}> is reserved but has no registered handler")]
    UnknownTag(String),

    #[error("tag <{tag}> is missing its required attribute '{attribute}'")]
    MissingAttribute {
        tag: String,
        attribute: &'static str,
    },

    #[error("tag <{tag}> does not accept attribute '{attribute}'")]
    UnexpectedAttribute { tag: String, attribute: String },

    #[error("tag <{tag}> attribute '{attribute}' is invalid: {message}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        message: String,
    },

    #[error("no {kind} found for reference '{reference}'")]
    UnresolvedReference {
        kind: &'static str,
        reference: String,
    },

    #[error("more than one observation matches control id '{0}'")]
    AmbiguousControlId(String),

    #[error("repeat sections cannot be nested")]
    NestedRepeat,

    #[error("no repeat section is open")]
    RepeatNotOpen,

    #[error("a repeat section is never closed")]
    RepeatNotClosed,

    #[error("obs group opened and closed out of balance")]
    UnbalancedObsGroup,

    #[error("no standard regimen is defined with code '{0}'")]
    UnknownRegimenCode(String),

    #[error("standard regimen '{code}' names unknown drug '{drug}'")]
    RegimenDrugNotFound { code: String, drug: String },
}

pub type DesignResult<T> = Result<T, DesignError>;

/// A single validation failure, addressed to the field that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormSubmissionError {
    pub field_id: String,
    pub message: String,
}

impl FormSubmissionError {
    pub fn new(field_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FormSubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field_id, self.message)
    }
}

/// Why a submission could not be turned into saved data.
#[derive(Debug, Error)]
pub enum SubmissionFailure {
    #[error("submission rejected with {} validation error(s)", .0.len())]
    Rejected(Vec<FormSubmissionError>),

    #[error("a form rendered in VIEW mode cannot accept submissions")]
    ViewMode,

    #[error(transparent)]
    Design(#[from] DesignError),

    #[error(transparent)]
    Compat(#[from] CompatError),

    #[error(transparent)]
    Host(#[from] HostError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_error_messages_name_the_tag() {
        let err = DesignError::MissingAttribute {
            tag: "obs".into(),
            attribute: "conceptId",
        };
        assert_eq!(
            err.to_string(),
            "tag <obs> is missing its required attribute 'conceptId'"
        );
    }

    #[test]
    fn test_rejection_counts_errors() {
        let failure = SubmissionFailure::Rejected(vec![
            FormSubmissionError::new("w1", "required"),
            FormSubmissionError::new("w2", "not a number"),
        ]);
        assert_eq!(
            failure.to_string(),
            "submission rejected with 2 validation error(s)"
        );
    }
}
