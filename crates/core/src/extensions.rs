//! Extension points other modules plug behaviour in through.

use crate::actions::{Submission, SubmissionContext};
use crate::error::SubmissionFailure;
use crate::registry::TagRegistry;
use formentry_host::Patient;
use std::collections::HashMap;
use std::sync::Arc;

/// Contributes extra tag handlers to the vocabulary at startup.
pub trait TagHandlerProvider: Send + Sync {
    fn register(&self, registry: &mut TagRegistry);
}

/// Wraps extra behaviour around every form submission.
pub trait SubmissionActionExtender: Send + Sync {
    /// Runs after validation passes, before the action tree is applied.
    fn before_submission(
        &self,
        _context: &mut SubmissionContext<'_>,
        _submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        Ok(())
    }

    /// Runs after the action tree applied cleanly, before the encounter is
    /// persisted.
    fn after_submission(
        &self,
        _context: &mut SubmissionContext<'_>,
        _submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        Ok(())
    }
}

/// Seeds template variables for `<lookup>` before a session renders.
pub trait TemplateVariableProvider: Send + Sync {
    fn populate(&self, variables: &mut HashMap<String, String>, patient: &Patient);
}

/// Everything a deployment plugs in, gathered for module startup.
#[derive(Default)]
pub struct ModuleExtensions {
    pub tag_handlers: Vec<Box<dyn TagHandlerProvider>>,
    pub submission_extenders: Vec<Arc<dyn SubmissionActionExtender>>,
    pub variable_providers: Vec<Arc<dyn TemplateVariableProvider>>,
}
