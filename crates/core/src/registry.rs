//! The tag registry: the custom tag vocabulary a session renders with.

use crate::handlers::{
    condition::ConditionTagHandler, drug_order::DrugOrderTagHandler, if_mode::IfModeTagHandler,
    lookup::LookupTagHandler, obs::ObsTagHandler, obsgroup::ObsGroupTagHandler,
    repeat::RepeatTagHandler, section::SectionTagHandler,
    standard_regimen::StandardRegimenTagHandler, submit::SubmitTagHandler, TagHandler,
};
use crate::regimen::StandardRegimen;
use std::collections::HashMap;
use std::sync::Arc;

/// The reserved tag names. An element with one of these names must have a
/// registered handler; anything else passes through as literal HTML.
pub const RESERVED_TAGS: &[&str] = &[
    "obs",
    "obsgroup",
    "drugOrder",
    "standardRegimen",
    "condition",
    "repeat",
    "section",
    "ifMode",
    "submit",
    "lookup",
];

#[derive(Default)]
pub struct TagRegistry {
    handlers: HashMap<String, Arc<dyn TagHandler>>,
}

impl TagRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The full built-in vocabulary.
    pub fn standard(standard_regimens: Arc<Vec<StandardRegimen>>) -> Self {
        let mut registry = Self::empty();
        registry.register("obs", Arc::new(ObsTagHandler));
        registry.register("obsgroup", Arc::new(ObsGroupTagHandler));
        registry.register("drugOrder", Arc::new(DrugOrderTagHandler));
        registry.register(
            "standardRegimen",
            Arc::new(StandardRegimenTagHandler::new(standard_regimens)),
        );
        registry.register("condition", Arc::new(ConditionTagHandler));
        registry.register("repeat", Arc::new(RepeatTagHandler));
        registry.register("section", Arc::new(SectionTagHandler));
        registry.register("ifMode", Arc::new(IfModeTagHandler));
        registry.register("submit", Arc::new(SubmitTagHandler));
        registry.register("lookup", Arc::new(LookupTagHandler));
        registry
    }

    /// Registers (or replaces) the handler for a tag name.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn TagHandler>) {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            tracing::info!(tag = %name, "replacing registered tag handler");
        }
        self.handlers.insert(name, handler);
    }

    pub fn handler(&self, name: &str) -> Option<&Arc<dyn TagHandler>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn tag_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Freezes the vocabulary for sharing across sessions.
    pub fn freeze(self) -> Arc<Self> {
        Arc::new(self)
    }
}
