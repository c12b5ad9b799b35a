//! Form entry over HTML templates with custom clinical tags.
//!
//! A form is HTML markup carrying a reserved tag vocabulary (`<obs>`,
//! `<obsgroup>`, `<drugOrder>`, `<standardRegimen>`, ...). The crate parses
//! that markup, renders it for one of three session modes, and turns
//! submissions back into encounters, observations, orders and conditions on
//! the host platform, through the version compatibility layer in
//! `formentry-compat`.

pub mod actions;
pub mod context;
pub mod error;
pub mod extensions;
pub mod handlers;
pub mod module;
pub mod obsmatch;
pub mod regimen;
pub mod registry;
pub mod schema;
pub mod session;
pub mod template;
pub mod widgets;

pub use actions::{
    FormSubmissionController, RepeatAction, RepeatHooks, Submission, SubmissionAction,
    SubmissionContext,
};
pub use context::RenderContext;
pub use error::{DesignError, DesignResult, FormSubmissionError, SubmissionFailure};
pub use extensions::{
    ModuleExtensions, SubmissionActionExtender, TagHandlerProvider, TemplateVariableProvider,
};
pub use handlers::{AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler};
pub use module::{ModuleConfig, ModuleRuntime, StartupError};
pub use regimen::{
    find_strongest_match, load_standard_regimens, standard_regimen_by_code,
    standard_regimen_to_drug_orders, DrugComponent, RegimenMatch, StandardRegimen,
};
pub use registry::{TagRegistry, RESERVED_TAGS};
pub use schema::{FieldDescriptor, FormSchema, SchemaSection};
pub use session::FormEntrySession;
pub use template::{FormTemplate, NodeKind, TagNode};
pub use widgets::{SelectOption, Widget};
