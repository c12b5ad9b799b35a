//! The host EMR platform's domain model, as seen by this plugin.
//!
//! The plugin runs inside a host platform that owns the clinical data graph:
//! patients, encounters, observations, drug orders, conditions, and the
//! concept dictionary. This crate defines that model plus the narrow service
//! traits the core consumes. Persistence is entirely the host's concern;
//! nothing here writes anywhere except through a service trait.
//!
//! [`MemoryHost`] is an in-memory implementation of every service trait. It
//! backs the test suites of the dependent crates and doubles as a reference
//! for the trait contracts.

pub mod concept;
pub mod condition;
pub mod drug;
pub mod encounter;
pub mod form;
pub mod memory;
pub mod obs;
pub mod services;

pub use concept::{Concept, ConceptDatatype, ConceptMapping};
pub use condition::{Condition, ConditionStatus};
pub use drug::{Drug, DrugOrder, OrderFrequency, Urgency};
pub use encounter::{Encounter, Patient};
pub use form::HtmlForm;
pub use memory::MemoryHost;
pub use obs::{Obs, ObsValue};
pub use services::{
    AuthContext, ConceptService, ConditionService, EncounterService, FormStore, HostServices,
    OrderService, PatientService,
};

/// Errors surfaced by host service calls.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("no authenticated user")]
    NotAuthenticated,
    #[error("patient {0} does not exist")]
    UnknownPatient(i64),
    #[error("encounter {0} does not exist")]
    UnknownEncounter(i64),
    #[error("form {0} does not exist")]
    UnknownForm(i64),
    #[error("drug order must reference a drug")]
    OrderWithoutDrug,
    #[error("storage failure: {0}")]
    Storage(String),
}

pub type HostResult<T> = std::result::Result<T, HostError>;
