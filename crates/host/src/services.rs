//! The narrow service traits the core consumes from the host platform.
//!
//! Each trait covers one collaborator the form pipeline needs. They are kept
//! object-safe so a session can hold them as `Arc<dyn Trait>` and tests can
//! substitute fakes; [`HostServices`] bundles one of each.

use crate::concept::Concept;
use crate::condition::Condition;
use crate::drug::{Drug, DrugOrder, OrderFrequency};
use crate::encounter::{Encounter, Patient};
use crate::form::HtmlForm;
use crate::HostResult;
use std::sync::Arc;
use uuid::Uuid;

/// Lookups against the host concept and drug dictionaries.
pub trait ConceptService: Send + Sync {
    fn concept(&self, id: i64) -> Option<Concept>;
    fn concept_by_uuid(&self, uuid: &Uuid) -> Option<Concept>;
    fn concept_by_mapping(&self, source: &str, code: &str) -> Option<Concept>;
    fn concept_by_name(&self, name: &str) -> Option<Concept>;
    fn drug(&self, id: i64) -> Option<Drug>;
    fn drug_by_uuid(&self, uuid: &Uuid) -> Option<Drug>;
    fn drug_by_name(&self, name: &str) -> Option<Drug>;
}

/// Order persistence and frequency lookups.
pub trait OrderService: Send + Sync {
    fn save_drug_order(&self, order: DrugOrder) -> HostResult<DrugOrder>;
    fn drug_orders_for_patient(&self, patient_id: i64) -> Vec<DrugOrder>;
    fn order_frequency_by_name(&self, name: &str) -> Option<OrderFrequency>;
}

/// Encounter persistence and retrieval.
pub trait EncounterService: Send + Sync {
    fn save_encounter(&self, encounter: Encounter) -> HostResult<Encounter>;
    fn encounter(&self, id: i64) -> Option<Encounter>;
    fn encounters_for_patient(&self, patient_id: i64) -> Vec<Encounter>;
}

/// Condition-list persistence.
pub trait ConditionService: Send + Sync {
    fn save_condition(&self, condition: Condition) -> HostResult<Condition>;
    fn conditions_for_patient(&self, patient_id: i64) -> Vec<Condition>;
}

/// Patient retrieval and the mutations the exit-from-care capability needs.
pub trait PatientService: Send + Sync {
    fn patient(&self, id: i64) -> Option<Patient>;
    fn save_patient(&self, patient: Patient) -> HostResult<Patient>;
}

/// The host's authentication context for the current request.
pub trait AuthContext: Send + Sync {
    fn authenticated_user(&self) -> Option<String>;
}

/// Storage of the form definitions themselves.
pub trait FormStore: Send + Sync {
    fn form(&self, id: i64) -> HostResult<Option<HtmlForm>>;
    fn form_by_uuid(&self, uuid: &Uuid) -> HostResult<Option<HtmlForm>>;
    fn save_form(&self, form: HtmlForm) -> HostResult<HtmlForm>;
    fn delete_form(&self, id: i64) -> HostResult<()>;
    fn all_forms(&self) -> HostResult<Vec<HtmlForm>>;
}

/// One handle per consumed host service.
///
/// Cloning is cheap; every field is an `Arc`.
#[derive(Clone)]
pub struct HostServices {
    pub concepts: Arc<dyn ConceptService>,
    pub orders: Arc<dyn OrderService>,
    pub encounters: Arc<dyn EncounterService>,
    pub conditions: Arc<dyn ConditionService>,
    pub patients: Arc<dyn PatientService>,
    pub auth: Arc<dyn AuthContext>,
    pub forms: Arc<dyn FormStore>,
}
