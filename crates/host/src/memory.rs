//! An in-memory host platform.
//!
//! Backs the test suites of dependent crates and serves as the reference
//! implementation of the service traits. Identifier assignment mimics the
//! host's persistence layer: unsaved entities come back with ids, nested obs
//! included.

use crate::concept::Concept;
use crate::condition::Condition;
use crate::drug::{Drug, DrugOrder, OrderFrequency};
use crate::encounter::{Encounter, Patient};
use crate::form::HtmlForm;
use crate::obs::Obs;
use crate::services::{
    AuthContext, ConceptService, ConditionService, EncounterService, FormStore, HostServices,
    OrderService, PatientService,
};
use crate::{HostError, HostResult};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

#[derive(Default)]
struct Store {
    concepts: Vec<Concept>,
    drugs: Vec<Drug>,
    frequencies: Vec<OrderFrequency>,
    patients: Vec<Patient>,
    encounters: Vec<Encounter>,
    orders: Vec<DrugOrder>,
    conditions: Vec<Condition>,
    forms: Vec<HtmlForm>,
    authenticated_user: Option<String>,
    next_id: i64,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory implementation of every host service trait.
///
/// Clones share the same store, so one host can hand out any number of
/// service handles.
#[derive(Clone, Default)]
pub struct MemoryHost {
    store: Arc<RwLock<Store>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bundles this host into a [`HostServices`] handle set.
    pub fn services(&self) -> HostServices {
        HostServices {
            concepts: Arc::new(self.clone()),
            orders: Arc::new(self.clone()),
            encounters: Arc::new(self.clone()),
            conditions: Arc::new(self.clone()),
            patients: Arc::new(self.clone()),
            auth: Arc::new(self.clone()),
            forms: Arc::new(self.clone()),
        }
    }

    pub fn add_concept(&self, concept: Concept) {
        self.store.write().unwrap().concepts.push(concept);
    }

    pub fn add_drug(&self, drug: Drug) {
        self.store.write().unwrap().drugs.push(drug);
    }

    pub fn add_order_frequency(&self, frequency: OrderFrequency) {
        self.store.write().unwrap().frequencies.push(frequency);
    }

    pub fn add_patient(&self, patient: Patient) {
        self.store.write().unwrap().patients.push(patient);
    }

    /// Seeds an existing encounter, assigning ids where missing.
    pub fn add_encounter(&self, mut encounter: Encounter) -> Encounter {
        let mut store = self.store.write().unwrap();
        if encounter.id.is_none() {
            encounter.id = Some(store.next_id());
        }
        let encounter_id = encounter.id;
        for obs in &mut encounter.obs {
            assign_obs_ids(obs, encounter_id, &mut store);
        }
        for order in &mut encounter.orders {
            if order.id.is_none() {
                order.id = Some(store.next_id());
            }
            order.encounter_id = encounter_id;
            store.orders.push(order.clone());
        }
        store.encounters.push(encounter.clone());
        encounter
    }

    pub fn set_authenticated_user(&self, username: impl Into<String>) {
        self.store.write().unwrap().authenticated_user = Some(username.into());
    }
}

fn assign_obs_ids(obs: &mut Obs, encounter_id: Option<i64>, store: &mut Store) {
    if obs.id.is_none() {
        obs.id = Some(store.next_id());
    }
    obs.encounter_id = encounter_id;
    for member in &mut obs.group_members {
        assign_obs_ids(member, encounter_id, store);
    }
}

impl ConceptService for MemoryHost {
    fn concept(&self, id: i64) -> Option<Concept> {
        let store = self.store.read().unwrap();
        store.concepts.iter().find(|c| c.id == id).cloned()
    }

    fn concept_by_uuid(&self, uuid: &Uuid) -> Option<Concept> {
        let store = self.store.read().unwrap();
        store.concepts.iter().find(|c| c.uuid == *uuid).cloned()
    }

    fn concept_by_mapping(&self, source: &str, code: &str) -> Option<Concept> {
        let store = self.store.read().unwrap();
        store
            .concepts
            .iter()
            .find(|c| c.has_mapping(source, code))
            .cloned()
    }

    fn concept_by_name(&self, name: &str) -> Option<Concept> {
        let store = self.store.read().unwrap();
        store
            .concepts
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .cloned()
    }

    fn drug(&self, id: i64) -> Option<Drug> {
        let store = self.store.read().unwrap();
        store.drugs.iter().find(|d| d.id == id).cloned()
    }

    fn drug_by_uuid(&self, uuid: &Uuid) -> Option<Drug> {
        let store = self.store.read().unwrap();
        store.drugs.iter().find(|d| d.uuid == *uuid).cloned()
    }

    fn drug_by_name(&self, name: &str) -> Option<Drug> {
        let store = self.store.read().unwrap();
        store
            .drugs
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
            .cloned()
    }
}

impl OrderService for MemoryHost {
    fn save_drug_order(&self, mut order: DrugOrder) -> HostResult<DrugOrder> {
        if order.drug_id <= 0 {
            return Err(HostError::OrderWithoutDrug);
        }
        let mut store = self.store.write().unwrap();
        if order.id.is_none() {
            order.id = Some(store.next_id());
        }
        tracing::debug!(order_id = ?order.id, drug_id = order.drug_id, "saving drug order");
        store.orders.retain(|o| o.id != order.id);
        store.orders.push(order.clone());
        Ok(order)
    }

    fn drug_orders_for_patient(&self, patient_id: i64) -> Vec<DrugOrder> {
        let store = self.store.read().unwrap();
        store
            .orders
            .iter()
            .filter(|o| o.patient_id == patient_id)
            .cloned()
            .collect()
    }

    fn order_frequency_by_name(&self, name: &str) -> Option<OrderFrequency> {
        let store = self.store.read().unwrap();
        store
            .frequencies
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .cloned()
    }
}

impl EncounterService for MemoryHost {
    fn save_encounter(&self, mut encounter: Encounter) -> HostResult<Encounter> {
        let mut store = self.store.write().unwrap();
        if store.patients.iter().all(|p| p.id != encounter.patient_id) {
            return Err(HostError::UnknownPatient(encounter.patient_id));
        }
        if encounter.id.is_none() {
            encounter.id = Some(store.next_id());
        }
        let encounter_id = encounter.id;
        for obs in &mut encounter.obs {
            assign_obs_ids(obs, encounter_id, &mut store);
        }
        for order in &mut encounter.orders {
            if order.id.is_none() {
                order.id = Some(store.next_id());
            }
            order.encounter_id = encounter_id;
            store.orders.retain(|o| o.id != order.id);
            store.orders.push(order.clone());
        }
        tracing::debug!(encounter_id = ?encounter.id, "saving encounter");
        store.encounters.retain(|e| e.id != encounter.id);
        store.encounters.push(encounter.clone());
        Ok(encounter)
    }

    fn encounter(&self, id: i64) -> Option<Encounter> {
        let store = self.store.read().unwrap();
        store.encounters.iter().find(|e| e.id == Some(id)).cloned()
    }

    fn encounters_for_patient(&self, patient_id: i64) -> Vec<Encounter> {
        let store = self.store.read().unwrap();
        store
            .encounters
            .iter()
            .filter(|e| e.patient_id == patient_id)
            .cloned()
            .collect()
    }
}

impl ConditionService for MemoryHost {
    fn save_condition(&self, mut condition: Condition) -> HostResult<Condition> {
        let mut store = self.store.write().unwrap();
        if store.patients.iter().all(|p| p.id != condition.patient_id) {
            return Err(HostError::UnknownPatient(condition.patient_id));
        }
        if condition.id.is_none() {
            condition.id = Some(store.next_id());
        }
        store.conditions.retain(|c| c.id != condition.id);
        store.conditions.push(condition.clone());
        Ok(condition)
    }

    fn conditions_for_patient(&self, patient_id: i64) -> Vec<Condition> {
        let store = self.store.read().unwrap();
        store
            .conditions
            .iter()
            .filter(|c| c.patient_id == patient_id)
            .cloned()
            .collect()
    }
}

impl PatientService for MemoryHost {
    fn patient(&self, id: i64) -> Option<Patient> {
        let store = self.store.read().unwrap();
        store.patients.iter().find(|p| p.id == id).cloned()
    }

    fn save_patient(&self, patient: Patient) -> HostResult<Patient> {
        let mut store = self.store.write().unwrap();
        match store.patients.iter_mut().find(|p| p.id == patient.id) {
            Some(existing) => {
                *existing = patient.clone();
                Ok(patient)
            }
            None => Err(HostError::UnknownPatient(patient.id)),
        }
    }
}

impl AuthContext for MemoryHost {
    fn authenticated_user(&self) -> Option<String> {
        self.store.read().unwrap().authenticated_user.clone()
    }
}

impl FormStore for MemoryHost {
    fn form(&self, id: i64) -> HostResult<Option<HtmlForm>> {
        let store = self.store.read().unwrap();
        Ok(store.forms.iter().find(|f| f.id == Some(id)).cloned())
    }

    fn form_by_uuid(&self, uuid: &Uuid) -> HostResult<Option<HtmlForm>> {
        let store = self.store.read().unwrap();
        Ok(store.forms.iter().find(|f| f.uuid == *uuid).cloned())
    }

    fn save_form(&self, mut form: HtmlForm) -> HostResult<HtmlForm> {
        let mut store = self.store.write().unwrap();
        if form.id.is_none() {
            form.id = Some(store.next_id());
        }
        store.forms.retain(|f| f.id != form.id);
        store.forms.push(form.clone());
        Ok(form)
    }

    fn delete_form(&self, id: i64) -> HostResult<()> {
        let mut store = self.store.write().unwrap();
        let before = store.forms.len();
        store.forms.retain(|f| f.id != Some(id));
        if store.forms.len() == before {
            return Err(HostError::UnknownForm(id));
        }
        Ok(())
    }

    fn all_forms(&self) -> HostResult<Vec<HtmlForm>> {
        let store = self.store.read().unwrap();
        Ok(store.forms.iter().filter(|f| !f.retired).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::ConceptDatatype;
    use crate::obs::ObsValue;

    #[test]
    fn test_save_encounter_assigns_nested_obs_ids() {
        let host = Arc::new(MemoryHost::new());
        host.add_patient(Patient::new(1, "Ada", "Lovelace"));

        let mut group = Obs::unsaved(1, 100, ObsValue::None);
        group.group_members.push(Obs::unsaved(1, 101, ObsValue::Numeric(70.0)));
        let mut encounter = Encounter::unsaved(1);
        encounter.obs.push(group);

        let saved = host.save_encounter(encounter).unwrap();
        assert!(saved.id.is_some());
        assert!(saved.obs[0].id.is_some());
        assert!(saved.obs[0].group_members[0].id.is_some());
        assert_eq!(saved.obs[0].group_members[0].encounter_id, saved.id);
    }

    #[test]
    fn test_save_encounter_rejects_unknown_patient() {
        let host = MemoryHost::new();
        let err = host.save_encounter(Encounter::unsaved(42)).unwrap_err();
        assert!(matches!(err, HostError::UnknownPatient(42)));
    }

    #[test]
    fn test_concept_lookup_by_mapping() {
        let host = MemoryHost::new();
        let mut concept = Concept::new(5089, "WEIGHT", ConceptDatatype::Numeric);
        concept.mappings.push(crate::concept::ConceptMapping {
            source: "CIEL".into(),
            code: "5089".into(),
        });
        host.add_concept(concept);
        assert!(host.concept_by_mapping("ciel", "5089").is_some());
        assert!(host.concept_by_mapping("CIEL", "9999").is_none());
    }

    #[test]
    fn test_form_store_round_trip() {
        let host = MemoryHost::new();
        let saved = host.save_form(HtmlForm::unsaved("Vitals", "<htmlform/>")).unwrap();
        let id = saved.id.unwrap();
        assert_eq!(host.form(id).unwrap().unwrap().name, "Vitals");
        host.delete_form(id).unwrap();
        assert!(host.form(id).unwrap().is_none());
        assert!(matches!(host.delete_form(id), Err(HostError::UnknownForm(_))));
    }
}
