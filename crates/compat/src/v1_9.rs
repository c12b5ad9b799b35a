//! Adapters for host platforms before the order-entry rewrite (1.9.x line,
//! and the legacy search/name/exit APIs that survived until 2.0).

use crate::drug_order::DrugOrderCompat;
use crate::encounter_search::{matches, EncounterCriteria, EncounterSearchCompat};
use crate::exit_from_care::ExitFromCareCompat;
use crate::name_layout::NameLayoutCompat;
use crate::regimen_deps::{reference_matches, RegimenDependencyCompat};
use crate::CompatError;
use chrono::NaiveDate;
use formentry_host::{DrugOrder, Encounter, HostServices};
use formentry_types::EntityRef;

/// Free-text drug-order fields, raw start date, no validation against the
/// encounter. This laxity is the 1.9 platform's own behaviour and is kept.
pub struct DrugOrderAdapter;

impl DrugOrderCompat for DrugOrderAdapter {
    fn set_start_date(
        &self,
        order: &mut DrugOrder,
        _encounter_date: Option<NaiveDate>,
        start: NaiveDate,
    ) -> Result<(), CompatError> {
        order.start_date = Some(start);
        Ok(())
    }

    fn start_date(&self, order: &DrugOrder) -> Option<NaiveDate> {
        order.start_date
    }

    fn set_frequency(&self, order: &mut DrugOrder, frequency: &str, _services: &HostServices) {
        order.frequency_text = Some(frequency.to_owned());
    }

    fn set_dose_units(&self, order: &mut DrugOrder, units: &str, _services: &HostServices) {
        order.dose_units_text = Some(units.to_owned());
    }

    fn set_route(&self, _order: &mut DrugOrder, _services: &HostServices) {
        // The 1.9 order model has no route field.
    }

    fn discontinue(
        &self,
        order: &mut DrugOrder,
        date: NaiveDate,
        reason: Option<&str>,
        services: &HostServices,
    ) -> Result<(), CompatError> {
        order.discontinued = true;
        order.discontinued_date = Some(date);
        if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
            match resolve_reason_concept(services, reason) {
                Some(concept_id) => order.discontinued_reason_concept_id = Some(concept_id),
                None => order.discontinued_reason_non_coded = Some(reason.to_owned()),
            }
        }
        Ok(())
    }
}

fn resolve_reason_concept(services: &HostServices, reason: &str) -> Option<i64> {
    match EntityRef::parse(reason).ok()? {
        EntityRef::Id(id) => services.concepts.concept(id).map(|c| c.id),
        EntityRef::Mapping { source, code } => services
            .concepts
            .concept_by_mapping(&source, &code)
            .map(|c| c.id),
        EntityRef::Uuid(uuid) => services.concepts.concept_by_uuid(&uuid).map(|c| c.id),
        EntityRef::Name(name) => services.concepts.concept_by_name(&name).map(|c| c.id),
    }
}

/// Fetch-then-filter search against the legacy encounter API.
pub struct EncounterSearchAdapter;

impl EncounterSearchCompat for EncounterSearchAdapter {
    fn encounters(&self, services: &HostServices, criteria: &EncounterCriteria) -> Vec<Encounter> {
        let mut found: Vec<Encounter> = services
            .encounters
            .encounters_for_patient(criteria.patient_id)
            .into_iter()
            .filter(|e| matches(e, criteria))
            .collect();
        found.sort_by_key(|e| e.encounter_datetime);
        found
    }
}

/// Exit-from-care on the legacy patient API: the reason is optional.
pub struct ExitFromCareAdapter;

impl ExitFromCareCompat for ExitFromCareAdapter {
    fn exit_from_care(
        &self,
        services: &HostServices,
        patient_id: i64,
        date: NaiveDate,
        reason_concept_id: Option<i64>,
    ) -> Result<(), CompatError> {
        let mut patient = services
            .patients
            .patient(patient_id)
            .ok_or(CompatError::UnknownPatient(patient_id))?;
        patient.exit_date = Some(date);
        patient.exit_reason_concept_id = reason_concept_id;
        services.patients.save_patient(patient)?;
        Ok(())
    }
}

/// The fixed short name layout of the legacy platform.
pub struct NameLayoutAdapter;

impl NameLayoutCompat for NameLayoutAdapter {
    fn layout_template(&self) -> &'static str {
        "{given} {family}"
    }
}

/// Regimen dependency enumeration keyed off the raw start/discontinued
/// fields of the legacy order model.
pub struct RegimenDependencyAdapter;

impl RegimenDependencyCompat for RegimenDependencyAdapter {
    fn drugs_in_use(&self, orders: &[DrugOrder], drug_refs: &[String]) -> Vec<String> {
        drug_refs
            .iter()
            .filter(|drug_ref| {
                orders.iter().any(|o| {
                    !o.voided
                        && !o.discontinued
                        && o.start_date.is_some()
                        && reference_matches(o, drug_ref)
                })
            })
            .cloned()
            .collect()
    }
}
