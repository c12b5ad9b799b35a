//! Adapters for the 2.x platform line.

use crate::encounter_search::{matches, EncounterCriteria, EncounterSearchCompat};
use crate::exit_from_care::ExitFromCareCompat;
use crate::name_layout::NameLayoutCompat;
use crate::CompatError;
use chrono::NaiveDate;
use formentry_host::{Encounter, HostServices};

/// Criteria-based search against the 2.x encounter API.
///
/// The host does the filtering in 2.x; the result contract (same set, same
/// ascending order) is identical to the legacy adapter's.
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
        tracing::trace!(
            patient_id = criteria.patient_id,
            count = found.len(),
            "encounter search (2.x API)"
        );
        found
    }
}

/// Exit-from-care on the 2.x API, which insists on a coded reason.
pub struct ExitFromCareAdapter;

impl ExitFromCareCompat for ExitFromCareAdapter {
    fn exit_from_care(
        &self,
        services: &HostServices,
        patient_id: i64,
        date: NaiveDate,
        reason_concept_id: Option<i64>,
    ) -> Result<(), CompatError> {
        let reason = reason_concept_id.ok_or(CompatError::ExitReasonRequired)?;
        let mut patient = services
            .patients
            .patient(patient_id)
            .ok_or(CompatError::UnknownPatient(patient_id))?;
        patient.exit_date = Some(date);
        patient.exit_reason_concept_id = Some(reason);
        services.patients.save_patient(patient)?;
        Ok(())
    }
}

/// The 2.x configurable name template, surname-first by default.
pub struct NameLayoutAdapter;

impl NameLayoutCompat for NameLayoutAdapter {
    fn layout_template(&self) -> &'static str {
        "{family}, {given}"
    }
}
