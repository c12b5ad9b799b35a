//! Encounter retrieval across host search-API generations.

use chrono::NaiveDate;
use formentry_host::{Encounter, HostServices};

/// Criteria for locating a patient's encounters.
#[derive(Clone, Debug, Default)]
pub struct EncounterCriteria {
    pub patient_id: i64,
    /// Inclusive lower bound on the encounter date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the encounter date.
    pub to: Option<NaiveDate>,
    /// Restrict to encounters created by the named form.
    pub form_name: Option<String>,
}

/// Encounter lookup matching the given criteria.
///
/// Implementations must be behaviourally equivalent: same result set, same
/// ascending date order, whatever the underlying host call shape is.
pub trait EncounterSearchCompat: Send + Sync {
    fn encounters(&self, services: &HostServices, criteria: &EncounterCriteria) -> Vec<Encounter>;
}

/// Shared filter logic; the adapters differ only in how they fetch.
pub(crate) fn matches(encounter: &Encounter, criteria: &EncounterCriteria) -> bool {
    if encounter.patient_id != criteria.patient_id {
        return false;
    }
    let date = encounter.encounter_date();
    if let Some(from) = criteria.from {
        if date < from {
            return false;
        }
    }
    if let Some(to) = criteria.to {
        if date > to {
            return false;
        }
    }
    if let Some(form_name) = &criteria.form_name {
        if encounter.form_name.as_deref() != Some(form_name.as_str()) {
            return false;
        }
    }
    true
}
