//! Adapters for the order-entry rewrite (platform 1.10 through 2.x).

use crate::drug_order::DrugOrderCompat;
use crate::regimen_deps::{reference_matches, RegimenDependencyCompat};
use crate::CompatError;
use chrono::NaiveDate;
use formentry_host::{DrugOrder, HostServices, Urgency};
use formentry_types::EntityRef;

/// Coded drug-order fields; the start date is derived from the encounter.
///
/// The rewrite activates orders at the encounter date: a later start date
/// becomes a scheduled order, an earlier one is rejected outright. That
/// strictness is the platform's own and is preserved here.
pub struct DrugOrderAdapter;

impl DrugOrderCompat for DrugOrderAdapter {
    fn set_start_date(
        &self,
        order: &mut DrugOrder,
        encounter_date: Option<NaiveDate>,
        start: NaiveDate,
    ) -> Result<(), CompatError> {
        let encounter = encounter_date.ok_or(CompatError::EncounterRequired)?;
        order.date_activated = Some(encounter);
        if start > encounter {
            order.scheduled_date = Some(start);
            order.urgency = Urgency::OnScheduledDate;
        } else if start < encounter {
            return Err(CompatError::StartDatePrecedesEncounter { start, encounter });
        }
        Ok(())
    }

    fn start_date(&self, order: &DrugOrder) -> Option<NaiveDate> {
        order.scheduled_date.or(order.date_activated)
    }

    fn set_frequency(&self, order: &mut DrugOrder, frequency: &str, services: &HostServices) {
        // Only a recognised coded frequency is recorded, as on the host.
        if let Some(found) = services.orders.order_frequency_by_name(frequency) {
            order.frequency_id = Some(found.id);
        } else {
            tracing::warn!(frequency, "no coded order frequency matches; leaving unset");
        }
    }

    fn set_dose_units(&self, order: &mut DrugOrder, units: &str, services: &HostServices) {
        order.dose_units_concept_id = resolve_concept_id(services, units);
    }

    fn set_route(&self, order: &mut DrugOrder, services: &HostServices) {
        order.route_concept_id = resolve_concept_id(services, "UNKNOWN");
    }

    fn discontinue(
        &self,
        _order: &mut DrugOrder,
        _date: NaiveDate,
        _reason: Option<&str>,
        _services: &HostServices,
    ) -> Result<(), CompatError> {
        Err(CompatError::Unsupported(
            "discontinuing through the order-entry rewrite",
        ))
    }
}

fn resolve_concept_id(services: &HostServices, value: &str) -> Option<i64> {
    match EntityRef::parse(value).ok()? {
        EntityRef::Id(id) => services.concepts.concept(id).map(|c| c.id),
        EntityRef::Mapping { source, code } => services
            .concepts
            .concept_by_mapping(&source, &code)
            .map(|c| c.id),
        EntityRef::Uuid(uuid) => services.concepts.concept_by_uuid(&uuid).map(|c| c.id),
        EntityRef::Name(name) => services.concepts.concept_by_name(&name).map(|c| c.id),
    }
}

/// Regimen dependency enumeration keyed off activation and scheduling.
pub struct RegimenDependencyAdapter;

impl RegimenDependencyCompat for RegimenDependencyAdapter {
    fn drugs_in_use(&self, orders: &[DrugOrder], drug_refs: &[String]) -> Vec<String> {
        drug_refs
            .iter()
            .filter(|drug_ref| {
                orders.iter().any(|o| {
                    !o.voided
                        && !o.discontinued
                        && (o.date_activated.is_some() || o.scheduled_date.is_some())
                        && reference_matches(o, drug_ref)
                })
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formentry_host::Drug;
    use uuid::Uuid;

    fn order() -> DrugOrder {
        let drug = Drug {
            id: 7,
            uuid: Uuid::new_v4(),
            name: "Aspirin".into(),
            concept_id: 70,
        };
        DrugOrder::unsaved(1, &drug)
    }

    #[test]
    fn test_start_date_requires_encounter() {
        let mut o = order();
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let err = DrugOrderAdapter.set_start_date(&mut o, None, start).unwrap_err();
        assert!(matches!(err, CompatError::EncounterRequired));
    }

    #[test]
    fn test_start_on_encounter_date_activates_immediately() {
        let mut o = order();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        DrugOrderAdapter.set_start_date(&mut o, Some(date), date).unwrap();
        assert_eq!(o.date_activated, Some(date));
        assert_eq!(o.scheduled_date, None);
        assert_eq!(o.urgency, Urgency::Routine);
        assert_eq!(DrugOrderAdapter.start_date(&o), Some(date));
    }

    #[test]
    fn test_future_start_becomes_scheduled() {
        let mut o = order();
        let encounter = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 5, 8).unwrap();
        DrugOrderAdapter
            .set_start_date(&mut o, Some(encounter), start)
            .unwrap();
        assert_eq!(o.scheduled_date, Some(start));
        assert_eq!(o.urgency, Urgency::OnScheduledDate);
        assert_eq!(DrugOrderAdapter.start_date(&o), Some(start));
    }

    #[test]
    fn test_start_before_encounter_is_rejected() {
        let mut o = order();
        let encounter = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let err = DrugOrderAdapter
            .set_start_date(&mut o, Some(encounter), start)
            .unwrap_err();
        assert!(matches!(err, CompatError::StartDatePrecedesEncounter { .. }));
    }

    #[test]
    fn test_discontinue_is_unsupported() {
        // No services needed: the adapter refuses before touching them.
        let mut o = order();
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        // A HostServices bundle is required by the trait; build a throwaway
        // one from the in-memory host.
        let host = std::sync::Arc::new(formentry_host::MemoryHost::new());
        let services = host.services();
        let err = DrugOrderAdapter
            .discontinue(&mut o, date, None, &services)
            .unwrap_err();
        assert!(matches!(err, CompatError::Unsupported(_)));
    }
}
