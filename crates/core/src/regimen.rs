//! Standard regimen definitions and the order-matching engine.
//!
//! A standard regimen is a named set of drug components. The matching engine
//! decides which defined regimen, if any, a patient's existing drug orders
//! amount to, so the regimen control can pre-select it when a form is opened
//! over an encounter.

use crate::error::{DesignError, SubmissionFailure};
use chrono::{NaiveDate, Utc};
use formentry_compat::DrugOrderCompat;
use formentry_host::{DrugOrder, HostServices, Patient};
use formentry_types::EntityRef;
use serde::{Deserialize, Serialize};

/// One drug within a regimen. Only the drug reference participates in
/// matching; dose and frequency describe what to order, not what to match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugComponent {
    /// Drug reference as written in the definition: a numeric drug id or a
    /// drug UUID.
    pub drug_id: String,
    #[serde(default)]
    pub dose: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub frequency: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardRegimen {
    pub code: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub components: Vec<DrugComponent>,
}

impl StandardRegimen {
    pub fn display(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.code)
    }
}

/// Parses regimen definitions from their YAML configuration form.
pub fn load_standard_regimens(yaml: &str) -> Result<Vec<StandardRegimen>, serde_yaml::Error> {
    serde_yaml::from_str(yaml)
}

pub fn standard_regimen_by_code<'a>(
    regimens: &'a [StandardRegimen],
    code: &str,
) -> Option<&'a StandardRegimen> {
    regimens.iter().find(|r| r.code == code)
}

/// A regimen the matching engine recognised, with the orders that formed it.
#[derive(Debug)]
pub struct RegimenMatch<'a> {
    pub regimen: &'a StandardRegimen,
    pub orders: Vec<&'a DrugOrder>,
}

/// Finds the strongest regimen the given orders amount to.
///
/// A candidate qualifies only when every one of its components is satisfied
/// by an order, and all of those orders share one start date: the first
/// component's match fixes the expectation, any later disagreement
/// disqualifies the whole candidate. Among qualifying candidates the one
/// with the most components wins; on a tie the earlier-declared one is kept.
/// Dose and frequency never participate, only the drug and the start date.
pub fn find_strongest_match<'a>(
    candidates: &'a [StandardRegimen],
    orders: &'a [DrugOrder],
) -> Option<RegimenMatch<'a>> {
    let mut best: Option<RegimenMatch<'a>> = None;
    for candidate in candidates {
        let mut matched: Vec<&DrugOrder> = Vec::new();
        let mut expected_start: Option<Option<NaiveDate>> = None;
        let mut complete = true;
        for component in &candidate.components {
            let Some(order) = component_match(component, orders) else {
                complete = false;
                break;
            };
            let start = order.effective_start_date();
            match expected_start {
                None => {
                    expected_start = Some(start);
                    matched.push(order);
                }
                Some(expected) if expected == start => matched.push(order),
                Some(_) => {
                    complete = false;
                    break;
                }
            }
        }
        if complete && best.as_ref().map_or(0, |b| b.orders.len()) < matched.len() {
            best = Some(RegimenMatch {
                regimen: candidate,
                orders: matched,
            });
        }
    }
    best
}

fn component_match<'a>(component: &DrugComponent, orders: &'a [DrugOrder]) -> Option<&'a DrugOrder> {
    orders.iter().find(|o| {
        !o.voided
            && (o.drug_id.to_string() == component.drug_id
                || o.drug_uuid.to_string() == component.drug_id)
    })
}

/// Expands a regimen into unsaved drug orders starting on the given date.
///
/// Each component's drug reference must resolve against the host dictionary
/// or the expansion fails outright. Frequency, dose units, route and start
/// date go through the drug-order compatibility adapter so the orders come
/// out shaped for the active platform version.
pub fn standard_regimen_to_drug_orders(
    regimen: &StandardRegimen,
    start_date: NaiveDate,
    patient: &Patient,
    encounter_date: Option<NaiveDate>,
    services: &HostServices,
    compat: &dyn DrugOrderCompat,
) -> Result<Vec<DrugOrder>, SubmissionFailure> {
    let mut orders = Vec::with_capacity(regimen.components.len());
    for component in &regimen.components {
        let drug = resolve_drug(services, &component.drug_id).ok_or_else(|| {
            DesignError::RegimenDrugNotFound {
                code: regimen.code.clone(),
                drug: component.drug_id.clone(),
            }
        })?;
        let mut order = DrugOrder::unsaved(patient.id, &drug);
        order.dose = component.dose;
        order.instructions = component.instructions.clone();
        if let Some(units) = &component.units {
            compat.set_dose_units(&mut order, units, services);
        }
        if let Some(frequency) = &component.frequency {
            compat.set_frequency(&mut order, frequency, services);
        }
        compat.set_route(&mut order, services);
        compat.set_start_date(&mut order, encounter_date, start_date)?;
        order.creator = services.auth.authenticated_user();
        order.date_changed = Some(Utc::now());
        orders.push(order);
    }
    Ok(orders)
}

fn resolve_drug(services: &HostServices, reference: &str) -> Option<formentry_host::Drug> {
    match EntityRef::parse(reference).ok()? {
        EntityRef::Id(id) => services.concepts.drug(id),
        EntityRef::Uuid(uuid) => services.concepts.drug_by_uuid(&uuid),
        EntityRef::Name(name) => services.concepts.drug_by_name(&name),
        EntityRef::Mapping { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formentry_host::Drug;
    use uuid::Uuid;

    fn drug(id: i64) -> Drug {
        Drug {
            id,
            uuid: Uuid::new_v4(),
            name: format!("drug-{id}"),
            concept_id: id * 10,
        }
    }

    fn order(drug: &Drug, start: &str) -> DrugOrder {
        let mut o = DrugOrder::unsaved(1, drug);
        o.start_date = Some(start.parse().unwrap());
        o
    }

    fn regimen(code: &str, drug_ids: &[&str]) -> StandardRegimen {
        StandardRegimen {
            code: code.to_owned(),
            display_name: None,
            components: drug_ids
                .iter()
                .map(|d| DrugComponent {
                    drug_id: (*d).to_owned(),
                    dose: None,
                    units: None,
                    frequency: None,
                    instructions: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_strongest_match_prefers_more_components() {
        let d1 = drug(1);
        let d2 = drug(2);
        let orders = vec![order(&d1, "2024-05-01"), order(&d2, "2024-05-01")];
        let candidates = vec![regimen("single", &["1"]), regimen("pair", &["1", "2"])];

        let found = find_strongest_match(&candidates, &orders).unwrap();
        assert_eq!(found.regimen.code, "pair");
        assert_eq!(found.orders.len(), 2);
    }

    #[test]
    fn test_tie_keeps_the_first_declared_candidate() {
        let d1 = drug(1);
        let d2 = drug(2);
        let orders = vec![order(&d1, "2024-05-01"), order(&d2, "2024-05-01")];
        let candidates = vec![regimen("a", &["1"]), regimen("b", &["2"])];

        let found = find_strongest_match(&candidates, &orders).unwrap();
        assert_eq!(found.regimen.code, "a");
    }

    #[test]
    fn test_differing_start_dates_disqualify_the_candidate() {
        let d1 = drug(1);
        let d2 = drug(2);
        let orders = vec![order(&d1, "2024-05-01"), order(&d2, "2024-06-01")];
        let candidates = vec![regimen("pair", &["1", "2"])];

        assert!(find_strongest_match(&candidates, &orders).is_none());
    }

    #[test]
    fn test_partial_match_does_not_qualify() {
        let d1 = drug(1);
        let orders = vec![order(&d1, "2024-05-01")];
        let candidates = vec![regimen("pair", &["1", "2"])];

        assert!(find_strongest_match(&candidates, &orders).is_none());
    }

    #[test]
    fn test_voided_orders_are_ignored() {
        let d1 = drug(1);
        let mut voided = order(&d1, "2024-05-01");
        voided.voided = true;
        let candidates = vec![regimen("single", &["1"])];

        assert!(find_strongest_match(&candidates, &[voided]).is_none());
    }

    #[test]
    fn test_component_matches_by_uuid_as_well_as_id() {
        let d1 = drug(1);
        let orders = vec![order(&d1, "2024-05-01")];
        let by_uuid = vec![regimen("u", &[&d1.uuid.to_string()])];

        assert!(find_strongest_match(&by_uuid, &orders).is_some());
    }

    #[test]
    fn test_dose_differences_do_not_affect_matching() {
        let d1 = drug(1);
        let mut o = order(&d1, "2024-05-01");
        o.dose = Some(500.0);
        let mut candidate = regimen("single", &["1"]);
        candidate.components[0].dose = Some(250.0);

        assert!(find_strongest_match(&[candidate], &[o]).is_some());
    }

    #[test]
    fn test_yaml_definitions_parse() {
        let yaml = r#"
- code: drug1+drug2
  display_name: Two drug regimen
  components:
    - drug_id: "1"
      dose: 300
      units: mg
      frequency: OD
    - drug_id: "2"
"#;
        let regimens = load_standard_regimens(yaml).unwrap();
        assert_eq!(regimens.len(), 1);
        assert_eq!(regimens[0].components.len(), 2);
        assert_eq!(regimens[0].components[0].dose, Some(300.0));
        assert_eq!(
            standard_regimen_by_code(&regimens, "drug1+drug2").unwrap().display(),
            "Two drug regimen"
        );
    }
}
