//! Drugs, drug orders, and order frequencies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A formulation in the host drug dictionary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Drug {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    /// The concept this drug is a formulation of.
    pub concept_id: i64,
}

/// A coded order frequency, used by platform versions that model frequency
/// as an entity rather than free text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFrequency {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
}

/// Scheduling urgency of an order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[default]
    Routine,
    OnScheduledDate,
}

/// A drug order in the host clinical data graph.
///
/// The struct carries both the legacy free-text fields (`frequency_text`,
/// `dose_units_text`) and the coded fields newer platform versions use
/// (`frequency_id`, `dose_units_concept_id`, `route_concept_id`). Which set
/// a given adapter populates is the compatibility layer's business; core
/// code never writes these fields directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrugOrder {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub patient_id: i64,
    pub encounter_id: Option<i64>,
    pub drug_id: i64,
    pub drug_uuid: Uuid,
    /// The concept of the ordered drug.
    pub concept_id: i64,
    pub dose: Option<f64>,
    pub instructions: Option<String>,

    // Legacy (pre-order-entry-rewrite) fields.
    pub frequency_text: Option<String>,
    pub dose_units_text: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub discontinued: bool,
    pub discontinued_date: Option<NaiveDate>,
    pub discontinued_reason_concept_id: Option<i64>,
    pub discontinued_reason_non_coded: Option<String>,

    // Coded fields introduced by the order-entry rewrite.
    pub frequency_id: Option<i64>,
    pub dose_units_concept_id: Option<i64>,
    pub route_concept_id: Option<i64>,
    pub date_activated: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub urgency: Urgency,

    pub voided: bool,
    pub creator: Option<String>,
    pub date_changed: Option<DateTime<Utc>>,
}

impl DrugOrder {
    /// An unsaved order for the given drug, with every optional field empty.
    pub fn unsaved(patient_id: i64, drug: &Drug) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            patient_id,
            encounter_id: None,
            drug_id: drug.id,
            drug_uuid: drug.uuid,
            concept_id: drug.concept_id,
            dose: None,
            instructions: None,
            frequency_text: None,
            dose_units_text: None,
            start_date: None,
            discontinued: false,
            discontinued_date: None,
            discontinued_reason_concept_id: None,
            discontinued_reason_non_coded: None,
            frequency_id: None,
            dose_units_concept_id: None,
            route_concept_id: None,
            date_activated: None,
            scheduled_date: None,
            urgency: Urgency::Routine,
            voided: false,
            creator: None,
            date_changed: None,
        }
    }

    /// The date the order takes effect, regardless of which field family the
    /// creating platform version populated.
    pub fn effective_start_date(&self) -> Option<NaiveDate> {
        self.scheduled_date.or(self.date_activated).or(self.start_date)
    }
}
