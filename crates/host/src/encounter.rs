//! Patients and encounters.

use crate::drug::DrugOrder;
use crate::obs::Obs;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A patient in the host platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub uuid: Uuid,
    pub given_name: String,
    pub family_name: String,
    pub identifier: Option<String>,
    /// Set when the patient has been exited from care.
    pub exit_date: Option<NaiveDate>,
    pub exit_reason_concept_id: Option<i64>,
    pub dead: bool,
    pub death_date: Option<NaiveDate>,
    pub cause_of_death_concept_id: Option<i64>,
}

impl Patient {
    pub fn new(id: i64, given_name: impl Into<String>, family_name: impl Into<String>) -> Self {
        Self {
            id,
            uuid: Uuid::new_v4(),
            given_name: given_name.into(),
            family_name: family_name.into(),
            identifier: None,
            exit_date: None,
            exit_reason_concept_id: None,
            dead: false,
            death_date: None,
            cause_of_death_concept_id: None,
        }
    }
}

/// A clinical encounter: the unit a form submission creates or edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub patient_id: i64,
    pub encounter_datetime: DateTime<Utc>,
    pub location: Option<String>,
    pub provider: Option<String>,
    /// The name of the form that created this encounter, if any.
    pub form_name: Option<String>,
    /// Top-level obs; group members nest inside their parents.
    #[serde(default)]
    pub obs: Vec<Obs>,
    #[serde(default)]
    pub orders: Vec<DrugOrder>,
}

impl Encounter {
    /// An unsaved encounter for the given patient, dated now.
    pub fn unsaved(patient_id: i64) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            patient_id,
            encounter_datetime: Utc::now(),
            location: None,
            provider: None,
            form_name: None,
            obs: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// The encounter date at day granularity, which is what order start
    /// dates are compared against.
    pub fn encounter_date(&self) -> NaiveDate {
        self.encounter_datetime.date_naive()
    }
}
