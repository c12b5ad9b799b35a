//! Patient conditions recorded through the `<condition>` tag.

use chrono::NaiveDate;
use formentry_types::ControlId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clinical status of a recorded condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    Active,
    Inactive,
    HistoryOf,
}

impl std::str::FromStr for ConditionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ConditionStatus::Active),
            "inactive" => Ok(ConditionStatus::Inactive),
            "history-of" | "historyof" => Ok(ConditionStatus::HistoryOf),
            other => Err(format!("unrecognised condition status '{}'", other)),
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionStatus::Active => "active",
            ConditionStatus::Inactive => "inactive",
            ConditionStatus::HistoryOf => "history-of",
        };
        write!(f, "{}", s)
    }
}

/// An entry on a patient's condition list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub patient_id: i64,
    pub concept_id: i64,
    pub status: ConditionStatus,
    pub onset_date: Option<NaiveDate>,
    /// Stamped with the originating tag's control id, like an obs's form
    /// field path.
    pub form_field_path: Option<String>,
    pub voided: bool,
}

impl Condition {
    pub fn unsaved(patient_id: i64, concept_id: i64, status: ConditionStatus) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            patient_id,
            concept_id,
            status,
            onset_date: None,
            form_field_path: None,
            voided: false,
        }
    }

    /// The control id embedded in this condition's form field path, if any.
    pub fn control_id(&self) -> Option<ControlId> {
        self.form_field_path
            .as_deref()
            .and_then(ControlId::from_field_path)
    }
}
