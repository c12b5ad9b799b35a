//! Observations: single clinical data points tied to a concept.

use chrono::{DateTime, NaiveDate, Utc};
use formentry_types::ControlId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The value an obs carries, shaped by its concept's datatype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObsValue {
    Numeric(f64),
    Text(String),
    Date(NaiveDate),
    /// The id of the answer concept.
    Coded(i64),
    Boolean(bool),
    /// Group parents and not-yet-valued obs carry no value.
    None,
}

impl ObsValue {
    /// The value formatted the way forms display it (ISO dates, plain
    /// numerics). Coded values render as their concept id; callers that want
    /// the answer's name resolve it through the concept service.
    pub fn display(&self) -> String {
        match self {
            ObsValue::Numeric(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            ObsValue::Text(t) => t.clone(),
            ObsValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            ObsValue::Coded(id) => format!("{}", id),
            ObsValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            ObsValue::None => String::new(),
        }
    }
}

/// An observation, possibly a group parent with nested members.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub concept_id: i64,
    pub person_id: i64,
    pub encounter_id: Option<i64>,
    pub value: ObsValue,
    pub obs_datetime: Option<DateTime<Utc>>,
    /// The form field path the creating form stamped on this obs; carries
    /// the control id used to re-associate the obs with its tag.
    pub form_field_path: Option<String>,
    /// Direct members, when this obs is a group parent.
    #[serde(default)]
    pub group_members: Vec<Obs>,
    pub voided: bool,
}

impl Obs {
    /// An unsaved obs for the given person and concept.
    pub fn unsaved(person_id: i64, concept_id: i64, value: ObsValue) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            concept_id,
            person_id,
            encounter_id: None,
            value,
            obs_datetime: None,
            form_field_path: None,
            group_members: Vec::new(),
            voided: false,
        }
    }

    /// The control id embedded in this obs's form field path, if any.
    pub fn control_id(&self) -> Option<ControlId> {
        self.form_field_path
            .as_deref()
            .and_then(ControlId::from_field_path)
    }

    /// Whether this obs is a group parent.
    pub fn is_group(&self) -> bool {
        !self.group_members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_id_comes_from_field_path() {
        let mut obs = Obs::unsaved(1, 10, ObsValue::Numeric(70.0));
        obs.form_field_path = Some("FormEntry^Vitals.1.0/weight_tag-0".into());
        assert_eq!(obs.control_id().unwrap().as_str(), "weight_tag");
    }

    #[test]
    fn test_obs_without_field_path_has_no_control_id() {
        let obs = Obs::unsaved(1, 10, ObsValue::None);
        assert!(obs.control_id().is_none());
    }

    #[test]
    fn test_numeric_display_drops_trailing_zeroes() {
        assert_eq!(ObsValue::Numeric(70.0).display(), "70");
        assert_eq!(ObsValue::Numeric(70.5).display(), "70.5");
    }

    #[test]
    fn test_date_display_is_iso() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(ObsValue::Date(d).display(), "2024-03-09");
    }
}
