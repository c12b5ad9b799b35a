//! The stored form document this plugin renders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored HTML-with-tags form definition.
///
/// The `xml_data` body is what the template parser consumes; everything else
/// is bookkeeping owned by the host's form service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HtmlForm {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub form_version: String,
    pub xml_data: String,
    pub retired: bool,
    pub date_changed: Option<DateTime<Utc>>,
}

impl HtmlForm {
    /// An unsaved form with the given name and markup body.
    pub fn unsaved(name: impl Into<String>, xml_data: impl Into<String>) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            form_version: "1.0".into(),
            xml_data: xml_data.into(),
            retired: false,
            date_changed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_serialises_for_sharing() {
        // Form definitions travel between systems as JSON documents.
        let form = HtmlForm::unsaved("Vitals", "<obs conceptId=\"5089\"/>");
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["name"], "Vitals");
        assert_eq!(json["form_version"], "1.0");
        let back: HtmlForm = serde_json::from_value(json).unwrap();
        assert_eq!(back, form);
    }
}
