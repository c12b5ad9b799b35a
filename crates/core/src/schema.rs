//! A structural summary of a rendered form, built up as tags are walked.
//!
//! The schema is what export and reporting tooling consumes: which sections
//! exist, which fields they hold and which concepts those fields capture.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub field_id: String,
    pub label: Option<String>,
    pub concept_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answers: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaSection {
    pub name: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

/// Sections in document order. A leading unnamed section collects fields
/// that appear before the first explicit section tag.
#[derive(Debug, Clone, Serialize)]
pub struct FormSchema {
    sections: Vec<SchemaSection>,
}

impl Default for FormSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSchema {
    pub fn new() -> Self {
        Self {
            sections: vec![SchemaSection::default()],
        }
    }

    pub fn begin_section(&mut self, name: Option<&str>) {
        self.sections.push(SchemaSection {
            name: name.map(str::to_owned),
            fields: Vec::new(),
        });
    }

    pub fn add_field(&mut self, field: FieldDescriptor) {
        // new() guarantees at least one section
        self.sections
            .last_mut()
            .expect("schema always has a section")
            .fields
            .push(field);
    }

    pub fn sections(&self) -> &[SchemaSection] {
        &self.sections
    }

    pub fn field_count(&self) -> usize {
        self.sections.iter().map(|s| s.fields.len()).sum()
    }

    /// All fields across sections, in document order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.sections.iter().flat_map(|s| s.fields.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(id: &str) -> FieldDescriptor {
        FieldDescriptor {
            field_id: id.to_owned(),
            label: None,
            concept_id: None,
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_fields_before_first_section_land_in_unnamed_one() {
        let mut schema = FormSchema::new();
        schema.add_field(field("w1"));
        schema.begin_section(Some("Vitals"));
        schema.add_field(field("w2"));

        assert_eq!(schema.sections().len(), 2);
        assert_eq!(schema.sections()[0].name, None);
        assert_eq!(schema.sections()[1].name.as_deref(), Some("Vitals"));
        assert_eq!(schema.field_count(), 2);
    }

    #[test]
    fn test_schema_serialises_for_export() {
        let mut schema = FormSchema::new();
        schema.begin_section(Some("Vitals"));
        schema.add_field(FieldDescriptor {
            field_id: "w1".into(),
            label: Some("Weight (kg)".into()),
            concept_id: Some(5089),
            answers: Vec::new(),
        });
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["sections"][1]["name"], "Vitals");
        assert_eq!(json["sections"][1]["fields"][0]["concept_id"], 5089);
        // Empty answer lists stay out of the export.
        assert!(json["sections"][1]["fields"][0].get("answers").is_none());
    }

    #[test]
    fn test_fields_iterate_in_document_order() {
        let mut schema = FormSchema::new();
        schema.add_field(field("w1"));
        schema.begin_section(None);
        schema.add_field(field("w2"));
        let ids: Vec<_> = schema.fields().map(|f| f.field_id.as_str()).collect();
        assert_eq!(ids, vec!["w1", "w2"]);
    }
}
