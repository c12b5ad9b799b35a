//! Tag handlers: one per custom form tag.
//!
//! A handler declares the attributes its tag accepts, renders markup for the
//! session's mode, and contributes submission actions to the controller. The
//! walker owns recursion; a handler only says whether its children should be
//! walked, and how many times.

use crate::context::RenderContext;
use crate::error::{DesignError, DesignResult};
use formentry_compat::Capabilities;
use formentry_host::{Concept, Drug, Encounter, HostServices, Patient};
use formentry_types::EntityRef;

use crate::actions::FormSubmissionController;

pub mod condition;
pub mod drug_order;
pub mod if_mode;
pub mod lookup;
pub mod obs;
pub mod obsgroup;
pub mod repeat;
pub mod section;
pub mod standard_regimen;
pub mod submit;

/// What the walker should do with the tag's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// The handler consumed the element entirely.
    SkipChildren,
    /// Walk the children once.
    Children,
    /// Walk the children this many times over.
    ChildrenRepeated(u32),
}

/// The kind of value an attribute carries, for descriptor metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Literal,
    Bool,
    Number,
    Date,
    Concept,
    Drug,
    Mode,
    ControlId,
}

/// One attribute a tag accepts.
#[derive(Debug, Clone, Copy)]
pub struct AttributeDescriptor {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub required: bool,
}

impl AttributeDescriptor {
    pub const fn required(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }
}

/// The attributes of one tag occurrence, validated against its descriptors.
pub struct TagAttributes<'a> {
    tag: &'a str,
    attributes: &'a [(String, String)],
}

impl<'a> TagAttributes<'a> {
    pub fn new(tag: &'a str, attributes: &'a [(String, String)]) -> Self {
        Self { tag, attributes }
    }

    pub fn tag(&self) -> &str {
        self.tag
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn required(&self, name: &'static str) -> DesignResult<&'a str> {
        self.get(name).ok_or_else(|| DesignError::MissingAttribute {
            tag: self.tag.to_owned(),
            attribute: name,
        })
    }

    pub fn bool_or(&self, name: &str, default: bool) -> DesignResult<bool> {
        match self.get(name) {
            None => Ok(default),
            Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(self.invalid(name, format!("'{other}' is not true or false"))),
        }
    }

    pub fn number(&self, name: &str) -> DesignResult<Option<u32>> {
        self.get(name)
            .map(|raw| {
                raw.parse::<u32>()
                    .map_err(|_| self.invalid(name, format!("'{raw}' is not a whole number")))
            })
            .transpose()
    }

    pub fn invalid(&self, attribute: &str, message: impl Into<String>) -> DesignError {
        DesignError::InvalidAttribute {
            tag: self.tag.to_owned(),
            attribute: attribute.to_owned(),
            message: message.into(),
        }
    }

    /// Checks presence of required attributes and rejects unknown ones.
    pub fn validate(&self, descriptors: &[AttributeDescriptor]) -> DesignResult<()> {
        for descriptor in descriptors.iter().filter(|d| d.required) {
            if self.get(descriptor.name).is_none() {
                return Err(DesignError::MissingAttribute {
                    tag: self.tag.to_owned(),
                    attribute: descriptor.name,
                });
            }
        }
        for (name, _) in self.attributes {
            if !descriptors.iter().any(|d| d.name == name) {
                return Err(DesignError::UnexpectedAttribute {
                    tag: self.tag.to_owned(),
                    attribute: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Everything a handler may touch while a tag is being walked.
pub struct TagEnv<'a> {
    pub context: &'a mut RenderContext,
    pub controller: &'a mut FormSubmissionController,
    pub services: &'a HostServices,
    pub capabilities: &'a Capabilities,
    pub patient: &'a Patient,
    pub encounter: Option<&'a Encounter>,
    pub form_name: &'a str,
}

/// The behaviour of one custom tag.
pub trait TagHandler: Send + Sync {
    /// The attributes this tag accepts; the walker validates occurrences
    /// against these before calling [`TagHandler::start`].
    fn descriptors(&self) -> &[AttributeDescriptor];

    /// Called at the opening tag. Renders markup into `out`, registers
    /// actions, and decides what happens to the children.
    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled>;

    /// Called at the closing tag, after the children (if any) were walked.
    fn end(&self, _env: &mut TagEnv<'_>, _out: &mut String) -> DesignResult<()> {
        Ok(())
    }
}

/// Resolves a concept reference: numeric id, then "SOURCE:CODE" mapping,
/// then UUID, then name.
pub fn resolve_concept(services: &HostServices, reference: &str) -> DesignResult<Concept> {
    let parsed = EntityRef::parse(reference).map_err(|_| DesignError::UnresolvedReference {
        kind: "concept",
        reference: reference.to_owned(),
    })?;
    let found = match parsed {
        EntityRef::Id(id) => services.concepts.concept(id),
        EntityRef::Mapping { source, code } => services.concepts.concept_by_mapping(&source, &code),
        EntityRef::Uuid(uuid) => services.concepts.concept_by_uuid(&uuid),
        EntityRef::Name(name) => services.concepts.concept_by_name(&name),
    };
    found.ok_or_else(|| DesignError::UnresolvedReference {
        kind: "concept",
        reference: reference.to_owned(),
    })
}

/// Resolves a drug reference: numeric id, then UUID, then name.
pub fn resolve_drug(services: &HostServices, reference: &str) -> DesignResult<Drug> {
    let parsed = EntityRef::parse(reference).map_err(|_| DesignError::UnresolvedReference {
        kind: "drug",
        reference: reference.to_owned(),
    })?;
    let found = match parsed {
        EntityRef::Id(id) => services.concepts.drug(id),
        EntityRef::Uuid(uuid) => services.concepts.drug_by_uuid(&uuid),
        EntityRef::Name(name) => services.concepts.drug_by_name(&name),
        EntityRef::Mapping { .. } => None,
    };
    found.ok_or_else(|| DesignError::UnresolvedReference {
        kind: "drug",
        reference: reference.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTORS: &[AttributeDescriptor] = &[
        AttributeDescriptor::required("conceptId", AttributeKind::Concept),
        AttributeDescriptor::optional("id", AttributeKind::ControlId),
    ];

    #[test]
    fn test_missing_required_attribute_is_rejected() {
        let attributes = vec![("id".to_string(), "wt".to_string())];
        let attrs = TagAttributes::new("obs", &attributes);
        let err = attrs.validate(DESCRIPTORS).unwrap_err();
        assert!(matches!(
            err,
            DesignError::MissingAttribute { attribute: "conceptId", .. }
        ));
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let attributes = vec![
            ("conceptId".to_string(), "5089".to_string()),
            ("conceptid".to_string(), "5089".to_string()),
        ];
        let attrs = TagAttributes::new("obs", &attributes);
        let err = attrs.validate(DESCRIPTORS).unwrap_err();
        assert!(matches!(err, DesignError::UnexpectedAttribute { .. }));
    }

    #[test]
    fn test_bool_attribute_parsing() {
        let attributes = vec![("include".to_string(), "yes".to_string())];
        let attrs = TagAttributes::new("ifMode", &attributes);
        assert!(attrs.bool_or("missing", true).unwrap());
        assert!(matches!(
            attrs.bool_or("include", true).unwrap_err(),
            DesignError::InvalidAttribute { .. }
        ));
    }
}
