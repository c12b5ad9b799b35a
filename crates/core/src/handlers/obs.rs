//! The `<obs>` tag: one observation against one concept.

use crate::actions::{Submission, SubmissionAction, SubmissionContext};
use crate::context::RenderContext;
use crate::error::{DesignResult, FormSubmissionError, SubmissionFailure};
use crate::handlers::{
    resolve_concept, AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv,
    TagHandler,
};
use crate::schema::{AnswerOption, FieldDescriptor};
use crate::template::escape_attribute;
use crate::widgets::{SelectOption, Widget};
use chrono::{NaiveDate, Utc};
use formentry_host::{ConceptDatatype, Obs, ObsValue};
use formentry_types::{ControlId, Mode};

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("conceptId", AttributeKind::Concept),
    AttributeDescriptor::optional("answerConceptIds", AttributeKind::Literal),
    AttributeDescriptor::optional("labelText", AttributeKind::Literal),
    AttributeDescriptor::optional("id", AttributeKind::ControlId),
    AttributeDescriptor::optional("required", AttributeKind::Bool),
    AttributeDescriptor::optional("size", AttributeKind::Number),
];

pub struct ObsTagHandler;

impl TagHandler for ObsTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        let concept = resolve_concept(env.services, attrs.required("conceptId")?)?;
        let control = attrs
            .get("id")
            .map(|raw| {
                ControlId::new(raw).map_err(|e| attrs.invalid("id", e.to_string()))
            })
            .transpose()?;
        let required = attrs.bool_or("required", false)?;
        let mode = env.context.mode();

        let answers = match concept.datatype {
            ConceptDatatype::Coded => {
                let raw = attrs.get("answerConceptIds").ok_or_else(|| {
                    attrs.invalid("answerConceptIds", "a coded concept needs its answers listed")
                })?;
                let mut options = Vec::new();
                for reference in raw.split(',').map(str::trim).filter(|r| !r.is_empty()) {
                    let answer = resolve_concept(env.services, reference)?;
                    options.push(SelectOption {
                        value: answer.id.to_string(),
                        label: answer.name.clone(),
                    });
                }
                options
            }
            _ => Vec::new(),
        };

        // Pair this tag with the stored obs it previously produced, if the
        // session sits over an existing encounter.
        let existing = if mode == Mode::Enter {
            None
        } else if env.context.in_group() {
            env.context.take_group_member(concept.id, control.as_ref())?
        } else {
            env.context
                .existing_mut()
                .take_with_concept(concept.id, control.as_ref())?
        };

        let initial = existing.as_ref().and_then(|obs| match (&obs.value, mode) {
            (ObsValue::Boolean(true), Mode::View) => Some("Yes".to_owned()),
            (ObsValue::Boolean(false), _) => None,
            (ObsValue::None, _) => None,
            (value, _) => Some(value.display()),
        });

        let field_id = env.context.register_field();
        let widget = match concept.datatype {
            ConceptDatatype::Numeric => Widget::Number,
            ConceptDatatype::Text => Widget::Text { size: attrs.number("size")? },
            ConceptDatatype::Date => Widget::Date,
            ConceptDatatype::Coded => Widget::Select { options: answers.clone() },
            ConceptDatatype::Boolean => Widget::Checkbox { value: "true".into() },
        };

        if let Some(label) = attrs.get("labelText") {
            out.push_str(&format!(
                "<span class=\"label\">{}</span> ",
                escape_attribute(label)
            ));
        }
        out.push_str(&widget.render(&field_id, mode, initial.as_deref()));
        if mode.is_interactive() {
            out.push_str(&format!(
                "<span class=\"error\" id=\"{field_id}.error\" style=\"display:none\"></span>"
            ));
        }

        env.context.schema_mut().add_field(FieldDescriptor {
            field_id: field_id.clone(),
            label: attrs.get("labelText").map(str::to_owned),
            concept_id: Some(concept.id),
            answers: answers
                .iter()
                .map(|o| AnswerOption {
                    value: o.value.clone(),
                    label: o.label.clone(),
                })
                .collect(),
        });

        if mode.is_interactive() {
            env.controller.add_action(Box::new(ObsAction {
                field_id,
                concept_id: concept.id,
                datatype: concept.datatype,
                required,
                control: control.clone(),
                allowed_answers: answers.iter().map(|o| o.value.clone()).collect(),
                existing_obs_id: existing.as_ref().and_then(|o| o.id),
            }));
        }
        Ok(Handled::SkipChildren)
    }
}

/// The submission behaviour behind one `<obs>` occurrence.
pub struct ObsAction {
    field_id: String,
    concept_id: i64,
    datatype: ConceptDatatype,
    required: bool,
    control: Option<ControlId>,
    allowed_answers: Vec<String>,
    existing_obs_id: Option<i64>,
}

impl ObsAction {
    fn parse_value(&self, submission: &Submission) -> Result<Option<ObsValue>, String> {
        if self.datatype == ConceptDatatype::Boolean {
            return Ok(submission
                .is_checked(&self.field_id)
                .then_some(ObsValue::Boolean(true)));
        }
        let Some(raw) = submission.trimmed(&self.field_id) else {
            return Ok(None);
        };
        let value = match self.datatype {
            ConceptDatatype::Numeric => ObsValue::Numeric(
                raw.parse::<f64>().map_err(|_| format!("'{raw}' is not a number"))?,
            ),
            ConceptDatatype::Text => ObsValue::Text(raw.to_owned()),
            ConceptDatatype::Date => ObsValue::Date(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| format!("'{raw}' is not a date in yyyy-mm-dd form"))?,
            ),
            ConceptDatatype::Coded => {
                if !self.allowed_answers.iter().any(|a| a == raw) {
                    return Err(format!("'{raw}' is not one of the allowed answers"));
                }
                ObsValue::Coded(raw.parse::<i64>().map_err(|_| {
                    format!("'{raw}' is not a concept id")
                })?)
            }
            ConceptDatatype::Boolean => unreachable!("handled above"),
        };
        Ok(Some(value))
    }
}

impl SubmissionAction for ObsAction {
    fn validate(
        &self,
        _context: &RenderContext,
        submission: &Submission,
    ) -> Vec<FormSubmissionError> {
        match self.parse_value(submission) {
            Err(message) => vec![FormSubmissionError::new(&self.field_id, message)],
            Ok(None) if self.required => {
                vec![FormSubmissionError::new(&self.field_id, "this field is required")]
            }
            Ok(_) => Vec::new(),
        }
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        let value = self
            .parse_value(submission)
            .map_err(|message| {
                SubmissionFailure::Rejected(vec![FormSubmissionError::new(&self.field_id, message)])
            })?;
        // An edit replaces the stored obs rather than mutating it: the old
        // one is voided and, if a value remains, a successor is attached.
        if let Some(old) = self.existing_obs_id {
            context.void_obs(old);
        }
        if let Some(value) = value {
            let mut obs = Obs::unsaved(context.patient.id, self.concept_id, value);
            obs.obs_datetime = Some(Utc::now());
            obs.form_field_path = context.field_path(self.control.as_ref());
            context.attach_obs(obs);
        }
        Ok(())
    }
}
