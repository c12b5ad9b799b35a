//! The `<condition>` tag: record an entry on the patient's condition list.
//!
//! Unlike observations, conditions are saved straight through the host
//! condition service rather than riding on the encounter.

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
use chrono::NaiveDate;
use formentry_host::{Condition, ConditionStatus};
use formentry_types::{ControlId, Mode};

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("conceptId", AttributeKind::Concept),
    AttributeDescriptor::required("id", AttributeKind::ControlId),
    AttributeDescriptor::optional("labelText", AttributeKind::Literal),
    AttributeDescriptor::optional("required", AttributeKind::Bool),
];

const STATUSES: &[(&str, &str)] = &[
    ("active", "Active"),
    ("inactive", "Inactive"),
    ("history-of", "History of"),
];

pub struct ConditionTagHandler;

impl TagHandler for ConditionTagHandler {
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
        let control = ControlId::new(attrs.required("id")?)
            .map_err(|e| attrs.invalid("id", e.to_string()))?;
        let required = attrs.bool_or("required", false)?;
        let mode = env.context.mode();

        // Conditions re-associate through the control id stamped on their
        // form field path, never through concept alone.
        let existing = if mode == Mode::Enter {
            None
        } else {
            env.services
                .conditions
                .conditions_for_patient(env.patient.id)
                .into_iter()
                .find(|c| !c.voided && c.control_id().as_ref() == Some(&control))
        };

        let status_field = env.context.register_field();
        let onset_field = env.context.register_field();
        let status_initial = existing.as_ref().map(|c| c.status.to_string());
        let onset_initial = existing
            .as_ref()
            .and_then(|c| c.onset_date)
            .map(|d| d.format("%Y-%m-%d").to_string());

        let options: Vec<SelectOption> = STATUSES
            .iter()
            .map(|(value, label)| SelectOption {
                value: (*value).to_owned(),
                label: (*label).to_owned(),
            })
            .collect();

        let label = attrs.get("labelText").unwrap_or(&concept.name);
        out.push_str(&format!(
            "<span class=\"label\">{}</span> ",
            escape_attribute(label)
        ));
        out.push_str(&Widget::Select { options: options.clone() }.render(
            &status_field,
            mode,
            status_initial.as_deref(),
        ));
        out.push(' ');
        out.push_str(&Widget::Date.render(&onset_field, mode, onset_initial.as_deref()));
        if mode.is_interactive() {
            out.push_str(&format!(
                "<span class=\"error\" id=\"{status_field}.error\" style=\"display:none\"></span>"
            ));
        }

        env.context.schema_mut().add_field(FieldDescriptor {
            field_id: status_field.clone(),
            label: Some(label.to_owned()),
            concept_id: Some(concept.id),
            answers: options
                .iter()
                .map(|o| AnswerOption {
                    value: o.value.clone(),
                    label: o.label.clone(),
                })
                .collect(),
        });

        if mode.is_interactive() {
            env.controller.add_action(Box::new(ConditionAction {
                status_field,
                onset_field,
                concept_id: concept.id,
                control,
                required,
                existing_condition_id: existing.and_then(|c| c.id),
            }));
        }
        Ok(Handled::SkipChildren)
    }
}

pub struct ConditionAction {
    status_field: String,
    onset_field: String,
    concept_id: i64,
    control: ControlId,
    required: bool,
    existing_condition_id: Option<i64>,
}

impl ConditionAction {
    fn parse(
        &self,
        submission: &Submission,
    ) -> Result<Option<(ConditionStatus, Option<NaiveDate>)>, FormSubmissionError> {
        let Some(raw) = submission.trimmed(&self.status_field) else {
            return Ok(None);
        };
        let status: ConditionStatus = raw
            .parse()
            .map_err(|e: String| FormSubmissionError::new(&self.status_field, e))?;
        let onset = submission
            .trimmed(&self.onset_field)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    FormSubmissionError::new(
                        &self.onset_field,
                        format!("'{raw}' is not a date in yyyy-mm-dd form"),
                    )
                })
            })
            .transpose()?;
        Ok(Some((status, onset)))
    }
}

impl SubmissionAction for ConditionAction {
    fn validate(
        &self,
        _context: &RenderContext,
        submission: &Submission,
    ) -> Vec<FormSubmissionError> {
        match self.parse(submission) {
            Err(error) => vec![error],
            Ok(None) if self.required => vec![FormSubmissionError::new(
                &self.status_field,
                "a condition status is required",
            )],
            Ok(_) => Vec::new(),
        }
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        let parsed = self
            .parse(submission)
            .map_err(|e| SubmissionFailure::Rejected(vec![e]))?;
        if let Some(old) = self.existing_condition_id {
            let stored = context
                .services
                .conditions
                .conditions_for_patient(context.patient.id)
                .into_iter()
                .find(|c| c.id == Some(old));
            if let Some(mut stored) = stored {
                stored.voided = true;
                context.services.conditions.save_condition(stored)?;
            }
        }
        let Some((status, onset)) = parsed else {
            return Ok(());
        };
        let mut condition = Condition::unsaved(context.patient.id, self.concept_id, status);
        condition.onset_date = onset;
        condition.form_field_path = context.field_path(Some(&self.control));
        context.services.conditions.save_condition(condition)?;
        Ok(())
    }
}
