//! The `<obsgroup>` tag: nests member observations under a grouping concept.

use crate::actions::{Submission, SubmissionAction, SubmissionContext};
use crate::context::RenderContext;
use crate::error::{DesignResult, FormSubmissionError, SubmissionFailure};
use crate::handlers::{
    resolve_concept, AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv,
    TagHandler,
};
use chrono::Utc;
use formentry_host::{Obs, ObsValue};
use formentry_types::{ControlId, Mode};

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("groupingConceptId", AttributeKind::Concept),
    AttributeDescriptor::optional("id", AttributeKind::ControlId),
];

pub struct ObsGroupTagHandler;

impl TagHandler for ObsGroupTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        _out: &mut String,
    ) -> DesignResult<Handled> {
        let concept = resolve_concept(env.services, attrs.required("groupingConceptId")?)?;
        let control = attrs
            .get("id")
            .map(|raw| ControlId::new(raw).map_err(|e| attrs.invalid("id", e.to_string())))
            .transpose()?;
        let mode = env.context.mode();

        let existing = if mode == Mode::Enter {
            None
        } else {
            env.context
                .existing_mut()
                .take_group(concept.id, control.as_ref())?
        };
        let existing_group_id = existing.as_ref().and_then(|g| g.id);
        env.context.begin_obs_group(concept.id, existing);

        if mode.is_interactive() {
            env.controller.add_action(Box::new(ObsGroupAction::Begin {
                concept_id: concept.id,
                control,
                existing_group_id,
            }));
        }
        Ok(Handled::Children)
    }

    fn end(&self, env: &mut TagEnv<'_>, _out: &mut String) -> DesignResult<()> {
        env.context.end_obs_group()?;
        if env.context.mode().is_interactive() {
            env.controller.add_action(Box::new(ObsGroupAction::End));
        }
        Ok(())
    }
}

/// Bracketing actions that mirror the group's nesting into the apply pass.
pub enum ObsGroupAction {
    Begin {
        concept_id: i64,
        control: Option<ControlId>,
        existing_group_id: Option<i64>,
    },
    End,
}

impl SubmissionAction for ObsGroupAction {
    fn validate(&self, _: &RenderContext, _: &Submission) -> Vec<FormSubmissionError> {
        Vec::new()
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        _submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        match self {
            ObsGroupAction::Begin {
                concept_id,
                control,
                existing_group_id,
            } => {
                if let Some(old) = existing_group_id {
                    context.void_obs(*old);
                }
                let mut group = Obs::unsaved(context.patient.id, *concept_id, ObsValue::None);
                group.obs_datetime = Some(Utc::now());
                group.form_field_path = context.field_path(control.as_ref());
                context.begin_group(group);
                Ok(())
            }
            ObsGroupAction::End => {
                context.end_group()?;
                Ok(())
            }
        }
    }
}
