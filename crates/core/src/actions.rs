//! The submission action tree and its controller.
//!
//! Rendering a form in an interactive mode builds, as a side effect, an
//! ordered tree of submission actions mirroring the document order of the
//! tags that produced them. Submitting runs two passes over that tree: a
//! validation pass that collects every error, then an apply pass that stops
//! at the first failure.

use crate::context::RenderContext;
use crate::error::{DesignError, DesignResult, FormSubmissionError, SubmissionFailure};
use chrono::Utc;
use formentry_compat::Capabilities;
use formentry_host::{Encounter, HostServices, Obs, Patient};
use formentry_types::{ControlId, Mode};
use std::collections::HashMap;

/// The submitted form values, keyed by field id.
#[derive(Debug, Default, Clone)]
pub struct Submission {
    values: HashMap<String, String>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: impl Into<String>) {
        self.values.insert(field_id.into(), value.into());
    }

    pub fn get(&self, field_id: &str) -> Option<&str> {
        self.values.get(field_id).map(String::as_str)
    }

    /// The trimmed value, with blank treated as absent.
    pub fn trimmed(&self, field_id: &str) -> Option<&str> {
        self.get(field_id).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Whether a checkbox field came back checked.
    pub fn is_checked(&self, field_id: &str) -> bool {
        matches!(self.trimmed(field_id), Some("true" | "on" | "checked"))
    }
}

/// Mutable state the apply pass works against: the encounter being built or
/// edited, plus the obs-group nesting mirroring the render-time one.
pub struct SubmissionContext<'a> {
    pub mode: Mode,
    pub patient: &'a Patient,
    pub encounter: &'a mut Encounter,
    pub services: &'a HostServices,
    pub capabilities: &'a Capabilities,
    pub form_name: &'a str,
    group_stack: Vec<Obs>,
}

impl<'a> SubmissionContext<'a> {
    pub fn new(
        mode: Mode,
        patient: &'a Patient,
        encounter: &'a mut Encounter,
        services: &'a HostServices,
        capabilities: &'a Capabilities,
        form_name: &'a str,
    ) -> Self {
        Self {
            mode,
            patient,
            encounter,
            services,
            capabilities,
            form_name,
            group_stack: Vec::new(),
        }
    }

    /// Attaches an obs to the open group, or to the encounter top level when
    /// no group is open.
    pub fn attach_obs(&mut self, obs: Obs) {
        match self.group_stack.last_mut() {
            Some(group) => group.group_members.push(obs),
            None => self.encounter.obs.push(obs),
        }
    }

    pub fn begin_group(&mut self, group: Obs) {
        self.group_stack.push(group);
    }

    pub fn end_group(&mut self) -> DesignResult<()> {
        let group = self.group_stack.pop().ok_or(DesignError::UnbalancedObsGroup)?;
        // A group whose members all came back blank is dropped, not saved
        // as an empty parent.
        if group.is_group() {
            self.attach_obs(group);
        }
        Ok(())
    }

    pub fn open_groups(&self) -> usize {
        self.group_stack.len()
    }

    /// The form field path recorded on created obs, which is what later
    /// sessions parse the control id back out of.
    pub fn field_path(&self, control: Option<&ControlId>) -> Option<String> {
        control.map(|c| format!("HtmlFormEntry^{}/{}-0", self.form_name, c))
    }

    /// Voids the stored obs with the given id, wherever it sits in the
    /// encounter's obs tree.
    pub fn void_obs(&mut self, obs_id: i64) {
        fn void_in(list: &mut [Obs], obs_id: i64) -> bool {
            for obs in list {
                if obs.id == Some(obs_id) {
                    obs.voided = true;
                    return true;
                }
                if void_in(&mut obs.group_members, obs_id) {
                    return true;
                }
            }
            false
        }
        if !void_in(&mut self.encounter.obs, obs_id) {
            tracing::warn!(obs_id, "asked to void an obs the encounter does not hold");
        }
    }

    /// Voids a stored drug order on the encounter.
    pub fn void_order(&mut self, order_id: i64) {
        match self.encounter.orders.iter_mut().find(|o| o.id == Some(order_id)) {
            Some(order) => {
                order.voided = true;
                order.date_changed = Some(Utc::now());
            }
            None => tracing::warn!(order_id, "asked to void an order the encounter does not hold"),
        }
    }
}

/// One unit of submission behaviour, contributed by a tag at render time.
pub trait SubmissionAction: Send + Sync {
    /// Checks the submitted values, returning every problem found. Must not
    /// change any state.
    fn validate(&self, context: &RenderContext, submission: &Submission)
        -> Vec<FormSubmissionError>;

    /// Applies the submitted values to the context. Only called after the
    /// whole tree validated cleanly.
    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure>;
}

/// Callbacks wrapped around a repeat section's children during both passes.
pub trait RepeatHooks: Send + Sync {
    fn before_validate(&self, _submission: &Submission) {}
    fn after_validate(&self, _errors: &[FormSubmissionError]) {}
    fn before_apply(&self, _submission: &Submission) {}
    fn after_apply(&self, _submission: &Submission) {}
}

/// Hooks that just trace the repeat's progress.
pub struct TracingRepeatHooks {
    pub rows: u32,
}

impl RepeatHooks for TracingRepeatHooks {
    fn before_validate(&self, _submission: &Submission) {
        tracing::debug!(rows = self.rows, "validating repeat section");
    }

    fn after_validate(&self, errors: &[FormSubmissionError]) {
        tracing::debug!(errors = errors.len(), "repeat section validated");
    }

    fn before_apply(&self, _submission: &Submission) {
        tracing::debug!(rows = self.rows, "applying repeat section");
    }
}

/// A composite action holding the children of one repeat section.
pub struct RepeatAction {
    hooks: Box<dyn RepeatHooks>,
    children: Vec<Box<dyn SubmissionAction>>,
}

impl RepeatAction {
    pub fn new(hooks: Box<dyn RepeatHooks>) -> Self {
        Self {
            hooks,
            children: Vec::new(),
        }
    }

    pub fn push(&mut self, action: Box<dyn SubmissionAction>) {
        self.children.push(action);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl SubmissionAction for RepeatAction {
    fn validate(
        &self,
        context: &RenderContext,
        submission: &Submission,
    ) -> Vec<FormSubmissionError> {
        self.hooks.before_validate(submission);
        let mut errors = Vec::new();
        for child in &self.children {
            errors.extend(child.validate(context, submission));
        }
        self.hooks.after_validate(&errors);
        errors
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        self.hooks.before_apply(submission);
        for child in &self.children {
            child.apply(context, submission)?;
        }
        self.hooks.after_apply(submission);
        Ok(())
    }
}

/// Owns the action tree and runs the two submission passes over it.
#[derive(Default)]
pub struct FormSubmissionController {
    actions: Vec<Box<dyn SubmissionAction>>,
    open_repeat: Option<RepeatAction>,
    last_errors: Vec<FormSubmissionError>,
}

impl FormSubmissionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action, routing it into the open repeat section if one is
    /// being built.
    pub fn add_action(&mut self, action: Box<dyn SubmissionAction>) {
        match self.open_repeat.as_mut() {
            Some(repeat) => repeat.push(action),
            None => self.actions.push(action),
        }
    }

    pub fn start_repeat(&mut self, hooks: Box<dyn RepeatHooks>) -> DesignResult<()> {
        if self.open_repeat.is_some() {
            return Err(DesignError::NestedRepeat);
        }
        self.open_repeat = Some(RepeatAction::new(hooks));
        Ok(())
    }

    pub fn end_repeat(&mut self) -> DesignResult<()> {
        let repeat = self.open_repeat.take().ok_or(DesignError::RepeatNotOpen)?;
        self.actions.push(Box::new(repeat));
        Ok(())
    }

    /// Render finished: no repeat section may still be open.
    pub fn finish(&self) -> DesignResult<()> {
        if self.open_repeat.is_some() {
            return Err(DesignError::RepeatNotClosed);
        }
        Ok(())
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Runs the validation pass in document order, collecting every error
    /// rather than stopping at the first.
    pub fn validate_submission(
        &mut self,
        context: &RenderContext,
        submission: &Submission,
    ) -> &[FormSubmissionError] {
        let mut errors = Vec::new();
        for action in &self.actions {
            errors.extend(action.validate(context, submission));
        }
        self.last_errors = errors;
        &self.last_errors
    }

    pub fn last_errors(&self) -> &[FormSubmissionError] {
        &self.last_errors
    }

    /// Runs the apply pass, propagating the first failure.
    pub fn handle_submission(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        for action in &self.actions {
            action.apply(context, submission)?;
        }
        Ok(())
    }
}
