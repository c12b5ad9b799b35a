//! Per-session rendering state shared by every tag handler.

use crate::error::{DesignError, DesignResult};
use crate::obsmatch::ExistingObsIndex;
use crate::schema::FormSchema;
use formentry_host::{Encounter, Obs};
use formentry_types::{ControlId, Mode};
use std::collections::HashMap;

/// An obs group currently open during the walk. When the form is rendered
/// over an existing encounter, `existing` carries the matched stored group
/// so member tags pair against its members rather than the top level.
#[derive(Debug)]
pub struct ObsGroupScope {
    pub concept_id: i64,
    pub existing: Option<Obs>,
}

/// Rendering state threaded through a template walk: the mode, the field id
/// sequence, the open obs-group stack, the schema under construction and the
/// index of not-yet-claimed existing observations.
#[derive(Debug)]
pub struct RenderContext {
    mode: Mode,
    sequence: u32,
    schema: FormSchema,
    group_stack: Vec<ObsGroupScope>,
    existing: ExistingObsIndex,
    variables: HashMap<String, String>,
}

impl RenderContext {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            sequence: 0,
            schema: FormSchema::new(),
            group_stack: Vec::new(),
            existing: ExistingObsIndex::empty(),
            variables: HashMap::new(),
        }
    }

    pub fn with_encounter(mode: Mode, encounter: &Encounter) -> Self {
        let mut ctx = Self::new(mode);
        ctx.existing = ExistingObsIndex::build(encounter);
        ctx
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The next field id in the session-wide sequence: "w1", "w2", ...
    pub fn register_field(&mut self) -> String {
        self.sequence += 1;
        format!("w{}", self.sequence)
    }

    pub fn fields_registered(&self) -> u32 {
        self.sequence
    }

    pub fn begin_obs_group(&mut self, concept_id: i64, existing: Option<Obs>) {
        self.group_stack.push(ObsGroupScope {
            concept_id,
            existing,
        });
    }

    pub fn end_obs_group(&mut self) -> DesignResult<()> {
        self.group_stack
            .pop()
            .map(|_| ())
            .ok_or(DesignError::UnbalancedObsGroup)
    }

    pub fn open_group_depth(&self) -> usize {
        self.group_stack.len()
    }

    pub fn active_group(&self) -> Option<&ObsGroupScope> {
        self.group_stack.last()
    }

    /// Claims a member of the active group's stored counterpart, by concept
    /// and optionally by control id. Outside a group, or in a group with no
    /// stored counterpart, there is nothing to claim.
    pub fn take_group_member(
        &mut self,
        concept_id: i64,
        control: Option<&ControlId>,
    ) -> DesignResult<Option<Obs>> {
        let Some(scope) = self.group_stack.last_mut() else {
            return Ok(None);
        };
        let Some(existing) = scope.existing.as_mut() else {
            return Ok(None);
        };
        let matches: Vec<usize> = existing
            .group_members
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.concept_id == concept_id
                    && control.map_or(true, |c| m.control_id().as_ref() == Some(c))
            })
            .map(|(i, _)| i)
            .collect();
        match (matches.as_slice(), control) {
            ([], _) => Ok(None),
            ([index], _) => Ok(Some(existing.group_members.remove(*index))),
            (_, Some(control)) => Err(DesignError::AmbiguousControlId(control.to_string())),
            ([index, ..], None) => Ok(Some(existing.group_members.remove(*index))),
        }
    }

    pub fn in_group(&self) -> bool {
        !self.group_stack.is_empty()
    }

    pub fn existing(&self) -> &ExistingObsIndex {
        &self.existing
    }

    pub fn existing_mut(&mut self) -> &mut ExistingObsIndex {
        &mut self.existing
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn schema_mut(&mut self) -> &mut FormSchema {
        &mut self.schema
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variables_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.variables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formentry_host::ObsValue;

    #[test]
    fn test_field_ids_are_sequential() {
        let mut ctx = RenderContext::new(Mode::Enter);
        assert_eq!(ctx.register_field(), "w1");
        assert_eq!(ctx.register_field(), "w2");
        assert_eq!(ctx.fields_registered(), 2);
    }

    #[test]
    fn test_group_stack_must_balance() {
        let mut ctx = RenderContext::new(Mode::Enter);
        ctx.begin_obs_group(1234, None);
        assert!(ctx.in_group());
        ctx.end_obs_group().unwrap();
        let err = ctx.end_obs_group().unwrap_err();
        assert!(matches!(err, DesignError::UnbalancedObsGroup));
    }

    #[test]
    fn test_group_member_claim_prefers_control_id() {
        let mut group = Obs::unsaved(1, 1234, ObsValue::None);
        let mut member = Obs::unsaved(1, 5089, ObsValue::Numeric(70.0));
        member.form_field_path = Some("HtmlFormEntry^F.1/wt-0".into());
        group.group_members.push(member);

        let mut ctx = RenderContext::new(Mode::Edit);
        ctx.begin_obs_group(1234, Some(group));
        let control = ControlId::new("wt").unwrap();
        let claimed = ctx.take_group_member(5089, Some(&control)).unwrap().unwrap();
        assert_eq!(claimed.value, ObsValue::Numeric(70.0));
        // Claimed means gone.
        assert!(ctx.take_group_member(5089, Some(&control)).unwrap().is_none());
    }
}
