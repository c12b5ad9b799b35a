//! Matching existing observations back to the form controls that made them.
//!
//! When a form is opened over an existing encounter, each tag must find the
//! observation it previously created so EDIT can pre-populate and VIEW can
//! display. Matching is by concept, narrowed by control id where the form
//! supplies one. Zero matches is fine (the field was left blank), one match
//! is the answer, and two or more is a form-design fault that must stop the
//! render rather than silently pick one.

use crate::error::{DesignError, DesignResult};
use formentry_host::{Encounter, Obs};
use formentry_types::ControlId;

/// Finds the single member of an obs group carrying the given control id.
pub fn obs_in_group<'a>(group: &'a Obs, control: &ControlId) -> DesignResult<Option<&'a Obs>> {
    let mut found = None;
    for member in group.group_members.iter().filter(|m| !m.voided) {
        if member.control_id().as_ref() == Some(control) {
            if found.is_some() {
                return Err(DesignError::AmbiguousControlId(control.to_string()));
            }
            found = Some(member);
        }
    }
    Ok(found)
}

/// The not-yet-claimed observations of an encounter.
///
/// Tags claim observations as they render, removing them from the index so
/// two identical tags pair with two distinct observations in document order.
#[derive(Debug, Default)]
pub struct ExistingObsIndex {
    top_level: Vec<Obs>,
}

impl ExistingObsIndex {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(encounter: &Encounter) -> Self {
        Self {
            top_level: encounter
                .obs
                .iter()
                .filter(|o| !o.voided)
                .cloned()
                .map(strip_voided_members)
                .collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.top_level.len()
    }

    /// Looks across the full flattened obs set for a concept + control id
    /// pair, without claiming anything.
    pub fn obs_with_concept(
        &self,
        concept_id: i64,
        control: &ControlId,
    ) -> DesignResult<Option<&Obs>> {
        let mut found = None;
        for obs in self.flattened() {
            if obs.concept_id == concept_id && obs.control_id().as_ref() == Some(control) {
                if found.is_some() {
                    return Err(DesignError::AmbiguousControlId(control.to_string()));
                }
                found = Some(obs);
            }
        }
        Ok(found)
    }

    pub fn obs_by_control_id(&self, control: &ControlId) -> DesignResult<Option<&Obs>> {
        let mut found = None;
        for obs in self.flattened() {
            if obs.control_id().as_ref() == Some(control) {
                if found.is_some() {
                    return Err(DesignError::AmbiguousControlId(control.to_string()));
                }
                found = Some(obs);
            }
        }
        Ok(found)
    }

    /// Claims a top-level leaf observation for a concept, narrowed by
    /// control id when one is given.
    pub fn take_with_concept(
        &mut self,
        concept_id: i64,
        control: Option<&ControlId>,
    ) -> DesignResult<Option<Obs>> {
        match control {
            Some(control) => {
                let matches: Vec<usize> = self
                    .top_level
                    .iter()
                    .enumerate()
                    .filter(|(_, o)| {
                        o.concept_id == concept_id && o.control_id().as_ref() == Some(control)
                    })
                    .map(|(i, _)| i)
                    .collect();
                match matches.as_slice() {
                    [] => Ok(None),
                    [index] => Ok(Some(self.top_level.remove(*index))),
                    _ => Err(DesignError::AmbiguousControlId(control.to_string())),
                }
            }
            None => Ok(self.take_first(concept_id)),
        }
    }

    /// Claims the first unclaimed leaf observation with the concept.
    pub fn take_first(&mut self, concept_id: i64) -> Option<Obs> {
        let index = self
            .top_level
            .iter()
            .position(|o| o.concept_id == concept_id && !o.is_group())?;
        Some(self.top_level.remove(index))
    }

    /// Claims a top-level obs group by grouping concept, narrowed by
    /// control id when one is given.
    pub fn take_group(
        &mut self,
        concept_id: i64,
        control: Option<&ControlId>,
    ) -> DesignResult<Option<Obs>> {
        let matches: Vec<usize> = self
            .top_level
            .iter()
            .enumerate()
            .filter(|(_, o)| {
                o.concept_id == concept_id
                    && o.is_group()
                    && control.map_or(true, |c| o.control_id().as_ref() == Some(c))
            })
            .map(|(i, _)| i)
            .collect();
        match (matches.as_slice(), control) {
            ([], _) => Ok(None),
            ([index], _) => Ok(Some(self.top_level.remove(*index))),
            (_, Some(control)) => Err(DesignError::AmbiguousControlId(control.to_string())),
            // Without a control id, document order disambiguates.
            ([index, ..], None) => Ok(Some(self.top_level.remove(*index))),
        }
    }

    fn flattened(&self) -> impl Iterator<Item = &Obs> {
        fn walk<'a>(obs: &'a Obs, out: &mut Vec<&'a Obs>) {
            out.push(obs);
            for member in &obs.group_members {
                walk(member, out);
            }
        }
        let mut all = Vec::new();
        for obs in &self.top_level {
            walk(obs, &mut all);
        }
        all.into_iter()
    }
}

fn strip_voided_members(mut obs: Obs) -> Obs {
    obs.group_members.retain(|m| !m.voided);
    obs.group_members = obs
        .group_members
        .into_iter()
        .map(strip_voided_members)
        .collect();
    obs
}
