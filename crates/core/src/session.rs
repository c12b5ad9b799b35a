//! The form entry session: one form, one patient, one mode.
//!
//! A session parses the form's template, walks it to produce markup (and,
//! as a side effect, the schema and the submission action tree), then in
//! interactive modes accepts a submission and turns it into saved data.

use crate::actions::{FormSubmissionController, Submission, SubmissionContext};
use crate::context::RenderContext;
use crate::error::{DesignError, DesignResult, FormSubmissionError, SubmissionFailure};
use crate::extensions::SubmissionActionExtender;
use crate::handlers::{TagAttributes, TagEnv};
use crate::module::ModuleRuntime;
use crate::regimen::StandardRegimen;
use crate::registry::{TagRegistry, RESERVED_TAGS};
use crate::schema::FormSchema;
use crate::template::{is_void_element, serialize_open_tag, FormTemplate, NodeId, NodeKind};
use formentry_compat::{Capabilities, EncounterCriteria};
use formentry_host::{Encounter, HostError, HostServices, HtmlForm, Patient};
use formentry_types::Mode;
use std::sync::Arc;

pub struct FormEntrySession {
    mode: Mode,
    patient: Patient,
    encounter: Encounter,
    template: Arc<FormTemplate>,
    form_name: String,
    context: RenderContext,
    controller: FormSubmissionController,
    registry: Arc<TagRegistry>,
    capabilities: Arc<Capabilities>,
    standard_regimens: Arc<Vec<StandardRegimen>>,
    services: HostServices,
    extenders: Vec<Arc<dyn SubmissionActionExtender>>,
    html: Option<String>,
}

impl FormEntrySession {
    /// A session for entering a new encounter through the form.
    pub fn enter(
        runtime: &ModuleRuntime,
        services: HostServices,
        patient: Patient,
        form: &HtmlForm,
    ) -> DesignResult<Self> {
        let encounter = {
            let mut e = Encounter::unsaved(patient.id);
            e.form_name = Some(form.name.clone());
            e
        };
        Self::build(Mode::Enter, runtime, services, patient, encounter, form)
    }

    /// A session for editing an existing encounter through the form that
    /// created it.
    pub fn edit(
        runtime: &ModuleRuntime,
        services: HostServices,
        patient: Patient,
        encounter: Encounter,
        form: &HtmlForm,
    ) -> DesignResult<Self> {
        Self::build(Mode::Edit, runtime, services, patient, encounter, form)
    }

    /// A read-only session over an existing encounter.
    pub fn view(
        runtime: &ModuleRuntime,
        services: HostServices,
        patient: Patient,
        encounter: Encounter,
        form: &HtmlForm,
    ) -> DesignResult<Self> {
        Self::build(Mode::View, runtime, services, patient, encounter, form)
    }

    fn build(
        mode: Mode,
        runtime: &ModuleRuntime,
        services: HostServices,
        patient: Patient,
        encounter: Encounter,
        form: &HtmlForm,
    ) -> DesignResult<Self> {
        let template = Arc::new(FormTemplate::parse(&form.xml_data)?);
        let mut context = if mode == Mode::Enter {
            RenderContext::new(mode)
        } else {
            RenderContext::with_encounter(mode, &encounter)
        };

        // Built-in template variables, then whatever the deployment adds.
        context.set_variable(
            "patient.name",
            runtime.capabilities.name_layout.format_name(&patient),
        );
        if let Some(identifier) = &patient.identifier {
            context.set_variable("patient.identifier", identifier.clone());
        }
        let past = runtime.capabilities.encounter_search.encounters(
            &services,
            &EncounterCriteria {
                patient_id: patient.id,
                ..EncounterCriteria::default()
            },
        );
        context.set_variable("patient.encounterCount", past.len().to_string());
        for provider in &runtime.variable_providers {
            provider.populate(context.variables_mut(), &patient);
        }

        Ok(Self {
            mode,
            patient,
            encounter,
            template,
            form_name: form.name.clone(),
            context,
            controller: FormSubmissionController::new(),
            registry: runtime.registry.clone(),
            capabilities: runtime.capabilities.clone(),
            standard_regimens: runtime.standard_regimens.clone(),
            services,
            extenders: runtime.submission_extenders.clone(),
            html: None,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn patient(&self) -> &Patient {
        &self.patient
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// The schema built by the last render. Empty before the first call to
    /// [`FormEntrySession::generate_html`].
    pub fn schema(&self) -> &FormSchema {
        self.context.schema()
    }

    /// Renders the form markup for this session's mode. Idempotent: the
    /// walk happens once and the result is cached.
    pub fn generate_html(&mut self) -> DesignResult<String> {
        if let Some(html) = &self.html {
            return Ok(html.clone());
        }
        let template = Arc::clone(&self.template);
        let registry = Arc::clone(&self.registry);
        let mut env = TagEnv {
            context: &mut self.context,
            controller: &mut self.controller,
            services: &self.services,
            capabilities: &self.capabilities,
            patient: &self.patient,
            encounter: if self.mode == Mode::Enter {
                None
            } else {
                Some(&self.encounter)
            },
            form_name: &self.form_name,
        };
        let mut out = String::new();
        for &root in template.roots() {
            walk_node(&template, &registry, &mut env, root, &mut out)?;
        }
        self.controller.finish()?;
        if self.context.open_group_depth() != 0 {
            return Err(DesignError::UnbalancedObsGroup);
        }
        self.html = Some(out.clone());
        Ok(out)
    }

    /// Runs the validation pass and returns every problem found, without
    /// changing any data.
    pub fn validate_submission(
        &mut self,
        submission: &Submission,
    ) -> DesignResult<Vec<FormSubmissionError>> {
        self.generate_html()?;
        Ok(self
            .controller
            .validate_submission(&self.context, submission)
            .to_vec())
    }

    /// Validates and, if clean, applies the submission and persists the
    /// encounter. Refuses outright in VIEW mode or without an
    /// authenticated user.
    pub fn submit(&mut self, submission: &Submission) -> Result<Encounter, SubmissionFailure> {
        if self.mode == Mode::View {
            return Err(SubmissionFailure::ViewMode);
        }
        if self.services.auth.authenticated_user().is_none() {
            return Err(SubmissionFailure::Host(HostError::NotAuthenticated));
        }
        let errors = self.validate_submission(submission)?;
        if !errors.is_empty() {
            return Err(SubmissionFailure::Rejected(errors));
        }

        let mut ctx = SubmissionContext::new(
            self.mode,
            &self.patient,
            &mut self.encounter,
            &self.services,
            &self.capabilities,
            &self.form_name,
        );
        for extender in &self.extenders {
            extender.before_submission(&mut ctx, submission)?;
        }
        self.controller.handle_submission(&mut ctx, submission)?;
        if ctx.open_groups() != 0 {
            return Err(SubmissionFailure::Design(DesignError::UnbalancedObsGroup));
        }
        for extender in &self.extenders {
            extender.after_submission(&mut ctx, submission)?;
        }

        let saved = self
            .services
            .encounters
            .save_encounter(self.encounter.clone())?;
        self.encounter = saved.clone();
        Ok(saved)
    }

    /// Which of the configured standard regimens the patient's current
    /// orders satisfy in full, by code.
    pub fn regimen_codes_in_use(&self) -> Vec<String> {
        let orders = self.services.orders.drug_orders_for_patient(self.patient.id);
        self.standard_regimens
            .iter()
            .filter(|regimen| {
                let refs: Vec<String> =
                    regimen.components.iter().map(|c| c.drug_id.clone()).collect();
                let in_use = self.capabilities.regimen_deps.drugs_in_use(&orders, &refs);
                !refs.is_empty() && in_use.len() == refs.len()
            })
            .map(|r| r.code.clone())
            .collect()
    }
}

fn walk_node(
    template: &FormTemplate,
    registry: &TagRegistry,
    env: &mut TagEnv<'_>,
    id: NodeId,
    out: &mut String,
) -> DesignResult<()> {
    match &template.node(id).kind {
        NodeKind::Text(text) => out.push_str(text),
        NodeKind::Comment(_) => {}
        NodeKind::Element { name, attributes } => {
            if let Some(handler) = registry.handler(name) {
                let handler = Arc::clone(handler);
                let attrs = TagAttributes::new(name, attributes);
                attrs.validate(handler.descriptors())?;
                match handler.start(env, &attrs, out)? {
                    crate::handlers::Handled::SkipChildren => {}
                    crate::handlers::Handled::Children => {
                        for &child in template.children(id) {
                            walk_node(template, registry, env, child, out)?;
                        }
                    }
                    crate::handlers::Handled::ChildrenRepeated(times) => {
                        for _ in 0..times {
                            for &child in template.children(id) {
                                walk_node(template, registry, env, child, out)?;
                            }
                        }
                    }
                }
                handler.end(env, out)?;
            } else if RESERVED_TAGS.contains(&name.as_str()) {
                return Err(DesignError::UnknownTag(name.clone()));
            } else {
                // Plain HTML passes through untouched. An empty element only
                // self-closes when the author wrote it that way or it is an
                // HTML void element; `<div/>` would read as an unclosed div.
                let self_close = template.node(id).self_closed || is_void_element(name);
                out.push_str(&serialize_open_tag(name, attributes, self_close));
                if !self_close {
                    for &child in template.children(id) {
                        walk_node(template, registry, env, child, out)?;
                    }
                    out.push_str(&format!("</{name}>"));
                }
            }
        }
    }
    Ok(())
}
