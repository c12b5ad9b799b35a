//! Regimen ordering, platform-version divergence and the extension points,
//! exercised through whole sessions.

use formentry_core::{
    AttributeDescriptor, DesignResult, FormEntrySession, Handled, ModuleConfig, ModuleRuntime,
    Submission, SubmissionActionExtender, SubmissionContext, TagAttributes, TagEnv, TagHandler,
    TagHandlerProvider, TagRegistry, TemplateVariableProvider,
};
use formentry_core::error::SubmissionFailure;
use formentry_host::{
    Concept, ConceptDatatype, Drug, HtmlForm, MemoryHost, OrderFrequency, Patient, Urgency,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

const REGIMEN_YAML: &str = r#"
- code: mono
  display_name: Aspirin alone
  components:
    - drug_id: "7"
      dose: 100
      units: mg
      frequency: OD
- code: dual
  display_name: Aspirin and clopidogrel
  components:
    - drug_id: "7"
      dose: 100
      units: mg
      frequency: OD
    - drug_id: "8"
      dose: 75
      units: mg
      frequency: OD
"#;

fn seeded_host() -> Arc<MemoryHost> {
    let host = Arc::new(MemoryHost::new());
    host.add_concept(Concept::new(70, "ASPIRIN", ConceptDatatype::Numeric));
    host.add_concept(Concept::new(80, "CLOPIDOGREL", ConceptDatatype::Numeric));
    host.add_concept(Concept::new(9999, "UNKNOWN", ConceptDatatype::Text));
    host.add_concept(Concept::new(9000, "MG", ConceptDatatype::Text));
    host.add_drug(Drug {
        id: 7,
        uuid: Uuid::new_v4(),
        name: "Aspirin 100mg".into(),
        concept_id: 70,
    });
    host.add_drug(Drug {
        id: 8,
        uuid: Uuid::new_v4(),
        name: "Clopidogrel 75mg".into(),
        concept_id: 80,
    });
    host.add_order_frequency(OrderFrequency {
        id: 1,
        uuid: Uuid::new_v4(),
        name: "OD".into(),
    });
    host.add_patient(Patient::new(1, "Ada", "Lovelace"));
    host.set_authenticated_user("hornblower");
    host
}

fn runtime_at(version: &str) -> ModuleRuntime {
    let mut config = ModuleConfig::new(version.parse().unwrap());
    config.standard_regimens_yaml = Some(REGIMEN_YAML.to_owned());
    ModuleRuntime::initialise(config).unwrap()
}

fn patient(host: &Arc<MemoryHost>) -> Patient {
    host.services().patients.patient(1).unwrap()
}

#[test]
fn test_selecting_a_regimen_orders_every_component() {
    let host = seeded_host();
    let runtime = runtime_at("2.3.0");
    let form = HtmlForm::unsaved(
        "ART Card",
        r#"<standardRegimen regimenCodes="mono,dual" labelText="Regimen"/>"#,
    );
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    let html = session.generate_html().unwrap();
    assert!(html.contains("Aspirin and clopidogrel"));

    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let saved = session
        .submit(&Submission::from_pairs([
            ("w1", "dual"),
            ("w2", today.as_str()),
        ]))
        .unwrap();

    assert_eq!(saved.orders.len(), 2);
    let drug_ids: Vec<i64> = saved.orders.iter().map(|o| o.drug_id).collect();
    assert!(drug_ids.contains(&7) && drug_ids.contains(&8));
    for order in &saved.orders {
        assert_eq!(order.date_activated, Some(saved.encounter_date()));
        assert_eq!(order.urgency, Urgency::Routine);
        assert_eq!(order.frequency_id, Some(1));
        assert_eq!(order.creator.as_deref(), Some("hornblower"));
    }

    // The saved orders now amount to both defined regimens: dual in full,
    // and mono as its subset.
    let in_use = session.regimen_codes_in_use();
    assert!(in_use.contains(&"mono".to_string()));
    assert!(in_use.contains(&"dual".to_string()));
}

#[test]
fn test_edit_preselects_the_strongest_matching_regimen() {
    let host = seeded_host();
    let runtime = runtime_at("2.3.0");
    let form = HtmlForm::unsaved(
        "ART Card",
        r#"<standardRegimen regimenCodes="mono,dual"/>"#,
    );
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    session.generate_html().unwrap();
    let today = chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let saved = session
        .submit(&Submission::from_pairs([
            ("w1", "dual"),
            ("w2", today.as_str()),
        ]))
        .unwrap();

    let mut edit =
        FormEntrySession::edit(&runtime, host.services(), patient(&host), saved, &form).unwrap();
    let html = edit.generate_html().unwrap();
    // Both mono and dual match the stored orders; dual has more components
    // and wins.
    assert!(html.contains("<option value=\"dual\" selected=\"selected\">"));
}

#[test]
fn test_unknown_regimen_code_is_a_design_error() {
    let host = seeded_host();
    let runtime = runtime_at("2.3.0");
    let form = HtmlForm::unsaved("Bad", r#"<standardRegimen regimenCodes="nonesuch"/>"#);
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    assert!(session.generate_html().is_err());
}

#[test]
fn test_legacy_platform_stores_free_text_order_fields() {
    let host = seeded_host();
    let runtime = runtime_at("1.9.9");
    let form = HtmlForm::unsaved(
        "Rx",
        r#"<drugOrder drugId="7" dose="100" doseUnits="mg" frequency="OD"/>"#,
    );
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    session.generate_html().unwrap();

    // A past start date is fine on 1.9: the platform stores it raw.
    let saved = session
        .submit(&Submission::from_pairs([
            ("w1", "true"),
            ("w2", "2024-05-01"),
        ]))
        .unwrap();
    let order = &saved.orders[0];
    assert_eq!(order.start_date, Some("2024-05-01".parse().unwrap()));
    assert_eq!(order.frequency_text.as_deref(), Some("OD"));
    assert_eq!(order.frequency_id, None);
    assert_eq!(order.date_activated, None);
}

#[test]
fn test_rewrite_platform_rejects_backdated_orders() {
    let host = seeded_host();
    let runtime = runtime_at("2.3.0");
    let form = HtmlForm::unsaved("Rx", r#"<drugOrder drugId="7"/>"#);
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    session.generate_html().unwrap();

    let err = session
        .submit(&Submission::from_pairs([
            ("w1", "true"),
            ("w2", "2024-05-01"),
        ]))
        .unwrap_err();
    assert!(matches!(err, SubmissionFailure::Compat(_)));
}

struct GreetingTag;

impl TagHandler for GreetingTag {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        &[]
    }

    fn start(
        &self,
        _env: &mut TagEnv<'_>,
        _attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        out.push_str("<em>hello</em>");
        Ok(Handled::SkipChildren)
    }
}

struct GreetingProvider;

impl TagHandlerProvider for GreetingProvider {
    fn register(&self, registry: &mut TagRegistry) {
        registry.register("greeting", Arc::new(GreetingTag));
    }
}

struct ClinicVariables;

impl TemplateVariableProvider for ClinicVariables {
    fn populate(&self, variables: &mut HashMap<String, String>, _patient: &Patient) {
        variables.insert("clinic.name".into(), "Mirebalais".into());
    }
}

#[derive(Default)]
struct CountingExtender {
    before: AtomicUsize,
    after: AtomicUsize,
}

impl SubmissionActionExtender for CountingExtender {
    fn before_submission(
        &self,
        _context: &mut SubmissionContext<'_>,
        _submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        self.before.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn after_submission(
        &self,
        _context: &mut SubmissionContext<'_>,
        _submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        self.after.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_extension_points_participate_in_render_and_submit() {
    let host = seeded_host();
    let extender = Arc::new(CountingExtender::default());
    let mut config = ModuleConfig::new("2.3.0".parse().unwrap());
    config.extensions.tag_handlers.push(Box::new(GreetingProvider));
    config.extensions.variable_providers.push(Arc::new(ClinicVariables));
    config.extensions.submission_extenders.push(extender.clone());
    let runtime = ModuleRuntime::initialise(config).unwrap();

    let form = HtmlForm::unsaved(
        "Greeting",
        r#"<greeting/> at <lookup name="clinic.name"/>"#,
    );
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    let html = session.generate_html().unwrap();
    assert!(html.contains("<em>hello</em> at Mirebalais"));

    session.submit(&Submission::new()).unwrap();
    assert_eq!(extender.before.load(Ordering::SeqCst), 1);
    assert_eq!(extender.after.load(Ordering::SeqCst), 1);
}
