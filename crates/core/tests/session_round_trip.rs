//! End-to-end session behaviour: enter, view, edit over one form.

use chrono::Utc;
use formentry_core::{
    FormEntrySession, ModuleConfig, ModuleRuntime, Submission, SubmissionFailure,
};
use formentry_host::{
    Concept, ConceptDatatype, Drug, HtmlForm, MemoryHost, ObsValue, OrderFrequency, Patient,
};
use formentry_types::Mode;
use std::sync::Arc;
use uuid::Uuid;

const FORM_MARKUP: &str = r#"<h1>Visit note for <lookup name="patient.name"/></h1>
<section headerLabel="Vitals">
  <obs conceptId="5089" labelText="Weight (kg)" id="wt" required="true"/>
  <obs conceptId="5096" labelText="Next visit" id="next"/>
</section>
<section headerLabel="History">
  <obsgroup groupingConceptId="1234" id="smoking">
    <obs conceptId="2000" labelText="Smoker" answerConceptIds="2001,2002" id="smoker"/>
  </obsgroup>
</section>
<section headerLabel="Treatment">
  <drugOrder drugId="7" dose="100" doseUnits="mg" frequency="OD"/>
</section>
<ifMode mode="VIEW" include="false">
  <submit label="Save visit"/>
</ifMode>"#;

fn seeded_host() -> Arc<MemoryHost> {
    let host = Arc::new(MemoryHost::new());
    host.add_concept(Concept::new(5089, "WEIGHT (KG)", ConceptDatatype::Numeric));
    host.add_concept(Concept::new(5096, "RETURN VISIT DATE", ConceptDatatype::Date));
    host.add_concept(Concept::new(1234, "SMOKING HISTORY", ConceptDatatype::Coded));
    host.add_concept(Concept::new(2000, "SMOKER", ConceptDatatype::Coded));
    host.add_concept(Concept::new(2001, "YES", ConceptDatatype::Boolean));
    host.add_concept(Concept::new(2002, "NO", ConceptDatatype::Boolean));
    host.add_concept(Concept::new(9999, "UNKNOWN", ConceptDatatype::Text));
    host.add_concept(Concept::new(70, "ASPIRIN", ConceptDatatype::Numeric));
    host.add_drug(Drug {
        id: 7,
        uuid: Uuid::new_v4(),
        name: "Aspirin 100mg".into(),
        concept_id: 70,
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

fn runtime() -> ModuleRuntime {
    ModuleRuntime::initialise(ModuleConfig::new("2.3.0".parse().unwrap())).unwrap()
}

fn form() -> HtmlForm {
    HtmlForm::unsaved("Visit Note", FORM_MARKUP)
}

fn patient(host: &Arc<MemoryHost>) -> Patient {
    host.services().patients.patient(1).unwrap()
}

#[test]
fn test_enter_mode_renders_inputs_and_substitutes_variables() {
    let host = seeded_host();
    let runtime = runtime();
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form()).unwrap();
    let html = session.generate_html().unwrap();

    // Surname-first, per the 2.x name layout.
    assert!(html.contains("Visit note for Lovelace, Ada"));
    assert!(html.contains("id=\"w1\""));
    assert!(html.contains("<span class=\"sectionHeader\">Vitals</span>"));
    assert!(html.contains("<option value=\"2001\">YES</option>"));
    assert!(html.contains("value=\"Save visit\""));
    assert_eq!(session.schema().sections().len(), 4);
}

#[test]
fn test_missing_required_field_rejects_the_submission() {
    let host = seeded_host();
    let runtime = runtime();
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form()).unwrap();
    session.generate_html().unwrap();

    let err = session.submit(&Submission::new()).unwrap_err();
    match err {
        SubmissionFailure::Rejected(errors) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].field_id, "w1");
        }
        other => panic!("expected a rejection, got {other}"),
    }
    assert!(host.services().encounters.encounters_for_patient(1).is_empty());
}

#[test]
fn test_enter_submit_then_view_round_trip() {
    let host = seeded_host();
    let runtime = runtime();
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form()).unwrap();
    session.generate_html().unwrap();

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    let submission = Submission::from_pairs([
        ("w1", "72.5"),
        ("w3", "2001"),
        ("w4", "true"),
        ("w5", today.as_str()),
    ]);
    let saved = session.submit(&submission).unwrap();

    assert!(saved.id.is_some());
    // Weight at the top level, the smoking answer nested in its group.
    let weight = saved
        .obs
        .iter()
        .find(|o| o.concept_id == 5089)
        .expect("weight obs");
    assert_eq!(weight.value, ObsValue::Numeric(72.5));
    assert_eq!(
        weight.form_field_path.as_deref(),
        Some("HtmlFormEntry^Visit Note/wt-0")
    );
    let group = saved
        .obs
        .iter()
        .find(|o| o.concept_id == 1234)
        .expect("smoking group");
    assert_eq!(group.group_members.len(), 1);
    assert_eq!(group.group_members[0].value, ObsValue::Coded(2001));
    // The drug order went through the rewrite adapter: coded frequency,
    // activation on the encounter date.
    assert_eq!(saved.orders.len(), 1);
    assert_eq!(saved.orders[0].frequency_id, Some(1));
    assert_eq!(saved.orders[0].date_activated, Some(saved.encounter_date()));

    let mut view = FormEntrySession::view(
        &runtime,
        host.services(),
        patient(&host),
        saved,
        &form(),
    )
    .unwrap();
    let html = view.generate_html().unwrap();
    assert!(html.contains("<span class=\"value\">72.5</span>"));
    assert!(html.contains("<span class=\"value\">YES</span>"));
    assert!(!html.contains("<input"));
    assert!(!html.contains("Save visit"));
}

#[test]
fn test_edit_prepopulates_and_replaces_changed_values() {
    let host = seeded_host();
    let runtime = runtime();
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form()).unwrap();
    session.generate_html().unwrap();
    let saved = session
        .submit(&Submission::from_pairs([("w1", "72.5")]))
        .unwrap();

    let mut edit = FormEntrySession::edit(
        &runtime,
        host.services(),
        patient(&host),
        saved.clone(),
        &form(),
    )
    .unwrap();
    let html = edit.generate_html().unwrap();
    assert!(html.contains("value=\"72.5\""));

    let resaved = edit
        .submit(&Submission::from_pairs([("w1", "74")]))
        .unwrap();
    let weights: Vec<_> = resaved
        .obs
        .iter()
        .filter(|o| o.concept_id == 5089)
        .collect();
    let live: Vec<_> = weights.iter().filter(|o| !o.voided).collect();
    let voided: Vec<_> = weights.iter().filter(|o| o.voided).collect();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].value, ObsValue::Numeric(74.0));
    assert_eq!(voided.len(), 1);
    assert_eq!(voided[0].value, ObsValue::Numeric(72.5));
}

#[test]
fn test_view_mode_refuses_submissions() {
    let host = seeded_host();
    let runtime = runtime();
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form()).unwrap();
    session.generate_html().unwrap();
    let saved = session
        .submit(&Submission::from_pairs([("w1", "70")]))
        .unwrap();

    let mut view =
        FormEntrySession::view(&runtime, host.services(), patient(&host), saved, &form()).unwrap();
    view.generate_html().unwrap();
    assert!(matches!(
        view.submit(&Submission::new()).unwrap_err(),
        SubmissionFailure::ViewMode
    ));
    assert_eq!(view.mode(), Mode::View);
}

#[test]
fn test_pass_through_markup_survives_rendering_unmangled() {
    let host = seeded_host();
    let runtime = runtime();
    let markup = r#"<a href="x?a=1&amp;b=2">ward list</a><div class="note"></div><br>"#;
    let form = HtmlForm::unsaved("Links", markup);
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    let html = session.generate_html().unwrap();

    // Author-written entities come back exactly as written.
    assert!(html.contains(r#"<a href="x?a=1&amp;b=2">ward list</a>"#));
    assert!(!html.contains("&amp;amp;"));
    // An empty div keeps its closing tag; only void elements self-close.
    assert!(html.contains(r#"<div class="note"></div>"#));
    assert!(html.contains("<br/>"));
}

#[test]
fn test_labels_are_escaped_in_rendered_markup() {
    let host = seeded_host();
    let runtime = runtime();
    let markup = r#"<section headerLabel="A & B"><obs conceptId="5089" labelText="Weight <kg>"/></section>"#;
    let form = HtmlForm::unsaved("Escaping", markup);
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &form).unwrap();
    let html = session.generate_html().unwrap();

    assert!(html.contains("<span class=\"sectionHeader\">A &amp; B</span>"));
    assert!(html.contains("<span class=\"label\">Weight &lt;kg&gt;</span>"));
}

#[test]
fn test_reserved_tag_without_handler_fails_the_render() {
    let host = seeded_host();
    let runtime = runtime();
    let bad_form = HtmlForm::unsaved("Broken", "<exitFromCare/>");
    // exitFromCare is not part of the vocabulary; unknown non-reserved
    // names pass through instead.
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &bad_form).unwrap();
    let html = session.generate_html().unwrap();
    assert!(html.contains("<exitFromCare/>"));

    let unhandled = HtmlForm::unsaved("Broken2", "<obs conceptId=\"5089\" badAttr=\"x\"/>");
    let mut session =
        FormEntrySession::enter(&runtime, host.services(), patient(&host), &unhandled).unwrap();
    assert!(session.generate_html().is_err());
}
