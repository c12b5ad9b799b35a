//! The `<drugOrder>` tag: order one drug, with a start date.

use crate::actions::{Submission, SubmissionAction, SubmissionContext};
use crate::context::RenderContext;
use crate::error::{DesignResult, FormSubmissionError, SubmissionFailure};
use crate::handlers::{
    resolve_drug, AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use crate::schema::FieldDescriptor;
use crate::template::escape_attribute;
use crate::widgets::Widget;
use chrono::{NaiveDate, Utc};
use formentry_host::{Drug, DrugOrder};
use formentry_types::Mode;

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("drugId", AttributeKind::Drug),
    AttributeDescriptor::optional("dose", AttributeKind::Number),
    AttributeDescriptor::optional("doseUnits", AttributeKind::Literal),
    AttributeDescriptor::optional("frequency", AttributeKind::Literal),
    AttributeDescriptor::optional("instructions", AttributeKind::Literal),
    AttributeDescriptor::optional("labelText", AttributeKind::Literal),
];

pub struct DrugOrderTagHandler;

impl TagHandler for DrugOrderTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        let drug = resolve_drug(env.services, attrs.required("drugId")?)?;
        let dose = attrs
            .get("dose")
            .map(|raw| {
                raw.parse::<f64>()
                    .map_err(|_| attrs.invalid("dose", format!("'{raw}' is not a number")))
            })
            .transpose()?;
        let mode = env.context.mode();
        let label = attrs.get("labelText").unwrap_or(&drug.name);

        let existing = env.encounter.and_then(|e| {
            e.orders
                .iter()
                .find(|o| !o.voided && o.drug_id == drug.id)
                .cloned()
        });
        let existing = if mode == Mode::Enter { None } else { existing };
        let start_initial = existing
            .as_ref()
            .and_then(|o| env.capabilities.drug_order.start_date(o))
            .map(|d| d.format("%Y-%m-%d").to_string());

        let checkbox_field = env.context.register_field();
        let date_field = env.context.register_field();

        if mode == Mode::View {
            match &existing {
                Some(order) => {
                    let mut text = drug.name.clone();
                    if let Some(dose) = order.dose {
                        text.push_str(&format!(" {dose}"));
                    }
                    if let Some(start) = &start_initial {
                        text.push_str(&format!(" from {start}"));
                    }
                    out.push_str(&format!(
                        "<span class=\"value\">{}</span>",
                        escape_attribute(&text)
                    ));
                }
                None => out.push_str("<span class=\"emptyValue\">____</span>"),
            }
        } else {
            out.push_str(&format!(
                "<span class=\"label\">{}</span> ",
                escape_attribute(label)
            ));
            let checkbox = Widget::Checkbox { value: "true".into() };
            let checked = existing.as_ref().map(|_| "true");
            out.push_str(&checkbox.render(&checkbox_field, mode, checked));
            out.push_str(" <span class=\"label\">start</span> ");
            out.push_str(&Widget::Date.render(&date_field, mode, start_initial.as_deref()));
            out.push_str(&format!(
                "<span class=\"error\" id=\"{date_field}.error\" style=\"display:none\"></span>"
            ));
        }

        env.context.schema_mut().add_field(FieldDescriptor {
            field_id: checkbox_field.clone(),
            label: Some(label.to_owned()),
            concept_id: Some(drug.concept_id),
            answers: Vec::new(),
        });

        if mode.is_interactive() {
            env.controller.add_action(Box::new(DrugOrderAction {
                checkbox_field,
                date_field,
                drug,
                dose,
                dose_units: attrs.get("doseUnits").map(str::to_owned),
                frequency: attrs.get("frequency").map(str::to_owned),
                instructions: attrs.get("instructions").map(str::to_owned),
                existing_order_id: existing.and_then(|o| o.id),
            }));
        }
        Ok(Handled::SkipChildren)
    }
}

pub struct DrugOrderAction {
    checkbox_field: String,
    date_field: String,
    drug: Drug,
    dose: Option<f64>,
    dose_units: Option<String>,
    frequency: Option<String>,
    instructions: Option<String>,
    existing_order_id: Option<i64>,
}

impl DrugOrderAction {
    fn start_date(&self, submission: &Submission) -> Result<Option<NaiveDate>, String> {
        submission
            .trimmed(&self.date_field)
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| format!("'{raw}' is not a date in yyyy-mm-dd form"))
            })
            .transpose()
    }
}

impl SubmissionAction for DrugOrderAction {
    fn validate(
        &self,
        _context: &RenderContext,
        submission: &Submission,
    ) -> Vec<FormSubmissionError> {
        if !submission.is_checked(&self.checkbox_field) {
            return Vec::new();
        }
        match self.start_date(submission) {
            Err(message) => vec![FormSubmissionError::new(&self.date_field, message)],
            Ok(None) => vec![FormSubmissionError::new(
                &self.date_field,
                "a start date is required when the drug is ordered",
            )],
            Ok(Some(_)) => Vec::new(),
        }
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        if let Some(old) = self.existing_order_id {
            context.void_order(old);
        }
        if !submission.is_checked(&self.checkbox_field) {
            return Ok(());
        }
        let start = self
            .start_date(submission)
            .ok()
            .flatten()
            .ok_or_else(|| {
                SubmissionFailure::Rejected(vec![FormSubmissionError::new(
                    &self.date_field,
                    "a start date is required when the drug is ordered",
                )])
            })?;

        let mut order = DrugOrder::unsaved(context.patient.id, &self.drug);
        order.dose = self.dose;
        order.instructions = self.instructions.clone();
        let compat = context.capabilities.drug_order.clone();
        if let Some(units) = &self.dose_units {
            compat.set_dose_units(&mut order, units, context.services);
        }
        if let Some(frequency) = &self.frequency {
            compat.set_frequency(&mut order, frequency, context.services);
        }
        compat.set_route(&mut order, context.services);
        compat.set_start_date(
            &mut order,
            Some(context.encounter.encounter_date()),
            start,
        )?;
        order.creator = context.services.auth.authenticated_user();
        order.date_changed = Some(Utc::now());
        context.encounter.orders.push(order);
        Ok(())
    }
}
