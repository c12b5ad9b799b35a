//! The `<standardRegimen>` tag: order a whole regimen at once.

use crate::actions::{Submission, SubmissionAction, SubmissionContext};
use crate::context::RenderContext;
use crate::error::{DesignError, DesignResult, FormSubmissionError, SubmissionFailure};
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use crate::regimen::{
    find_strongest_match, standard_regimen_by_code, standard_regimen_to_drug_orders,
    StandardRegimen,
};
use crate::schema::{AnswerOption, FieldDescriptor};
use crate::template::escape_attribute;
use crate::widgets::{SelectOption, Widget};
use chrono::NaiveDate;
use formentry_types::Mode;
use std::collections::HashMap;
use std::sync::Arc;

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("regimenCodes", AttributeKind::Literal),
    AttributeDescriptor::optional("labelText", AttributeKind::Literal),
];

pub struct StandardRegimenTagHandler {
    regimens: Arc<Vec<StandardRegimen>>,
}

impl StandardRegimenTagHandler {
    pub fn new(regimens: Arc<Vec<StandardRegimen>>) -> Self {
        Self { regimens }
    }
}

impl TagHandler for StandardRegimenTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        let mut allowed = Vec::new();
        for code in attrs
            .required("regimenCodes")?
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            let regimen = standard_regimen_by_code(&self.regimens, code)
                .ok_or_else(|| DesignError::UnknownRegimenCode(code.to_owned()))?;
            allowed.push(regimen.clone());
        }
        let mode = env.context.mode();

        // Pre-select whichever allowed regimen the stored orders amount to.
        let matched = if mode == Mode::Enter {
            None
        } else {
            let orders = match env.encounter {
                Some(encounter) => encounter.orders.clone(),
                None => env.services.orders.drug_orders_for_patient(env.patient.id),
            };
            find_strongest_match(&allowed, &orders).map(|m| {
                let matched_ids: Vec<i64> = m.orders.iter().filter_map(|o| o.id).collect();
                let start = m.orders.first().and_then(|o| o.effective_start_date());
                (m.regimen.code.clone(), start, matched_ids)
            })
        };

        let select_field = env.context.register_field();
        let date_field = env.context.register_field();
        let options: Vec<SelectOption> = allowed
            .iter()
            .map(|r| SelectOption {
                value: r.code.clone(),
                label: r.display().to_owned(),
            })
            .collect();

        let initial_code = matched.as_ref().map(|(code, _, _)| code.clone());
        let initial_start = matched
            .as_ref()
            .and_then(|(_, start, _)| *start)
            .map(|d| d.format("%Y-%m-%d").to_string());

        if let Some(label) = attrs.get("labelText") {
            out.push_str(&format!(
                "<span class=\"label\">{}</span> ",
                escape_attribute(label)
            ));
        }
        out.push_str(
            &Widget::Select { options: options.clone() }.render(
                &select_field,
                mode,
                initial_code.as_deref(),
            ),
        );
        if mode.is_interactive() {
            out.push_str(" <span class=\"label\">start</span> ");
            out.push_str(&Widget::Date.render(&date_field, mode, initial_start.as_deref()));
            out.push_str(&format!(
                "<span class=\"error\" id=\"{date_field}.error\" style=\"display:none\"></span>"
            ));
        } else if let Some(start) = &initial_start {
            out.push_str(&format!(" <span class=\"value\">from {start}</span>"));
        }

        env.context.schema_mut().add_field(FieldDescriptor {
            field_id: select_field.clone(),
            label: attrs.get("labelText").map(str::to_owned),
            concept_id: None,
            answers: options
                .iter()
                .map(|o| AnswerOption {
                    value: o.value.clone(),
                    label: o.label.clone(),
                })
                .collect(),
        });

        if mode.is_interactive() {
            env.controller.add_action(Box::new(RegimenAction {
                select_field,
                date_field,
                allowed: allowed
                    .into_iter()
                    .map(|r| (r.code.clone(), r))
                    .collect(),
                existing_order_ids: matched.map(|(_, _, ids)| ids).unwrap_or_default(),
            }));
        }
        Ok(Handled::SkipChildren)
    }
}

pub struct RegimenAction {
    select_field: String,
    date_field: String,
    allowed: HashMap<String, StandardRegimen>,
    existing_order_ids: Vec<i64>,
}

impl RegimenAction {
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

impl SubmissionAction for RegimenAction {
    fn validate(
        &self,
        _context: &RenderContext,
        submission: &Submission,
    ) -> Vec<FormSubmissionError> {
        let Some(code) = submission.trimmed(&self.select_field) else {
            return Vec::new();
        };
        let mut errors = Vec::new();
        if !self.allowed.contains_key(code) {
            errors.push(FormSubmissionError::new(
                &self.select_field,
                format!("'{code}' is not one of the offered regimens"),
            ));
        }
        match self.start_date(submission) {
            Err(message) => errors.push(FormSubmissionError::new(&self.date_field, message)),
            Ok(None) => errors.push(FormSubmissionError::new(
                &self.date_field,
                "a start date is required when a regimen is selected",
            )),
            Ok(Some(_)) => {}
        }
        errors
    }

    fn apply(
        &self,
        context: &mut SubmissionContext<'_>,
        submission: &Submission,
    ) -> Result<(), SubmissionFailure> {
        let selected = submission.trimmed(&self.select_field);
        // A changed or cleared selection replaces the orders that formed the
        // previous match.
        for old in &self.existing_order_ids {
            context.void_order(*old);
        }
        let Some(code) = selected else {
            return Ok(());
        };
        let regimen = self.allowed.get(code).ok_or_else(|| {
            SubmissionFailure::Rejected(vec![FormSubmissionError::new(
                &self.select_field,
                format!("'{code}' is not one of the offered regimens"),
            )])
        })?;
        let start = self.start_date(submission).ok().flatten().ok_or_else(|| {
            SubmissionFailure::Rejected(vec![FormSubmissionError::new(
                &self.date_field,
                "a start date is required when a regimen is selected",
            )])
        })?;
        let orders = standard_regimen_to_drug_orders(
            regimen,
            start,
            context.patient,
            Some(context.encounter.encounter_date()),
            context.services,
            context.capabilities.drug_order.as_ref(),
        )?;
        context.encounter.orders.extend(orders);
        Ok(())
    }
}
