//! The `<submit>` tag: the form's submit button, absent in VIEW.

use crate::error::DesignResult;
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use crate::template::escape_attribute;

const DESCRIPTORS: &[AttributeDescriptor] =
    &[AttributeDescriptor::optional("label", AttributeKind::Literal)];

pub struct SubmitTagHandler;

impl TagHandler for SubmitTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        if env.context.mode().is_interactive() {
            let label = attrs.get("label").unwrap_or("Submit");
            out.push_str(&format!(
                "<input type=\"submit\" class=\"submitButton\" value=\"{}\"/>",
                escape_attribute(label)
            ));
        }
        Ok(Handled::SkipChildren)
    }
}
