//! The `<lookup>` tag: substitute a template variable into the markup.

use crate::error::DesignResult;
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use crate::template::escape_attribute;

const DESCRIPTORS: &[AttributeDescriptor] =
    &[AttributeDescriptor::required("name", AttributeKind::Literal)];

pub struct LookupTagHandler;

impl TagHandler for LookupTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        let name = attrs.required("name")?;
        match env.context.variable(name) {
            Some(value) => out.push_str(&escape_attribute(value)),
            // An undefined variable renders as nothing; the form still works.
            None => tracing::debug!(name, "lookup variable is not defined"),
        }
        Ok(Handled::SkipChildren)
    }
}
