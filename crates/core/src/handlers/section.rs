//! The `<section>` tag: a headed grouping in markup and in the schema.

use crate::error::DesignResult;
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use crate::template::escape_attribute;

const DESCRIPTORS: &[AttributeDescriptor] =
    &[AttributeDescriptor::optional("headerLabel", AttributeKind::Literal)];

pub struct SectionTagHandler;

impl TagHandler for SectionTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        out: &mut String,
    ) -> DesignResult<Handled> {
        let header = attrs.get("headerLabel");
        env.context.schema_mut().begin_section(header);
        out.push_str("<div class=\"section\">");
        if let Some(header) = header {
            out.push_str(&format!(
                "<span class=\"sectionHeader\">{}</span>",
                escape_attribute(header)
            ));
        }
        Ok(Handled::Children)
    }

    fn end(&self, _env: &mut TagEnv<'_>, out: &mut String) -> DesignResult<()> {
        out.push_str("</div>");
        Ok(())
    }
}
