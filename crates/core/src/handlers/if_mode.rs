//! The `<ifMode>` tag: include or exclude content per session mode.

use crate::error::DesignResult;
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};
use formentry_types::Mode;

const DESCRIPTORS: &[AttributeDescriptor] = &[
    AttributeDescriptor::required("mode", AttributeKind::Mode),
    AttributeDescriptor::optional("include", AttributeKind::Bool),
];

pub struct IfModeTagHandler;

impl TagHandler for IfModeTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        _out: &mut String,
    ) -> DesignResult<Handled> {
        let raw = attrs.required("mode")?;
        let target: Mode = raw
            .parse()
            .map_err(|_| attrs.invalid("mode", format!("'{raw}' is not ENTER, EDIT or VIEW")))?;
        let include = attrs.bool_or("include", true)?;
        if (env.context.mode() == target) == include {
            Ok(Handled::Children)
        } else {
            Ok(Handled::SkipChildren)
        }
    }
}
