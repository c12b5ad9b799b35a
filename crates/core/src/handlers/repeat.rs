//! The `<repeat>` tag: render its children a fixed number of times.
//!
//! Each pass registers fresh field ids, so three repeats of one `<obs>` tag
//! become three independent fields. The child actions are grouped under one
//! composite so repeat-level hooks wrap them during both submission passes.

use crate::actions::TracingRepeatHooks;
use crate::error::DesignResult;
use crate::handlers::{
    AttributeDescriptor, AttributeKind, Handled, TagAttributes, TagEnv, TagHandler,
};

const DESCRIPTORS: &[AttributeDescriptor] =
    &[AttributeDescriptor::optional("count", AttributeKind::Number)];

pub struct RepeatTagHandler;

impl TagHandler for RepeatTagHandler {
    fn descriptors(&self) -> &[AttributeDescriptor] {
        DESCRIPTORS
    }

    fn start(
        &self,
        env: &mut TagEnv<'_>,
        attrs: &TagAttributes<'_>,
        _out: &mut String,
    ) -> DesignResult<Handled> {
        let count = attrs.number("count")?.unwrap_or(1);
        if count == 0 {
            return Err(attrs.invalid("count", "a repeat must run at least once"));
        }
        env.controller
            .start_repeat(Box::new(TracingRepeatHooks { rows: count }))?;
        Ok(Handled::ChildrenRepeated(count))
    }

    fn end(&self, env: &mut TagEnv<'_>, _out: &mut String) -> DesignResult<()> {
        env.controller.end_repeat()
    }
}
