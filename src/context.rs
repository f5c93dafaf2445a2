//! Explicit parenting context for span creation.
//!
//! There is no ambient "current span" in this crate. The parent of a new
//! span is always carried in an explicit, immutable [`Context`] value that
//! call sites thread through their own call graph. Propagation semantics are
//! unchanged from ambient-tracking designs; only the hidden global state is
//! gone.

use crate::trace::SpanContext;

/// An immutable value carrying the parent [`SpanContext`] for span creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Context {
    span_context: Option<SpanContext>,
}

impl Context {
    /// An empty context; spans created under it are trace roots.
    pub fn root() -> Self {
        Context::default()
    }

    /// A context parented to the given in-process span context.
    pub fn with_span_context(span_context: SpanContext) -> Self {
        Context {
            span_context: Some(span_context),
        }
    }

    /// A context parented to a span context received from a remote process.
    ///
    /// Invalid remote contexts are ignored, yielding a root context.
    pub fn with_remote_span_context(span_context: SpanContext) -> Self {
        if span_context.is_valid() {
            Context::with_span_context(span_context)
        } else {
            Context::root()
        }
    }

    /// The span context spans created under this context are parented to,
    /// if any.
    pub fn span_context(&self) -> Option<&SpanContext> {
        self.span_context.as_ref()
    }

    /// Returns `true` if this context carries a valid parent span context.
    pub fn has_active_span(&self) -> bool {
        self.span_context
            .as_ref()
            .map(|sc| sc.is_valid())
            .unwrap_or(false)
    }
}
