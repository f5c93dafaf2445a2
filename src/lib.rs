//! The in-process tracing core of a telemetry SDK.
//!
//! `tracekit` creates, mutates and finalizes trace spans under bounded
//! memory, decides whether spans are sampled, and delivers finished spans to
//! export pipelines without ever blocking or throwing into application
//! threads.
//!
//! ## Getting started
//!
//! ```
//! use tracekit::trace::{SdkTracerProvider, Status};
//! use tracekit::{Context, KeyValue};
//!
//! // Build a provider; processors, sampler, limits and clock are wired here.
//! let provider = SdkTracerProvider::builder().build();
//! let tracer = provider.tracer("my-component");
//!
//! // Spans are parented through explicit context values.
//! let mut parent = tracer.start("handle-request", &Context::root());
//! let parent_cx = Context::with_span_context(parent.span_context().clone());
//!
//! let mut child = tracer.start("query-db", &parent_cx);
//! child.set_attribute(KeyValue::new("db.system", "postgres"));
//! child.set_status(Status::Ok);
//! child.end();
//!
//! parent.end();
//! provider.shutdown().unwrap();
//! ```
//!
//! ## Design
//!
//! * Every span mutator is a silent no-op on bad input or after `end()`;
//!   tracing can never crash or alter the control flow of the application
//!   it observes.
//! * Per-span attribute, event and link stores are bounded, evicting the
//!   oldest entry when full and counting what was dropped.
//! * Snapshots ([`trace::SpanData`]) are value copies, decoupled from
//!   further mutation of the live span.
//! * Span durations are computed against an anchored monotonic clock, so
//!   they stay correct when the wall clock jumps.
//! * The batch export queue is bounded and drop-on-full; an application
//!   thread ending a span never waits for export I/O.

#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unreachable_pub,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod common;
mod context;
mod internal_logging;

pub mod error;
pub mod resource;
pub mod time;
pub mod trace;

#[cfg(any(test, feature = "testing"))]
#[cfg_attr(docsrs, doc(cfg(feature = "testing")))]
pub mod testing;

pub use common::{
    Array, InstrumentationScope, InstrumentationScopeBuilder, Key, KeyValue, StringValue, Value,
};
pub use context::Context;

#[cfg(feature = "internal-logs")]
#[doc(hidden)]
pub mod _private {
    pub use tracing::{debug, error, info, warn};
}
