//! # Tracing
//!
//! The tracing signal: spans, their bounded state, sampling, lifecycle
//! processors and batched export.
//!
//! A [`SdkTracerProvider`] wires a [`ShouldSample`] sampler, an
//! [`IdGenerator`], a [`Clock`](crate::time::Clock), [`SpanLimits`] and the
//! registered [`SpanProcessor`]s into every [`Span`] its tracers create.
//! Finished spans flow as immutable [`SpanData`] snapshots through the
//! processors to a [`SpanExporter`].
//!
//! ```
//! use tracekit::trace::SdkTracerProvider;
//! use tracekit::{Context, KeyValue};
//!
//! let provider = SdkTracerProvider::builder().build();
//! let tracer = provider.tracer("my-component");
//!
//! let mut span = tracer.start("operation", &Context::root());
//! span.set_attribute(KeyValue::new("db.rows", 42i64));
//! span.end();
//!
//! provider.shutdown().unwrap();
//! ```

mod attributes;
mod config;
mod events;
mod export;
mod id_generator;
mod in_memory_exporter;
mod links;
mod provider;
mod sampler;
mod span;
mod span_context;
mod span_limit;
mod span_processor;
mod tracer;

pub use config::Config;
pub use events::{Event, SpanEvents};
pub use export::{ExportResult, SpanData, SpanExporter};
pub use id_generator::{IdGenerator, IncrementIdGenerator, RandomIdGenerator};
pub use in_memory_exporter::{InMemorySpanExporter, InMemorySpanExporterBuilder};
pub use links::{Link, SpanLinks};
pub use provider::{SdkTracerProvider, TracerProviderBuilder};
pub use sampler::{Sampler, SamplingDecision, SamplingResult, ShouldSample};
pub use span::{ReadWriteSpan, Span, SpanHandle};
pub use span_context::{SpanContext, SpanId, TraceFlags, TraceId, TraceState, TraceStateError};
pub use span_limit::SpanLimits;
pub use span_processor::{
    BatchConfig, BatchConfigBuilder, BatchSpanProcessor, BatchSpanProcessorBuilder,
    SimpleSpanProcessor, SpanProcessor,
};
pub use tracer::SdkTracer;

use crate::common::KeyValue;
use crate::context::Context;
use std::borrow::Cow;
use std::time::SystemTime;

/// The relationship of the span to the operation it describes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpanKind {
    /// Outgoing synchronous remote call (e.g. an outgoing HTTP request).
    Client,
    /// Incoming synchronous remote call (e.g. handling an HTTP request).
    Server,
    /// Producer of an asynchronously processed message.
    Producer,
    /// Consumer of an asynchronously produced message.
    Consumer,
    /// Operation internal to the application.
    Internal,
}

/// The status of a finished span.
///
/// The variants form a total order, `Ok > Error > Unset`, and a span's
/// status only ever upgrades: once `Ok` is set, later `Error`s are ignored.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    /// The default status.
    #[default]
    Unset,

    /// The operation contains an error.
    Error {
        /// The description of the error.
        description: Cow<'static, str>,
    },

    /// The operation completed successfully.
    Ok,
}

impl Status {
    /// Create an error status with the given description.
    pub fn error(description: impl Into<Cow<'static, str>>) -> Self {
        Status::Error {
            description: description.into(),
        }
    }
}

/// A deferred description of a span to create.
///
/// Attributes, links and events supplied here are frozen into the span when
/// it starts, subject to the provider's [`SpanLimits`].
#[derive(Clone, Debug, Default)]
pub struct SpanBuilder {
    /// The span name.
    pub name: Cow<'static, str>,
    /// The span kind; [`SpanKind::Internal`] if unset.
    pub span_kind: Option<SpanKind>,
    /// An explicit start time; the provider clock's reading if unset.
    pub start_time: Option<SystemTime>,
    /// Initial attributes.
    pub attributes: Option<Vec<KeyValue>>,
    /// Initial events.
    pub events: Option<Vec<Event>>,
    /// Links to other spans.
    pub links: Option<Vec<Link>>,
}

impl SpanBuilder {
    /// Create a builder for a span named `name`.
    pub fn from_name<T: Into<Cow<'static, str>>>(name: T) -> Self {
        SpanBuilder {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the span kind.
    pub fn with_kind(self, span_kind: SpanKind) -> Self {
        SpanBuilder {
            span_kind: Some(span_kind),
            ..self
        }
    }

    /// Set an explicit start time.
    pub fn with_start_time<T: Into<SystemTime>>(self, start_time: T) -> Self {
        SpanBuilder {
            start_time: Some(start_time.into()),
            ..self
        }
    }

    /// Set the initial attributes.
    pub fn with_attributes<I>(self, attributes: I) -> Self
    where
        I: IntoIterator<Item = KeyValue>,
    {
        SpanBuilder {
            attributes: Some(attributes.into_iter().collect()),
            ..self
        }
    }

    /// Set the initial events.
    pub fn with_events(self, events: Vec<Event>) -> Self {
        SpanBuilder {
            events: Some(events),
            ..self
        }
    }

    /// Set the links to other spans.
    pub fn with_links(self, links: Vec<Link>) -> Self {
        SpanBuilder {
            links: Some(links),
            ..self
        }
    }

    /// Start the described span under the given parent context.
    pub fn start(self, tracer: &SdkTracer, parent_cx: &Context) -> Span {
        tracer.build_with_context(self, parent_cx)
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn status_order() {
        assert!(Status::Ok > Status::error("any"));
        assert!(Status::error("any") > Status::Unset);
        assert!(Status::Ok > Status::Unset);
    }
}
