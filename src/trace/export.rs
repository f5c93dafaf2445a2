//! Span export interface.

use crate::common::{InstrumentationScope, KeyValue};
use crate::error::SdkResult;
use crate::resource::Resource;
use crate::trace::{SpanContext, SpanEvents, SpanId, SpanKind, SpanLinks, Status};
use futures_util::future::BoxFuture;
use std::borrow::Cow;
use std::fmt::Debug;
use std::time::SystemTime;

/// Describes the result of an export.
pub type ExportResult = SdkResult;

/// The interface protocol-specific exporters implement so they can be
/// plugged into a span pipeline.
///
/// An exporter is expected to be a simple encoder and transmitter of
/// finished span data; batching, queuing and backpressure are handled by the
/// processor that owns it.
pub trait SpanExporter: Send + Sync + Debug {
    /// Exports a batch of finished spans.
    ///
    /// This function is never called concurrently for the same exporter
    /// instance; it is called again only after the returned future resolves.
    /// It must not block indefinitely. Retry logic, if any, is the
    /// exporter's responsibility.
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult>;

    /// Shuts down the exporter. After this call, `export` is not invoked
    /// again.
    fn shutdown(&mut self) {}

    /// A hint that any spans received but not yet transmitted should be sent
    /// now.
    fn force_flush(&mut self) -> BoxFuture<'static, ExportResult> {
        Box::pin(std::future::ready(Ok(())))
    }

    /// Set the resource associated with the producing entity.
    ///
    /// Called once at pipeline construction; the resource is pass-through
    /// metadata the core never inspects.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// An immutable snapshot of a span's state, used as the exporter input.
///
/// Snapshots are value copies: mutating the live span after a snapshot was
/// taken never changes a previously returned `SpanData`.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub struct SpanData {
    /// The span's propagatable identity.
    pub span_context: SpanContext,
    /// Id of the parent span, or [`SpanId::INVALID`] for a root span.
    pub parent_span_id: SpanId,
    /// Whether the parent context was propagated from a remote process.
    pub parent_span_is_remote: bool,
    /// The span kind.
    pub span_kind: SpanKind,
    /// The span name at snapshot time.
    pub name: Cow<'static, str>,
    /// Start timestamp.
    pub start_time: SystemTime,
    /// End timestamp; equals `start_time` until the span has ended.
    pub end_time: SystemTime,
    /// Attributes at snapshot time, oldest-to-newest.
    pub attributes: Vec<KeyValue>,
    /// Lifetime count of attribute puts, including evicted/overwritten ones.
    pub total_recorded_attributes: u32,
    /// Events at snapshot time.
    pub events: SpanEvents,
    /// Links at snapshot time.
    pub links: SpanLinks,
    /// The span status.
    pub status: Status,
    /// The instrumentation scope that produced this span.
    pub instrumentation_scope: InstrumentationScope,
}

impl SpanData {
    /// The number of attributes dropped by bounding, derived from the
    /// lifetime put count and the retained set.
    pub fn dropped_attributes_count(&self) -> u32 {
        self.total_recorded_attributes
            .saturating_sub(self.attributes.len() as u32)
    }
}
