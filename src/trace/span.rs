//! # Span
//!
//! `Span`s represent a single operation within a trace. Spans can be nested
//! to form a trace tree. Each trace contains a root span, which typically
//! describes the end-to-end latency and, optionally, one or more sub-spans
//! for its sub-operations.
//!
//! After creation a span's name, attributes, events, links and status can be
//! changed until `end()` is called; every mutator is a silent no-op after
//! that. All mutation for one span happens under a single per-span lock, so
//! concurrent writers (or a writer racing a snapshot) can never observe or
//! produce a torn state.

use crate::common::{Key, KeyValue, Value};
use crate::time::AnchoredClock;
use crate::trace::attributes::AttributesMap;
use crate::trace::{
    Event, SpanContext, SpanData, SpanEvents, SpanId, SpanKind, SpanLimits, SpanLinks, Status,
};
use std::borrow::Cow;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Single operation within a trace.
///
/// The application thread that started the span holds it until `end()`;
/// processors observe it through snapshots or the [`ReadWriteSpan`] view,
/// never through direct field access. For concurrent mutation from another
/// thread, obtain a [`SpanHandle`] with [`Span::handle`].
#[derive(Debug)]
pub struct Span {
    span_context: SpanContext,
    inner: Arc<Mutex<Option<SpanRecording>>>,
    tracer: crate::trace::SdkTracer,
    span_limits: SpanLimits,
}

/// Thread safe, cloneable reference to a span.
///
/// Handles share the owning span's state and lock; mutations through either
/// are visible to both.
#[derive(Clone, Debug)]
pub struct SpanHandle {
    span_context: SpanContext,
    inner: Arc<Mutex<Option<SpanRecording>>>,
    tracer: crate::trace::SdkTracer,
    span_limits: SpanLimits,
}

/// The live, mutable state of a recording span.
///
/// `None` in the owning `Option` means the span is non-recording (sampler
/// decided `Drop`); `has_ended` marks the recording-to-ended transition.
#[derive(Clone, Debug)]
pub(crate) struct SpanRecording {
    pub(crate) parent_span_id: SpanId,
    pub(crate) parent_span_is_remote: bool,
    pub(crate) span_kind: SpanKind,
    pub(crate) name: Cow<'static, str>,
    pub(crate) start_time: SystemTime,
    pub(crate) end_time: SystemTime,
    pub(crate) attributes: AttributesMap,
    pub(crate) events: SpanEvents,
    pub(crate) links: SpanLinks,
    pub(crate) status: Status,
    pub(crate) has_ended: bool,
    pub(crate) clock: AnchoredClock,
}

impl Span {
    pub(crate) fn new(
        span_context: SpanContext,
        recording: Option<SpanRecording>,
        tracer: crate::trace::SdkTracer,
        span_limits: SpanLimits,
    ) -> Self {
        Span {
            span_context,
            inner: Arc::new(Mutex::new(recording)),
            tracer,
            span_limits,
        }
    }

    /// Returns the `SpanContext` for the given `Span`.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` if this span records information like events, set
    /// attributes and status. Always `false` after `end`.
    pub fn is_recording(&self) -> bool {
        is_recording(&self.inner)
    }

    /// Returns `true` once the span has ended.
    pub fn has_ended(&self) -> bool {
        self.inner
            .lock()
            .map(|guard| guard.as_ref().map(|data| data.has_ended).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Sets a single attribute.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        with_data(&self.inner, |data| data_set_attribute(data, attribute));
    }

    /// Sets multiple attributes.
    pub fn set_attributes(&mut self, attributes: impl IntoIterator<Item = KeyValue>) {
        with_data(&self.inner, |data| {
            for attribute in attributes {
                data_set_attribute(data, attribute);
            }
        });
    }

    /// Records an event at the current time.
    pub fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        let limits = self.span_limits;
        with_data(&self.inner, |data| {
            data_add_event(data, name.into(), None, attributes, &limits)
        });
    }

    /// Records an event at a specific time.
    pub fn add_event_with_timestamp<T>(
        &mut self,
        name: T,
        timestamp: SystemTime,
        attributes: Vec<KeyValue>,
    ) where
        T: Into<Cow<'static, str>>,
    {
        let limits = self.span_limits;
        with_data(&self.inner, |data| {
            data_add_event(data, name.into(), Some(timestamp), attributes, &limits)
        });
    }

    /// Adds a link to another span.
    ///
    /// Links supplied through the builder are frozen into the span at
    /// construction; this channel stays open until `end()`.
    pub fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>) {
        let limits = self.span_limits;
        with_data(&self.inner, |data| {
            data_add_link(data, span_context, attributes, &limits)
        });
    }

    /// Sets the status of this span.
    ///
    /// Status upgrades only: `Ok` wins over `Error` wins over `Unset`, and
    /// once `Ok` is set later `Error`s are ignored.
    pub fn set_status(&mut self, status: Status) {
        with_data(&self.inner, |data| data_set_status(data, status));
    }

    /// Updates the span's name.
    pub fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        with_data(&self.inner, |data| data.name = new_name.into());
    }

    /// Records an error as an `exception` event.
    pub fn record_error(&mut self, err: &dyn Error) {
        self.record_error_with_attributes(err, Vec::new());
    }

    /// Records an error as an `exception` event with extra attributes.
    ///
    /// Caller-supplied attributes take precedence over the synthesized
    /// `exception.*` attributes on key collision.
    pub fn record_error_with_attributes(&mut self, err: &dyn Error, attributes: Vec<KeyValue>) {
        let limits = self.span_limits;
        let message = err.to_string();
        with_data(&self.inner, |data| {
            data_record_error(data, message, attributes, &limits)
        });
    }

    /// Finishes the span with the current time.
    pub fn end(&mut self) {
        self.end_with_timestamp_opt(None);
    }

    /// Finishes the span with the given timestamp.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        self.end_with_timestamp_opt(Some(timestamp));
    }

    fn end_with_timestamp_opt(&mut self, timestamp: Option<SystemTime>) {
        end_and_deliver(
            &self.span_context,
            &self.inner,
            &self.tracer,
            self.span_limits,
            timestamp,
        );
    }

    /// Produces an immutable snapshot of the span's current state, or `None`
    /// for a non-recording span.
    ///
    /// Callable before or after `end()`; later mutation of the span never
    /// changes a previously returned snapshot.
    pub fn to_span_data(&self) -> Option<SpanData> {
        to_span_data(&self.span_context, &self.inner, &self.tracer)
    }

    /// The span's duration so far: `end - start` once ended, otherwise the
    /// anchored clock's current reading minus the start time.
    ///
    /// Monotone non-decreasing while the span is active, even under wall
    /// clock adjustment. Zero for non-recording spans.
    pub fn latency(&self) -> Duration {
        latency(&self.inner)
    }

    /// Get a shared, cloneable handle to this span for concurrent use.
    pub fn handle(&self) -> SpanHandle {
        SpanHandle {
            span_context: self.span_context.clone(),
            inner: self.inner.clone(),
            tracer: self.tracer.clone(),
            span_limits: self.span_limits,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_recording<T>(&self, f: impl FnOnce(&SpanRecording) -> T) -> Option<T> {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(f))
    }
}

impl Drop for Span {
    /// Ends and reports the span if the application never called `end()`.
    fn drop(&mut self) {
        self.end_with_timestamp_opt(None);
    }
}

impl SpanHandle {
    /// Returns the `SpanContext` for the underlying span.
    pub fn span_context(&self) -> &SpanContext {
        &self.span_context
    }

    /// Returns `true` if the underlying span is still recording.
    pub fn is_recording(&self) -> bool {
        is_recording(&self.inner)
    }

    /// Sets a single attribute.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        with_data(&self.inner, |data| data_set_attribute(data, attribute));
    }

    /// Records an event at the current time.
    pub fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        let limits = self.span_limits;
        with_data(&self.inner, |data| {
            data_add_event(data, name.into(), None, attributes, &limits)
        });
    }

    /// Adds a link to another span.
    pub fn add_link(&mut self, span_context: SpanContext, attributes: Vec<KeyValue>) {
        let limits = self.span_limits;
        with_data(&self.inner, |data| {
            data_add_link(data, span_context, attributes, &limits)
        });
    }

    /// Sets the status of the underlying span.
    pub fn set_status(&mut self, status: Status) {
        with_data(&self.inner, |data| data_set_status(data, status));
    }

    /// Updates the underlying span's name.
    pub fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        with_data(&self.inner, |data| data.name = new_name.into());
    }

    /// Finishes the underlying span with the given timestamp.
    pub fn end_with_timestamp(&mut self, timestamp: SystemTime) {
        end_and_deliver(
            &self.span_context,
            &self.inner,
            &self.tracer,
            self.span_limits,
            Some(timestamp),
        );
    }

    /// Produces an immutable snapshot of the underlying span's state.
    pub fn to_span_data(&self) -> Option<SpanData> {
        to_span_data(&self.span_context, &self.inner, &self.tracer)
    }
}

/// A read-write view of a span handed to [`SpanProcessor::on_ending`].
///
/// The view operates inside the span's mutual-exclusion domain: while the
/// hook runs, the span is mutable to exactly one caller and application
/// threads are excluded.
///
/// [`SpanProcessor::on_ending`]: crate::trace::SpanProcessor::on_ending
#[derive(Debug)]
pub struct ReadWriteSpan<'a> {
    span_context: &'a SpanContext,
    data: &'a mut SpanRecording,
    span_limits: SpanLimits,
}

impl<'a> ReadWriteSpan<'a> {
    pub(crate) fn new(
        span_context: &'a SpanContext,
        data: &'a mut SpanRecording,
        span_limits: SpanLimits,
    ) -> Self {
        ReadWriteSpan {
            span_context,
            data,
            span_limits,
        }
    }

    /// The span's context.
    pub fn span_context(&self) -> &SpanContext {
        self.span_context
    }

    /// The span's current name.
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// The span's current status.
    pub fn status(&self) -> &Status {
        &self.data.status
    }

    /// The already-frozen end timestamp.
    pub fn end_time(&self) -> SystemTime {
        self.data.end_time
    }

    /// The value currently recorded for an attribute key, if any.
    pub fn attribute(&self, key: &Key) -> Option<&Value> {
        self.data.attributes.get(key)
    }

    /// Sets a single attribute.
    pub fn set_attribute(&mut self, attribute: KeyValue) {
        data_set_attribute(self.data, attribute);
    }

    /// Updates the span's name.
    pub fn update_name<T>(&mut self, new_name: T)
    where
        T: Into<Cow<'static, str>>,
    {
        self.data.name = new_name.into();
    }

    /// Sets the span's status, with the usual upgrade-only rules.
    pub fn set_status(&mut self, status: Status) {
        data_set_status(self.data, status);
    }

    /// Records an event at the current time.
    pub fn add_event<T>(&mut self, name: T, attributes: Vec<KeyValue>)
    where
        T: Into<Cow<'static, str>>,
    {
        let limits = self.span_limits;
        data_add_event(self.data, name.into(), None, attributes, &limits);
    }
}

fn with_data<T, F>(inner: &Arc<Mutex<Option<SpanRecording>>>, f: F) -> Option<T>
where
    F: FnOnce(&mut SpanRecording) -> T,
{
    inner.lock().ok().and_then(|mut guard| {
        guard
            .as_mut()
            .filter(|data| !data.has_ended)
            .map(f)
    })
}

fn is_recording(inner: &Arc<Mutex<Option<SpanRecording>>>) -> bool {
    inner
        .lock()
        .map(|guard| {
            guard
                .as_ref()
                .map(|data| !data.has_ended)
                .unwrap_or(false)
        })
        .unwrap_or(false)
}

fn latency(inner: &Arc<Mutex<Option<SpanRecording>>>) -> Duration {
    inner
        .lock()
        .ok()
        .and_then(|guard| {
            guard.as_ref().map(|data| {
                let end = if data.has_ended {
                    data.end_time
                } else {
                    data.clock.now()
                };
                end.duration_since(data.start_time).unwrap_or_default()
            })
        })
        .unwrap_or_default()
}

fn to_span_data(
    span_context: &SpanContext,
    inner: &Arc<Mutex<Option<SpanRecording>>>,
    tracer: &crate::trace::SdkTracer,
) -> Option<SpanData> {
    inner.lock().ok().and_then(|guard| {
        guard
            .as_ref()
            .map(|data| build_span_data(data, span_context.clone(), tracer))
    })
}

pub(crate) fn build_span_data(
    data: &SpanRecording,
    span_context: SpanContext,
    tracer: &crate::trace::SdkTracer,
) -> SpanData {
    SpanData {
        span_context,
        parent_span_id: data.parent_span_id,
        parent_span_is_remote: data.parent_span_is_remote,
        span_kind: data.span_kind.clone(),
        name: data.name.clone(),
        start_time: data.start_time,
        end_time: data.end_time,
        attributes: data.attributes.to_vec(),
        total_recorded_attributes: data.attributes.total_added(),
        events: data.events.clone(),
        links: data.links.clone(),
        status: data.status.clone(),
        instrumentation_scope: tracer.instrumentation_scope().clone(),
    }
}

fn data_set_attribute(data: &mut SpanRecording, attribute: KeyValue) {
    data.attributes.insert(attribute);
}

fn data_add_event(
    data: &mut SpanRecording,
    name: Cow<'static, str>,
    timestamp: Option<SystemTime>,
    attributes: Vec<KeyValue>,
    limits: &SpanLimits,
) {
    let timestamp = timestamp.unwrap_or_else(|| data.clock.now());
    let mut bounded = AttributesMap::new(
        limits.max_attributes_per_event,
        limits.max_attribute_value_length,
    );
    for attribute in attributes {
        bounded.insert(attribute);
    }
    data.events.add(Event::new(
        name,
        timestamp,
        bounded.to_vec(),
        bounded.dropped_count(),
    ));
}

fn data_add_link(
    data: &mut SpanRecording,
    span_context: SpanContext,
    attributes: Vec<KeyValue>,
    limits: &SpanLimits,
) {
    let mut bounded = AttributesMap::new(
        limits.max_attributes_per_link,
        limits.max_attribute_value_length,
    );
    for attribute in attributes {
        bounded.insert(attribute);
    }
    data.links.add(crate::trace::Link::new(
        span_context,
        bounded.to_vec(),
        bounded.dropped_count(),
    ));
}

fn data_set_status(data: &mut SpanRecording, status: Status) {
    // These values form a total order: Ok > Error > Unset.
    if status > data.status {
        data.status = status;
    }
}

fn data_record_error(
    data: &mut SpanRecording,
    message: String,
    extra_attributes: Vec<KeyValue>,
    limits: &SpanLimits,
) {
    let mut attributes = Vec::with_capacity(1 + extra_attributes.len());
    if !message.is_empty() {
        attributes.push(KeyValue::new("exception.message", message));
    }
    // caller attributes go last so they win on key collision
    attributes.extend(extra_attributes);
    data_add_event(data, "exception".into(), None, attributes, limits);
}

fn end_and_deliver(
    span_context: &SpanContext,
    inner: &Arc<Mutex<Option<SpanRecording>>>,
    tracer: &crate::trace::SdkTracer,
    span_limits: SpanLimits,
    timestamp: Option<SystemTime>,
) {
    let provider = tracer.provider();
    // skip if the provider has been shut down
    if provider.is_shutdown() {
        return;
    }

    let snapshot = {
        let Ok(mut guard) = inner.lock() else { return };
        let Some(data) = guard.as_mut() else { return };
        if data.has_ended {
            return; // already ended
        }
        data.end_time = timestamp.unwrap_or_else(|| data.clock.now());

        // The ending hook runs before the ended flag flips; the span lock is
        // held, so the hook is the only writer during this window.
        {
            let mut view = ReadWriteSpan::new(span_context, data, span_limits);
            provider.span_processor().on_ending(&mut view);
        }

        data.has_ended = true;
        build_span_data(data, span_context.clone(), tracer)
    };

    provider.span_processor().on_end(snapshot);
}
