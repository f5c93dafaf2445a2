//! # Tracer
//!
//! The `Tracer` creates spans: it runs the sampler, assembles the new span's
//! context and bounded state, and fans `on_start` out to the registered
//! processors. Parenting is explicit; every span-creating call takes a
//! [`Context`] value.

use crate::common::InstrumentationScope;
use crate::context::Context;
use crate::time::AnchoredClock;
use crate::trace::attributes::AttributesMap;
use crate::trace::provider::SdkTracerProvider;
use crate::trace::span::SpanRecording;
use crate::trace::{
    SamplingDecision, Span, SpanBuilder, SpanContext, SpanEvents, SpanKind, SpanLimits, SpanLinks,
    Status, TraceFlags,
};
use std::borrow::Cow;
use std::fmt;

/// Creates and manages spans under one instrumentation scope.
#[derive(Clone)]
pub struct SdkTracer {
    scope: InstrumentationScope,
    provider: SdkTracerProvider,
}

impl fmt::Debug for SdkTracer {
    /// Omitting `provider` here is necessary to avoid cycles.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkTracer")
            .field("name", &self.scope.name())
            .field("version", &self.scope.version())
            .finish()
    }
}

impl SdkTracer {
    pub(crate) fn new(scope: InstrumentationScope, provider: SdkTracerProvider) -> Self {
        SdkTracer { scope, provider }
    }

    pub(crate) fn provider(&self) -> &SdkTracerProvider {
        &self.provider
    }

    pub(crate) fn instrumentation_scope(&self) -> &InstrumentationScope {
        &self.scope
    }

    /// Returns a builder for a span named `name`.
    pub fn span_builder<T: Into<Cow<'static, str>>>(&self, name: T) -> SpanBuilder {
        SpanBuilder::from_name(name)
    }

    /// Starts a span named `name` under the given parent context.
    pub fn start<T: Into<Cow<'static, str>>>(&self, name: T, parent_cx: &Context) -> Span {
        self.build_with_context(SpanBuilder::from_name(name), parent_cx)
    }

    /// Starts a span from a [`SpanBuilder`] under the given parent context.
    pub fn build_with_context(&self, mut builder: SpanBuilder, parent_cx: &Context) -> Span {
        let provider = self.provider();
        // no point starting a span if the provider has already shut down
        if provider.is_shutdown() {
            return Span::new(
                SpanContext::empty_context(),
                None,
                self.clone(),
                SpanLimits::default(),
            );
        }

        let config = provider.config();
        let span_id = config.id_generator.new_span_id();
        let parent = parent_cx.span_context().filter(|sc| sc.is_valid());
        let trace_id = match parent {
            Some(sc) => sc.trace_id(),
            None => config.id_generator.new_trace_id(),
        };

        let sampling_result = config.sampler.should_sample(
            parent_cx,
            trace_id,
            &builder.name,
            builder.span_kind.as_ref().unwrap_or(&SpanKind::Internal),
            builder.attributes.as_deref().unwrap_or(&[]),
            builder.links.as_deref().unwrap_or(&[]),
        );

        let parent_flags = parent.map(|sc| sc.trace_flags()).unwrap_or_default();
        let trace_state = sampling_result.trace_state;
        let span_limits = config.span_limits;

        let mut span = match sampling_result.decision {
            SamplingDecision::RecordAndSample => {
                let sc = SpanContext::new(
                    trace_id,
                    span_id,
                    parent_flags.with_sampled(true),
                    false,
                    trace_state,
                );
                self.build_recording_span(
                    parent,
                    sc,
                    builder,
                    sampling_result.attributes,
                    span_limits,
                )
            }
            SamplingDecision::RecordOnly => {
                let sc = SpanContext::new(
                    trace_id,
                    span_id,
                    parent_flags.with_sampled(false),
                    false,
                    trace_state,
                );
                self.build_recording_span(
                    parent,
                    sc,
                    builder,
                    sampling_result.attributes,
                    span_limits,
                )
            }
            SamplingDecision::Drop => {
                let sc = SpanContext::new(
                    trace_id,
                    span_id,
                    TraceFlags::default(),
                    false,
                    trace_state,
                );
                builder.attributes = None;
                Span::new(sc, None, self.clone(), span_limits)
            }
        };

        if span.is_recording() {
            let processor = provider.span_processor();
            if processor.is_start_required() {
                processor.on_start(&mut span, parent_cx);
            }
        }

        span
    }

    fn build_recording_span(
        &self,
        parent: Option<&SpanContext>,
        span_context: SpanContext,
        builder: SpanBuilder,
        sampler_attributes: Vec<crate::common::KeyValue>,
        span_limits: SpanLimits,
    ) -> Span {
        let mut attributes = AttributesMap::new(
            span_limits.max_attributes_per_span,
            span_limits.max_attribute_value_length,
        );
        // Sampler attributes first, builder attributes second: explicitly
        // set builder attributes win on key collision.
        for attribute in sampler_attributes {
            attributes.insert(attribute);
        }
        for attribute in builder.attributes.unwrap_or_default() {
            attributes.insert(attribute);
        }

        let mut links = SpanLinks::with_capacity(span_limits.max_links_per_span);
        for link in builder.links.unwrap_or_default() {
            let mut bounded = AttributesMap::new(
                span_limits.max_attributes_per_link,
                span_limits.max_attribute_value_length,
            );
            for attribute in link.attributes {
                bounded.insert(attribute);
            }
            links.add(crate::trace::Link::new(
                link.span_context,
                bounded.to_vec(),
                bounded.dropped_count() + link.dropped_attributes_count,
            ));
        }

        let clock = AnchoredClock::new(self.provider.config().clock.clone());
        let start_time = builder.start_time.unwrap_or_else(|| clock.start_time());

        let mut events = SpanEvents::with_capacity(span_limits.max_events_per_span);
        for event in builder.events.unwrap_or_default() {
            let mut bounded = AttributesMap::new(
                span_limits.max_attributes_per_event,
                span_limits.max_attribute_value_length,
            );
            for attribute in event.attributes {
                bounded.insert(attribute);
            }
            events.add(crate::trace::Event::new(
                event.name,
                event.timestamp,
                bounded.to_vec(),
                bounded.dropped_count() + event.dropped_attributes_count,
            ));
        }

        Span::new(
            span_context,
            Some(SpanRecording {
                parent_span_id: parent
                    .map(|sc| sc.span_id())
                    .unwrap_or(crate::trace::SpanId::INVALID),
                parent_span_is_remote: parent.map(|sc| sc.is_remote()).unwrap_or(false),
                span_kind: builder.span_kind.unwrap_or(SpanKind::Internal),
                name: builder.name,
                start_time,
                end_time: start_time,
                attributes,
                events,
                links,
                status: Status::Unset,
                has_ended: false,
                clock,
            }),
            self.clone(),
            span_limits,
        )
    }
}
