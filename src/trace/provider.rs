//! # Tracer provider
//!
//! The `SdkTracerProvider` is the central configuration point for tracing:
//! it owns the sampler, id generator, clock, span limits, resource and the
//! registered span processors, and hands out [`SdkTracer`] instances that
//! share them.
//!
//! Cloning a provider creates a new reference to the same instance. Dropping
//! the last reference triggers shutdown, which flushes remaining spans
//! through the processors. After shutdown the provider is disabled: spans
//! created by its tracers are non-recording no-ops.

use crate::common::InstrumentationScope;
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::time::Clock;
use crate::trace::span_processor::composite;
use crate::trace::{
    BatchSpanProcessor, Config, IdGenerator, SdkTracer, ShouldSample, SimpleSpanProcessor,
    SpanExporter, SpanLimits, SpanProcessor,
};
use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

// A disabled provider handed to tracers requested after shutdown.
static NOOP_TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

#[inline]
fn noop_tracer_provider() -> &'static SdkTracerProvider {
    NOOP_TRACER_PROVIDER.get_or_init(|| SdkTracerProvider {
        inner: Arc::new(TracerProviderInner {
            processor: composite(Vec::new()),
            config: Config::default(),
            is_shutdown: AtomicBool::new(true),
        }),
    })
}

#[derive(Debug)]
pub(crate) struct TracerProviderInner {
    processor: Box<dyn SpanProcessor>,
    config: Config,
    is_shutdown: AtomicBool,
}

impl TracerProviderInner {
    /// Shared shutdown path for explicit `shutdown` calls and the final
    /// drop.
    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        let result = self.processor.shutdown_with_timeout(timeout);
        if let Err(err) = &result {
            // Also logged because during a drop-triggered shutdown there is
            // no caller left to observe the returned error.
            crate::sdk_debug!(
                name: "TracerProvider.Shutdown.Error",
                error = format!("{err}")
            );
        }
        result
    }
}

impl Drop for TracerProviderInner {
    fn drop(&mut self) {
        if !self.is_shutdown.load(Ordering::Relaxed) {
            let _ = self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Creator and registry of named [`SdkTracer`] instances.
#[derive(Clone, Debug)]
pub struct SdkTracerProvider {
    inner: Arc<TracerProviderInner>,
}

impl Default for SdkTracerProvider {
    fn default() -> Self {
        SdkTracerProvider::builder().build()
    }
}

impl SdkTracerProvider {
    /// Create a new [`SdkTracerProvider`] builder.
    pub fn builder() -> TracerProviderBuilder {
        TracerProviderBuilder::default()
    }

    /// The composed span processor for this provider.
    pub(crate) fn span_processor(&self) -> &dyn SpanProcessor {
        self.inner.processor.as_ref()
    }

    /// Config associated with this provider.
    pub(crate) fn config(&self) -> &Config {
        &self.inner.config
    }

    /// `true` once the provider has been shut down. Spans are neither
    /// started nor exported afterwards.
    pub fn is_shutdown(&self) -> bool {
        self.inner.is_shutdown.load(Ordering::Relaxed)
    }

    /// Returns a tracer named `name`.
    pub fn tracer(&self, name: impl Into<Cow<'static, str>>) -> SdkTracer {
        self.tracer_with_scope(InstrumentationScope::builder(name).build())
    }

    /// Returns a tracer carrying the given instrumentation scope.
    pub fn tracer_with_scope(&self, scope: InstrumentationScope) -> SdkTracer {
        if self.is_shutdown() {
            return SdkTracer::new(scope, noop_tracer_provider().clone());
        }
        if scope.name().is_empty() {
            crate::sdk_info!(
                name: "TracerNameEmpty",
                message = "tracer name is empty; consider providing a meaningful name"
            );
        }
        SdkTracer::new(scope, self.clone())
    }

    /// Hand all buffered spans to their exporters and wait for the result.
    ///
    /// This is the only operation that deterministically waits for
    /// previously ended spans to reach the exporter.
    pub fn force_flush(&self) -> SdkResult {
        self.span_processor().force_flush()
    }

    /// Shut down this provider, flushing remaining spans first.
    ///
    /// Repeat calls are cheap no-ops.
    pub fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// [`shutdown`](SdkTracerProvider::shutdown) with a caller-supplied
    /// bound on the wait.
    ///
    /// Timing out does not roll back partial shutdown progress.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self
            .inner
            .is_shutdown
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.inner.shutdown_with_timeout(timeout)
        } else {
            Ok(())
        }
    }
}

/// Builder for [`SdkTracerProvider`].
#[derive(Debug, Default)]
pub struct TracerProviderBuilder {
    processors: Vec<Box<dyn SpanProcessor>>,
    sampler: Option<Box<dyn ShouldSample>>,
    id_generator: Option<Box<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
    span_limits: Option<SpanLimits>,
    resource: Option<Resource>,
}

impl TracerProviderBuilder {
    /// Add a [`SimpleSpanProcessor`] exporting to `exporter`.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_simple_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        self.with_span_processor(SimpleSpanProcessor::new(exporter))
    }

    /// Add a [`BatchSpanProcessor`] exporting to `exporter`.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_batch_exporter<T: SpanExporter + 'static>(self, exporter: T) -> Self {
        self.with_span_processor(BatchSpanProcessor::builder(exporter).build())
    }

    /// Add a span processor to the pipeline.
    ///
    /// Processors are invoked in the order they are added.
    pub fn with_span_processor<T: SpanProcessor + 'static>(mut self, processor: T) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    /// Set the sampler consulted for every new span.
    pub fn with_sampler<T: ShouldSample + 'static>(mut self, sampler: T) -> Self {
        self.sampler = Some(Box::new(sampler));
        self
    }

    /// Set the generator for trace and span ids.
    pub fn with_id_generator<T: IdGenerator + 'static>(mut self, id_generator: T) -> Self {
        self.id_generator = Some(Box::new(id_generator));
        self
    }

    /// Set the clock spans anchor against at creation.
    pub fn with_clock<T: Clock + 'static>(mut self, clock: T) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Set the per-span collection limits.
    pub fn with_span_limits(mut self, span_limits: SpanLimits) -> Self {
        self.span_limits = Some(span_limits);
        self
    }

    /// Set the resource describing the producing entity. It is passed
    /// through to every registered exporter.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Build the configured [`SdkTracerProvider`].
    pub fn build(self) -> SdkTracerProvider {
        let mut config = Config::default();
        if let Some(sampler) = self.sampler {
            config.sampler = sampler;
        }
        if let Some(id_generator) = self.id_generator {
            config.id_generator = id_generator;
        }
        if let Some(clock) = self.clock {
            config.clock = clock;
        }
        if let Some(span_limits) = self.span_limits {
            config.span_limits = span_limits;
        }
        if let Some(resource) = self.resource {
            config.resource = Cow::Owned(resource);
        }

        let mut processors = self.processors;
        for processor in processors.iter_mut() {
            processor.set_resource(config.resource.as_ref());
        }

        SdkTracerProvider {
            inner: Arc::new(TracerProviderInner {
                processor: composite(processors),
                config,
                is_shutdown: AtomicBool::new(false),
            }),
        }
    }
}
