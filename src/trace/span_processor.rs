//! # Span processors
//!
//! Span processors observe span lifecycle transitions (`on_start`,
//! `on_ending`, `on_end`) and expose `force_flush`/`shutdown` as bounded
//! operations. Built-in processors convert finished spans into exportable
//! batches and hand them to a [`SpanExporter`].
//!
//! Processors are registered on the provider and composed into a single
//! fan-out that consults each child's `is_start_required`/`is_end_required`
//! capability flags once, at registration time.

use crate::context::Context;
use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::span::ReadWriteSpan;
use crate::trace::{Span, SpanData, SpanExporter};
use futures_executor::block_on;
use std::env;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{sync_channel, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Delay interval between two consecutive scheduled exports.
pub(crate) const ENV_BSP_SCHEDULE_DELAY: &str = "TRACEKIT_BSP_SCHEDULE_DELAY";
/// Default delay interval between two consecutive scheduled exports.
pub(crate) const DEFAULT_BSP_SCHEDULE_DELAY_MILLIS: u64 = 5_000;
/// Maximum export queue size.
pub(crate) const ENV_BSP_MAX_QUEUE_SIZE: &str = "TRACEKIT_BSP_MAX_QUEUE_SIZE";
/// Default maximum export queue size.
pub(crate) const DEFAULT_BSP_MAX_QUEUE_SIZE: usize = 2_048;
/// Maximum batch size, must be less than or equal to the max queue size.
pub(crate) const ENV_BSP_MAX_EXPORT_BATCH_SIZE: &str = "TRACEKIT_BSP_MAX_EXPORT_BATCH_SIZE";
/// Default maximum batch size.
pub(crate) const DEFAULT_BSP_MAX_EXPORT_BATCH_SIZE: usize = 512;
/// Maximum allowed time for flush and shutdown round trips.
pub(crate) const ENV_BSP_EXPORT_TIMEOUT: &str = "TRACEKIT_BSP_EXPORT_TIMEOUT";
/// Default maximum allowed time for flush and shutdown round trips.
pub(crate) const DEFAULT_BSP_EXPORT_TIMEOUT_MILLIS: u64 = 30_000;

const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// An observer of span lifecycle transitions.
///
/// `on_start` and `on_end` run synchronously on the thread that starts or
/// ends the span and must not block.
pub trait SpanProcessor: Send + Sync + std::fmt::Debug {
    /// Called when a recording span is started.
    fn on_start(&self, span: &mut Span, parent_cx: &Context);

    /// Called while a span is ending, after the end timestamp is frozen but
    /// before the span becomes immutable. The span's lock is held: the hook
    /// is the sole writer for the duration of the call.
    fn on_ending(&self, _span: &mut ReadWriteSpan<'_>) {}

    /// Called with an immutable snapshot after a span has ended.
    fn on_end(&self, span: SpanData);

    /// Export any buffered spans and report the outcome.
    fn force_flush(&self) -> SdkResult;

    /// Shut down the processor, flushing buffered spans first.
    ///
    /// Implementations must make repeat shutdowns cheap no-ops.
    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult;

    /// [`shutdown_with_timeout`](SpanProcessor::shutdown_with_timeout) with
    /// the default bound.
    fn shutdown(&self) -> SdkResult {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Whether this processor needs `on_start` callbacks. Queried once at
    /// registration.
    fn is_start_required(&self) -> bool {
        true
    }

    /// Whether this processor needs `on_ending`/`on_end` callbacks. Queried
    /// once at registration.
    fn is_end_required(&self) -> bool {
        true
    }

    /// Set the resource for the processor's exporter, if it has one.
    fn set_resource(&mut self, _resource: &Resource) {}
}

/// Compose a set of processors into one.
///
/// Zero processors yield a no-op; exactly one is returned unchanged; more
/// fan out per the children's capability flags.
pub(crate) fn composite(mut processors: Vec<Box<dyn SpanProcessor>>) -> Box<dyn SpanProcessor> {
    match processors.len() {
        0 => Box::new(NoopSpanProcessor::new()),
        1 => processors.remove(0),
        _ => Box::new(MultiSpanProcessor::new(processors)),
    }
}

/// A processor that observes nothing and requires nothing.
#[derive(Debug, Default)]
pub(crate) struct NoopSpanProcessor {
    _private: (),
}

impl NoopSpanProcessor {
    pub(crate) fn new() -> Self {
        NoopSpanProcessor::default()
    }
}

impl SpanProcessor for NoopSpanProcessor {
    fn on_start(&self, _span: &mut Span, _parent_cx: &Context) {}

    fn on_end(&self, _span: SpanData) {}

    fn force_flush(&self) -> SdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        Ok(())
    }

    fn is_start_required(&self) -> bool {
        false
    }

    fn is_end_required(&self) -> bool {
        false
    }
}

/// Fan-out over two or more registered processors.
#[derive(Debug)]
pub(crate) struct MultiSpanProcessor {
    children: Vec<RegisteredProcessor>,
    start_required: bool,
    end_required: bool,
}

/// A child processor with its capability flags captured at registration.
#[derive(Debug)]
struct RegisteredProcessor {
    processor: Box<dyn SpanProcessor>,
    start_required: bool,
    end_required: bool,
}

impl MultiSpanProcessor {
    pub(crate) fn new(processors: Vec<Box<dyn SpanProcessor>>) -> Self {
        let children: Vec<_> = processors
            .into_iter()
            .map(|processor| RegisteredProcessor {
                start_required: processor.is_start_required(),
                end_required: processor.is_end_required(),
                processor,
            })
            .collect();
        let start_required = children.iter().any(|c| c.start_required);
        let end_required = children.iter().any(|c| c.end_required);
        MultiSpanProcessor {
            children,
            start_required,
            end_required,
        }
    }

    fn combine(results: Vec<SdkResult>) -> SdkResult {
        if results.iter().all(|r| r.is_ok()) {
            Ok(())
        } else {
            let failures: Vec<_> = results.into_iter().filter_map(Result::err).collect();
            Err(SdkError::InternalFailure(format!(
                "{} processor(s) failed: {failures:?}",
                failures.len()
            )))
        }
    }
}

impl SpanProcessor for MultiSpanProcessor {
    fn on_start(&self, span: &mut Span, parent_cx: &Context) {
        for child in self.children.iter().filter(|c| c.start_required) {
            child.processor.on_start(span, parent_cx);
        }
    }

    fn on_ending(&self, span: &mut ReadWriteSpan<'_>) {
        for child in self.children.iter().filter(|c| c.end_required) {
            child.processor.on_ending(span);
        }
    }

    fn on_end(&self, span: SpanData) {
        let required: Vec<_> = self
            .children
            .iter()
            .filter(|c| c.end_required)
            .collect();
        if let Some((last, rest)) = required.split_last() {
            for child in rest {
                child.processor.on_end(span.clone());
            }
            last.processor.on_end(span);
        }
    }

    fn force_flush(&self) -> SdkResult {
        // flush goes to every child regardless of capability flags
        Self::combine(
            self.children
                .iter()
                .map(|c| c.processor.force_flush())
                .collect(),
        )
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        Self::combine(
            self.children
                .iter()
                .map(|c| c.processor.shutdown_with_timeout(timeout))
                .collect(),
        )
    }

    fn is_start_required(&self) -> bool {
        self.start_required
    }

    fn is_end_required(&self) -> bool {
        self.end_required
    }

    fn set_resource(&mut self, resource: &Resource) {
        for child in self.children.iter_mut() {
            child.processor.set_resource(resource);
        }
    }
}

/// A [`SpanProcessor`] that passes finished sampled spans to its exporter as
/// soon as they end, without batching.
///
/// Useful for debugging and testing; prefer [`BatchSpanProcessor`] for
/// throughput.
#[derive(Debug)]
pub struct SimpleSpanProcessor {
    exporter: Mutex<Box<dyn SpanExporter>>,
}

impl SimpleSpanProcessor {
    /// Create a new [`SimpleSpanProcessor`] using the provided exporter.
    pub fn new<E: SpanExporter + 'static>(exporter: E) -> Self {
        Self {
            exporter: Mutex::new(Box::new(exporter)),
        }
    }
}

impl SpanProcessor for SimpleSpanProcessor {
    fn on_start(&self, _span: &mut Span, _parent_cx: &Context) {
        // Ignored
    }

    fn on_end(&self, span: SpanData) {
        if !span.span_context.is_sampled() {
            return;
        }

        let result = self
            .exporter
            .lock()
            .map_err(SdkError::from)
            .and_then(|mut exporter| block_on(exporter.export(vec![span])));

        if let Err(err) = result {
            crate::sdk_debug!(
                name: "SimpleSpanProcessor.OnEnd.Error",
                reason = format!("{:?}", err)
            );
        }
    }

    fn force_flush(&self) -> SdkResult {
        self.exporter
            .lock()
            .map_err(SdkError::from)
            .and_then(|mut exporter| block_on(exporter.force_flush()))
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
        let mut exporter = self.exporter.lock().map_err(SdkError::from)?;
        exporter.shutdown();
        Ok(())
    }

    fn is_start_required(&self) -> bool {
        false
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut exporter) = self.exporter.lock() {
            exporter.set_resource(resource);
        }
    }
}

/// Messages exchanged between application threads and the export thread.
#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
enum BatchMessage {
    ExportSpan(SpanData),
    ForceFlush(SyncSender<SdkResult>),
    Shutdown(SyncSender<SdkResult>),
}

/// A [`SpanProcessor`] that queues ended spans and exports them in batches
/// from a dedicated background thread.
///
/// The queue is bounded: when full, newly ending spans are dropped and
/// counted rather than blocking the application thread. Batches go out when
/// `max_export_batch_size` spans are buffered, when the schedule delay
/// elapses, or on an explicit [`force_flush`](SpanProcessor::force_flush).
#[derive(Debug)]
pub struct BatchSpanProcessor {
    message_sender: SyncSender<BatchMessage>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    forceflush_timeout: Duration,
    is_shutdown: AtomicBool,
    dropped_span_count: Arc<AtomicUsize>,
}

impl BatchSpanProcessor {
    /// Creates a new `BatchSpanProcessor` exporting to `exporter`.
    pub fn new<E>(mut exporter: E, config: BatchConfig) -> Self
    where
        E: SpanExporter + 'static,
    {
        let (message_sender, message_receiver) = sync_channel(config.max_queue_size);
        let max_export_batch_size = config.max_export_batch_size;
        let scheduled_delay = config.scheduled_delay;

        let handle = thread::Builder::new()
            .name("tracekit-batch-span-processor".to_string())
            .spawn(move || {
                let mut spans: Vec<SpanData> = Vec::with_capacity(max_export_batch_size);
                let mut last_export_time = Instant::now();

                loop {
                    let timeout = scheduled_delay.saturating_sub(last_export_time.elapsed());
                    match message_receiver.recv_timeout(timeout) {
                        Ok(BatchMessage::ExportSpan(span)) => {
                            spans.push(span);
                            if spans.len() >= max_export_batch_size {
                                if let Err(err) =
                                    export_batches(&mut exporter, &mut spans, max_export_batch_size)
                                {
                                    crate::sdk_debug!(
                                        name: "BatchSpanProcessor.Export.Error",
                                        reason = format!("{err}")
                                    );
                                }
                                last_export_time = Instant::now();
                            }
                        }
                        Ok(BatchMessage::ForceFlush(sender)) => {
                            // every span enqueued before the flush request is
                            // already buffered here thanks to channel ordering
                            let result =
                                export_batches(&mut exporter, &mut spans, max_export_batch_size);
                            let _ = sender.send(result);
                            last_export_time = Instant::now();
                        }
                        Ok(BatchMessage::Shutdown(sender)) => {
                            let result =
                                export_batches(&mut exporter, &mut spans, max_export_batch_size);
                            exporter.shutdown();
                            let _ = sender.send(result);
                            break;
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            if let Err(err) =
                                export_batches(&mut exporter, &mut spans, max_export_batch_size)
                            {
                                crate::sdk_debug!(
                                    name: "BatchSpanProcessor.Export.Error",
                                    reason = format!("{err}")
                                );
                            }
                            last_export_time = Instant::now();
                        }
                        Err(RecvTimeoutError::Disconnected) => {
                            let _ = export_batches(&mut exporter, &mut spans, max_export_batch_size);
                            break;
                        }
                    }
                }
            })
            .expect("failed to spawn batch span processor thread");

        Self {
            message_sender,
            handle: Mutex::new(Some(handle)),
            forceflush_timeout: config.export_timeout,
            is_shutdown: AtomicBool::new(false),
            dropped_span_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a builder for a `BatchSpanProcessor` with the given exporter.
    pub fn builder<E>(exporter: E) -> BatchSpanProcessorBuilder<E>
    where
        E: SpanExporter + 'static,
    {
        BatchSpanProcessorBuilder {
            exporter,
            config: BatchConfig::default(),
        }
    }

    /// The number of spans dropped because the queue was full.
    pub fn dropped_span_count(&self) -> usize {
        self.dropped_span_count.load(Ordering::Relaxed)
    }

    /// [`force_flush`](SpanProcessor::force_flush) with a caller-supplied
    /// bound on the wait.
    pub fn force_flush_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.load(Ordering::Relaxed) {
            return Err(SdkError::AlreadyShutdown);
        }
        let (sender, receiver) = sync_channel(1);
        self.message_sender
            .try_send(BatchMessage::ForceFlush(sender))
            .map_err(|_| SdkError::InternalFailure("failed to send flush message".to_string()))?;

        receiver
            .recv_timeout(timeout)
            .map_err(|_| SdkError::Timeout(timeout))?
    }
}

fn export_batches(
    exporter: &mut dyn SpanExporter,
    spans: &mut Vec<SpanData>,
    max_export_batch_size: usize,
) -> SdkResult {
    let mut result = Ok(());
    while !spans.is_empty() {
        let split = spans.len().min(max_export_batch_size);
        let batch = spans.drain(..split).collect();
        if let Err(err) = block_on(exporter.export(batch)) {
            result = Err(err);
        }
    }
    result
}

impl SpanProcessor for BatchSpanProcessor {
    fn on_start(&self, _span: &mut Span, _parent_cx: &Context) {
        // Ignored
    }

    fn on_end(&self, span: SpanData) {
        if !span.span_context.is_sampled() {
            return;
        }
        if self.is_shutdown.load(Ordering::Relaxed) {
            return;
        }
        let result = self.message_sender.try_send(BatchMessage::ExportSpan(span));

        if result.is_err() {
            // Count the drop; warn only on the first one to avoid flooding.
            if self.dropped_span_count.fetch_add(1, Ordering::Relaxed) == 0 {
                crate::sdk_warn!(
                    name: "BatchSpanProcessor.SpanDroppingStarted",
                    message = "span export queue is full; dropping spans until the queue drains. \
                               The total dropped count is reported at shutdown."
                );
            }
        }
    }

    fn force_flush(&self) -> SdkResult {
        self.force_flush_with_timeout(self.forceflush_timeout)
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> SdkResult {
        if self.is_shutdown.swap(true, Ordering::Relaxed) {
            // repeat shutdowns are cheap no-ops
            return Ok(());
        }
        let dropped = self.dropped_span_count.load(Ordering::Relaxed);
        if dropped > 0 {
            crate::sdk_warn!(
                name: "BatchSpanProcessor.Shutdown.DroppedSpans",
                dropped_span_count = dropped
            );
        }
        let (sender, receiver) = sync_channel(1);
        self.message_sender
            .try_send(BatchMessage::Shutdown(sender))
            .map_err(|_| {
                SdkError::InternalFailure("failed to send shutdown message".to_string())
            })?;

        let result = receiver
            .recv_timeout(timeout)
            .map_err(|_| SdkError::Timeout(timeout))?;
        if let Ok(mut handle) = self.handle.lock() {
            if let Some(handle) = handle.take() {
                handle
                    .join()
                    .map_err(|_| SdkError::InternalFailure("export thread panicked".to_string()))?;
            }
        }
        result
    }

    fn is_start_required(&self) -> bool {
        false
    }
}

/// Builder for [`BatchSpanProcessor`].
#[derive(Debug)]
pub struct BatchSpanProcessorBuilder<E>
where
    E: SpanExporter + 'static,
{
    exporter: E,
    config: BatchConfig,
}

impl<E> BatchSpanProcessorBuilder<E>
where
    E: SpanExporter + 'static,
{
    /// Set the [`BatchConfig`] for the processor.
    pub fn with_batch_config(self, config: BatchConfig) -> Self {
        BatchSpanProcessorBuilder { config, ..self }
    }

    /// Build the [`BatchSpanProcessor`].
    pub fn build(self) -> BatchSpanProcessor {
        BatchSpanProcessor::new(self.exporter, self.config)
    }
}

/// Batch span processor configuration.
///
/// Use [`BatchConfigBuilder`] to configure your own instance.
#[derive(Debug)]
pub struct BatchConfig {
    /// Maximum queue size for spans awaiting export. When the queue is full
    /// newly ending spans are dropped.
    pub(crate) max_queue_size: usize,

    /// Delay between two consecutive scheduled exports.
    pub(crate) scheduled_delay: Duration,

    /// Maximum number of spans in a single export call. Excess buffered
    /// spans are exported in consecutive batches without delay.
    pub(crate) max_export_batch_size: usize,

    /// Bound on flush/shutdown round trips.
    pub(crate) export_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfigBuilder::default().build()
    }
}

/// A builder for creating [`BatchConfig`] instances.
#[derive(Debug)]
pub struct BatchConfigBuilder {
    max_queue_size: usize,
    scheduled_delay: Duration,
    max_export_batch_size: usize,
    export_timeout: Duration,
}

impl Default for BatchConfigBuilder {
    /// Default batch configuration, with overrides applied from the
    /// environment:
    /// * `TRACEKIT_BSP_MAX_QUEUE_SIZE`
    /// * `TRACEKIT_BSP_SCHEDULE_DELAY`
    /// * `TRACEKIT_BSP_MAX_EXPORT_BATCH_SIZE`
    /// * `TRACEKIT_BSP_EXPORT_TIMEOUT`
    fn default() -> Self {
        BatchConfigBuilder {
            max_queue_size: DEFAULT_BSP_MAX_QUEUE_SIZE,
            scheduled_delay: Duration::from_millis(DEFAULT_BSP_SCHEDULE_DELAY_MILLIS),
            max_export_batch_size: DEFAULT_BSP_MAX_EXPORT_BATCH_SIZE,
            export_timeout: Duration::from_millis(DEFAULT_BSP_EXPORT_TIMEOUT_MILLIS),
        }
        .init_from_env_vars()
    }
}

impl BatchConfigBuilder {
    /// Set the maximum queue size; spans are dropped when it is full.
    pub fn with_max_queue_size(mut self, max_queue_size: usize) -> Self {
        self.max_queue_size = max_queue_size;
        self
    }

    /// Set the maximum number of spans exported in one batch.
    pub fn with_max_export_batch_size(mut self, max_export_batch_size: usize) -> Self {
        self.max_export_batch_size = max_export_batch_size;
        self
    }

    /// Set the delay between two consecutive scheduled exports.
    pub fn with_scheduled_delay(mut self, scheduled_delay: Duration) -> Self {
        self.scheduled_delay = scheduled_delay;
        self
    }

    /// Set the bound on flush/shutdown round trips.
    pub fn with_export_timeout(mut self, export_timeout: Duration) -> Self {
        self.export_timeout = export_timeout;
        self
    }

    /// Build a [`BatchConfig`], clamping `max_export_batch_size` to
    /// `max_queue_size`.
    pub fn build(self) -> BatchConfig {
        let max_export_batch_size = self.max_export_batch_size.min(self.max_queue_size);

        BatchConfig {
            max_queue_size: self.max_queue_size,
            scheduled_delay: self.scheduled_delay,
            export_timeout: self.export_timeout,
            max_export_batch_size,
        }
    }

    fn init_from_env_vars(mut self) -> Self {
        if let Some(max_queue_size) = env::var(ENV_BSP_MAX_QUEUE_SIZE)
            .ok()
            .and_then(|queue_size| usize::from_str(&queue_size).ok())
        {
            self.max_queue_size = max_queue_size;
        }

        if let Some(scheduled_delay) = env::var(ENV_BSP_SCHEDULE_DELAY)
            .ok()
            .and_then(|delay| u64::from_str(&delay).ok())
        {
            self.scheduled_delay = Duration::from_millis(scheduled_delay);
        }

        if let Some(max_export_batch_size) = env::var(ENV_BSP_MAX_EXPORT_BATCH_SIZE)
            .ok()
            .and_then(|batch_size| usize::from_str(&batch_size).ok())
        {
            self.max_export_batch_size = max_export_batch_size;
        }

        if let Some(export_timeout) = env::var(ENV_BSP_EXPORT_TIMEOUT)
            .ok()
            .and_then(|timeout| u64::from_str(&timeout).ok())
        {
            self.export_timeout = Duration::from_millis(export_timeout);
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::trace::new_test_span_data;
    use crate::trace::{InMemorySpanExporter, SpanContext, SpanId, TraceFlags, TraceId};
    use futures_util::future::BoxFuture;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Condvar;

    fn sampled_span_data(name: &str) -> SpanData {
        let mut span = new_test_span_data();
        span.name = name.to_string().into();
        span.span_context = SpanContext::new(
            TraceId::from(1),
            SpanId::from(1),
            TraceFlags::SAMPLED,
            false,
            Default::default(),
        );
        span
    }

    #[test]
    fn simple_processor_exports_on_end() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());
        let span = sampled_span_data("simple");
        processor.on_end(span.clone());
        assert_eq!(exporter.get_finished_spans().unwrap(), vec![span]);
        processor.shutdown().unwrap();
    }

    #[test]
    fn simple_processor_skips_unsampled_spans() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());
        processor.on_end(new_test_span_data());
        assert!(exporter.get_finished_spans().unwrap().is_empty());
    }

    #[test]
    fn simple_processor_shutdown_is_clean() {
        let exporter = InMemorySpanExporter::default();
        let processor = SimpleSpanProcessor::new(exporter.clone());
        processor.on_end(sampled_span_data("span"));
        processor.shutdown().unwrap();
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[derive(Debug)]
    struct RecordingProcessor {
        name: &'static str,
        start_required: bool,
        end_required: bool,
        fail_flush: bool,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingProcessor {
        fn new(
            name: &'static str,
            start_required: bool,
            end_required: bool,
            calls: Arc<Mutex<Vec<String>>>,
        ) -> Self {
            RecordingProcessor {
                name,
                start_required,
                end_required,
                fail_flush: false,
                calls,
            }
        }

        fn record(&self, call: &str) {
            self.calls.lock().unwrap().push(format!("{call}:{}", self.name));
        }
    }

    impl SpanProcessor for RecordingProcessor {
        fn on_start(&self, _span: &mut Span, _parent_cx: &Context) {
            self.record("on_start");
        }

        fn on_end(&self, _span: SpanData) {
            self.record("on_end");
        }

        fn force_flush(&self) -> SdkResult {
            self.record("force_flush");
            if self.fail_flush {
                Err(SdkError::InternalFailure("flush failed".to_string()))
            } else {
                Ok(())
            }
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> SdkResult {
            self.record("shutdown");
            Ok(())
        }

        fn is_start_required(&self) -> bool {
            self.start_required
        }

        fn is_end_required(&self) -> bool {
            self.end_required
        }
    }

    #[test]
    fn composite_fans_out_per_capability_flags() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let multi = MultiSpanProcessor::new(vec![
            Box::new(RecordingProcessor::new("starts", true, false, calls.clone())),
            Box::new(RecordingProcessor::new("ends", false, true, calls.clone())),
        ]);
        assert!(multi.is_start_required());
        assert!(multi.is_end_required());

        multi.on_end(sampled_span_data("span"));

        let provider = crate::trace::SdkTracerProvider::builder().build();
        let mut span = provider.tracer("test").start("span", &Context::root());
        multi.on_start(&mut span, &Context::root());

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"on_end:ends".to_string()));
        assert!(!calls.contains(&"on_end:starts".to_string()));
        assert!(calls.contains(&"on_start:starts".to_string()));
        assert!(!calls.contains(&"on_start:ends".to_string()));
    }

    #[test]
    fn composite_flush_and_shutdown_reach_every_child() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let multi = MultiSpanProcessor::new(vec![
            Box::new(RecordingProcessor::new("a", true, false, calls.clone())),
            Box::new(RecordingProcessor::new("b", false, true, calls.clone())),
        ]);

        multi.force_flush().unwrap();
        multi.shutdown().unwrap();

        let calls = calls.lock().unwrap();
        for expected in [
            "force_flush:a",
            "force_flush:b",
            "shutdown:a",
            "shutdown:b",
        ] {
            assert!(calls.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn composite_flush_failure_does_not_stop_siblings() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut failing = RecordingProcessor::new("failing", true, true, calls.clone());
        failing.fail_flush = true;
        let multi = MultiSpanProcessor::new(vec![
            Box::new(failing),
            Box::new(RecordingProcessor::new("healthy", true, true, calls.clone())),
        ]);

        let result = multi.force_flush();
        assert!(result.is_err());

        let calls = calls.lock().unwrap();
        assert!(calls.contains(&"force_flush:healthy".to_string()));
    }

    #[test]
    fn composite_of_none_requires_nothing() {
        let noop = composite(Vec::new());
        assert!(!noop.is_start_required());
        assert!(!noop.is_end_required());
        assert!(noop.force_flush().is_ok());
        assert!(noop.shutdown().is_ok());
    }

    #[test]
    fn composite_of_one_behaves_like_the_child() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let single = composite(vec![Box::new(RecordingProcessor::new(
            "only",
            false,
            true,
            calls.clone(),
        ))]);
        assert!(!single.is_start_required());
        assert!(single.is_end_required());
        single.on_end(sampled_span_data("span"));
        assert_eq!(*calls.lock().unwrap(), vec!["on_end:only".to_string()]);
    }

    #[test]
    fn composite_end_required_is_or_of_children() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let multi = MultiSpanProcessor::new(vec![
            Box::new(RecordingProcessor::new("a", false, false, calls.clone())),
            Box::new(RecordingProcessor::new("b", false, false, calls.clone())),
        ]);
        assert!(!multi.is_start_required());
        assert!(!multi.is_end_required());
        multi.on_end(sampled_span_data("span"));
        assert!(calls.lock().unwrap().is_empty());
    }

    fn small_batch_config() -> BatchConfig {
        BatchConfigBuilder::default()
            .with_max_queue_size(10)
            .with_max_export_batch_size(10)
            .with_scheduled_delay(Duration::from_secs(5))
            .with_export_timeout(Duration::from_secs(2))
            .build()
    }

    #[test]
    fn batch_processor_force_flush_exports_queued_spans() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(exporter.clone(), small_batch_config());

        processor.on_end(sampled_span_data("flush_span"));
        processor.force_flush().unwrap();

        let exported = exporter.get_finished_spans().unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "flush_span");
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_processor_exports_when_batch_size_reached() {
        let exporter = InMemorySpanExporter::default();
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(10)
            .with_max_export_batch_size(2)
            .with_scheduled_delay(Duration::from_secs(3600))
            .build();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);

        processor.on_end(sampled_span_data("a"));
        processor.on_end(sampled_span_data("b"));

        // no flush requested; the batch threshold alone triggers the export
        let deadline = Instant::now() + Duration::from_secs(5);
        while exporter.get_finished_spans().unwrap().len() < 2 {
            assert!(Instant::now() < deadline, "batch was never exported");
            thread::sleep(Duration::from_millis(10));
        }
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_processor_exports_on_schedule() {
        let exporter = InMemorySpanExporter::default();
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(10)
            .with_max_export_batch_size(10)
            .with_scheduled_delay(Duration::from_millis(50))
            .build();
        let processor = BatchSpanProcessor::new(exporter.clone(), config);

        processor.on_end(sampled_span_data("scheduled"));

        let deadline = Instant::now() + Duration::from_secs(5);
        while exporter.get_finished_spans().unwrap().is_empty() {
            assert!(Instant::now() < deadline, "scheduled export never ran");
            thread::sleep(Duration::from_millis(10));
        }
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_processor_shutdown_flushes_and_is_idempotent() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(exporter.clone(), small_batch_config());

        processor.on_end(sampled_span_data("shutdown_span"));
        processor.shutdown().unwrap();

        let exported = exporter.get_finished_spans().unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "shutdown_span");

        // repeat shutdown is a cheap no-op, not an error
        assert!(processor.shutdown().is_ok());
        // spans ending after shutdown are ignored
        processor.on_end(sampled_span_data("late"));
        assert_eq!(exporter.get_finished_spans().unwrap().len(), 1);
    }

    #[test]
    fn batch_processor_skips_unsampled_spans() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(exporter.clone(), small_batch_config());
        processor.on_end(new_test_span_data());
        processor.force_flush().unwrap();
        assert!(exporter.get_finished_spans().unwrap().is_empty());
        processor.shutdown().unwrap();
    }

    #[test]
    fn batch_processor_flush_after_shutdown_errors() {
        let exporter = InMemorySpanExporter::default();
        let processor = BatchSpanProcessor::new(exporter, small_batch_config());
        processor.shutdown().unwrap();
        assert_eq!(processor.force_flush(), Err(SdkError::AlreadyShutdown));
    }

    #[derive(Debug, Default)]
    struct Gate {
        released: Mutex<bool>,
        condvar: Condvar,
    }

    impl Gate {
        fn release(&self) {
            *self.released.lock().unwrap() = true;
            self.condvar.notify_all();
        }

        fn wait(&self) {
            let mut released = self.released.lock().unwrap();
            while !*released {
                released = self.condvar.wait(released).unwrap();
            }
        }
    }

    /// An exporter that blocks inside `export` until the gate is released.
    #[derive(Debug)]
    struct BlockingExporter {
        exported: Arc<Mutex<Vec<SpanData>>>,
        export_calls: Arc<AtomicUsize>,
        gate: Arc<Gate>,
    }

    impl SpanExporter for BlockingExporter {
        fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
            self.export_calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.clone();
            let exported = self.exported.clone();
            Box::pin(async move {
                gate.wait();
                exported.lock().unwrap().extend(batch);
                Ok(())
            })
        }
    }

    #[test]
    fn batch_processor_drops_spans_when_queue_is_full() {
        let exported = Arc::new(Mutex::new(Vec::new()));
        let export_calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Gate::default());
        let exporter = BlockingExporter {
            exported: exported.clone(),
            export_calls: export_calls.clone(),
            gate: gate.clone(),
        };
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(1)
            .with_max_export_batch_size(1)
            .with_scheduled_delay(Duration::from_secs(3600))
            .with_export_timeout(Duration::from_secs(10))
            .build();
        let processor = BatchSpanProcessor::new(exporter, config);

        // The first span reaches the worker, which blocks inside export.
        processor.on_end(sampled_span_data("first"));
        let deadline = Instant::now() + Duration::from_secs(5);
        while export_calls.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "worker never started exporting");
            thread::sleep(Duration::from_millis(10));
        }

        // With the worker blocked, the queue (capacity 1) takes one more
        // span; the rest are dropped without blocking this thread.
        processor.on_end(sampled_span_data("second"));
        processor.on_end(sampled_span_data("third"));
        processor.on_end(sampled_span_data("fourth"));
        assert_eq!(processor.dropped_span_count(), 2);

        gate.release();

        // wait for the queue to drain so the shutdown message has room
        let deadline = Instant::now() + Duration::from_secs(5);
        while exported.lock().unwrap().len() < 2 {
            assert!(Instant::now() < deadline, "queued spans never exported");
            thread::sleep(Duration::from_millis(10));
        }
        processor.shutdown_with_timeout(Duration::from_secs(10)).unwrap();

        let exported = exported.lock().unwrap();
        let names: Vec<&str> = exported.iter().map(|s| s.name.as_ref()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn default_batch_config_values() {
        let env_vars = vec![
            ENV_BSP_SCHEDULE_DELAY,
            ENV_BSP_EXPORT_TIMEOUT,
            ENV_BSP_MAX_QUEUE_SIZE,
            ENV_BSP_MAX_EXPORT_BATCH_SIZE,
        ];

        let config = temp_env::with_vars_unset(env_vars, BatchConfig::default);

        assert_eq!(config.max_queue_size, DEFAULT_BSP_MAX_QUEUE_SIZE);
        assert_eq!(
            config.scheduled_delay,
            Duration::from_millis(DEFAULT_BSP_SCHEDULE_DELAY_MILLIS)
        );
        assert_eq!(
            config.max_export_batch_size,
            DEFAULT_BSP_MAX_EXPORT_BATCH_SIZE
        );
        assert_eq!(
            config.export_timeout,
            Duration::from_millis(DEFAULT_BSP_EXPORT_TIMEOUT_MILLIS)
        );
    }

    #[test]
    fn batch_config_configurable_by_env() {
        let env_vars = vec![
            (ENV_BSP_SCHEDULE_DELAY, Some("2000")),
            (ENV_BSP_EXPORT_TIMEOUT, Some("60000")),
            (ENV_BSP_MAX_QUEUE_SIZE, Some("4096")),
            (ENV_BSP_MAX_EXPORT_BATCH_SIZE, Some("1024")),
        ];

        let config = temp_env::with_vars(env_vars, BatchConfig::default);

        assert_eq!(config.scheduled_delay, Duration::from_millis(2000));
        assert_eq!(config.export_timeout, Duration::from_millis(60000));
        assert_eq!(config.max_queue_size, 4096);
        assert_eq!(config.max_export_batch_size, 1024);
    }

    #[test]
    fn batch_size_is_clamped_to_queue_size() {
        let config = BatchConfigBuilder::default()
            .with_max_queue_size(256)
            .with_max_export_batch_size(1024)
            .build();
        assert_eq!(config.max_queue_size, 256);
        assert_eq!(config.max_export_batch_size, 256);
    }
}
