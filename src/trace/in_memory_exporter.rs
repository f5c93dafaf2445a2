//! An exporter that collects finished spans in memory.

use crate::error::{SdkError, SdkResult};
use crate::resource::Resource;
use crate::trace::{SpanData, SpanExporter};
use futures_util::future::BoxFuture;
use std::sync::{Arc, Mutex};

/// A span exporter that stores finished spans in memory.
///
/// Useful for testing and debugging. Clones share the same storage, so a
/// clone handed to the pipeline can be observed from the test body via
/// [`get_finished_spans`](InMemorySpanExporter::get_finished_spans).
#[derive(Clone, Debug)]
pub struct InMemorySpanExporter {
    spans: Arc<Mutex<Vec<SpanData>>>,
    resource: Arc<Mutex<Resource>>,
}

impl Default for InMemorySpanExporter {
    fn default() -> Self {
        InMemorySpanExporterBuilder::new().build()
    }
}

/// Builder for [`InMemorySpanExporter`].
#[derive(Clone, Debug, Default)]
pub struct InMemorySpanExporterBuilder {}

impl InMemorySpanExporterBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {}
    }

    /// Creates a new [`InMemorySpanExporter`].
    pub fn build(&self) -> InMemorySpanExporter {
        InMemorySpanExporter {
            spans: Arc::new(Mutex::new(Vec::new())),
            resource: Arc::new(Mutex::new(Resource::empty())),
        }
    }
}

impl InMemorySpanExporter {
    /// Returns the finished spans collected so far.
    pub fn get_finished_spans(&self) -> Result<Vec<SpanData>, SdkError> {
        self.spans
            .lock()
            .map(|spans| spans.clone())
            .map_err(SdkError::from)
    }

    /// Clears the collected spans.
    pub fn reset(&self) {
        let _ = self.spans.lock().map(|mut spans| spans.clear());
    }

    /// The resource most recently installed on this exporter.
    pub fn resource(&self) -> Result<Resource, SdkError> {
        self.resource
            .lock()
            .map(|resource| resource.clone())
            .map_err(SdkError::from)
    }
}

impl SpanExporter for InMemorySpanExporter {
    fn export(&mut self, mut batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
        let result = self
            .spans
            .lock()
            .map(|mut spans| spans.append(&mut batch))
            .map_err(SdkError::from);
        Box::pin(std::future::ready(result))
    }

    fn set_resource(&mut self, resource: &Resource) {
        if let Ok(mut guard) = self.resource.lock() {
            *guard = resource.clone();
        }
    }
}
