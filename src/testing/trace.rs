//! Test helpers for the trace signal.

use crate::error::SdkResult;
use crate::time::Clock;
use crate::trace::{
    SpanContext, SpanData, SpanEvents, SpanExporter, SpanId, SpanKind, SpanLinks, Status,
};
use futures_util::future::BoxFuture;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// A [`Clock`] whose wall and monotonic readings are set by the test.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<ManualClockState>,
}

#[derive(Debug, Clone, Copy)]
struct ManualClockState {
    wall_time: SystemTime,
    monotonic_nanos: u64,
}

impl Default for ManualClock {
    fn default() -> Self {
        ManualClock::new(UNIX_EPOCH, 0)
    }
}

impl ManualClock {
    /// Create a manual clock with the given initial readings.
    pub fn new(wall_time: SystemTime, monotonic_nanos: u64) -> Self {
        ManualClock {
            state: Mutex::new(ManualClockState {
                wall_time,
                monotonic_nanos,
            }),
        }
    }

    /// Set the wall clock reading (simulating a clock step).
    pub fn set_wall_time(&self, wall_time: SystemTime) {
        if let Ok(mut state) = self.state.lock() {
            state.wall_time = wall_time;
        }
    }

    /// Set the monotonic reading.
    pub fn set_monotonic_nanos(&self, monotonic_nanos: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.monotonic_nanos = monotonic_nanos;
        }
    }

    /// Advance the monotonic reading.
    pub fn advance_nanos(&self, delta: u64) {
        if let Ok(mut state) = self.state.lock() {
            state.monotonic_nanos += delta;
        }
    }
}

impl Clock for ManualClock {
    fn wall_time(&self) -> SystemTime {
        self.state
            .lock()
            .map(|state| state.wall_time)
            .unwrap_or(UNIX_EPOCH)
    }

    fn monotonic_nanos(&self) -> u64 {
        self.state
            .lock()
            .map(|state| state.monotonic_nanos)
            .unwrap_or(0)
    }
}

/// An exporter that accepts and discards everything.
#[derive(Debug, Default)]
pub struct NoopSpanExporter {
    _private: (),
}

impl NoopSpanExporter {
    /// Create a new no-op exporter.
    pub fn new() -> Self {
        NoopSpanExporter::default()
    }
}

impl SpanExporter for NoopSpanExporter {
    fn export(&mut self, _batch: Vec<SpanData>) -> BoxFuture<'static, SdkResult> {
        Box::pin(std::future::ready(Ok(())))
    }
}

/// A finished-span snapshot with placeholder content.
pub fn new_test_span_data() -> SpanData {
    SpanData {
        span_context: SpanContext::empty_context(),
        parent_span_id: SpanId::INVALID,
        parent_span_is_remote: false,
        span_kind: SpanKind::Internal,
        name: "test-span".into(),
        start_time: UNIX_EPOCH,
        end_time: UNIX_EPOCH,
        attributes: Vec::new(),
        total_recorded_attributes: 0,
        events: new_span_events(),
        links: new_span_links(),
        status: Status::Unset,
        instrumentation_scope: Default::default(),
    }
}

/// An empty event list with the default capacity.
pub fn new_span_events() -> SpanEvents {
    SpanEvents::with_capacity(128)
}

/// An empty link list with the default capacity.
pub fn new_span_links() -> SpanLinks {
    SpanLinks::with_capacity(128)
}
