//! Trace and span id generation.

use crate::trace::{SpanId, TraceId};
use rand::{rngs, Rng, SeedableRng};
use std::cell::RefCell;
use std::fmt;

/// Interface for generating trace and span ids.
///
/// Implementations must never return the all-zero ("invalid") id.
pub trait IdGenerator: Send + Sync + fmt::Debug {
    /// Generate a new `TraceId`.
    fn new_trace_id(&self) -> TraceId;

    /// Generate a new `SpanId`.
    fn new_span_id(&self) -> SpanId;
}

/// Default [`IdGenerator`] implementation.
///
/// Generates ids from a per-thread random number generator, discarding and
/// redrawing the (astronomically unlikely) all-zero candidate.
#[derive(Clone, Debug, Default)]
pub struct RandomIdGenerator {
    _private: (),
}

impl IdGenerator for RandomIdGenerator {
    fn new_trace_id(&self) -> TraceId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                let id = TraceId::from(rng.gen::<u128>());
                if id != TraceId::INVALID {
                    return id;
                }
            }
        })
    }

    fn new_span_id(&self) -> SpanId {
        CURRENT_RNG.with(|rng| {
            let mut rng = rng.borrow_mut();
            loop {
                let id = SpanId::from(rng.gen::<u64>());
                if id != SpanId::INVALID {
                    return id;
                }
            }
        })
    }
}

thread_local! {
    /// Store random number generator for each thread
    static CURRENT_RNG: RefCell<rngs::SmallRng> = RefCell::new(rngs::SmallRng::from_entropy());
}

pub use increment::IncrementIdGenerator;

mod increment {
    use crate::trace::{IdGenerator, SpanId, TraceId};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// [`IdGenerator`] implementation that increments a counter for each new
    /// id, producing predictable ids for testing.
    #[derive(Clone, Debug)]
    pub struct IncrementIdGenerator(Arc<AtomicU64>);

    impl IncrementIdGenerator {
        /// Create a new [`IncrementIdGenerator`] starting at 1.
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl Default for IncrementIdGenerator {
        fn default() -> Self {
            Self(Arc::new(AtomicU64::new(1)))
        }
    }

    impl IdGenerator for IncrementIdGenerator {
        fn new_trace_id(&self) -> TraceId {
            TraceId::from(self.0.fetch_add(1, Ordering::SeqCst) as u128)
        }

        fn new_span_id(&self) -> SpanId {
            SpanId::from(self.0.fetch_add(1, Ordering::SeqCst))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_ids_are_never_invalid() {
        let generator = RandomIdGenerator::default();
        for _ in 0..1000 {
            assert_ne!(generator.new_trace_id(), TraceId::INVALID);
            assert_ne!(generator.new_span_id(), SpanId::INVALID);
        }
    }

    #[test]
    fn increment_generator_is_predictable() {
        let generator = IncrementIdGenerator::new();
        assert_eq!(generator.new_trace_id(), TraceId::from(1u128));
        assert_eq!(generator.new_span_id(), SpanId::from(2u64));
        assert_eq!(generator.new_trace_id(), TraceId::from(3u128));
    }
}
