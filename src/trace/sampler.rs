//! Sampling decisions for newly created spans.

use crate::common::KeyValue;
use crate::context::Context;
use crate::trace::{Link, SpanKind, TraceId, TraceState};

/// A sampling decision for a span about to be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingDecision {
    /// The span is neither recorded nor exported; it is effectively a no-op.
    Drop,
    /// The span records attributes, events and links locally but is not
    /// marked sampled, so downstream children see an unsampled parent.
    RecordOnly,
    /// The span is fully recorded and marked sampled for export.
    RecordAndSample,
}

/// The result of a sampler invocation.
#[derive(Clone, Debug)]
pub struct SamplingResult {
    /// The decision about whether or not to record/sample.
    pub decision: SamplingDecision,
    /// Extra attributes the sampler contributes to the new span.
    ///
    /// These are applied before builder-supplied attributes, so explicit
    /// builder attributes win on key collision.
    pub attributes: Vec<KeyValue>,
    /// The trace state to install on the new span's context; samplers may
    /// rewrite the parent state here.
    pub trace_state: TraceState,
}

/// The interface samplers implement.
///
/// `should_sample` must be a pure function of its arguments: samplers can be
/// swapped at runtime without affecting spans created under a prior sampler.
pub trait ShouldSample: CloneShouldSample + Send + Sync + std::fmt::Debug {
    /// Returns the [`SamplingResult`] for a span about to be created.
    fn should_sample(
        &self,
        parent_context: &Context,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult;
}

/// Object-safe cloning support for boxed samplers. Use [`ShouldSample`]
/// directly instead of this trait.
pub trait CloneShouldSample {
    /// Box-clone this sampler.
    fn box_clone(&self) -> Box<dyn ShouldSample>;
}

impl<T> CloneShouldSample for T
where
    T: ShouldSample + Clone + 'static,
{
    fn box_clone(&self) -> Box<dyn ShouldSample> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ShouldSample> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Built-in samplers covering the common decisions.
///
/// For more complex strategies implement [`ShouldSample`] directly.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Sampler {
    /// Always sample.
    AlwaysOn,
    /// Never sample.
    AlwaysOff,
    /// Respect the parent span's sampling decision, delegating to the inner
    /// sampler for root spans.
    ParentBased(Box<dyn ShouldSample>),
    /// Sample the given fraction of traces, keyed off the trace id so an
    /// entire trace samples consistently. Fractions >= 1 always sample,
    /// fractions <= 0 never do.
    TraceIdRatioBased(f64),
}

impl ShouldSample for Sampler {
    fn should_sample(
        &self,
        parent_context: &Context,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let decision = match self {
            Sampler::AlwaysOn => SamplingDecision::RecordAndSample,
            Sampler::AlwaysOff => SamplingDecision::Drop,
            Sampler::ParentBased(delegate) => match parent_context.span_context() {
                Some(parent) if parent.is_valid() => {
                    if parent.is_sampled() {
                        SamplingDecision::RecordAndSample
                    } else {
                        SamplingDecision::Drop
                    }
                }
                _ => {
                    delegate
                        .should_sample(
                            parent_context,
                            trace_id,
                            name,
                            span_kind,
                            attributes,
                            links,
                        )
                        .decision
                }
            },
            Sampler::TraceIdRatioBased(fraction) => {
                sample_based_on_probability(*fraction, trace_id)
            }
        };

        SamplingResult {
            decision,
            // The built-in samplers never contribute attributes.
            attributes: Vec::new(),
            // The built-in samplers pass the parent trace state through
            // unmodified.
            trace_state: parent_context
                .span_context()
                .map(|sc| sc.trace_state().clone())
                .unwrap_or_default(),
        }
    }
}

fn sample_based_on_probability(fraction: f64, trace_id: TraceId) -> SamplingDecision {
    if fraction >= 1.0 {
        return SamplingDecision::RecordAndSample;
    }
    let upper_bound = (fraction.max(0.0) * (1u64 << 63) as f64) as u64;
    // Use the low 63 bits of the trace id as the randomness source so every
    // participant in a trace reaches the same decision.
    let bytes = trace_id.to_bytes();
    let (_, low) = bytes.split_at(8);
    let trace_id_low = u64::from_be_bytes(low.try_into().expect("8 byte slice"));
    if (trace_id_low >> 1) < upper_bound {
        SamplingDecision::RecordAndSample
    } else {
        SamplingDecision::Drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{SpanContext, SpanId, TraceFlags};
    use rand::Rng;

    fn parent(sampled: bool) -> Context {
        Context::with_span_context(SpanContext::new(
            TraceId::from(1),
            SpanId::from(1),
            TraceFlags::default().with_sampled(sampled),
            false,
            TraceState::default(),
        ))
    }

    fn random_trace_id() -> TraceId {
        TraceId::from(rand::thread_rng().gen::<u128>())
    }

    fn sample(sampler: &Sampler, cx: &Context) -> SamplingDecision {
        sampler
            .should_sample(
                cx,
                random_trace_id(),
                "test",
                &SpanKind::Internal,
                &[],
                &[],
            )
            .decision
    }

    #[test]
    fn always_on_and_off() {
        assert_eq!(
            sample(&Sampler::AlwaysOn, &Context::root()),
            SamplingDecision::RecordAndSample
        );
        assert_eq!(
            sample(&Sampler::AlwaysOff, &Context::root()),
            SamplingDecision::Drop
        );
    }

    #[test]
    fn parent_based_follows_parent() {
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOff));
        assert_eq!(
            sample(&sampler, &parent(true)),
            SamplingDecision::RecordAndSample
        );
        assert_eq!(sample(&sampler, &parent(false)), SamplingDecision::Drop);
    }

    #[test]
    fn parent_based_delegates_for_roots() {
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOn));
        assert_eq!(
            sample(&sampler, &Context::root()),
            SamplingDecision::RecordAndSample
        );
        let sampler = Sampler::ParentBased(Box::new(Sampler::AlwaysOff));
        assert_eq!(sample(&sampler, &Context::root()), SamplingDecision::Drop);
    }

    #[test]
    fn ratio_extremes() {
        assert_eq!(
            sample(&Sampler::TraceIdRatioBased(1.0), &Context::root()),
            SamplingDecision::RecordAndSample
        );
        assert_eq!(
            sample(&Sampler::TraceIdRatioBased(0.0), &Context::root()),
            SamplingDecision::Drop
        );
        // negative fractions behave like zero
        assert_eq!(
            sample(&Sampler::TraceIdRatioBased(-1.0), &Context::root()),
            SamplingDecision::Drop
        );
    }

    #[test]
    fn ratio_is_approximately_honored() {
        let sampler = Sampler::TraceIdRatioBased(0.5);
        let total = 10_000;
        let sampled = (0..total)
            .filter(|_| sample(&sampler, &Context::root()) == SamplingDecision::RecordAndSample)
            .count();
        let ratio = sampled as f64 / total as f64;
        assert!((0.45..0.55).contains(&ratio), "observed ratio {ratio}");
    }

    #[test]
    fn ratio_decision_is_deterministic_per_trace_id() {
        let sampler = Sampler::TraceIdRatioBased(0.5);
        let trace_id = random_trace_id();
        let first = sampler
            .should_sample(
                &Context::root(),
                trace_id,
                "test",
                &SpanKind::Internal,
                &[],
                &[],
            )
            .decision;
        for _ in 0..10 {
            let again = sampler
                .should_sample(
                    &Context::root(),
                    trace_id,
                    "test",
                    &SpanKind::Internal,
                    &[],
                    &[],
                )
                .decision;
            assert_eq!(first, again);
        }
    }

    #[test]
    fn built_in_samplers_pass_parent_trace_state_through() {
        let state = TraceState::from_key_value(vec![("foo", "bar")]).unwrap();
        let cx = Context::with_span_context(SpanContext::new(
            TraceId::from(1),
            SpanId::from(1),
            TraceFlags::SAMPLED,
            false,
            state.clone(),
        ));
        let result = Sampler::AlwaysOn.should_sample(
            &cx,
            random_trace_id(),
            "test",
            &SpanKind::Internal,
            &[],
            &[],
        );
        assert_eq!(result.trace_state, state);
    }
}
