//! Tracer configuration.
//!
//! `Config` carries the sampler, id generator, clock, span limits and
//! resource shared by every tracer a provider creates. Overrides can be set
//! through the environment; the builder on
//! [`SdkTracerProvider`](crate::trace::SdkTracerProvider) wins over both.

use crate::resource::Resource;
use crate::time::{Clock, SystemClock};
use crate::trace::{IdGenerator, RandomIdGenerator, Sampler, ShouldSample, SpanLimits};
use std::borrow::Cow;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

const ENV_SPAN_ATTRIBUTE_COUNT_LIMIT: &str = "TRACEKIT_SPAN_ATTRIBUTE_COUNT_LIMIT";
const ENV_SPAN_EVENT_COUNT_LIMIT: &str = "TRACEKIT_SPAN_EVENT_COUNT_LIMIT";
const ENV_SPAN_LINK_COUNT_LIMIT: &str = "TRACEKIT_SPAN_LINK_COUNT_LIMIT";
const ENV_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT: &str = "TRACEKIT_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT";
const ENV_TRACES_SAMPLER: &str = "TRACEKIT_TRACES_SAMPLER";
const ENV_TRACES_SAMPLER_ARG: &str = "TRACEKIT_TRACES_SAMPLER_ARG";

/// Tracer configuration.
#[derive(Debug)]
#[non_exhaustive]
pub struct Config {
    /// The sampler consulted for every new span.
    pub sampler: Box<dyn ShouldSample>,

    /// The id generator for new trace/span ids.
    pub id_generator: Box<dyn IdGenerator>,

    /// The clock spans anchor against at creation.
    pub clock: Arc<dyn Clock>,

    /// Per-span collection limits.
    pub span_limits: SpanLimits,

    /// Attributes representing the entity producing telemetry.
    pub resource: Cow<'static, Resource>,
}

impl Default for Config {
    /// Default configuration, with overrides applied from the environment.
    fn default() -> Self {
        let mut config = Config {
            sampler: Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
            id_generator: Box::<RandomIdGenerator>::default(),
            clock: Arc::new(SystemClock::new()),
            span_limits: SpanLimits::default(),
            resource: Cow::Owned(Resource::empty()),
        };

        if let Some(max_attributes_per_span) = env::var(ENV_SPAN_ATTRIBUTE_COUNT_LIMIT)
            .ok()
            .and_then(|limit| u32::from_str(&limit).ok())
        {
            config.span_limits.max_attributes_per_span = max_attributes_per_span;
        }

        if let Some(max_events_per_span) = env::var(ENV_SPAN_EVENT_COUNT_LIMIT)
            .ok()
            .and_then(|limit| u32::from_str(&limit).ok())
        {
            config.span_limits.max_events_per_span = max_events_per_span;
        }

        if let Some(max_links_per_span) = env::var(ENV_SPAN_LINK_COUNT_LIMIT)
            .ok()
            .and_then(|limit| u32::from_str(&limit).ok())
        {
            config.span_limits.max_links_per_span = max_links_per_span;
        }

        if let Some(max_value_length) = env::var(ENV_SPAN_ATTRIBUTE_VALUE_LENGTH_LIMIT)
            .ok()
            .and_then(|limit| u32::from_str(&limit).ok())
        {
            config.span_limits.max_attribute_value_length = max_value_length;
        }

        let sampler_arg = env::var(ENV_TRACES_SAMPLER_ARG).ok();
        if let Ok(sampler) = env::var(ENV_TRACES_SAMPLER) {
            config.sampler = sampler_from_env(&sampler, sampler_arg.as_deref());
        }

        config
    }
}

fn sampler_from_env(name: &str, arg: Option<&str>) -> Box<dyn ShouldSample> {
    match name {
        "always_on" => Box::new(Sampler::AlwaysOn),
        "always_off" => Box::new(Sampler::AlwaysOff),
        "traceidratio" => Box::new(Sampler::TraceIdRatioBased(ratio_or_default(name, arg))),
        "parentbased_always_on" => Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn))),
        "parentbased_always_off" => Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOff))),
        "parentbased_traceidratio" => Box::new(Sampler::ParentBased(Box::new(
            Sampler::TraceIdRatioBased(ratio_or_default(name, arg)),
        ))),
        unknown => {
            crate::sdk_warn!(
                name: "Config.InvalidSamplerType",
                message = format!(
                    "unrecognized sampler {unknown:?} in {ENV_TRACES_SAMPLER}; valid values are \
                     always_on, always_off, traceidratio, parentbased_always_on, \
                     parentbased_always_off, parentbased_traceidratio; \
                     falling back to parentbased_always_on"
                )
            );
            Box::new(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        }
    }
}

fn ratio_or_default(name: &str, arg: Option<&str>) -> f64 {
    match arg.and_then(|r| r.parse::<f64>().ok()) {
        Some(ratio) => ratio,
        None => {
            crate::sdk_warn!(
                name: "Config.InvalidSamplerArgument",
                message = format!(
                    "{ENV_TRACES_SAMPLER} is set to {name:?} but {ENV_TRACES_SAMPLER_ARG} is \
                     missing or not a float; falling back to ratio 1.0"
                )
            );
            1.0
        }
    }
}
