use criterion::{criterion_group, criterion_main, Criterion};
use tracekit::trace::{SdkTracerProvider, SpanLimits, Status};
use tracekit::{Context, KeyValue};

fn criterion_benchmark(c: &mut Criterion) {
    let provider = SdkTracerProvider::builder()
        .with_span_limits(SpanLimits::default())
        .build();
    let tracer = provider.tracer("bench");

    c.bench_function("start-end-span", |b| {
        b.iter(|| {
            let mut span = tracer.start("operation", &Context::root());
            span.end();
        })
    });

    c.bench_function("start-end-span-4-attrs", |b| {
        b.iter(|| {
            let mut span = tracer.start("operation", &Context::root());
            span.set_attribute(KeyValue::new("key1", false));
            span.set_attribute(KeyValue::new("key2", "hello"));
            span.set_attribute(KeyValue::new("key3", 123i64));
            span.set_attribute(KeyValue::new("key4", 123.456));
            span.end();
        })
    });

    c.bench_function("start-end-span-with-events", |b| {
        b.iter(|| {
            let mut span = tracer.start("operation", &Context::root());
            span.add_event("checkpoint", vec![KeyValue::new("step", 1i64)]);
            span.set_status(Status::Ok);
            span.end();
        })
    });

    c.bench_function("span-snapshot", |b| {
        let mut span = tracer.start("operation", &Context::root());
        span.set_attribute(KeyValue::new("key", "value"));
        b.iter(|| {
            let _ = span.to_span_data();
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
