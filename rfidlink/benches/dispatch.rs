use std::sync::Arc;

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rfidlink::{EventDispatcher, EventSink, ReaderEvent, TagReadEvent};

struct Discard;

impl EventSink for Discard {
    fn deliver(&self, event: ReaderEvent) -> bool {
        black_box(event);
        true
    }
}

fn tag_batch(len: usize) -> Vec<TagReadEvent> {
    (0..len)
        .map(|i| TagReadEvent::new(format!("E28011C1A50000{:010X}", i), -55, 1, 1).unwrap())
        .collect()
}

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Elements(1));

    let dispatcher = EventDispatcher::new();
    dispatcher.subscribe(Arc::new(Discard));

    group.bench_function("trigger", |b| {
        b.iter(|| dispatcher.publish(ReaderEvent::Trigger { pressed: true }))
    });

    let tags = tag_batch(100);
    group.bench_function("tag_batch_100", |b| {
        b.iter_batched(
            || ReaderEvent::TagRead { tags: tags.clone() },
            |event| dispatcher.publish(event),
            BatchSize::SmallInput,
        )
    });

    let unsubscribed = EventDispatcher::new();
    group.bench_function("no_subscriber", |b| {
        b.iter(|| unsubscribed.publish(ReaderEvent::Disconnected))
    });

    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let dispatcher = EventDispatcher::new();
    let mut rx = dispatcher.subscribe_channel();

    c.bench_function("dispatch/channel_roundtrip", |b| {
        b.iter(|| {
            dispatcher.publish(ReaderEvent::Trigger { pressed: false });
            rx.try_recv().unwrap()
        })
    });
}

criterion_group!(benches, bench_publish, bench_channel);
criterion_main!(benches);
