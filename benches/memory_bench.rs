//! Benchmarks for template rendering and conversation memory.

use std::collections::HashMap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use prompt_relay::memory::{ConversationId, ConversationMemory, MemoryConfig, MessageTurn};
use prompt_relay::prompt::library::movie_recommendation;
use prompt_relay::prompt::PromptTemplate;

fn bench_render(c: &mut Criterion) {
    let template = movie_recommendation();
    let values = HashMap::from([("type", "thriller"), ("year", "2010"), ("lang", "English")]);

    c.bench_function("render_movie_template", |b| {
        b.iter(|| black_box(template.render(black_box(&values)).unwrap()))
    });

    // 1,000 placeholders interleaved with text.
    let source: String = (0..1_000).map(|i| format!("field {i}: {{v{}}}\n", i % 10)).collect();
    let template = PromptTemplate::new(source);
    let values: HashMap<String, String> = (0..10).map(|i| (format!("v{i}"), "value".to_string())).collect();

    c.bench_function("render_1k_placeholders", |b| {
        b.iter(|| black_box(template.render(black_box(&values)).unwrap()))
    });
}

fn bench_append_at_capacity(c: &mut Criterion) {
    let memory = ConversationMemory::new(MemoryConfig { max_window_size: 20 }).unwrap();
    let id = ConversationId::from("bench");
    for i in 0..20 {
        memory.append(&id, MessageTurn::user(format!("warm-{i}")));
    }

    c.bench_function("append_evicting_window_20", |b| {
        b.iter(|| memory.append(black_box(&id), MessageTurn::user("turn")))
    });
}

fn bench_snapshot_many_conversations(c: &mut Criterion) {
    let memory = ConversationMemory::new(MemoryConfig { max_window_size: 20 }).unwrap();
    let ids: Vec<ConversationId> = (0..10_000).map(|i| ConversationId::from(format!("c{i}"))).collect();
    for id in &ids {
        for i in 0..20 {
            memory.append(id, MessageTurn::user(format!("turn-{i}")));
        }
    }

    c.bench_function("snapshot_from_10k_conversations", |b| {
        let mut next = 0;
        b.iter(|| {
            next = (next + 1) % ids.len();
            black_box(memory.snapshot(&ids[next]))
        })
    });
}

criterion_group!(
    benches,
    bench_render,
    bench_append_at_capacity,
    bench_snapshot_many_conversations,
);
criterion_main!(benches);
