//! Benchmarks for message search and pagination over long sessions.
//!
//! Uses 5,000 messages by default. Set `BENCH_FULL_SCALE=1` for 50,000.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hacxorz_chat::filter::evaluate;
use hacxorz_chat::pagination::PaginationWindow;
use hacxorz_chat::store::MessageStore;
use hacxorz_core::types::{Confidence, Message, SessionId};

const CI_MESSAGE_COUNT: usize = 5_000;
const FULL_SCALE_MESSAGE_COUNT: usize = 50_000;

fn message_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_MESSAGE_COUNT
    } else {
        CI_MESSAGE_COUNT
    }
}

/// Alternating user/assistant exchange with a handful of distinct topics.
fn build_messages(count: usize) -> Vec<Message> {
    let sid = SessionId::new();
    let topics = [
        "Is this news article about the election fake?",
        "How do I verify a screenshot of a tweet?",
        "Summarize the privacy policy of this app for me.",
        "What are common signs of a phishing email?",
        "Explain how you computed your confidence score.",
    ];
    (0..count)
        .map(|i| {
            let text = format!("{} (message {})", topics[i % topics.len()], i);
            if i % 2 == 0 {
                Message::user(sid, text)
            } else {
                Message::assistant(sid, text, Confidence::new((i % 100) as f64))
            }
        })
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let count = message_count();
    let messages = build_messages(count);

    let mut group = c.benchmark_group("filter_evaluate");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function(format!("common_term_{}msgs", count), |b| {
        b.iter(|| {
            let hits = evaluate(black_box(&messages), black_box("PHISHING"));
            assert!(!hits.is_empty());
            hits
        });
    });

    group.bench_function(format!("no_match_{}msgs", count), |b| {
        b.iter(|| evaluate(black_box(&messages), black_box("quantum entanglement")));
    });

    group.finish();
}

fn bench_pagination(c: &mut Criterion) {
    let count = message_count();
    let mut store = MessageStore::new();
    store.replace_all(Some(SessionId::new()), build_messages(count));

    c.bench_function(format!("page_through_{}msgs", count).as_str(), |b| {
        b.iter(|| {
            let mut window = PaginationWindow::new(20).expect("valid page size");
            window.observe(store.generation());
            while window.load_more(store.len()) {}
            window.visible_slice(store.messages()).len()
        });
    });
}

criterion_group!(benches, bench_evaluate, bench_pagination);
criterion_main!(benches);
