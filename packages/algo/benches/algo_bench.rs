//! Benchmark suite for recall-algo
//!
//! Run with: cargo bench

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use recall_algo::{apply_review, select_due, MemoryState, Quality, QueueEntry, SchedulingPolicy};

#[derive(Clone)]
struct Candidate {
    id: String,
    due: DateTime<Utc>,
    ef: f64,
    fresh: bool,
}

impl QueueEntry for Candidate {
    fn entry_id(&self) -> &str {
        &self.id
    }
    fn due_at(&self) -> DateTime<Utc> {
        self.due
    }
    fn easiness(&self) -> f64 {
        self.ef
    }
    fn created_at(&self) -> DateTime<Utc> {
        self.due
    }
    fn is_unreviewed(&self) -> bool {
        self.fresh
    }
}

fn bench_apply_review(c: &mut Criterion) {
    let policy = SchedulingPolicy::default();
    let state = MemoryState {
        easiness_factor: 2.5,
        interval_days: 6,
        repetitions: 2,
        lapse_count: 0,
    };
    let now = Utc::now();
    c.bench_function("apply_review", |b| {
        b.iter(|| apply_review(black_box(&state), Quality::EASY, &policy, now))
    });
}

fn bench_select_due(c: &mut Criterion) {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candidates: Vec<Candidate> = (0..2000)
        .map(|i| Candidate {
            id: format!("w{i:05}"),
            due: now - Duration::minutes((i * 7919 % 10_000) as i64),
            ef: 1.3 + (i % 17) as f64 * 0.1,
            fresh: i % 5 == 0,
        })
        .collect();

    c.bench_function("select_due/2000", |b| {
        b.iter(|| select_due(black_box(candidates.clone()), now, 100, 20))
    });
}

criterion_group!(benches, bench_apply_review, bench_select_due);
criterion_main!(benches);
