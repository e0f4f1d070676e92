use criterion::{Criterion, black_box, criterion_group, criterion_main};
use treeclock_core::Stamp;

/// Fork a stamp into `2^depth` leaves, left to right.
fn fork_n(stamp: Stamp, depth: u32) -> Vec<Stamp> {
    if depth == 0 {
        return vec![stamp];
    }
    let (l, r) = stamp.fork();
    let mut result = fork_n(l, depth - 1);
    result.extend(fork_n(r, depth - 1));
    result
}

/// A realistic mid-life stamp: 16 peers, uneven work, partially merged.
fn worked_stamp() -> Stamp {
    let mut agents = fork_n(Stamp::seed(), 4);
    for (i, agent) in agents.iter_mut().enumerate() {
        for _ in 0..=(i % 5) {
            agent.event().expect("event");
        }
    }
    let mut merged = agents[0].clone();
    for agent in &agents[1..8] {
        merged = Stamp::join(&merged, agent).expect("join");
    }
    merged
}

fn bench_stamp_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamp");

    let stamp = worked_stamp();
    let (left, right) = stamp.fork();
    let bytes = stamp.to_bytes();

    group.bench_function("fork", |b| b.iter(|| black_box(stamp.fork())));

    group.bench_function("event", |b| {
        b.iter(|| {
            let mut s = left.clone();
            s.event().expect("event");
            black_box(s)
        });
    });

    group.bench_function("join", |b| {
        b.iter(|| black_box(Stamp::join(&left, &right).expect("join")));
    });

    group.bench_function("compare", |b| {
        b.iter(|| black_box(left.compare(&right).expect("compare")));
    });

    group.bench_function("to_bytes", |b| b.iter(|| black_box(stamp.to_bytes())));

    group.bench_function("from_bytes", |b| {
        b.iter(|| black_box(Stamp::from_bytes(&bytes).expect("decode")));
    });

    group.finish();
}

criterion_group!(benches, bench_stamp_operations);
criterion_main!(benches);
