//! Criterion microbenches for the per-topology stages (group "topology").
//!
//! - Trajectory enumeration on the six-port, five-beamsplitter circuit.
//! - Amplitude and truth matrices on a four-port circuit that passes the sift.
//! - Full deviation including the sift gate.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use optigraph::prelude::*;
use optigraph::topology::enumerate_trajectories;

fn six_port() -> Topology {
    let edges = vec![10, 15, 4, 6, 8, 11, 9, 14, 12, 13, 0, 5, 2, 3, 7, 1];
    Topology::new(6, ElementCounts::new(5, 0, 0), edges).unwrap()
}

fn four_port() -> Topology {
    let edges = vec![2, 4, 6, 7, 8, 9, 0, 1, 3, 5];
    Topology::new(4, ElementCounts::new(3, 0, 0), edges).unwrap()
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology");
    let t6 = six_port();
    group.bench_function("trajectories_p6_q5", |b| {
        b.iter(|| enumerate_trajectories(black_box(&t6)).unwrap())
    });

    let mut t4 = four_port();
    t4.trajectories().unwrap();
    group.bench_function("amplitude_matrix_p4_q3", |b| {
        b.iter(|| black_box(&mut t4).amplitude_matrix().unwrap())
    });
    group.bench_function("truth_matrix_p4_q3", |b| {
        b.iter(|| black_box(&mut t4).truth_matrix().unwrap())
    });
    group.bench_function("deviation_cold_cache", |b| {
        b.iter_batched(four_port, |mut t| t.deviation(), BatchSize::SmallInput)
    });
    group.finish();
}

criterion_group!(benches, bench_stages);
criterion_main!(benches);
