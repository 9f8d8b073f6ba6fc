use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hitscheck_core::graph::GraphPair;
use hitscheck_rank::{RankVectors, reference_rank, top_k};

struct Tier {
    name: &'static str,
    vertices: usize,
    arcs: usize,
}

const TIERS: [Tier; 3] = [
    Tier {
        name: "small",
        vertices: 1_000,
        arcs: 8_000,
    },
    Tier {
        name: "medium",
        vertices: 20_000,
        arcs: 160_000,
    },
    Tier {
        name: "large",
        vertices: 100_000,
        arcs: 1_000_000,
    },
];

fn generate(tier: &Tier, seed: u64) -> GraphPair {
    let mut rng = StdRng::seed_from_u64(seed);
    let arcs = (0..tier.arcs).filter_map(|_| {
        let v = rng.gen_range(0..tier.vertices);
        let w = rng.gen_range(0..tier.vertices);
        (v != w).then_some((v, w))
    });
    let arcs: Vec<_> = arcs.collect();
    GraphPair::from_arcs(tier.vertices, arcs).expect("generated arcs are in range")
}

fn bench_reference(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference.hits");
    group.sample_size(10);

    for tier in &TIERS {
        let graph = generate(tier, 0x4175_u64 + tier.vertices as u64);
        group.throughput(Throughput::Elements(graph.view().num_arcs() as u64));

        group.bench_with_input(BenchmarkId::new("f64", tier.name), &graph, |b, g| {
            b.iter(|| {
                let ranks: RankVectors<f64> = reference_rank(g.view(), black_box(10));
                black_box(ranks)
            });
        });

        group.bench_with_input(BenchmarkId::new("f32", tier.name), &graph, |b, g| {
            b.iter(|| {
                let ranks: RankVectors<f32> = reference_rank(g.view(), black_box(10));
                black_box(ranks)
            });
        });
    }

    group.finish();
}

fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("reference.top_k");
    let mut rng = StdRng::seed_from_u64(7);

    for tier in &TIERS {
        let scores: Vec<f64> = (0..tier.vertices).map(|_| rng.gen_range(0.0..1.0)).collect();
        group.bench_with_input(BenchmarkId::new("k10", tier.name), &scores, |b, s| {
            b.iter(|| black_box(top_k(s, 10)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_reference, bench_top_k);
criterion_main!(benches);
