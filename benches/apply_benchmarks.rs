//! Benchmark suite for the decision diagram engine, grounded on
//! `espresso-logic/benches/pla_benchmarks.rs`'s shape (one `criterion_group`
//! per benchmarked operation, parameterised with `BenchmarkId`/`Throughput`).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use teddy_mdd::reliability::{self, ProbabilityTable};
use teddy_mdd::{Fold, Manager, Op};

const VAR_COUNTS: [usize; 4] = [8, 12, 16, 20];

/// Builds `(x0 op x1) op (x2 op x3) op ...` as a balanced tree over
/// `var_count` variables, alternating `And`/`Or` by level — the same shape
/// scenario S1/S6 use, scaled up.
fn build_balanced(manager: &Manager, var_count: usize) -> teddy_mdd::Diagram {
    let vars: Vec<_> = (0..var_count).map(|i| manager.variable(i).unwrap()).collect();
    manager.fold(Op::And, &vars[..var_count / 2], Fold::Tree).and_then(|lhs| {
        manager
            .fold(Op::Or, &vars[var_count / 2..], Fold::Tree)
            .and_then(|rhs| manager.apply(Op::Xor, &lhs, &rhs))
    })
    .unwrap()
}

fn bench_apply_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_balanced_tree");
    for &n in &VAR_COUNTS {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("and_or_xor", n), &n, |b, &n| {
            b.iter(|| {
                let manager = Manager::new_bdd(n, None).unwrap();
                let f = build_balanced(&manager, n);
                black_box(f);
            });
        });
    }
    group.finish();
}

fn bench_satisfy_count(c: &mut Criterion) {
    let mut group = c.benchmark_group("satisfy_count");
    for &n in &VAR_COUNTS {
        let manager = Manager::new_bdd(n, None).unwrap();
        let f = build_balanced(&manager, n);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("count_ones", n), &n, |b, _| {
            b.iter(|| black_box(manager.satisfy_count(&f, 1).unwrap()));
        });
    }
    group.finish();
}

fn bench_sift(c: &mut Criterion) {
    let mut group = c.benchmark_group("sift");
    for &n in &VAR_COUNTS {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("single_pass", n), &n, |b, &n| {
            b.iter(|| {
                let manager = Manager::new_bdd(n, None).unwrap();
                let f = build_balanced(&manager, n);
                black_box(&f);
                manager.force_sift();
                black_box(manager.node_count(&f).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_reliability_probability(c: &mut Criterion) {
    let mut group = c.benchmark_group("reliability_probability");
    for &n in &VAR_COUNTS {
        let manager = Manager::new_bdd(n, None).unwrap();
        let f = build_balanced(&manager, n);
        let table = ProbabilityTable::new(&manager, vec![vec![0.5, 0.5]; n]).unwrap();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("one_shot", n), &n, |b, _| {
            b.iter(|| black_box(reliability::probability(&manager, &f, &table, 1).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_apply_tree,
    bench_satisfy_count,
    bench_sift,
    bench_reliability_probability
);
criterion_main!(benches);
