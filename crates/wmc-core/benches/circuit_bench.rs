//! # Circuit Benchmarks
//!
//! Performance benchmarks for wmc-core evaluation.
//!
//! Run with: `cargo bench -p wmc-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use wmc_core::{
    Circuit, DagEvaluator, Evaluatable, Evaluator, EvidenceInput, Label, NodeId,
    ProbabilitySemiring, SymbolicSemiring,
};

/// Chain of exclusive disjunctions: `n_i = OR(x_i, AND(NOT x_i, n_{i-1}))`.
fn create_chain(size: usize) -> (Circuit, NodeId) {
    let mut circuit = Circuit::new();
    let mut prev = circuit.add_false();

    for _ in 0..size {
        let x = circuit.add_atom(0.01);
        let rest = circuit
            .add_and(vec![x.negative(), prev.positive()])
            .expect("and");
        prev = circuit
            .add_or(vec![x.positive(), rest.positive()])
            .expect("or");
    }

    (circuit, prev)
}

/// Ladder where every rung reuses both nodes of the previous rung.
fn create_ladder(size: usize) -> (Circuit, NodeId) {
    let mut circuit = Circuit::new();
    let a = circuit.add_atom(0.5);
    let b = circuit.add_atom(0.5);
    let mut left = a;
    let mut right = b;

    for _ in 0..size {
        let next_left = circuit
            .add_and(vec![left.positive(), right.negative()])
            .expect("and");
        let next_right = circuit
            .add_or(vec![left.positive(), right.positive()])
            .expect("or");
        left = next_left;
        right = next_right;
    }

    (circuit, right)
}

/// Many atoms queried by name, half of them also declared as evidence.
fn create_wide(size: usize) -> Circuit {
    let mut circuit = Circuit::new();
    let atoms: Vec<NodeId> = (0..size)
        .map(|i| circuit.add_atom(((i % 9) + 1) as f64 / 10.0))
        .collect();
    let all = circuit
        .add_or(atoms.iter().map(|a| a.positive()).collect())
        .expect("or");

    for (i, atom) in atoms.iter().enumerate() {
        circuit
            .add_name(format!("q{i}"), atom.positive(), Label::Query)
            .expect("name");
    }
    circuit
        .add_name("any", all.positive(), Label::EvidencePositive)
        .expect("name");
    circuit
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_propagate_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("propagate_chain");

    for size in [100, 1000, 10000].iter() {
        let (circuit, top) = create_chain(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut evaluator =
                    DagEvaluator::new(&circuit, ProbabilitySemiring).expect("evaluator");
                evaluator.add_evidence(top.positive());
                evaluator.propagate().expect("propagate");
                black_box(evaluator.z())
            });
        });
    }

    group.finish();
}

fn bench_shared_ladder(c: &mut Criterion) {
    let mut group = c.benchmark_group("shared_ladder");

    for size in [100, 1000, 10000].iter() {
        let (circuit, top) = create_ladder(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut evaluator =
                    DagEvaluator::new(&circuit, ProbabilitySemiring).expect("evaluator");
                evaluator.propagate().expect("propagate");
                black_box(evaluator.evaluate(top.positive()))
            });
        });
    }

    group.finish();
}

fn bench_conditioned_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("conditioned_queries");

    for size in [10, 100, 500].iter() {
        let circuit = create_wide(*size);
        let evidence = EvidenceInput::new().with("any", true);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(circuit.probabilities(Some(&evidence))));
        });
    }

    group.finish();
}

fn bench_symbolic(c: &mut Criterion) {
    let (circuit, top) = create_chain(50);

    c.bench_function("symbolic_chain_50", |b| {
        b.iter(|| {
            let mut evaluator = DagEvaluator::new(&circuit, SymbolicSemiring).expect("evaluator");
            evaluator.propagate().expect("propagate");
            black_box(evaluator.evaluate(top.positive()))
        });
    });
}

criterion_group!(
    benches,
    bench_propagate_chain,
    bench_shared_ladder,
    bench_conditioned_queries,
    bench_symbolic,
);
criterion_main!(benches);
