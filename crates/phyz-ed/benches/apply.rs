//! Matrix-free multiply and Lanczos on spin and t-J chains.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::DVector;
use num_complex::Complex64;
use phyz_ed::{
    Block, LanczosParams, Op, OpSum, OpType, Operator, Representation, Spinhalf, Tj,
    cyclic_group, eigvals_lanczos,
};

fn ring(n: usize, terms: &[(f64, OpType)]) -> OpSum {
    let mut ops = OpSum::new();
    for i in 0..n {
        for &(c, kind) in terms {
            ops += (c, Op::new(kind, [i, (i + 1) % n]).unwrap());
        }
    }
    ops
}

fn benchmark_apply_spinhalf(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_spinhalf");
    group.sample_size(20);

    for n in [12, 16, 20] {
        let ops = ring(n, &[(1.0, OpType::SdotS)]);

        group.bench_with_input(BenchmarkId::new("plain", n), &n, |b, &n| {
            let block: Block = Spinhalf::with_sz(n, n / 2).unwrap().into();
            let op = Operator::<f64>::on(&ops, &block).unwrap();
            let v = DVector::from_element(block.size(), 1.0);
            let mut w = DVector::zeros(block.size());
            b.iter(|| {
                op.apply(&v, &mut w).unwrap();
                black_box(w[0]);
            });
        });

        group.bench_with_input(BenchmarkId::new("momentum", n), &n, |b, &n| {
            let g = cyclic_group(n).unwrap();
            let phase = std::f64::consts::TAU / n as f64;
            let irrep = Representation::new(
                (0..n)
                    .map(|j| Complex64::from_polar(1.0, phase * j as f64))
                    .collect(),
            );
            let block: Block = Spinhalf::symmetric_sz(n, n / 2, &g, &irrep).unwrap().into();
            let op = Operator::<Complex64>::on(&ops, &block).unwrap();
            let v = DVector::from_element(block.size(), Complex64::new(1.0, 0.0));
            let mut w = DVector::zeros(block.size());
            b.iter(|| {
                op.apply(&v, &mut w).unwrap();
                black_box(w[0]);
            });
        });
    }

    group.finish();
}

fn benchmark_apply_tj(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply_tj");
    group.sample_size(20);

    for n in [10, 12, 14] {
        let ops = ring(n, &[(1.0, OpType::Hop), (0.4, OpType::TjSdotS)]);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let block: Block = Tj::new(n, n / 3, n / 3).unwrap().into();
            let op = Operator::<f64>::on(&ops, &block).unwrap();
            let v = DVector::from_element(block.size(), 1.0);
            let mut w = DVector::zeros(block.size());
            b.iter(|| {
                op.apply(&v, &mut w).unwrap();
                black_box(w[0]);
            });
        });
    }

    group.finish();
}

fn benchmark_lanczos(c: &mut Criterion) {
    let mut group = c.benchmark_group("lanczos_ground_state");
    group.sample_size(10);

    for n in [12, 16] {
        let ops = ring(n, &[(1.0, OpType::SdotS)]);
        let block: Block = Spinhalf::with_sz(n, n / 2).unwrap().into();
        let params = LanczosParams::default();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(eigvals_lanczos(&ops, &block, 1, &params).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_apply_spinhalf, benchmark_apply_tj, benchmark_lanczos);
criterion_main!(benches);
