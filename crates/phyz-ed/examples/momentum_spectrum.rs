//! Lowest energy per momentum sector of the periodic Heisenberg chain.
//!
//! Run:
//!   cargo run --example momentum_spectrum -p phyz-ed --release

use num_complex::Complex64;
use phyz_ed::{
    Block, LanczosParams, Op, OpSum, OpType, Representation, Spinhalf, cyclic_group,
    eigvals_lanczos,
};
use std::f64::consts::TAU;

fn heisenberg(n: usize) -> OpSum {
    let mut ops = OpSum::new();
    for i in 0..n {
        ops += (1.0, Op::new(OpType::SdotS, [i, (i + 1) % n]).unwrap());
    }
    ops
}

fn main() {
    eprintln!("=== Heisenberg ring: E0(k) ===\n");

    let params = LanczosParams {
        precision: 1e-10,
        ..Default::default()
    };

    println!("n_sites\tk\tdim\tE0\tE0_per_site\titerations");
    for n in [8, 12, 16, 20] {
        let ops = heisenberg(n);
        let group = cyclic_group(n).unwrap();
        eprintln!("── n = {n} ──");
        for k in 0..n {
            let irrep = Representation::new(
                (0..n)
                    .map(|j| Complex64::from_polar(1.0, TAU * (k * j) as f64 / n as f64))
                    .collect(),
            );
            let block: Block = Spinhalf::symmetric_sz(n, n / 2, &group, &irrep)
                .unwrap()
                .into();
            if block.size() == 0 {
                continue;
            }
            let result = eigvals_lanczos(&ops, &block, 1, &params).unwrap();
            let e0 = result.eigenvalues[0];
            println!(
                "{n}\t{k}\t{}\t{e0:.10}\t{:.10}\t{}",
                block.size(),
                e0 / n as f64,
                result.n_iterations
            );
        }
        println!();
    }
}
