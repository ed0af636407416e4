//! Hubbard ring at half filling: ground energy and charge gap against U.
//!
//! Run:
//!   RUST_LOG=phyz_ed=info cargo run --example hubbard_lanczos -p phyz-ed --release

use phyz_ed::{Block, Electron, LanczosParams, Op, OpSum, OpType, eigvals_lanczos};
use tracing_subscriber::EnvFilter;

fn hubbard(n: usize, u: f64) -> OpSum {
    let mut ops = OpSum::new();
    for i in 0..n {
        ops += (1.0, Op::new(OpType::Hop, [i, (i + 1) % n]).unwrap());
    }
    ops += (u, Op::new(OpType::HubbardU, Vec::new()).unwrap());
    ops
}

fn ground_energy(n: usize, n_up: usize, n_dn: usize, u: f64) -> f64 {
    let block: Block = Electron::with_np(n, n_up, n_dn).unwrap().into();
    eigvals_lanczos(&hubbard(n, u), &block, 1, &LanczosParams::default())
        .unwrap()
        .eigenvalues[0]
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let n = 8;
    let half = n / 2;
    eprintln!("=== Hubbard ring, {n} sites, half filling ===\n");

    // charge gap: E(N+1) + E(N-1) - 2 E(N)
    println!("U\tE0\tE0_per_site\tcharge_gap");
    for u in [0.0, 1.0, 2.0, 4.0, 8.0, 16.0] {
        let e0 = ground_energy(n, half, half, u);
        let plus = ground_energy(n, half + 1, half, u);
        let minus = ground_energy(n, half - 1, half, u);
        println!(
            "{u:.1}\t{e0:.10}\t{:.10}\t{:.6}",
            e0 / n as f64,
            plus + minus - 2.0 * e0
        );
    }
}
