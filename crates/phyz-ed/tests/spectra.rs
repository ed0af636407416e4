//! Hermiticity and spectrum equivalence of symmetry-reduced blocks.

use num_complex::Complex64;
use phyz_ed::{
    Block, EdError, Electron, Op, OpSum, OpType, Permutation, PermutationGroup, Representation,
    Spinhalf, Tj, cyclic_group, generated_group, matrix_on,
};
use phyz_math::{eigvals_sym, is_hermitian};
use std::f64::consts::PI;

fn ring(n: usize, terms: &[(f64, OpType)]) -> OpSum {
    let mut ops = OpSum::new();
    for i in 0..n {
        for &(c, kind) in terms {
            ops += (c, Op::new(kind, [i, (i + 1) % n]).unwrap());
        }
    }
    ops
}

fn heisenberg(n: usize) -> OpSum {
    ring(n, &[(1.0, OpType::SdotS)])
}

fn tj_chain(n: usize) -> OpSum {
    ring(n, &[(1.0, OpType::Hop), (0.4, OpType::TjSdotS)])
}

fn hubbard(n: usize, u: f64) -> OpSum {
    let mut ops = ring(n, &[(1.0, OpType::Hop)]);
    ops += (u, Op::new(OpType::HubbardU, Vec::new()).unwrap());
    ops
}

fn momentum(n: usize, k: usize) -> Representation {
    Representation::new(
        (0..n)
            .map(|j| Complex64::from_polar(1.0, 2.0 * PI * (k * j) as f64 / n as f64))
            .collect(),
    )
}

fn spectrum(ops: &OpSum, block: &Block) -> Vec<f64> {
    if block.size() == 0 {
        return Vec::new();
    }
    let h = matrix_on::<Complex64>(ops, block).unwrap();
    assert!(is_hermitian(&h, 1e-12), "{} block not Hermitian", block.model());
    eigvals_sym(&h).iter().copied().collect()
}

/// Eigenvalues pooled over every momentum block, sorted.
fn pooled(n: usize, ops: &OpSum, block_for: impl Fn(&Representation) -> Block) -> Vec<f64> {
    let mut all: Vec<f64> = (0..n)
        .flat_map(|k| spectrum(ops, &block_for(&momentum(n, k))))
        .collect();
    all.sort_by(f64::total_cmp);
    all
}

fn assert_same_spectrum(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len(), "spectra of different sizes");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() < 1e-9, "eigenvalue {i}: {x} vs {y}");
    }
}

#[test]
fn test_heisenberg_hermitian_and_pooled() {
    for n in [4, 5, 6] {
        let group = cyclic_group(n).unwrap();
        for n_up in 0..=n {
            let ops = heisenberg(n);
            let full = spectrum(&ops, &Spinhalf::with_sz(n, n_up).unwrap().into());
            let sym = pooled(n, &ops, |irrep| {
                Spinhalf::symmetric_sz(n, n_up, &group, irrep).unwrap().into()
            });
            assert_same_spectrum(&full, &sym);
        }
    }
}

#[test]
fn test_heisenberg_without_sz() {
    let n = 5;
    let group = cyclic_group(n).unwrap();
    let ops = heisenberg(n);
    let full = spectrum(&ops, &Spinhalf::new(n).unwrap().into());
    assert_eq!(full.len(), 32);
    let sym = pooled(n, &ops, |irrep| {
        Spinhalf::symmetric(n, &group, irrep).unwrap().into()
    });
    assert_same_spectrum(&full, &sym);
}

#[test]
fn test_tj_hermitian_and_pooled() {
    let n = 5;
    let group = cyclic_group(n).unwrap();
    for (n_up, n_dn) in [(1, 1), (2, 1), (2, 2), (3, 1)] {
        let ops = tj_chain(n);
        let full = spectrum(&ops, &Tj::new(n, n_up, n_dn).unwrap().into());
        let sym = pooled(n, &ops, |irrep| {
            Tj::symmetric(n, n_up, n_dn, &group, irrep).unwrap().into()
        });
        assert_same_spectrum(&full, &sym);
    }
}

#[test]
fn test_hubbard_hermitian_and_pooled() {
    for n in [3, 4] {
        let group = cyclic_group(n).unwrap();
        for (n_up, n_dn) in [(1, 1), (2, 1), (2, 2)] {
            let ops = hubbard(n, 4.0);
            let full = spectrum(&ops, &Electron::with_np(n, n_up, n_dn).unwrap().into());
            let sym = pooled(n, &ops, |irrep| {
                Electron::symmetric(n, n_up, n_dn, &group, irrep)
                    .unwrap()
                    .into()
            });
            assert_same_spectrum(&full, &sym);
        }
    }
}

#[test]
fn test_hubbard_all_sectors() {
    let n = 3;
    let group = cyclic_group(n).unwrap();
    let mut ops = hubbard(n, 2.0);
    ops += (-0.7, Op::new(OpType::Ntot, [0]).unwrap());
    ops += (-0.7, Op::new(OpType::Ntot, [1]).unwrap());
    ops += (-0.7, Op::new(OpType::Ntot, [2]).unwrap());
    let full = spectrum(&ops, &Electron::new(n).unwrap().into());
    assert_eq!(full.len(), 64);
    let sym = pooled(n, &ops, |irrep| {
        Electron::symmetric_all(n, &group, irrep).unwrap().into()
    });
    assert_same_spectrum(&full, &sym);
}

#[test]
fn test_block_sizes_sum_over_sectors() {
    let n = 4;
    let spin: usize = (0..=n)
        .map(|k| Spinhalf::with_sz(n, k).unwrap().size())
        .sum();
    assert_eq!(spin, 1 << n);

    let mut electron = 0;
    let mut tj = 0;
    for n_up in 0..=n {
        for n_dn in 0..=n {
            electron += Electron::with_np(n, n_up, n_dn).unwrap().size();
            if n_up + n_dn <= n {
                tj += Tj::new(n, n_up, n_dn).unwrap().size();
            }
        }
    }
    assert_eq!(electron, 4usize.pow(n as u32));
    assert_eq!(tj, 3usize.pow(n as u32));
}

#[test]
fn test_symmetric_sizes_sum_to_full() {
    let n = 6;
    let group = cyclic_group(n).unwrap();
    let total: usize = (0..n)
        .map(|k| {
            Tj::symmetric(n, 2, 2, &group, &momentum(n, k))
                .unwrap()
                .size()
        })
        .sum();
    assert_eq!(total, Tj::new(n, 2, 2).unwrap().size());
}

/// Dihedral group with real characters for the translation and the reflection.
fn dihedral(n: usize, translation: f64, reflection: f64) -> (PermutationGroup, Representation) {
    generated_group(&[
        (Permutation::translation(n, 1), Complex64::new(translation, 0.0)),
        (Permutation::reflection(n), Complex64::new(reflection, 0.0)),
    ])
    .unwrap()
}

/// At momenta 0 and pi both reflection parities together give back the
/// momentum block.
fn check_reflection_split(
    n: usize,
    ops: &OpSum,
    block_for: impl Fn(&PermutationGroup, &Representation) -> Block,
) {
    let cyclic = cyclic_group(n).unwrap();
    for (k, translation) in [(0, 1.0), (n / 2, -1.0)] {
        let mut whole = spectrum(ops, &block_for(&cyclic, &momentum(n, k)));
        whole.sort_by(f64::total_cmp);
        let mut split: Vec<f64> = [1.0, -1.0]
            .into_iter()
            .flat_map(|reflection| {
                let (group, irrep) = dihedral(n, translation, reflection);
                spectrum(ops, &block_for(&group, &irrep))
            })
            .collect();
        split.sort_by(f64::total_cmp);
        assert_same_spectrum(&whole, &split);
    }
}

#[test]
fn test_hubbard_reflection_parities() {
    let n = 4;
    let ops = hubbard(n, 4.0);
    for (n_up, n_dn) in [(2, 1), (2, 2)] {
        check_reflection_split(n, &ops, |group, irrep| {
            Electron::symmetric(n, n_up, n_dn, group, irrep)
                .unwrap()
                .into()
        });
    }
}

#[test]
fn test_tj_reflection_parities() {
    let n = 6;
    let ops = tj_chain(n);
    check_reflection_split(n, &ops, |group, irrep| {
        Tj::symmetric(n, 2, 2, group, irrep).unwrap().into()
    });
}

#[test]
fn test_open_chain_breaks_translations() {
    let n = 4;
    let group = cyclic_group(n).unwrap();
    let block: Block = Electron::symmetric(n, 2, 1, &group, &momentum(n, 0))
        .unwrap()
        .into();
    let mut ops = OpSum::new();
    for i in 0..n - 1 {
        ops += (1.0, Op::new(OpType::Hop, [i, i + 1]).unwrap());
    }
    let err = matrix_on::<Complex64>(&ops, &block).unwrap_err();
    assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));

    // an open chain keeps the reflection
    let mirror = PermutationGroup::new(vec![
        Permutation::identity(n),
        Permutation::reflection(n),
    ])
    .unwrap();
    let even: Block = Electron::symmetric(n, 2, 1, &mirror, &Representation::trivial(2))
        .unwrap()
        .into();
    assert!(!spectrum(&ops, &even).is_empty());
}
