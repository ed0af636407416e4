//! Projection norms of orbit representatives.
//!
//! The norm of a representative is `sqrt(|Σ χ(g)|)` over the symmetries `g`
//! that leave it invariant, with a fermionic sign folded into `χ` for
//! fermions. A vanishing norm means the projection onto the irrep is zero
//! and the representative is not part of the symmetric basis.

use super::{GroupAction, fermi_bool_of_permutation};
use crate::bits::BitWord;
use num_complex::Complex64;

/// Norms below this are treated as zero.
pub const NORM_TOLERANCE: f64 = 1e-6;

pub fn norm<B: BitWord>(state: B, action: &GroupAction<B>, characters: &[Complex64]) -> f64 {
    let mut amplitude = Complex64::new(0.0, 0.0);
    for sym in 0..action.n_symmetries() {
        if action.apply(sym, state) == state {
            amplitude += characters[sym];
        }
    }
    amplitude.norm().sqrt()
}

pub fn norm_fermionic<B: BitWord>(
    state: B,
    action: &GroupAction<B>,
    characters: &[Complex64],
) -> f64 {
    let group = action.permutation_group();
    let mut amplitude = Complex64::new(0.0, 0.0);
    for sym in 0..action.n_symmetries() {
        if action.apply(sym, state) == state {
            if fermi_bool_of_permutation(state, &group[sym]) {
                amplitude -= characters[sym];
            } else {
                amplitude += characters[sym];
            }
        }
    }
    amplitude.norm().sqrt()
}

/// Norm of a two-channel fermionic state.
pub fn norm_electron<B: BitWord>(
    ups: B,
    dns: B,
    action: &GroupAction<B>,
    characters: &[Complex64],
) -> f64 {
    let all: Vec<usize> = (0..action.n_symmetries()).collect();
    norm_electron_subset(ups, dns, action, characters, &all)
}

/// Two-channel norm restricted to `syms`, typically the stabilizer of `ups`.
pub fn norm_electron_subset<B: BitWord>(
    ups: B,
    dns: B,
    action: &GroupAction<B>,
    characters: &[Complex64],
    syms: &[usize],
) -> f64 {
    let group = action.permutation_group();
    let mut amplitude = Complex64::new(0.0, 0.0);
    for &sym in syms {
        if action.apply(sym, ups) == ups && action.apply(sym, dns) == dns {
            let fermi_ups = fermi_bool_of_permutation(ups, &group[sym]);
            let fermi_dns = fermi_bool_of_permutation(dns, &group[sym]);
            if fermi_ups == fermi_dns {
                amplitude += characters[sym];
            } else {
                amplitude -= characters[sym];
            }
        }
    }
    amplitude.norm().sqrt()
}
