//! Fermionic reordering signs under site permutations.
//!
//! Occupied sites are ordered by site index. A permutation relabels them and
//! the operator string has to be sorted back, picking up `(-1)` per
//! transposition. The parity of that sort is the fermi bool of the pair.

use super::{GroupAction, Permutation};
use crate::bits::BitWord;
use crate::combinatorics::PatternSet;
use rayon::prelude::*;

/// Parity of the reordering `perm` induces on the occupied sites of `state`.
pub fn fermi_bool_of_permutation<B: BitWord>(state: B, perm: &Permutation) -> bool {
    let mut targets = [0u8; 64];
    let mut n = 0;
    let mut s = state;
    while s != B::ZERO {
        let site = s.trailing_zeros();
        targets[n] = perm.get(site) as u8;
        n += 1;
        s ^= B::bit(site);
    }
    let mut odd = false;
    for i in 0..n {
        for j in (i + 1)..n {
            if targets[i] > targets[j] {
                odd = !odd;
            }
        }
    }
    odd
}

/// Cached fermi bools for every (symmetry, pattern) pair of one channel.
#[derive(Debug, Clone)]
pub struct FermiTable<B> {
    patterns: PatternSet<B>,
    size: usize,
    table: Vec<bool>,
}

impl<B: BitWord> FermiTable<B> {
    pub fn new(patterns: &PatternSet<B>, action: &GroupAction<B>) -> Self {
        let size = patterns.size();
        let group = action.permutation_group();
        let mut table = vec![false; size * action.n_symmetries()];
        if size > 0 {
            table
                .par_chunks_mut(size)
                .zip(group.permutations().par_iter())
                .for_each(|(row, perm)| {
                    for (slot, state) in row.iter_mut().zip(patterns.iter()) {
                        *slot = fermi_bool_of_permutation(state, perm);
                    }
                });
        }
        Self {
            patterns: patterns.clone(),
            size,
            table,
        }
    }

    /// Fermi bool of applying `sym` to the member `state`.
    #[inline]
    pub fn get(&self, sym: usize, state: B) -> bool {
        self.table[sym * self.size + self.patterns.index(state)]
    }
}
