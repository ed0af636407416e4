//! Enumeration, ranking, and unranking of bit patterns.
//!
//! - [`Combinations`]: all N-bit patterns with exactly K set bits
//! - [`Subsets`]: all N-bit patterns
//! - [`LinTable`]: O(1) ranking of fixed-weight patterns via a split table
//! - [`PatternSet`]: either of the above behind one indexing interface
//!
//! All enumerations run in strictly ascending numeric order, so the rank of a
//! pattern is its position in that order.

mod combinations;
mod lin_table;
mod pattern_set;
mod subsets;

pub use combinations::{Combinations, CombinationsIter};
pub use lin_table::LinTable;
pub use pattern_set::{PatternIter, PatternSet};
pub use subsets::{Subsets, SubsetsIter};

use crate::bits::{BitWord, MAX_SITES};
use crate::error::{EdError, Result};

const TABLE_SIZE: usize = 65;

const fn pascal() -> [[u64; TABLE_SIZE]; TABLE_SIZE] {
    let mut table = [[0u64; TABLE_SIZE]; TABLE_SIZE];
    let mut n = 0;
    while n < TABLE_SIZE {
        table[n][0] = 1;
        let mut k = 1;
        while k <= n {
            table[n][k] = table[n - 1][k - 1] + table[n - 1][k];
            k += 1;
        }
        n += 1;
    }
    table
}

static BINOMIALS: [[u64; TABLE_SIZE]; TABLE_SIZE] = pascal();

/// Binomial coefficient C(n, k); zero when `k > n`.
#[inline]
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n || n >= TABLE_SIZE {
        return 0;
    }
    BINOMIALS[n][k] as usize
}

/// Unrank: the `index`-th pattern (ascending) with `n_up` of `n_sites` bits set.
///
/// Walks the sites from the top down, placing a bit wherever the remaining
/// count exceeds the number of patterns that fit below it. O(n_sites).
pub fn get_nth_pattern<B: BitWord>(index: usize, n_sites: usize, n_up: usize) -> B {
    let mut state = B::ZERO;
    let mut counter = index;
    let mut remaining = n_up;
    let mut site = n_sites;
    while remaining > 0 && site > 0 {
        site -= 1;
        let below = binomial(site, remaining);
        if counter >= below {
            state |= B::bit(site);
            counter -= below;
            remaining -= 1;
        }
    }
    state
}

/// Rank of a fixed-weight pattern by the combinatorial number system. O(K).
pub fn get_n_for_pattern<B: BitWord>(state: B) -> usize {
    let mut n = 0;
    let mut k = 1;
    let mut s = state;
    while s != B::ZERO {
        let site = s.trailing_zeros();
        n += binomial(site, k);
        k += 1;
        s ^= B::bit(site);
    }
    n
}

pub(crate) fn check_n_sites(n_sites: usize) -> Result<()> {
    if n_sites > MAX_SITES {
        return Err(EdError::invalid(format!(
            "n_sites = {n_sites} exceeds the maximum of {MAX_SITES}"
        )));
    }
    Ok(())
}
