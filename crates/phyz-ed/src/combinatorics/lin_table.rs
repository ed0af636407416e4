use super::{Combinations, binomial};
use crate::bits::BitWord;
use crate::error::Result;

/// O(1) rank of a fixed-weight pattern through a split-half lookup.
///
/// The word is cut into a left (high) and right (low) half. Patterns are
/// ordered left-major, so the rank is the number of patterns with a smaller
/// left half plus the rank of the right half among right values of the same
/// weight. Both pieces are tabulated: `left_offsets` over all left values and
/// `right_ranks` over all right values.
#[derive(Debug, Clone)]
pub struct LinTable<B> {
    n_sites: usize,
    n_up: usize,
    n_right: usize,
    right_mask: B,
    left_offsets: Vec<usize>,
    right_ranks: Vec<usize>,
    size: usize,
}

impl<B: BitWord> LinTable<B> {
    pub fn new(n_sites: usize, n_up: usize) -> Result<Self> {
        // Validates the sector and the word width
        let combinations = Combinations::<B>::new(n_sites, n_up)?;

        let n_right = n_sites / 2;
        let n_left = n_sites - n_right;

        let mut left_offsets = vec![0usize; 1 << n_left];
        let mut offset = 0;
        for (left, slot) in left_offsets.iter_mut().enumerate() {
            let k_left = left.count_ones() as usize;
            if k_left <= n_up && n_up - k_left <= n_right {
                *slot = offset;
                offset += binomial(n_right, n_up - k_left);
            }
        }

        let mut counters = vec![0usize; n_right + 1];
        let right_ranks = (0..1usize << n_right)
            .map(|right| {
                let k = right.count_ones() as usize;
                let rank = counters[k];
                counters[k] += 1;
                rank
            })
            .collect();

        Ok(Self {
            n_sites,
            n_up,
            n_right,
            right_mask: B::mask(n_right),
            left_offsets,
            right_ranks,
            size: combinations.size(),
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_up(&self) -> usize {
        self.n_up
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Rank of `state`; the pattern must have `n_up` bits within `n_sites`.
    #[inline]
    pub fn index(&self, state: B) -> usize {
        let left = (state >> self.n_right).to_usize();
        let right = (state & self.right_mask).to_usize();
        self.left_offsets[left] + self.right_ranks[right]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_matches_enumeration() {
        for n in 0..14 {
            for k in 0..=n {
                let table = LinTable::<u16>::new(n, k).unwrap();
                let comb = Combinations::<u16>::new(n, k).unwrap();
                assert_eq!(table.size(), comb.size());
                for (i, state) in comb.iter().enumerate() {
                    assert_eq!(table.index(state), i, "n={n} k={k} state={state:b}");
                }
            }
        }
    }

    #[test]
    fn test_wide_word() {
        let table = LinTable::<u64>::new(34, 3).unwrap();
        let comb = Combinations::<u64>::new(34, 3).unwrap();
        let last = comb.iter().last().unwrap();
        assert_eq!(table.index(last), comb.size() - 1);
    }

    #[test]
    fn test_invalid_sector() {
        assert!(LinTable::<u32>::new(6, 7).is_err());
    }
}
