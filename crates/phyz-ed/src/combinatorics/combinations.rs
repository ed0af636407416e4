use super::{binomial, check_n_sites, get_nth_pattern};
use crate::bits::BitWord;
use crate::error::{EdError, Result};
use std::marker::PhantomData;

/// All `n_sites`-bit patterns with exactly `n_up` set bits, ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combinations<B> {
    n_sites: usize,
    n_up: usize,
    size: usize,
    _word: PhantomData<B>,
}

impl<B: BitWord> Combinations<B> {
    pub fn new(n_sites: usize, n_up: usize) -> Result<Self> {
        check_n_sites(n_sites)?;
        if n_sites > B::BITS {
            return Err(EdError::invalid(format!(
                "{n_sites} sites do not fit into a {}-bit word",
                B::BITS
            )));
        }
        if n_up > n_sites {
            return Err(EdError::invalid(format!(
                "Combinations: n_up = {n_up} exceeds n_sites = {n_sites}"
            )));
        }
        Ok(Self {
            n_sites,
            n_up,
            size: binomial(n_sites, n_up),
            _word: PhantomData,
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

    pub fn iter(&self) -> CombinationsIter<B> {
        self.range(0, self.size)
    }

    /// Iterate the patterns with ranks in `begin..end`.
    ///
    /// The first pattern is unranked once, the rest follow by successor steps,
    /// so a chunk costs O(n_sites + len).
    pub fn range(&self, begin: usize, end: usize) -> CombinationsIter<B> {
        let end = end.min(self.size);
        let begin = begin.min(end);
        CombinationsIter {
            current: get_nth_pattern(begin, self.n_sites, self.n_up),
            remaining: end - begin,
        }
    }
}

impl<B: BitWord> IntoIterator for &Combinations<B> {
    type Item = B;
    type IntoIter = CombinationsIter<B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct CombinationsIter<B> {
    current: B,
    remaining: usize,
}

impl<B: BitWord> Iterator for CombinationsIter<B> {
    type Item = B;

    #[inline]
    fn next(&mut self) -> Option<B> {
        if self.remaining == 0 {
            return None;
        }
        let state = self.current;
        self.remaining -= 1;
        if self.remaining > 0 {
            self.current = state.next_same_popcount();
        }
        Some(state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<B: BitWord> ExactSizeIterator for CombinationsIter<B> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_choose_two() {
        let comb = Combinations::<u16>::new(4, 2).unwrap();
        let states: Vec<u16> = comb.iter().collect();
        assert_eq!(states, vec![0b0011, 0b0101, 0b0110, 0b1001, 0b1010, 0b1100]);
        assert_eq!(comb.size(), 6);
    }

    #[test]
    fn test_empty_and_full() {
        let none = Combinations::<u32>::new(5, 0).unwrap();
        assert_eq!(none.iter().collect::<Vec<_>>(), vec![0]);
        let all = Combinations::<u32>::new(5, 5).unwrap();
        assert_eq!(all.iter().collect::<Vec<_>>(), vec![0b11111]);
    }

    #[test]
    fn test_range_chunks_cover() {
        let comb = Combinations::<u64>::new(12, 5).unwrap();
        let full: Vec<u64> = comb.iter().collect();
        let mut chunked = Vec::new();
        let step = 97;
        let mut begin = 0;
        while begin < comb.size() {
            chunked.extend(comb.range(begin, begin + step));
            begin += step;
        }
        assert_eq!(full, chunked);
    }

    #[test]
    fn test_popcount_and_size() {
        for n in 0..12 {
            for k in 0..=n {
                let comb = Combinations::<u16>::new(n, k).unwrap();
                let states: Vec<u16> = comb.iter().collect();
                assert_eq!(states.len(), binomial(n, k));
                assert!(states.iter().all(|s| s.count_ones() as usize == k));
                assert!(states.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    #[test]
    fn test_invalid() {
        assert!(Combinations::<u16>::new(4, 5).is_err());
        assert!(Combinations::<u16>::new(17, 2).is_err());
    }
}
