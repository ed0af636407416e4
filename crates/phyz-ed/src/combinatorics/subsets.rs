use super::check_n_sites;
use crate::bits::BitWord;
use crate::error::{EdError, Result};
use std::marker::PhantomData;

/// All `n_sites`-bit patterns, ascending from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subsets<B> {
    n_sites: usize,
    size: usize,
    _word: PhantomData<B>,
}

impl<B: BitWord> Subsets<B> {
    pub fn new(n_sites: usize) -> Result<Self> {
        check_n_sites(n_sites)?;
        if n_sites > B::BITS {
            return Err(EdError::invalid(format!(
                "{n_sites} sites do not fit into a {}-bit word",
                B::BITS
            )));
        }
        Ok(Self {
            n_sites,
            size: 1usize << n_sites,
            _word: PhantomData,
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn iter(&self) -> SubsetsIter<B> {
        self.range(0, self.size)
    }

    pub fn range(&self, begin: usize, end: usize) -> SubsetsIter<B> {
        let end = end.min(self.size);
        SubsetsIter {
            next: begin.min(end),
            end,
            _word: PhantomData,
        }
    }
}

impl<B: BitWord> IntoIterator for &Subsets<B> {
    type Item = B;
    type IntoIter = SubsetsIter<B>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct SubsetsIter<B> {
    next: usize,
    end: usize,
    _word: PhantomData<B>,
}

impl<B: BitWord> Iterator for SubsetsIter<B> {
    type Item = B;

    #[inline]
    fn next(&mut self) -> Option<B> {
        if self.next >= self.end {
            return None;
        }
        let state = B::from_usize(self.next);
        self.next += 1;
        Some(state)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl<B: BitWord> ExactSizeIterator for SubsetsIter<B> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_sites() {
        let subsets = Subsets::<u16>::new(4).unwrap();
        let states: Vec<u16> = subsets.iter().collect();
        assert_eq!(states, (0..16).collect::<Vec<u16>>());
    }

    #[test]
    fn test_range() {
        let subsets = Subsets::<u32>::new(6).unwrap();
        let chunk: Vec<u32> = subsets.range(10, 13).collect();
        assert_eq!(chunk, vec![10, 11, 12]);
        assert_eq!(subsets.range(60, 100).count(), 4);
    }
}
