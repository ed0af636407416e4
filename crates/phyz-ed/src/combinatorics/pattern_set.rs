use super::{Combinations, CombinationsIter, LinTable, Subsets, SubsetsIter};
use crate::bits::BitWord;
use crate::error::Result;

/// Patterns of one channel: a fixed-weight sector or all patterns.
#[derive(Debug, Clone)]
pub enum PatternSet<B> {
    Fixed {
        combinations: Combinations<B>,
        table: LinTable<B>,
    },
    Free(Subsets<B>),
}

impl<B: BitWord> PatternSet<B> {
    /// Fixed weight `n_up`, or every pattern when `n_up` is `None`.
    pub fn new(n_sites: usize, n_up: Option<usize>) -> Result<Self> {
        Ok(match n_up {
            Some(k) => PatternSet::Fixed {
                combinations: Combinations::new(n_sites, k)?,
                table: LinTable::new(n_sites, k)?,
            },
            None => PatternSet::Free(Subsets::new(n_sites)?),
        })
    }

    pub fn n_sites(&self) -> usize {
        match self {
            PatternSet::Fixed { combinations, .. } => combinations.n_sites(),
            PatternSet::Free(subsets) => subsets.n_sites(),
        }
    }

    /// Fixed weight of the set, if any.
    pub fn n_up(&self) -> Option<usize> {
        match self {
            PatternSet::Fixed { combinations, .. } => Some(combinations.n_up()),
            PatternSet::Free(_) => None,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            PatternSet::Fixed { combinations, .. } => combinations.size(),
            PatternSet::Free(subsets) => subsets.size(),
        }
    }

    /// Whether `state` is a member of the set.
    #[inline]
    pub fn contains(&self, state: B) -> bool {
        let inside = state & !B::mask(self.n_sites()) == B::ZERO;
        match self {
            PatternSet::Fixed { combinations, .. } => {
                inside && state.popcount() == combinations.n_up()
            }
            PatternSet::Free(_) => inside,
        }
    }

    /// Rank of a member `state`.
    #[inline]
    pub fn index(&self, state: B) -> usize {
        match self {
            PatternSet::Fixed { table, .. } => table.index(state),
            PatternSet::Free(_) => state.to_usize(),
        }
    }

    /// Member with rank `index`.
    #[inline]
    pub fn state(&self, index: usize) -> B {
        match self {
            PatternSet::Fixed { combinations, .. } => {
                super::get_nth_pattern(index, combinations.n_sites(), combinations.n_up())
            }
            PatternSet::Free(_) => B::from_usize(index),
        }
    }

    pub fn iter(&self) -> PatternIter<B> {
        self.range(0, self.size())
    }

    pub fn range(&self, begin: usize, end: usize) -> PatternIter<B> {
        match self {
            PatternSet::Fixed { combinations, .. } => {
                PatternIter::Fixed(combinations.range(begin, end))
            }
            PatternSet::Free(subsets) => PatternIter::Free(subsets.range(begin, end)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PatternIter<B> {
    Fixed(CombinationsIter<B>),
    Free(SubsetsIter<B>),
}

impl<B: BitWord> Iterator for PatternIter<B> {
    type Item = B;

    #[inline]
    fn next(&mut self) -> Option<B> {
        match self {
            PatternIter::Fixed(it) => it.next(),
            PatternIter::Free(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            PatternIter::Fixed(it) => it.size_hint(),
            PatternIter::Free(it) => it.size_hint(),
        }
    }
}

impl<B: BitWord> ExactSizeIterator for PatternIter<B> {}
