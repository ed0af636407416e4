//! Spin-1/2 bases: one bit word per state.

use super::{Resolved, SpinIndexing};
use crate::bits::BitWord;
use crate::combinatorics::PatternSet;
use crate::error::Result;
use crate::symmetries::{GroupAction, Projection, RepresentativeTable, Symmetry};
use num_complex::Complex64;
use std::ops::Range;

/// All spin configurations of a sector (or of all sectors).
#[derive(Debug, Clone)]
pub struct SpinhalfPlain<B> {
    patterns: PatternSet<B>,
}

impl<B: BitWord> SpinhalfPlain<B> {
    pub fn new(n_sites: usize, n_up: Option<usize>) -> Result<Self> {
        Ok(Self {
            patterns: PatternSet::new(n_sites, n_up)?,
        })
    }

    pub fn n_up(&self) -> Option<usize> {
        self.patterns.n_up()
    }

    pub fn patterns(&self) -> &PatternSet<B> {
        &self.patterns
    }

    pub fn index(&self, state: B) -> Option<usize> {
        self.patterns
            .contains(state)
            .then(|| self.patterns.index(state))
    }

    pub fn iter(&self) -> impl Iterator<Item = B> + '_ {
        self.patterns.iter()
    }
}

impl<B: BitWord> SpinIndexing<B> for SpinhalfPlain<B> {
    fn n_sites(&self) -> usize {
        self.patterns.n_sites()
    }

    fn size(&self) -> usize {
        self.patterns.size()
    }

    fn state(&self, idx: usize) -> B {
        self.patterns.state(idx)
    }

    fn norm(&self, _idx: usize) -> f64 {
        1.0
    }

    fn for_each_in<F: FnMut(usize, B)>(&self, range: Range<usize>, mut f: F) {
        for (idx, state) in range.clone().zip(self.patterns.range(range.start, range.end)) {
            f(idx, state);
        }
    }

    #[inline]
    fn resolve(&self, state: B) -> Option<Resolved> {
        self.index(state).map(Resolved::plain)
    }

    fn characters(&self) -> Option<&[Complex64]> {
        None
    }
}

/// Orbit representatives of a spin sector with non-zero norm in an irrep.
#[derive(Debug, Clone)]
pub struct SpinhalfSymmetric<B> {
    patterns: PatternSet<B>,
    action: GroupAction<B>,
    characters: Vec<Complex64>,
    table: RepresentativeTable<B>,
}

impl<B: BitWord> SpinhalfSymmetric<B> {
    #[tracing::instrument(skip_all, fields(n_sites = n_sites, n_up = ?n_up))]
    pub fn new(n_sites: usize, n_up: Option<usize>, symmetry: &Symmetry) -> Result<Self> {
        symmetry.check_sites(n_sites)?;
        let patterns = PatternSet::new(n_sites, n_up)?;
        let action = GroupAction::new(symmetry.group())?;
        let characters = symmetry.irrep().characters().to_vec();
        let table =
            RepresentativeTable::build(&patterns, &action, Projection::Irrep(&characters));
        tracing::debug!(
            raw = patterns.size(),
            reps = table.size(),
            group = action.n_symmetries(),
            "built symmetric spin-1/2 basis"
        );
        Ok(Self {
            patterns,
            action,
            characters,
            table,
        })
    }

    pub fn n_up(&self) -> Option<usize> {
        self.patterns.n_up()
    }

    pub fn group_action(&self) -> &GroupAction<B> {
        &self.action
    }

    pub fn representative(&self, state: B) -> B {
        self.action.representative(state)
    }

    /// Index of the representative of `state`'s orbit and all symmetries
    /// mapping `state` onto it; `None` if the orbit has zero norm.
    pub fn index_syms(&self, state: B) -> Option<(usize, &[usize])> {
        if !self.patterns.contains(state) {
            return None;
        }
        let raw = self.patterns.index(state);
        self.table
            .index_of_raw(raw)
            .map(|idx| (idx, self.table.syms_of_raw(raw)))
    }

    /// Index of a representative state.
    pub fn index(&self, state: B) -> Option<usize> {
        self.index_syms(state)
            .and_then(|(idx, _)| (self.table.rep(idx) == state).then_some(idx))
    }

    pub fn iter(&self) -> impl Iterator<Item = B> + '_ {
        self.table.reps().iter().copied()
    }
}

impl<B: BitWord> SpinIndexing<B> for SpinhalfSymmetric<B> {
    fn n_sites(&self) -> usize {
        self.patterns.n_sites()
    }

    fn size(&self) -> usize {
        self.table.size()
    }

    fn state(&self, idx: usize) -> B {
        self.table.rep(idx)
    }

    fn norm(&self, idx: usize) -> f64 {
        self.table.norm(idx)
    }

    fn for_each_in<F: FnMut(usize, B)>(&self, range: Range<usize>, mut f: F) {
        for idx in range {
            f(idx, self.table.rep(idx));
        }
    }

    #[inline]
    fn resolve(&self, state: B) -> Option<Resolved> {
        let (index, syms) = self.index_syms(state)?;
        Some(Resolved {
            index,
            sym: syms[0],
            norm: self.table.norm(index),
            fermi: false,
        })
    }

    fn characters(&self) -> Option<&[Complex64]> {
        Some(&self.characters)
    }
}
