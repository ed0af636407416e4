use super::norm::{NORM_TOLERANCE, norm};
use super::GroupAction;
use crate::bits::BitWord;
use crate::combinatorics::PatternSet;
use crate::parallel;
use num_complex::Complex64;
use rayon::prelude::*;

/// Which orbits a [`RepresentativeTable`] keeps.
#[derive(Debug, Clone, Copy)]
pub enum Projection<'a> {
    /// Representatives with non-zero norm in the irrep with these characters.
    Irrep(&'a [Complex64]),
    /// Every orbit, with unit norm.
    Orbits,
}

/// Orbit representatives of a pattern set, with lookup from raw patterns.
///
/// For every raw pattern the table stores which representative its orbit
/// maps to and every symmetry that performs the mapping. Built once, then
/// read-only.
#[derive(Debug, Clone)]
pub struct RepresentativeTable<B> {
    reps: Vec<B>,
    norms: Vec<f64>,
    rep_of_raw: Vec<Option<usize>>,
    syms: Vec<usize>,
    sym_offsets: Vec<usize>,
}

impl<B: BitWord> RepresentativeTable<B> {
    pub fn build(
        patterns: &PatternSet<B>,
        action: &GroupAction<B>,
        projection: Projection,
    ) -> Self {
        let size = patterns.size();
        let chunks = parallel::partition(size, rayon::current_num_threads() * 4);

        let raw_reps: Vec<B> = chunks
            .par_iter()
            .flat_map_iter(move |range| {
                patterns
                    .range(range.start, range.end)
                    .map(move |state| action.representative(state))
            })
            .collect();

        let raw = &raw_reps;
        let (reps, norms): (Vec<B>, Vec<f64>) = chunks
            .par_iter()
            .flat_map_iter(move |range| {
                patterns
                    .range(range.start, range.end)
                    .zip(range.clone())
                    .filter(move |&(state, idx)| raw[idx] == state)
                    .filter_map(move |(state, _)| match projection {
                        Projection::Orbits => Some((state, 1.0)),
                        Projection::Irrep(characters) => {
                            let nrm = norm(state, action, characters);
                            (nrm > NORM_TOLERANCE).then_some((state, nrm))
                        }
                    })
            })
            .collect::<Vec<_>>()
            .into_iter()
            .unzip();

        let kept = &reps;
        let per_raw: Vec<(Option<usize>, Vec<usize>)> = chunks
            .par_iter()
            .flat_map_iter(move |range| {
                patterns
                    .range(range.start, range.end)
                    .zip(range.clone())
                    .map(move |(state, idx)| {
                        let rep = raw[idx];
                        match kept.binary_search(&rep) {
                            Ok(k) => (Some(k), action.mapping_syms(state, rep)),
                            Err(_) => (None, Vec::new()),
                        }
                    })
            })
            .collect();

        let mut rep_of_raw = Vec::with_capacity(size);
        let mut syms = Vec::new();
        let mut sym_offsets = Vec::with_capacity(size + 1);
        sym_offsets.push(0);
        for (rep, s) in per_raw {
            rep_of_raw.push(rep);
            syms.extend(s);
            sym_offsets.push(syms.len());
        }

        Self {
            reps,
            norms,
            rep_of_raw,
            syms,
            sym_offsets,
        }
    }

    /// Number of representatives kept.
    pub fn size(&self) -> usize {
        self.reps.len()
    }

    pub fn reps(&self) -> &[B] {
        &self.reps
    }

    #[inline]
    pub fn rep(&self, idx: usize) -> B {
        self.reps[idx]
    }

    #[inline]
    pub fn norm(&self, idx: usize) -> f64 {
        self.norms[idx]
    }

    /// Representative index for the raw pattern with rank `raw_idx`.
    #[inline]
    pub fn index_of_raw(&self, raw_idx: usize) -> Option<usize> {
        self.rep_of_raw[raw_idx]
    }

    /// Symmetries mapping the raw pattern with rank `raw_idx` to its representative.
    #[inline]
    pub fn syms_of_raw(&self, raw_idx: usize) -> &[usize] {
        &self.syms[self.sym_offsets[raw_idx]..self.sym_offsets[raw_idx + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symmetries::cyclic_group;

    #[test]
    fn test_ring_of_four() {
        let group = cyclic_group(4).unwrap();
        let action = GroupAction::<u16>::new(&group).unwrap();
        let patterns = PatternSet::new(4, Some(2)).unwrap();
        let table = RepresentativeTable::build(&patterns, &action, Projection::Orbits);
        assert_eq!(table.reps(), &[0b0011, 0b0101]);

        let trivial = vec![Complex64::new(1.0, 0.0); 4];
        let table = RepresentativeTable::build(&patterns, &action, Projection::Irrep(&trivial));
        assert_eq!(table.size(), 2);
        assert!((table.norm(1) - 2.0_f64.sqrt()).abs() < 1e-12);

        // 0b1010 maps to 0b0101 by T and T^3
        let raw = patterns.index(0b1010);
        assert_eq!(table.index_of_raw(raw), Some(1));
        assert_eq!(table.syms_of_raw(raw), &[1, 3]);
    }

    #[test]
    fn test_irrep_drops_zero_norm() {
        let group = cyclic_group(4).unwrap();
        let action = GroupAction::<u16>::new(&group).unwrap();
        let patterns = PatternSet::new(4, Some(2)).unwrap();
        // momentum pi/2: the stabilizer {0, 2} of 0b0101 sums to 1 + (-1)
        let chars: Vec<Complex64> = (0..4)
            .map(|s| Complex64::from_polar(1.0, std::f64::consts::FRAC_PI_2 * s as f64))
            .collect();
        let table = RepresentativeTable::build(&patterns, &action, Projection::Irrep(&chars));
        assert_eq!(table.reps(), &[0b0011]);
        assert_eq!(table.index_of_raw(patterns.index(0b1010)), None);
        assert!(table.syms_of_raw(patterns.index(0b1010)).is_empty());
    }
}
