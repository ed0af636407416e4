//! How a term list transforms under a permutation group.
//!
//! Relabeling the sites of a term list by `g` yields `U(g) H U(g)^-1`. When
//! that equals `lambda(g) H` for every `g`, the list maps a symmetric block
//! with irrep `chi` onto the block with irrep `conj(lambda) * chi`.
//!
//! Term lists are compared through a canonical form that is linear in the
//! operator: composite terms are expanded, sites are ordered, and the
//! amplitudes of equal `(kind, sites)` keys are summed. A bond term keeps the
//! amplitudes of both hopping directions, so that `Hop(1, 0)` and `Hop(0, 1)`
//! with conjugate couplings compare equal.

use super::{Op, OpSum, OpType};
use crate::error::Result;
use crate::symmetries::{PermutationGroup, Representation};
use nalgebra::DMatrix;
use num_complex::Complex64;
use std::collections::HashMap;

/// Summed amplitudes below this are dropped.
const ZERO_TOLERANCE: f64 = 1e-12;

/// Relative tolerance when matching a relabeled list to a multiple of the
/// original.
const MATCH_TOLERANCE: f64 = 1e-10;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

/// A term list as amplitudes per `(kind, sites)` key: the coupling for plain
/// terms, one amplitude per direction for bonds and chiralities, and the
/// coupling times the column-major local matrix for `Matrix`.
#[derive(Debug, Default)]
struct Canonical {
    terms: HashMap<(OpType, Vec<usize>), Vec<Complex64>>,
}

impl Canonical {
    fn new(ops: &OpSum) -> Self {
        let mut out = Self::default();
        for (c, op) in ops {
            out.add_term(c.to_complex(), op);
        }
        out.terms
            .retain(|_, amp| amp.iter().any(|z| z.norm() > ZERO_TOLERANCE));
        out
    }

    fn add(&mut self, kind: OpType, sites: Vec<usize>, amplitude: &[Complex64]) {
        let entry = self
            .terms
            .entry((kind, sites))
            .or_insert_with(|| vec![ZERO; amplitude.len()]);
        for (e, a) in entry.iter_mut().zip(amplitude) {
            *e += a;
        }
    }

    /// A bond term moving a particle off `sites[0]` with `z` and back with
    /// `conj(z)`. Stored as the amplitudes for leaving the lower and the
    /// higher site.
    fn add_directed(&mut self, kind: OpType, sites: &[usize], z: Complex64) {
        let (a, b) = (sites[0], sites[1]);
        if a < b {
            self.add(kind, vec![a, b], &[z, z.conj()]);
        } else {
            self.add(kind, vec![b, a], &[z.conj(), z]);
        }
    }

    fn add_term(&mut self, z: Complex64, op: &Op) {
        use OpType::*;
        let kind = op.kind();
        let sites = op.sites();
        match kind {
            SdotS => {
                self.add(SzSz, sorted(sites), &[z]);
                self.add_directed(Exchange, sites, z);
            }
            TjSdotS => {
                self.add(TjSzSz, sorted(sites), &[z]);
                self.add_directed(Exchange, sites, z);
            }
            Hop => {
                self.add_directed(Hopup, sites, z);
                self.add_directed(Hopdn, sites, z);
            }
            Ntot => {
                self.add(Nup, sites.to_vec(), &[z]);
                self.add(Ndn, sites.to_vec(), &[z]);
            }
            SzSz | TjSzSz => self.add(kind, sorted(sites), &[z]),
            Exchange | Hopup | Hopdn => self.add_directed(kind, sites, z),
            ScalarChirality => {
                // amplitudes of the two rotation senses; an odd reordering
                // swaps them
                let (ordered, odd) = sorted_with_parity(sites);
                let (cyclic, acyclic) = (z * I, -(z.conj() * I));
                let amplitude = if odd { [acyclic, cyclic] } else { [cyclic, acyclic] };
                self.add(kind, ordered, &amplitude);
            }
            Matrix => {
                if let Some(m) = op.local_matrix() {
                    let (ordered, entries) = sorted_matrix(sites, m);
                    let amplitude: Vec<Complex64> = entries.iter().map(|x| x * z).collect();
                    self.add(kind, ordered, &amplitude);
                }
            }
            _ => self.add(kind, sites.to_vec(), &[z]),
        }
    }

    fn max_norm(&self) -> f64 {
        self.terms
            .values()
            .flatten()
            .map(|z| z.norm())
            .fold(0.0, f64::max)
    }

    /// `lambda` with `self == lambda * reference`, if there is one.
    fn factor_of(&self, reference: &Canonical) -> Option<Complex64> {
        match (self.terms.is_empty(), reference.terms.is_empty()) {
            (true, true) => return Some(ONE),
            (false, false) => {}
            _ => return None,
        }
        if self.terms.len() != reference.terms.len() {
            return None;
        }

        // the largest reference amplitude fixes the factor
        let mut pivot = (ZERO, ZERO);
        for (key, b) in &reference.terms {
            let a = self.terms.get(key)?;
            for (&x, &y) in a.iter().zip(b) {
                if y.norm() > pivot.1.norm() {
                    pivot = (x, y);
                }
            }
        }
        let lambda = pivot.0 / pivot.1;

        let tol = MATCH_TOLERANCE * reference.max_norm().max(self.max_norm());
        let matches = reference.terms.iter().all(|(key, b)| {
            self.terms.get(key).is_some_and(|a| {
                a.len() == b.len()
                    && a.iter().zip(b).all(|(&x, &y)| (x - lambda * y).norm() <= tol)
            })
        });
        matches.then_some(lambda)
    }
}

fn sorted(sites: &[usize]) -> Vec<usize> {
    let mut out = sites.to_vec();
    out.sort_unstable();
    out
}

/// Ascending sites and whether sorting took an odd number of swaps.
fn sorted_with_parity(sites: &[usize]) -> (Vec<usize>, bool) {
    let mut out = sites.to_vec();
    let mut odd = false;
    for i in 1..out.len() {
        let mut j = i;
        while j > 0 && out[j - 1] > out[j] {
            out.swap(j - 1, j);
            odd = !odd;
            j -= 1;
        }
    }
    (out, odd)
}

/// Ascending sites, with the local matrix re-indexed to match.
///
/// Bit `b` of a new row or column index is bit `order[b]` of the old one.
fn sorted_matrix(sites: &[usize], m: &DMatrix<Complex64>) -> (Vec<usize>, Vec<Complex64>) {
    let mut order: Vec<usize> = (0..sites.len()).collect();
    order.sort_by_key(|&k| sites[k]);
    let old_index = |new: usize| {
        order
            .iter()
            .enumerate()
            .fold(0usize, |acc, (b, &k)| acc | (((new >> b) & 1) << k))
    };
    let dim = m.nrows();
    let mut entries = Vec::with_capacity(dim * dim);
    for col in 0..dim {
        for row in 0..dim {
            entries.push(m[(old_index(row), old_index(col))]);
        }
    }
    (order.iter().map(|&k| sites[k]).collect(), entries)
}

/// The characters `mu` with which `ops` maps a block of irrep `chi` onto a
/// block of irrep `mu * chi`.
///
/// `None` when relabeling `ops` by some group element does not give back a
/// multiple of `ops`, i.e. the list mixes irreps.
pub fn representation(ops: &OpSum, group: &PermutationGroup) -> Result<Option<Representation>> {
    ops.check(group.n_sites())?;
    let reference = Canonical::new(ops);
    let mut characters = Vec::with_capacity(group.size());
    for perm in group {
        let moved = Canonical::new(&ops.permute(perm)?);
        match moved.factor_of(&reference) {
            Some(lambda) => characters.push(lambda.conj()),
            None => return Ok(None),
        }
    }
    Ok(Some(Representation::new(characters)))
}
