use super::Permutation;
use crate::error::{EdError, Result};
use std::collections::HashMap;
use std::ops::Index;

/// A finite group of site permutations.
///
/// Construction checks the group axioms and tabulates products and inverses,
/// so element lookups during basis construction are O(1).
#[derive(Debug, Clone)]
pub struct PermutationGroup {
    n_sites: usize,
    permutations: Vec<Permutation>,
    inverses: Vec<usize>,
    /// `multiply[i * size + j]` is the index of `compose(g_i, g_j)`.
    multiply: Vec<usize>,
}

impl PermutationGroup {
    /// Validate and index a list of permutations.
    ///
    /// The list must be non-empty, act on a common number of sites, contain
    /// no duplicates, contain the identity, and be closed under composition.
    pub fn new(permutations: Vec<Permutation>) -> Result<Self> {
        let Some(first) = permutations.first() else {
            return Err(EdError::invalid("permutation group must not be empty"));
        };
        let n_sites = first.n_sites();
        if let Some(p) = permutations.iter().find(|p| p.n_sites() != n_sites) {
            return Err(EdError::invalid(format!(
                "permutation {p} acts on {} sites, expected {n_sites}",
                p.n_sites()
            )));
        }

        let mut lookup = HashMap::with_capacity(permutations.len());
        for (i, p) in permutations.iter().enumerate() {
            if lookup.insert(p.clone(), i).is_some() {
                return Err(EdError::invalid(format!(
                    "permutation {p} appears more than once in the group"
                )));
            }
        }
        if !lookup.contains_key(&Permutation::identity(n_sites)) {
            return Err(EdError::invalid("permutation group lacks the identity"));
        }

        let size = permutations.len();
        let mut multiply = vec![0; size * size];
        for (i, pi) in permutations.iter().enumerate() {
            for (j, pj) in permutations.iter().enumerate() {
                let product = pi.compose(pj)?;
                multiply[i * size + j] = *lookup.get(&product).ok_or_else(|| {
                    EdError::invalid(format!(
                        "permutation group not closed: {pi} then {pj} gives {product}"
                    ))
                })?;
            }
        }

        let mut inverses = Vec::with_capacity(size);
        for p in &permutations {
            let inv = p.inverse();
            let idx = lookup.get(&inv).ok_or_else(|| {
                EdError::invalid(format!("permutation group lacks the inverse of {p}"))
            })?;
            inverses.push(*idx);
        }

        Ok(Self {
            n_sites,
            permutations,
            inverses,
            multiply,
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn size(&self) -> usize {
        self.permutations.len()
    }

    pub fn permutations(&self) -> &[Permutation] {
        &self.permutations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Permutation> {
        self.permutations.iter()
    }

    /// Index of the inverse of element `i`.
    #[inline]
    pub fn inverse(&self, i: usize) -> usize {
        self.inverses[i]
    }

    /// Index of `compose(g_i, g_j)` (g_i applied first).
    #[inline]
    pub fn multiply(&self, i: usize, j: usize) -> usize {
        self.multiply[i * self.size() + j]
    }

    pub fn index_of(&self, p: &Permutation) -> Option<usize> {
        self.permutations.iter().position(|q| q == p)
    }

    /// The subgroup formed by the elements at `indices`.
    pub fn subgroup(&self, indices: &[usize]) -> Result<Self> {
        let mut perms = Vec::with_capacity(indices.len());
        for &i in indices {
            let p = self.permutations.get(i).ok_or_else(|| {
                EdError::invalid(format!(
                    "subgroup index {i} out of range for a group of size {}",
                    self.size()
                ))
            })?;
            perms.push(p.clone());
        }
        Self::new(perms).map_err(|e| e.context("building subgroup"))
    }
}

impl Index<usize> for PermutationGroup {
    type Output = Permutation;

    fn index(&self, i: usize) -> &Permutation {
        &self.permutations[i]
    }
}

impl<'a> IntoIterator for &'a PermutationGroup {
    type Item = &'a Permutation;
    type IntoIter = std::slice::Iter<'a, Permutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.permutations.iter()
    }
}

/// Cyclic translation group of a periodic chain.
pub fn cyclic_group(n_sites: usize) -> Result<PermutationGroup> {
    PermutationGroup::new(
        (0..n_sites.max(1))
            .map(|s| Permutation::translation(n_sites, s))
            .collect(),
    )
}
