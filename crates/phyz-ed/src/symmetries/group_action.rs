use super::PermutationGroup;
use crate::bits::BitWord;
use crate::error::{EdError, Result};

const CHUNK_BITS: usize = 8;
const CHUNK_SIZE: usize = 1 << CHUNK_BITS;

/// Action of a permutation group on bit words through chunked lookup tables.
///
/// For every symmetry and every byte of the word the image of all 256 byte
/// values is tabulated, so applying a symmetry costs one lookup per byte
/// instead of one per set bit.
#[derive(Debug, Clone)]
pub struct GroupAction<B> {
    group: PermutationGroup,
    n_sites: usize,
    n_chunks: usize,
    tables: Vec<B>,
}

impl<B: BitWord> GroupAction<B> {
    pub fn new(group: &PermutationGroup) -> Result<Self> {
        let n_sites = group.n_sites();
        if n_sites > B::BITS {
            return Err(EdError::invalid(format!(
                "group on {n_sites} sites does not fit into a {}-bit word",
                B::BITS
            )));
        }
        let n_chunks = n_sites.div_ceil(CHUNK_BITS).max(1);
        let mut tables = vec![B::ZERO; group.size() * n_chunks * CHUNK_SIZE];
        for (sym, perm) in group.iter().enumerate() {
            for chunk in 0..n_chunks {
                let base = (sym * n_chunks + chunk) * CHUNK_SIZE;
                let width = CHUNK_BITS.min(n_sites - chunk * CHUNK_BITS);
                for value in 0..(1usize << width) {
                    let state = B::from_usize(value) << (chunk * CHUNK_BITS);
                    tables[base + value] = perm.apply(state);
                }
            }
        }
        Ok(Self {
            group: group.clone(),
            n_sites,
            n_chunks,
            tables,
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_symmetries(&self) -> usize {
        self.group.size()
    }

    pub fn permutation_group(&self) -> &PermutationGroup {
        &self.group
    }

    /// Image of `state` under symmetry `sym`.
    #[inline]
    pub fn apply(&self, sym: usize, state: B) -> B {
        let mut out = B::ZERO;
        let base = sym * self.n_chunks * CHUNK_SIZE;
        let byte = B::mask(CHUNK_BITS);
        for chunk in 0..self.n_chunks {
            let value = ((state >> (chunk * CHUNK_BITS)) & byte).to_usize();
            out |= self.tables[base + chunk * CHUNK_SIZE + value];
        }
        out
    }

    /// Smallest element of the orbit of `state`.
    pub fn representative(&self, state: B) -> B {
        (0..self.n_symmetries())
            .map(|sym| self.apply(sym, state))
            .min()
            .unwrap_or(state)
    }

    /// Orbit representative and the first symmetry mapping `state` onto it.
    pub fn representative_sym(&self, state: B) -> (B, usize) {
        let mut rep = state;
        let mut rep_sym = 0;
        for sym in 0..self.n_symmetries() {
            let t = self.apply(sym, state);
            if t < rep {
                rep = t;
                rep_sym = sym;
            }
        }
        (rep, rep_sym)
    }

    /// Smallest image of `state` under the given subset of symmetries.
    pub fn representative_subset(&self, state: B, syms: &[usize]) -> B {
        syms.iter()
            .map(|&sym| self.apply(sym, state))
            .min()
            .unwrap_or(state)
    }

    /// Like [`representative_subset`](Self::representative_subset), also
    /// returning the symmetry that attains it.
    pub fn representative_sym_subset(&self, state: B, syms: &[usize]) -> (B, usize) {
        let mut rep = B::ZERO;
        let mut rep_sym = 0;
        let mut first = true;
        for &sym in syms {
            let t = self.apply(sym, state);
            if first || t < rep {
                rep = t;
                rep_sym = sym;
                first = false;
            }
        }
        if first { (state, 0) } else { (rep, rep_sym) }
    }

    /// Symmetries leaving `state` invariant.
    pub fn stabilizer_symmetries(&self, state: B) -> Vec<usize> {
        self.mapping_syms(state, state)
    }

    /// Symmetries mapping `from` onto `to`.
    pub fn mapping_syms(&self, from: B, to: B) -> Vec<usize> {
        (0..self.n_symmetries())
            .filter(|&sym| self.apply(sym, from) == to)
            .collect()
    }

    pub fn is_representative(&self, state: B) -> bool {
        (0..self.n_symmetries()).all(|sym| self.apply(sym, state) >= state)
    }
}
