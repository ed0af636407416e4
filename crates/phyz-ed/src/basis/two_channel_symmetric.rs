//! Symmetry-adapted two-channel basis.
//!
//! Up-patterns are reduced to their orbit representatives first. For each
//! up-representative the down-patterns are then reduced by the residual
//! stabilizer of that representative only:
//!
//! - trivial stabilizer: every down-pattern is a representative with unit
//!   norm, nothing is stored and ranking goes through the down-pattern set
//! - non-trivial stabilizer: the down-representatives with non-zero norm are
//!   stored in ascending order and found by binary search

use super::two_channel::{DnsSpace, pair_count};
use super::{Resolved, TwoChannelIndexing};
use crate::bits::BitWord;
use crate::combinatorics::PatternSet;
use crate::error::Result;
use crate::symmetries::norm::norm_electron_subset;
use crate::symmetries::{
    FermiTable, GroupAction, NORM_TOLERANCE, Projection, RepresentativeTable, Symmetry,
};
use num_complex::Complex64;
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnsEntries {
    /// Trivial stabilizer: all `dns.size()` patterns.
    All,
    /// Stored down-representatives in `start..end`.
    Stored { start: usize, end: usize },
}

#[derive(Debug, Clone)]
pub struct TwoChannelSymmetric<B> {
    n_sites: usize,
    ups: PatternSet<B>,
    dns: DnsSpace<B>,
    action: GroupAction<B>,
    characters: Vec<Complex64>,
    ups_table: RepresentativeTable<B>,
    entries: Vec<DnsEntries>,
    dns_storage: Vec<B>,
    norms_storage: Vec<f64>,
    ups_offset: Vec<usize>,
    fermi_ups: FermiTable<B>,
    fermi_dns: FermiTable<B>,
}

impl<B: BitWord> TwoChannelSymmetric<B> {
    #[tracing::instrument(skip_all, fields(n_sites = ups.n_sites()))]
    pub fn new(ups: PatternSet<B>, dns: DnsSpace<B>, symmetry: &Symmetry) -> Result<Self> {
        let n_sites = ups.n_sites();
        symmetry.check_sites(n_sites)?;
        pair_count(n_sites, ups.size(), dns.size())?;
        let action = GroupAction::new(symmetry.group())?;
        let characters = symmetry.irrep().characters().to_vec();
        let ups_table = RepresentativeTable::build(&ups, &action, Projection::Orbits);

        // Down-representatives per up-representative, in parallel over ups
        let per_up: Vec<(DnsEntries, Vec<B>, Vec<f64>)> = ups_table
            .reps()
            .par_iter()
            .map(|&rep_up| {
                let stabilizer = ups_table.syms_of_raw(ups.index(rep_up));
                if stabilizer.len() == 1 {
                    return (DnsEntries::All, Vec::new(), Vec::new());
                }
                let mut kept = Vec::new();
                let mut norms = Vec::new();
                for dns in dns.iter_for(rep_up) {
                    if action.representative_subset(dns, stabilizer) != dns {
                        continue;
                    }
                    let nrm = norm_electron_subset(rep_up, dns, &action, &characters, stabilizer);
                    if nrm > NORM_TOLERANCE {
                        kept.push(dns);
                        norms.push(nrm);
                    }
                }
                (DnsEntries::Stored { start: 0, end: 0 }, kept, norms)
            })
            .collect();

        let mut entries = Vec::with_capacity(per_up.len());
        let mut dns_storage = Vec::new();
        let mut norms_storage = Vec::new();
        let mut ups_offset = Vec::with_capacity(per_up.len() + 1);
        let mut offset = 0;
        for (entry, kept, norms) in per_up {
            ups_offset.push(offset);
            match entry {
                DnsEntries::All => {
                    entries.push(DnsEntries::All);
                    offset += dns.size();
                }
                DnsEntries::Stored { .. } => {
                    let start = dns_storage.len();
                    offset += kept.len();
                    dns_storage.extend(kept);
                    norms_storage.extend(norms);
                    entries.push(DnsEntries::Stored {
                        start,
                        end: dns_storage.len(),
                    });
                }
            }
        }
        ups_offset.push(offset);

        let fermi_ups = FermiTable::new(&ups, &action);
        let fermi_dns = FermiTable::new(&dns.full_set()?, &action);

        tracing::debug!(
            up_reps = ups_table.size(),
            size = offset,
            group = action.n_symmetries(),
            "built symmetric two-channel basis"
        );

        Ok(Self {
            n_sites,
            ups,
            dns,
            action,
            characters,
            ups_table,
            entries,
            dns_storage,
            norms_storage,
            ups_offset,
            fermi_ups,
            fermi_dns,
        })
    }

    pub fn group_action(&self) -> &GroupAction<B> {
        &self.action
    }

    pub fn ups(&self) -> &PatternSet<B> {
        &self.ups
    }

    pub fn dns(&self) -> &DnsSpace<B> {
        &self.dns
    }

    /// Up-representatives in ascending order.
    pub fn rep_ups(&self) -> &[B] {
        self.ups_table.reps()
    }

    /// Symmetries mapping `ups` onto its representative.
    pub fn syms_ups(&self, ups: B) -> &[usize] {
        self.ups_table.syms_of_raw(self.ups.index(ups))
    }

    /// Number of basis states sharing one up-representative.
    pub fn n_dns_for(&self, idx_up: usize) -> usize {
        self.ups_offset[idx_up + 1] - self.ups_offset[idx_up]
    }

    /// The `(ups, dns)` representative at position `idx`.
    pub fn state(&self, idx: usize) -> (B, B) {
        let idx_up = self.ups_offset.partition_point(|&o| o <= idx) - 1;
        let ups = self.ups_table.rep(idx_up);
        let k = idx - self.ups_offset[idx_up];
        let dns = match self.entries[idx_up] {
            DnsEntries::All => self.dns.state(ups, k),
            DnsEntries::Stored { start, .. } => self.dns_storage[start + k],
        };
        (ups, dns)
    }

    pub fn norm(&self, idx: usize) -> f64 {
        let idx_up = self.ups_offset.partition_point(|&o| o <= idx) - 1;
        match self.entries[idx_up] {
            DnsEntries::All => 1.0,
            DnsEntries::Stored { start, .. } => {
                self.norms_storage[start + idx - self.ups_offset[idx_up]]
            }
        }
    }

    /// Orbit representative of `(ups, dns)` in the two-level ordering.
    pub fn representative(&self, ups: B, dns: B) -> (B, B) {
        let syms = self.syms_ups(ups);
        let rep_up = self.action.apply(syms[0], ups);
        (rep_up, self.action.representative_subset(dns, syms))
    }

    /// Index of the representative of `(ups, dns)` with the symmetries
    /// mapping it there; `None` if the orbit carries zero norm.
    pub fn index_syms(&self, ups: B, dns: B) -> Option<(usize, Vec<usize>)> {
        let resolved = self.resolve(ups, dns)?;
        let (rep_up, rep_dn) = self.state(resolved.index);
        let syms = self
            .syms_ups(ups)
            .iter()
            .copied()
            .filter(|&s| self.action.apply(s, ups) == rep_up && self.action.apply(s, dns) == rep_dn)
            .collect();
        Some((resolved.index, syms))
    }

    /// Index of a representative pair.
    pub fn index(&self, ups: B, dns: B) -> Option<usize> {
        let resolved = self.resolve(ups, dns)?;
        (self.state(resolved.index) == (ups, dns)).then_some(resolved.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (B, B)> + '_ {
        (0..self.ups_table.size()).flat_map(move |idx_up| {
            let ups = self.ups_table.rep(idx_up);
            let mut states = Vec::with_capacity(self.n_dns_for(idx_up));
            self.for_each_dns(idx_up, ups, |_, dns, _| states.push((ups, dns)));
            states
        })
    }
}

impl<B: BitWord> TwoChannelIndexing<B> for TwoChannelSymmetric<B> {
    fn n_sites(&self) -> usize {
        self.n_sites
    }

    fn size(&self) -> usize {
        self.ups_offset.last().copied().unwrap_or(0)
    }

    fn n_ups(&self) -> usize {
        self.ups_table.size()
    }

    fn ups_at(&self, idx_up: usize) -> B {
        self.ups_table.rep(idx_up)
    }

    fn ups_offset(&self, idx_up: usize) -> usize {
        self.ups_offset[idx_up]
    }

    fn for_each_dns<F: FnMut(usize, B, f64)>(&self, idx_up: usize, ups: B, mut f: F) {
        let offset = self.ups_offset[idx_up];
        match self.entries[idx_up] {
            DnsEntries::All => {
                for (k, dns) in self.dns.iter_for(ups).enumerate() {
                    f(offset + k, dns, 1.0);
                }
            }
            DnsEntries::Stored { start, end } => {
                for k in start..end {
                    f(offset + k - start, self.dns_storage[k], self.norms_storage[k]);
                }
            }
        }
    }

    #[inline]
    fn resolve(&self, ups: B, dns: B) -> Option<Resolved> {
        if !self.ups.contains(ups) || !self.dns.allows(ups, dns) {
            return None;
        }
        let raw_up = self.ups.index(ups);
        let idx_up = self.ups_table.index_of_raw(raw_up)?;
        let rep_up = self.ups_table.rep(idx_up);
        let syms = self.ups_table.syms_of_raw(raw_up);
        let offset = self.ups_offset[idx_up];

        match self.entries[idx_up] {
            DnsEntries::All => {
                let sym = syms[0];
                let dns_rep = self.action.apply(sym, dns);
                Some(Resolved {
                    index: offset + self.dns.index(rep_up, dns_rep),
                    sym,
                    norm: 1.0,
                    fermi: self.fermi_ups.get(sym, ups) ^ self.fermi_dns.get(sym, dns),
                })
            }
            DnsEntries::Stored { start, end } => {
                let (dns_rep, sym) = self.action.representative_sym_subset(dns, syms);
                let k = self.dns_storage[start..end].binary_search(&dns_rep).ok()?;
                Some(Resolved {
                    index: offset + k,
                    sym,
                    norm: self.norms_storage[start + k],
                    fermi: self.fermi_ups.get(sym, ups) ^ self.fermi_dns.get(sym, dns),
                })
            }
        }
    }

    fn characters(&self) -> Option<&[Complex64]> {
        Some(&self.characters)
    }
}
