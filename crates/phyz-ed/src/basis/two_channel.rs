//! Two-channel (up/down) bases shared by the t-J and Electron models.
//!
//! A state is a pair of words `(ups, dns)`. Electrons allow any `dns` next to
//! any `ups`; t-J forbids double occupancy, so its `dns` live on the sites
//! left empty by `ups` and are stored compressed onto those sites.

use super::{Resolved, TwoChannelIndexing};
use crate::bits::BitWord;
use crate::combinatorics::{PatternIter, PatternSet};
use crate::error::{EdError, Result};
use num_complex::Complex64;

/// How down-patterns are enumerated for a given up-pattern.
#[derive(Debug, Clone)]
pub enum DnsSpace<B> {
    /// Every pattern of the set, independent of `ups`.
    Free(PatternSet<B>),
    /// Patterns on the complement of `ups`, ranked in compressed form.
    Complement {
        n_sites: usize,
        compressed: PatternSet<B>,
    },
}

impl<B: BitWord> DnsSpace<B> {
    pub fn electron(n_sites: usize, n_dn: Option<usize>) -> Result<Self> {
        Ok(DnsSpace::Free(PatternSet::new(n_sites, n_dn)?))
    }

    pub fn tj(n_sites: usize, n_up: usize, n_dn: usize) -> Result<Self> {
        if n_up + n_dn > n_sites {
            return Err(EdError::invalid(format!(
                "t-J sector n_up = {n_up}, n_dn = {n_dn} exceeds {n_sites} sites"
            )));
        }
        Ok(DnsSpace::Complement {
            n_sites,
            compressed: PatternSet::new(n_sites - n_up, Some(n_dn))?,
        })
    }

    /// Number of down-patterns per up-pattern.
    pub fn size(&self) -> usize {
        match self {
            DnsSpace::Free(set) => set.size(),
            DnsSpace::Complement { compressed, .. } => compressed.size(),
        }
    }

    pub fn n_dn(&self) -> Option<usize> {
        match self {
            DnsSpace::Free(set) => set.n_up(),
            DnsSpace::Complement { compressed, .. } => compressed.n_up(),
        }
    }

    pub fn is_constrained(&self) -> bool {
        matches!(self, DnsSpace::Complement { .. })
    }

    /// The full single-channel set the down-patterns are drawn from.
    pub fn full_set(&self) -> Result<PatternSet<B>> {
        match self {
            DnsSpace::Free(set) => Ok(set.clone()),
            DnsSpace::Complement {
                n_sites,
                compressed,
            } => PatternSet::new(*n_sites, compressed.n_up()),
        }
    }

    /// Whether `(ups, dns)` is an allowed pair.
    #[inline]
    pub fn allows(&self, ups: B, dns: B) -> bool {
        match self {
            DnsSpace::Free(set) => set.contains(dns),
            DnsSpace::Complement {
                n_sites,
                compressed,
            } => {
                (ups & dns) == B::ZERO
                    && dns & !B::mask(*n_sites) == B::ZERO
                    && Some(dns.popcount()) == compressed.n_up()
            }
        }
    }

    /// Rank of an allowed `dns` next to `ups`.
    #[inline]
    pub fn index(&self, ups: B, dns: B) -> usize {
        match self {
            DnsSpace::Free(set) => set.index(dns),
            DnsSpace::Complement {
                n_sites,
                compressed,
            } => compressed.index(dns.extract(!ups & B::mask(*n_sites))),
        }
    }

    /// The `k`-th down-pattern next to `ups`.
    #[inline]
    pub fn state(&self, ups: B, k: usize) -> B {
        match self {
            DnsSpace::Free(set) => set.state(k),
            DnsSpace::Complement {
                n_sites,
                compressed,
            } => compressed.state(k).deposit(!ups & B::mask(*n_sites)),
        }
    }

    /// All down-patterns next to `ups`, ascending.
    pub fn iter_for(&self, ups: B) -> DnsIter<B> {
        match self {
            DnsSpace::Free(set) => DnsIter {
                inner: set.iter(),
                deposit_mask: None,
            },
            DnsSpace::Complement {
                n_sites,
                compressed,
            } => DnsIter {
                inner: compressed.iter(),
                deposit_mask: Some(!ups & B::mask(*n_sites)),
            },
        }
    }
}

/// Iterator over the down-patterns of one up-pattern.
#[derive(Debug, Clone)]
pub struct DnsIter<B> {
    inner: PatternIter<B>,
    deposit_mask: Option<B>,
}

impl<B: BitWord> Iterator for DnsIter<B> {
    type Item = B;

    #[inline]
    fn next(&mut self) -> Option<B> {
        let dns = self.inner.next()?;
        Some(match self.deposit_mask {
            Some(mask) => dns.deposit(mask),
            None => dns,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Number of `(ups, dns)` pairs, failing when it does not fit an index.
pub(crate) fn pair_count(n_sites: usize, n_ups: usize, n_dns: usize) -> Result<usize> {
    n_ups.checked_mul(n_dns).ok_or_else(|| {
        EdError::invalid(format!(
            "{n_ups} x {n_dns} two-channel states on {n_sites} sites overflow the index type"
        ))
    })
}

/// Unsymmetrized two-channel basis, indexed `index_up * size_dns + index_dn`.
#[derive(Debug, Clone)]
pub struct TwoChannelPlain<B> {
    n_sites: usize,
    size: usize,
    ups: PatternSet<B>,
    dns: DnsSpace<B>,
}

impl<B: BitWord> TwoChannelPlain<B> {
    pub fn new(ups: PatternSet<B>, dns: DnsSpace<B>) -> Result<Self> {
        let n_sites = ups.n_sites();
        let size = pair_count(n_sites, ups.size(), dns.size())?;
        Ok(Self {
            n_sites,
            size,
            ups,
            dns,
        })
    }

    pub fn ups(&self) -> &PatternSet<B> {
        &self.ups
    }

    pub fn dns(&self) -> &DnsSpace<B> {
        &self.dns
    }

    pub fn size_dns(&self) -> usize {
        self.dns.size()
    }

    pub fn index(&self, ups: B, dns: B) -> Option<usize> {
        if !self.ups.contains(ups) || !self.dns.allows(ups, dns) {
            return None;
        }
        Some(self.ups.index(ups) * self.dns.size() + self.dns.index(ups, dns))
    }

    pub fn state(&self, idx: usize) -> (B, B) {
        let size_dns = self.dns.size();
        let ups = self.ups.state(idx / size_dns);
        (ups, self.dns.state(ups, idx % size_dns))
    }

    /// All `(ups, dns)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (B, B)> + '_ {
        self.ups
            .iter()
            .flat_map(move |ups| self.dns.iter_for(ups).map(move |dns| (ups, dns)))
    }
}

impl<B: BitWord> TwoChannelIndexing<B> for TwoChannelPlain<B> {
    fn n_sites(&self) -> usize {
        self.n_sites
    }

    fn size(&self) -> usize {
        self.size
    }

    fn n_ups(&self) -> usize {
        self.ups.size()
    }

    fn ups_at(&self, idx_up: usize) -> B {
        self.ups.state(idx_up)
    }

    fn ups_offset(&self, idx_up: usize) -> usize {
        idx_up * self.dns.size()
    }

    fn for_each_dns<F: FnMut(usize, B, f64)>(&self, idx_up: usize, ups: B, mut f: F) {
        let offset = idx_up * self.dns.size();
        for (k, dns) in self.dns.iter_for(ups).enumerate() {
            f(offset + k, dns, 1.0);
        }
    }

    #[inline]
    fn resolve(&self, ups: B, dns: B) -> Option<Resolved> {
        self.index(ups, dns).map(Resolved::plain)
    }

    fn characters(&self) -> Option<&[Complex64]> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tj_round_trip() {
        let n = 6;
        let basis = TwoChannelPlain::<u16>::new(
            PatternSet::new(n, Some(2)).unwrap(),
            DnsSpace::tj(n, 2, 2).unwrap(),
        )
        .unwrap();
        // C(6,2) * C(4,2)
        assert_eq!(basis.size(), 15 * 6);
        for (i, (ups, dns)) in basis.iter().enumerate() {
            assert_eq!(ups & dns, 0);
            assert_eq!(basis.index(ups, dns), Some(i));
            assert_eq!(basis.state(i), (ups, dns));
        }
        assert_eq!(basis.index(0b11, 0b11), None);
    }

    #[test]
    fn test_electron_round_trip() {
        let n = 4;
        let basis = TwoChannelPlain::<u16>::new(
            PatternSet::new(n, Some(1)).unwrap(),
            DnsSpace::electron(n, Some(2)).unwrap(),
        )
        .unwrap();
        assert_eq!(basis.size(), 4 * 6);
        for (i, (ups, dns)) in basis.iter().enumerate() {
            assert_eq!(basis.index(ups, dns), Some(i));
            assert_eq!(basis.state(i), (ups, dns));
        }
    }

    #[test]
    fn test_size_overflow_is_an_error() {
        // 2^40 * 2^40 pairs
        let err = TwoChannelPlain::<u64>::new(
            PatternSet::new(40, None).unwrap(),
            DnsSpace::electron(40, None).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, EdError::InvalidArgument(_)));
        assert!(pair_count(40, 1 << 40, 1 << 20).is_ok());
    }

    #[test]
    fn test_tj_sector_too_full() {
        assert!(DnsSpace::<u16>::tj(4, 3, 2).is_err());
    }
}
