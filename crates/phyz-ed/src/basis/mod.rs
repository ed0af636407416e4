//! Basis variants for spin-1/2 and two-channel (t-J, Electron) models.
//!
//! Each variant is generic over the bit word. A block fixes the word width
//! once from its site count and stores the variant in a width-tagged enum
//! ([`SpinhalfBasis`], [`TwoChannelBasis`]); kernels are instantiated per
//! width so the inner loops never branch on it.
//!
//! The application engine talks to all variants through two traits:
//! [`SpinIndexing`] and [`TwoChannelIndexing`]. Plain bases answer them as a
//! symmetric basis over the trivial group would: every state is its own
//! representative with unit norm.

mod spinhalf;
mod two_channel;
mod two_channel_symmetric;

pub use spinhalf::{SpinhalfPlain, SpinhalfSymmetric};
pub use two_channel::{DnsIter, DnsSpace, TwoChannelPlain};
pub(crate) use two_channel::pair_count;
pub use two_channel_symmetric::TwoChannelSymmetric;

use crate::bits::{BitWord, Width};
use crate::combinatorics::PatternSet;
use crate::error::Result;
use crate::symmetries::Symmetry;
use num_complex::Complex64;
use std::ops::Range;

/// Where a raw target state lands in a basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    /// Position of the orbit representative.
    pub index: usize,
    /// A symmetry mapping the raw state onto the representative.
    pub sym: usize,
    /// Norm of the representative.
    pub norm: f64,
    /// Fermionic reordering parity of applying `sym`.
    pub fermi: bool,
}

impl Resolved {
    #[inline]
    pub fn plain(index: usize) -> Self {
        Self {
            index,
            sym: 0,
            norm: 1.0,
            fermi: false,
        }
    }
}

/// Single-word bases as seen by the application engine.
pub trait SpinIndexing<B: BitWord>: Sync {
    fn n_sites(&self) -> usize;
    fn size(&self) -> usize;
    fn state(&self, idx: usize) -> B;
    fn norm(&self, idx: usize) -> f64;
    /// Visit `(index, state)` for the basis positions in `range`.
    fn for_each_in<F: FnMut(usize, B)>(&self, range: Range<usize>, f: F);
    /// Locate the orbit of a raw state; `None` if it is not in the basis.
    fn resolve(&self, state: B) -> Option<Resolved>;
    /// Irrep characters, `None` for plain bases.
    fn characters(&self) -> Option<&[Complex64]>;
}

/// Two-word bases, organized by up-pattern (representative).
pub trait TwoChannelIndexing<B: BitWord>: Sync {
    fn n_sites(&self) -> usize;
    fn size(&self) -> usize;
    /// Number of up-patterns (representatives).
    fn n_ups(&self) -> usize;
    fn ups_at(&self, idx_up: usize) -> B;
    /// First basis position belonging to up-pattern `idx_up`.
    fn ups_offset(&self, idx_up: usize) -> usize;
    /// Visit `(index, dns, norm)` for the states sharing up-pattern `idx_up`.
    fn for_each_dns<F: FnMut(usize, B, f64)>(&self, idx_up: usize, ups: B, f: F);
    fn resolve(&self, ups: B, dns: B) -> Option<Resolved>;
    fn characters(&self) -> Option<&[Complex64]>;
}

/// Spin-1/2 basis with its word width fixed.
#[derive(Debug, Clone)]
pub enum SpinhalfBasis {
    Plain16(SpinhalfPlain<u16>),
    Plain32(SpinhalfPlain<u32>),
    Plain64(SpinhalfPlain<u64>),
    Symmetric16(SpinhalfSymmetric<u16>),
    Symmetric32(SpinhalfSymmetric<u32>),
    Symmetric64(SpinhalfSymmetric<u64>),
}

/// Evaluate `$body` with `$b` bound to the concrete spin-1/2 basis.
macro_rules! with_spinhalf_basis {
    ($basis:expr, $b:ident => $body:expr) => {
        match $basis {
            $crate::basis::SpinhalfBasis::Plain16($b) => $body,
            $crate::basis::SpinhalfBasis::Plain32($b) => $body,
            $crate::basis::SpinhalfBasis::Plain64($b) => $body,
            $crate::basis::SpinhalfBasis::Symmetric16($b) => $body,
            $crate::basis::SpinhalfBasis::Symmetric32($b) => $body,
            $crate::basis::SpinhalfBasis::Symmetric64($b) => $body,
        }
    };
}

impl SpinhalfBasis {
    pub fn new(n_sites: usize, n_up: Option<usize>, symmetry: Option<&Symmetry>) -> Result<Self> {
        Ok(match (Width::for_sites(n_sites), symmetry) {
            (Width::U16, None) => Self::Plain16(SpinhalfPlain::new(n_sites, n_up)?),
            (Width::U32, None) => Self::Plain32(SpinhalfPlain::new(n_sites, n_up)?),
            (Width::U64, None) => Self::Plain64(SpinhalfPlain::new(n_sites, n_up)?),
            (Width::U16, Some(s)) => Self::Symmetric16(SpinhalfSymmetric::new(n_sites, n_up, s)?),
            (Width::U32, Some(s)) => Self::Symmetric32(SpinhalfSymmetric::new(n_sites, n_up, s)?),
            (Width::U64, Some(s)) => Self::Symmetric64(SpinhalfSymmetric::new(n_sites, n_up, s)?),
        })
    }

    pub fn size(&self) -> usize {
        with_spinhalf_basis!(self, b => b.size())
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            Self::Symmetric16(_) | Self::Symmetric32(_) | Self::Symmetric64(_)
        )
    }

    /// State at position `idx`, widened to `u64`.
    pub fn state(&self, idx: usize) -> u64 {
        with_spinhalf_basis!(self, b => b.state(idx).to_u64())
    }

    /// Position of a basis state (a representative for symmetric bases).
    pub fn index(&self, state: u64) -> Option<usize> {
        with_spinhalf_basis!(self, b => b.index(BitWord::from_u64(state)))
    }

    pub fn norm(&self, idx: usize) -> f64 {
        with_spinhalf_basis!(self, b => b.norm(idx))
    }
}

/// Two-channel basis with its word width fixed.
#[derive(Debug, Clone)]
pub enum TwoChannelBasis {
    Plain16(TwoChannelPlain<u16>),
    Plain32(TwoChannelPlain<u32>),
    Plain64(TwoChannelPlain<u64>),
    Symmetric16(TwoChannelSymmetric<u16>),
    Symmetric32(TwoChannelSymmetric<u32>),
    Symmetric64(TwoChannelSymmetric<u64>),
}

/// Evaluate `$body` with `$b` bound to the concrete two-channel basis.
macro_rules! with_two_channel_basis {
    ($basis:expr, $b:ident => $body:expr) => {
        match $basis {
            $crate::basis::TwoChannelBasis::Plain16($b) => $body,
            $crate::basis::TwoChannelBasis::Plain32($b) => $body,
            $crate::basis::TwoChannelBasis::Plain64($b) => $body,
            $crate::basis::TwoChannelBasis::Symmetric16($b) => $body,
            $crate::basis::TwoChannelBasis::Symmetric32($b) => $body,
            $crate::basis::TwoChannelBasis::Symmetric64($b) => $body,
        }
    };
}

/// Sector of a two-channel model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoChannelKind {
    /// No double occupancy; `(n_up, n_dn)` fixed.
    Tj { n_up: usize, n_dn: usize },
    /// Hubbard electrons; both counts fixed or neither.
    Electron { np: Option<(usize, usize)> },
}

fn build_two_channel<B: BitWord>(
    n_sites: usize,
    kind: TwoChannelKind,
) -> Result<(PatternSet<B>, DnsSpace<B>)> {
    match kind {
        TwoChannelKind::Tj { n_up, n_dn } => {
            let dns = DnsSpace::tj(n_sites, n_up, n_dn)?;
            Ok((PatternSet::new(n_sites, Some(n_up))?, dns))
        }
        TwoChannelKind::Electron { np } => Ok((
            PatternSet::new(n_sites, np.map(|(u, _)| u))?,
            DnsSpace::electron(n_sites, np.map(|(_, d)| d))?,
        )),
    }
}

impl TwoChannelBasis {
    pub fn new(n_sites: usize, kind: TwoChannelKind, symmetry: Option<&Symmetry>) -> Result<Self> {
        Ok(match Width::for_sites(n_sites) {
            Width::U16 => {
                let (ups, dns) = build_two_channel::<u16>(n_sites, kind)?;
                match symmetry {
                    None => Self::Plain16(TwoChannelPlain::new(ups, dns)?),
                    Some(s) => Self::Symmetric16(TwoChannelSymmetric::new(ups, dns, s)?),
                }
            }
            Width::U32 => {
                let (ups, dns) = build_two_channel::<u32>(n_sites, kind)?;
                match symmetry {
                    None => Self::Plain32(TwoChannelPlain::new(ups, dns)?),
                    Some(s) => Self::Symmetric32(TwoChannelSymmetric::new(ups, dns, s)?),
                }
            }
            Width::U64 => {
                let (ups, dns) = build_two_channel::<u64>(n_sites, kind)?;
                match symmetry {
                    None => Self::Plain64(TwoChannelPlain::new(ups, dns)?),
                    Some(s) => Self::Symmetric64(TwoChannelSymmetric::new(ups, dns, s)?),
                }
            }
        })
    }

    pub fn size(&self) -> usize {
        with_two_channel_basis!(self, b => b.size())
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            Self::Symmetric16(_) | Self::Symmetric32(_) | Self::Symmetric64(_)
        )
    }

    /// `(ups, dns)` at position `idx`, widened to `u64`.
    pub fn state(&self, idx: usize) -> (u64, u64) {
        with_two_channel_basis!(self, b => {
            let (u, d) = b.state(idx);
            (u.to_u64(), d.to_u64())
        })
    }

    pub fn index(&self, ups: u64, dns: u64) -> Option<usize> {
        with_two_channel_basis!(self, b => b.index(BitWord::from_u64(ups), BitWord::from_u64(dns)))
    }

    pub fn norm(&self, idx: usize) -> f64 {
        match self {
            Self::Symmetric16(b) => b.norm(idx),
            Self::Symmetric32(b) => b.norm(idx),
            Self::Symmetric64(b) => b.norm(idx),
            _ => 1.0,
        }
    }
}
