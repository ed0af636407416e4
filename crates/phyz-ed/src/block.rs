//! Hilbert-space blocks: a model, a sector, and optionally a symmetry.
//!
//! A block owns its basis behind an `Arc`, so clones are cheap and share
//! the representative tables. Two clones of one block are recognized as the
//! same space by [`Block::same_space`].

use crate::basis::{SpinhalfBasis, TwoChannelBasis, TwoChannelKind};
use crate::bits::MAX_SITES;
use crate::error::{EdError, Result, ResultExt};
use crate::symmetries::{PermutationGroup, Representation, Symmetry};
use std::sync::Arc;

fn check_n_sites(n_sites: usize) -> Result<()> {
    if n_sites > MAX_SITES {
        return Err(EdError::invalid(format!(
            "{n_sites} sites exceed the maximum of {MAX_SITES}"
        )));
    }
    Ok(())
}

fn check_count(n_sites: usize, count: usize, what: &str) -> Result<()> {
    if count > n_sites {
        return Err(EdError::invalid(format!(
            "{what} = {count} exceeds the number of sites {n_sites}"
        )));
    }
    Ok(())
}

/// Spin-1/2 block, optionally with fixed `n_up`.
#[derive(Debug, Clone)]
pub struct Spinhalf {
    n_sites: usize,
    n_up: Option<usize>,
    symmetry: Option<Symmetry>,
    basis: Arc<SpinhalfBasis>,
}

impl Spinhalf {
    /// All `2^n_sites` configurations.
    pub fn new(n_sites: usize) -> Result<Self> {
        Self::build(n_sites, None, None).context("Spinhalf::new")
    }

    /// Configurations with exactly `n_up` up-spins.
    pub fn with_sz(n_sites: usize, n_up: usize) -> Result<Self> {
        Self::build(n_sites, Some(n_up), None).context("Spinhalf::with_sz")
    }

    pub fn symmetric(
        n_sites: usize,
        group: &PermutationGroup,
        irrep: &Representation,
    ) -> Result<Self> {
        let symmetry = Symmetry::new(group, irrep).context("Spinhalf::symmetric")?;
        Self::build(n_sites, None, Some(symmetry)).context("Spinhalf::symmetric")
    }

    pub fn symmetric_sz(
        n_sites: usize,
        n_up: usize,
        group: &PermutationGroup,
        irrep: &Representation,
    ) -> Result<Self> {
        let symmetry = Symmetry::new(group, irrep).context("Spinhalf::symmetric_sz")?;
        Self::build(n_sites, Some(n_up), Some(symmetry)).context("Spinhalf::symmetric_sz")
    }

    fn build(n_sites: usize, n_up: Option<usize>, symmetry: Option<Symmetry>) -> Result<Self> {
        check_n_sites(n_sites)?;
        if let Some(n_up) = n_up {
            check_count(n_sites, n_up, "n_up")?;
        }
        let basis = SpinhalfBasis::new(n_sites, n_up, symmetry.as_ref())?;
        Ok(Self {
            n_sites,
            n_up,
            symmetry,
            basis: Arc::new(basis),
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_up(&self) -> Option<usize> {
        self.n_up
    }

    pub fn size(&self) -> usize {
        self.basis.size()
    }

    pub fn symmetry(&self) -> Option<&Symmetry> {
        self.symmetry.as_ref()
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry.is_some()
    }

    pub fn is_real(&self) -> bool {
        self.symmetry.as_ref().is_none_or(|s| s.irrep().is_real())
    }

    pub fn basis(&self) -> &SpinhalfBasis {
        &self.basis
    }

    pub fn state(&self, idx: usize) -> u64 {
        self.basis.state(idx)
    }

    pub fn index(&self, state: u64) -> Option<usize> {
        self.basis.index(state)
    }

    pub fn norm(&self, idx: usize) -> f64 {
        self.basis.norm(idx)
    }
}

/// t-J block: no doubly occupied sites, fixed `(n_up, n_dn)`.
#[derive(Debug, Clone)]
pub struct Tj {
    n_sites: usize,
    n_up: usize,
    n_dn: usize,
    symmetry: Option<Symmetry>,
    basis: Arc<TwoChannelBasis>,
}

impl Tj {
    pub fn new(n_sites: usize, n_up: usize, n_dn: usize) -> Result<Self> {
        Self::build(n_sites, n_up, n_dn, None).context("Tj::new")
    }

    pub fn symmetric(
        n_sites: usize,
        n_up: usize,
        n_dn: usize,
        group: &PermutationGroup,
        irrep: &Representation,
    ) -> Result<Self> {
        let symmetry = Symmetry::new(group, irrep).context("Tj::symmetric")?;
        Self::build(n_sites, n_up, n_dn, Some(symmetry)).context("Tj::symmetric")
    }

    fn build(n_sites: usize, n_up: usize, n_dn: usize, symmetry: Option<Symmetry>) -> Result<Self> {
        check_n_sites(n_sites)?;
        check_count(n_sites, n_up + n_dn, "n_up + n_dn")?;
        let basis =
            TwoChannelBasis::new(n_sites, TwoChannelKind::Tj { n_up, n_dn }, symmetry.as_ref())?;
        Ok(Self {
            n_sites,
            n_up,
            n_dn,
            symmetry,
            basis: Arc::new(basis),
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_up(&self) -> usize {
        self.n_up
    }

    pub fn n_dn(&self) -> usize {
        self.n_dn
    }

    pub fn size(&self) -> usize {
        self.basis.size()
    }

    pub fn symmetry(&self) -> Option<&Symmetry> {
        self.symmetry.as_ref()
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry.is_some()
    }

    pub fn is_real(&self) -> bool {
        self.symmetry.as_ref().is_none_or(|s| s.irrep().is_real())
    }

    pub fn basis(&self) -> &TwoChannelBasis {
        &self.basis
    }

    pub fn state(&self, idx: usize) -> (u64, u64) {
        self.basis.state(idx)
    }

    pub fn index(&self, ups: u64, dns: u64) -> Option<usize> {
        self.basis.index(ups, dns)
    }

    pub fn norm(&self, idx: usize) -> f64 {
        self.basis.norm(idx)
    }
}

/// Hubbard block: up and down electrons, double occupancy allowed.
#[derive(Debug, Clone)]
pub struct Electron {
    n_sites: usize,
    np: Option<(usize, usize)>,
    symmetry: Option<Symmetry>,
    basis: Arc<TwoChannelBasis>,
}

impl Electron {
    /// All `4^n_sites` configurations.
    pub fn new(n_sites: usize) -> Result<Self> {
        Self::build(n_sites, None, None).context("Electron::new")
    }

    pub fn with_np(n_sites: usize, n_up: usize, n_dn: usize) -> Result<Self> {
        Self::build(n_sites, Some((n_up, n_dn)), None).context("Electron::with_np")
    }

    pub fn symmetric(
        n_sites: usize,
        n_up: usize,
        n_dn: usize,
        group: &PermutationGroup,
        irrep: &Representation,
    ) -> Result<Self> {
        let symmetry = Symmetry::new(group, irrep).context("Electron::symmetric")?;
        Self::build(n_sites, Some((n_up, n_dn)), Some(symmetry)).context("Electron::symmetric")
    }

    /// Symmetric block without particle-number conservation.
    pub fn symmetric_all(
        n_sites: usize,
        group: &PermutationGroup,
        irrep: &Representation,
    ) -> Result<Self> {
        let symmetry = Symmetry::new(group, irrep).context("Electron::symmetric_all")?;
        Self::build(n_sites, None, Some(symmetry)).context("Electron::symmetric_all")
    }

    fn build(
        n_sites: usize,
        np: Option<(usize, usize)>,
        symmetry: Option<Symmetry>,
    ) -> Result<Self> {
        check_n_sites(n_sites)?;
        if let Some((n_up, n_dn)) = np {
            check_count(n_sites, n_up, "n_up")?;
            check_count(n_sites, n_dn, "n_dn")?;
        }
        let basis =
            TwoChannelBasis::new(n_sites, TwoChannelKind::Electron { np }, symmetry.as_ref())?;
        Ok(Self {
            n_sites,
            np,
            symmetry,
            basis: Arc::new(basis),
        })
    }

    pub fn n_sites(&self) -> usize {
        self.n_sites
    }

    pub fn n_up(&self) -> Option<usize> {
        self.np.map(|(u, _)| u)
    }

    pub fn n_dn(&self) -> Option<usize> {
        self.np.map(|(_, d)| d)
    }

    pub fn size(&self) -> usize {
        self.basis.size()
    }

    pub fn symmetry(&self) -> Option<&Symmetry> {
        self.symmetry.as_ref()
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry.is_some()
    }

    pub fn is_real(&self) -> bool {
        self.symmetry.as_ref().is_none_or(|s| s.irrep().is_real())
    }

    pub fn basis(&self) -> &TwoChannelBasis {
        &self.basis
    }

    pub fn state(&self, idx: usize) -> (u64, u64) {
        self.basis.state(idx)
    }

    pub fn index(&self, ups: u64, dns: u64) -> Option<usize> {
        self.basis.index(ups, dns)
    }

    pub fn norm(&self, idx: usize) -> f64 {
        self.basis.norm(idx)
    }
}

/// Any Hilbert-space block.
#[derive(Debug, Clone)]
pub enum Block {
    Spinhalf(Spinhalf),
    Tj(Tj),
    Electron(Electron),
}

impl Block {
    pub fn model(&self) -> &'static str {
        match self {
            Self::Spinhalf(_) => "Spinhalf",
            Self::Tj(_) => "tJ",
            Self::Electron(_) => "Electron",
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Self::Spinhalf(b) => b.size(),
            Self::Tj(b) => b.size(),
            Self::Electron(b) => b.size(),
        }
    }

    pub fn n_sites(&self) -> usize {
        match self {
            Self::Spinhalf(b) => b.n_sites(),
            Self::Tj(b) => b.n_sites(),
            Self::Electron(b) => b.n_sites(),
        }
    }

    /// Fixed up count; for spin-1/2 the number of up spins.
    pub fn n_up(&self) -> Option<usize> {
        match self {
            Self::Spinhalf(b) => b.n_up(),
            Self::Tj(b) => Some(b.n_up()),
            Self::Electron(b) => b.n_up(),
        }
    }

    /// Fixed down count; for spin-1/2 the number of down spins.
    pub fn n_dn(&self) -> Option<usize> {
        match self {
            Self::Spinhalf(b) => b.n_up().map(|u| b.n_sites() - u),
            Self::Tj(b) => Some(b.n_dn()),
            Self::Electron(b) => b.n_dn(),
        }
    }

    pub fn symmetry(&self) -> Option<&Symmetry> {
        match self {
            Self::Spinhalf(b) => b.symmetry(),
            Self::Tj(b) => b.symmetry(),
            Self::Electron(b) => b.symmetry(),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        self.symmetry().is_some()
    }

    /// Whether the block admits real-valued vectors and matrices.
    pub fn is_real(&self) -> bool {
        match self {
            Self::Spinhalf(b) => b.is_real(),
            Self::Tj(b) => b.is_real(),
            Self::Electron(b) => b.is_real(),
        }
    }

    /// A block of the same model on the same sites with another sector and
    /// symmetry. `np` is ignored for spin-1/2 down counts and required for t-J.
    pub(crate) fn rebuild(
        &self,
        np: Option<(usize, usize)>,
        symmetry: Option<Symmetry>,
    ) -> Result<Block> {
        let n_sites = self.n_sites();
        Ok(match self {
            Self::Spinhalf(_) => Spinhalf::build(n_sites, np.map(|(u, _)| u), symmetry)?.into(),
            Self::Tj(_) => {
                let (n_up, n_dn) = np.ok_or_else(|| {
                    EdError::invalid("t-J blocks need fixed particle numbers")
                })?;
                Tj::build(n_sites, n_up, n_dn, symmetry)?.into()
            }
            Self::Electron(_) => Electron::build(n_sites, np, symmetry)?.into(),
        })
    }

    /// Whether both blocks share one basis object.
    pub fn same_space(&self, other: &Block) -> bool {
        match (self, other) {
            (Self::Spinhalf(a), Self::Spinhalf(b)) => Arc::ptr_eq(&a.basis, &b.basis),
            (Self::Tj(a), Self::Tj(b)) => Arc::ptr_eq(&a.basis, &b.basis),
            (Self::Electron(a), Self::Electron(b)) => Arc::ptr_eq(&a.basis, &b.basis),
            _ => false,
        }
    }
}

impl From<Spinhalf> for Block {
    fn from(b: Spinhalf) -> Self {
        Self::Spinhalf(b)
    }
}

impl From<Tj> for Block {
    fn from(b: Tj) -> Self {
        Self::Tj(b)
    }
}

impl From<Electron> for Block {
    fn from(b: Electron) -> Self {
        Self::Electron(b)
    }
}
