use super::op_type::{Arity, OpType};
use crate::error::{EdError, Result};
use crate::symmetries::Permutation;
use nalgebra::DMatrix;
use num_complex::Complex64;
use phyz_math::Scalar;
use std::collections::HashSet;
use std::fmt;
use std::ops::{Add, AddAssign};

/// Imaginary parts below this make a coupling or matrix real.
const REAL_TOLERANCE: f64 = 1e-12;

/// A typed term acting on a list of sites.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    kind: OpType,
    sites: Vec<usize>,
    matrix: Option<DMatrix<Complex64>>,
}

impl Op {
    /// A term without a local matrix. The site list is validated against
    /// the arity of `kind`.
    pub fn new(kind: OpType, sites: impl Into<Vec<usize>>) -> Result<Self> {
        let op = Self {
            kind,
            sites: sites.into(),
            matrix: None,
        };
        op.validate()?;
        Ok(op)
    }

    /// A dense local operator on `sites`, of dimension `2^sites.len()`.
    /// Site `sites[k]` is bit `k` of the row and column index.
    pub fn matrix(sites: impl Into<Vec<usize>>, matrix: DMatrix<Complex64>) -> Result<Self> {
        let op = Self {
            kind: OpType::Matrix,
            sites: sites.into(),
            matrix: Some(matrix),
        };
        op.validate()?;
        Ok(op)
    }

    /// A real dense local operator.
    pub fn real_matrix(sites: impl Into<Vec<usize>>, matrix: &DMatrix<f64>) -> Result<Self> {
        Self::matrix(sites, matrix.map(|x| Complex64::new(x, 0.0)))
    }

    pub fn kind(&self) -> OpType {
        self.kind
    }

    pub fn sites(&self) -> &[usize] {
        &self.sites
    }

    pub fn site(&self, k: usize) -> usize {
        self.sites[k]
    }

    pub fn local_matrix(&self) -> Option<&DMatrix<Complex64>> {
        self.matrix.as_ref()
    }

    /// Whether all entries of the local matrix are real (vacuous otherwise).
    pub fn is_real(&self) -> bool {
        !self.kind.is_intrinsically_complex()
            && self
                .matrix
                .as_ref()
                .is_none_or(|m| m.iter().all(|z| z.im.abs() < REAL_TOLERANCE))
    }

    pub(crate) fn error(&self, reason: impl Into<String>) -> EdError {
        EdError::InvalidTerm {
            kind: self.kind.to_string(),
            sites: self.sites.clone(),
            reason: reason.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let unique: HashSet<usize> = self.sites.iter().copied().collect();
        if unique.len() != self.sites.len() {
            return Err(self.error("sites are not disjoint"));
        }
        match self.kind.arity() {
            Arity::None if !self.sites.is_empty() => {
                return Err(self.error("term takes no sites"));
            }
            Arity::Exactly(n) if self.sites.len() != n => {
                return Err(self.error(format!(
                    "term takes {n} site(s), got {}",
                    self.sites.len()
                )));
            }
            Arity::Matrix => {
                if self.sites.is_empty() {
                    return Err(self.error("matrix term needs at least one site"));
                }
                let dim = 1usize
                    .checked_shl(self.sites.len() as u32)
                    .ok_or_else(|| self.error("matrix term on too many sites"))?;
                match &self.matrix {
                    Some(m) if m.nrows() == dim && m.ncols() == dim => {}
                    Some(m) => {
                        return Err(self.error(format!(
                            "matrix is {}x{}, expected {dim}x{dim}",
                            m.nrows(),
                            m.ncols()
                        )));
                    }
                    None => return Err(self.error("matrix term without a matrix")),
                }
            }
            _ => {}
        }
        if self.kind != OpType::Matrix && self.matrix.is_some() {
            return Err(self.error("only Matrix terms carry a matrix"));
        }
        Ok(())
    }

    /// Check that all sites exist on a lattice of `n_sites`.
    pub fn check(&self, n_sites: usize) -> Result<()> {
        if let Some(&s) = self.sites.iter().find(|&&s| s >= n_sites) {
            return Err(self.error(format!("site {s} out of range for {n_sites} sites")));
        }
        Ok(())
    }

    /// The same term on relabeled sites: site `i` becomes `perm.get(i)`.
    pub fn permute(&self, perm: &Permutation) -> Result<Op> {
        if let Some(&s) = self.sites.iter().find(|&&s| s >= perm.n_sites()) {
            return Err(self.error(format!(
                "site {s} out of range for a permutation of {} sites",
                perm.n_sites()
            )));
        }
        Ok(Self {
            kind: self.kind,
            sites: self.sites.iter().map(|&s| perm.get(s)).collect(),
            matrix: self.matrix.clone(),
        })
    }

    /// Up-particle change of a local matrix, if it conserves the count.
    ///
    /// `Some(0)` when every non-zero entry connects equal popcounts.
    pub(crate) fn matrix_nup_change(&self) -> Option<i64> {
        let m = self.matrix.as_ref()?;
        let mut change = None;
        for col in 0..m.ncols() {
            for row in 0..m.nrows() {
                if m[(row, col)].norm() < REAL_TOLERANCE {
                    continue;
                }
                let d = row.count_ones() as i64 - col.count_ones() as i64;
                match change {
                    None => change = Some(d),
                    Some(c) if c != d => return None,
                    _ => {}
                }
            }
        }
        Some(change.unwrap_or(0))
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.kind, self.sites)
    }
}

/// Coefficient of a term.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coupling {
    Real(f64),
    Complex(Complex64),
}

impl Coupling {
    pub fn is_real(self) -> bool {
        match self {
            Coupling::Real(_) => true,
            Coupling::Complex(z) => z.im.abs() < REAL_TOLERANCE,
        }
    }

    pub fn to_complex(self) -> Complex64 {
        match self {
            Coupling::Real(x) => Complex64::new(x, 0.0),
            Coupling::Complex(z) => z,
        }
    }

    /// Narrow to the scalar type of a computation.
    pub fn to_scalar<T: Scalar>(self) -> Option<T> {
        T::from_complex(self.to_complex())
    }
}

impl From<f64> for Coupling {
    fn from(x: f64) -> Self {
        Coupling::Real(x)
    }
}

impl From<Complex64> for Coupling {
    fn from(z: Complex64) -> Self {
        Coupling::Complex(z)
    }
}

impl std::ops::Mul<f64> for Coupling {
    type Output = Coupling;

    fn mul(self, rhs: f64) -> Coupling {
        match self {
            Coupling::Real(x) => Coupling::Real(x * rhs),
            Coupling::Complex(z) => Coupling::Complex(z * rhs),
        }
    }
}

/// A sum of terms with couplings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpSum {
    terms: Vec<(Coupling, Op)>,
}

impl OpSum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, coupling: impl Into<Coupling>, op: Op) {
        self.terms.push((coupling.into(), op));
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Coupling, Op)> {
        self.terms.iter()
    }

    /// Check every term against a lattice of `n_sites`.
    pub fn check(&self, n_sites: usize) -> Result<()> {
        self.terms.iter().try_for_each(|(_, op)| op.check(n_sites))
    }

    /// Whether every coupling and every term is real.
    pub fn is_real(&self) -> bool {
        self.terms.iter().all(|(c, op)| c.is_real() && op.is_real())
    }

    /// Every term relabeled by `perm`.
    pub fn permute(&self, perm: &Permutation) -> Result<OpSum> {
        let terms = self
            .terms
            .iter()
            .map(|(c, op)| Ok((*c, op.permute(perm)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { terms })
    }
}

impl<C: Into<Coupling>> AddAssign<(C, Op)> for OpSum {
    fn add_assign(&mut self, (coupling, op): (C, Op)) {
        self.push(coupling, op);
    }
}

impl AddAssign<OpSum> for OpSum {
    fn add_assign(&mut self, other: OpSum) {
        self.terms.extend(other.terms);
    }
}

impl Add for OpSum {
    type Output = OpSum;

    fn add(mut self, other: OpSum) -> OpSum {
        self += other;
        self
    }
}

impl<C: Into<Coupling>> FromIterator<(C, Op)> for OpSum {
    fn from_iter<I: IntoIterator<Item = (C, Op)>>(iter: I) -> Self {
        Self {
            terms: iter.into_iter().map(|(c, op)| (c.into(), op)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a OpSum {
    type Item = &'a (Coupling, Op);
    type IntoIter = std::slice::Iter<'a, (Coupling, Op)>;

    fn into_iter(self) -> Self::IntoIter {
        self.terms.iter()
    }
}
