//! The term-application engine.
//!
//! An [`Operator`] is a term list compiled for a pair of blocks. It either
//! fills a dense matrix ([`Operator::matrix`]) or multiplies a vector
//! without storing the matrix ([`Operator::apply`]). Both go through the
//! same kernels; only the [`Fill`] sink differs. [`inner`] and
//! [`inner_between`] reduce a multiply to a matrix element, and
//! [`target_block`] names the block a term list maps into.
//!
//! Every term is dispatched once to a concrete struct, and every block pair
//! once to a concrete pair of bases, so the inner loops are monomorphic.
//!
//! On symmetric blocks the raw target state of a term is resolved to its
//! orbit representative and the element is rescaled by
//! `chi(sym) * norm(target) / norm(source)`, negated when applying `sym`
//! reorders an odd number of fermions. Targets outside the output basis
//! contribute nothing.

mod fill;
mod spin;
pub(crate) mod two_channel;

pub use fill::{DenseFill, Fill, MatvecFill};

use crate::basis::{Resolved, SpinhalfBasis, TwoChannelBasis};
use crate::block::Block;
use crate::error::{EdError, Result, ResultExt};
use crate::operators::{Model, Op, OpSum, OpType, compile, representation};
use crate::symmetries::Symmetry;
use nalgebra::{DMatrix, DVector};
use phyz_math::Scalar;
use tracing::debug;

#[inline]
pub(crate) fn element<T: Scalar>(val: T, r: &Resolved, norm_in: f64, chars: Option<&[T]>) -> T {
    let val = match chars {
        Some(chars) => val * chars[r.sym] * T::from_real(r.norm / norm_in),
        None => val,
    };
    if r.fermi { -val } else { val }
}

/// A term list compiled for one pair of blocks.
#[derive(Debug, Clone)]
pub struct Operator<T> {
    terms: OpSum,
    block_in: Block,
    block_out: Block,
    characters: Option<Vec<T>>,
    same: bool,
}

fn model_of(block: &Block) -> Model {
    match block {
        Block::Spinhalf(_) => Model::Spinhalf,
        Block::Tj(_) => Model::Tj,
        Block::Electron(_) => Model::Electron,
    }
}

fn check_numeric<T: Scalar>(ops: &OpSum, block_in: &Block, block_out: &Block) -> Result<()> {
    if T::IS_COMPLEX {
        return Ok(());
    }
    if let Some((_, op)) = ops.iter().find(|(c, op)| !c.is_real() || !op.is_real()) {
        return Err(EdError::NumericCompatibility(format!(
            "cannot build a real operator: {op} is complex"
        )));
    }
    if !block_in.is_real() || !block_out.is_real() {
        return Err(EdError::NumericCompatibility(
            "cannot build a real operator on a block with a complex irrep".into(),
        ));
    }
    Ok(())
}

/// Symmetric blocks must share a group, and the terms must carry the input
/// irrep onto the output irrep.
fn check_symmetries(terms: &OpSum, block_in: &Block, block_out: &Block) -> Result<()> {
    let (a, b) = match (block_in.symmetry(), block_out.symmetry()) {
        (None, None) => return Ok(()),
        (Some(a), Some(b)) if same_group(a, b) => (a, b),
        (Some(_), Some(_)) => {
            return Err(EdError::UnsupportedPairing(
                "symmetric blocks with different symmetry groups".into(),
            ));
        }
        _ => {
            return Err(EdError::UnsupportedPairing(
                "a symmetric and a non-symmetric block".into(),
            ));
        }
    };
    let Some(rep) = representation(terms, a.group())? else {
        return Err(EdError::UnsupportedPairing(
            "terms do not transform as a one-dimensional representation of the block symmetry"
                .into(),
        ));
    };
    if !rep.multiply(a.irrep())?.approx_eq(b.irrep()) {
        return Err(EdError::UnsupportedPairing(
            "terms do not map the input irrep onto the output irrep".into(),
        ));
    }
    Ok(())
}

fn same_group(a: &Symmetry, b: &Symmetry) -> bool {
    a.group().permutations() == b.group().permutations()
}

/// Particle-number changes `(up, down)` of a primitive term; `None` when a
/// local matrix mixes different changes.
fn qn_change(op: &Op, model: Model) -> Option<(i64, i64)> {
    let kind = op.kind();
    if kind == OpType::Matrix {
        return op.matrix_nup_change().map(|d| (d, -d));
    }
    match model {
        Model::Spinhalf => Some((kind.nup_change(), -kind.nup_change())),
        Model::Tj | Model::Electron => Some((kind.nup_change(), kind.ndn_change())),
    }
}

fn check_sector(
    op: &Op,
    from: Option<usize>,
    to: Option<usize>,
    change: Option<i64>,
) -> Result<()> {
    match (from, to, change) {
        (None, None, _) => Ok(()),
        (Some(a), Some(b), Some(d)) if a as i64 + d == b as i64 => Ok(()),
        (Some(a), Some(b), Some(d)) => Err(op.error(format!(
            "maps particle number {a} to {} but the output block has {b}",
            a as i64 + d
        ))),
        _ => Err(op.error("does not map the input sector onto the output sector")),
    }
}

fn check_sectors(terms: &OpSum, model: Model, block_in: &Block, block_out: &Block) -> Result<()> {
    let symmetric = block_in.is_symmetric();
    for (_, op) in terms {
        let change = qn_change(op, model);
        if symmetric && op.kind() != OpType::Matrix && change != Some((0, 0)) {
            return Err(EdError::UnsupportedPairing(format!(
                "{op} changes particle numbers and cannot act on symmetric blocks"
            )));
        }
        check_sector(op, block_in.n_up(), block_out.n_up(), change.map(|c| c.0))?;
        check_sector(op, block_in.n_dn(), block_out.n_dn(), change.map(|c| c.1))?;
    }
    Ok(())
}

impl<T: Scalar> Operator<T> {
    /// Compile `ops` for acting from `block_in` to `block_out`.
    ///
    /// All validation happens here: site ranges, model support, numeric
    /// compatibility, sector agreement and the supported block pairing. On
    /// symmetric blocks the terms must map the input irrep onto the output
    /// irrep.
    pub fn new(ops: &OpSum, block_in: &Block, block_out: &Block) -> Result<Self> {
        Self::build(ops, block_in, block_out).context("compiling operator")
    }

    /// The operator from a block onto itself.
    pub fn on(ops: &OpSum, block: &Block) -> Result<Self> {
        Self::new(ops, block, block)
    }

    fn build(ops: &OpSum, block_in: &Block, block_out: &Block) -> Result<Self> {
        let model = model_of(block_in);
        if model != model_of(block_out) {
            return Err(EdError::UnsupportedPairing(format!(
                "{} block to {} block",
                block_in.model(),
                block_out.model()
            )));
        }
        if block_in.n_sites() != block_out.n_sites() {
            return Err(EdError::invalid(format!(
                "blocks on {} and {} sites",
                block_in.n_sites(),
                block_out.n_sites()
            )));
        }
        check_numeric::<T>(ops, block_in, block_out)?;
        let terms = compile(ops, model, block_in.n_sites())?;
        check_sectors(&terms, model, block_in, block_out)?;
        check_symmetries(&terms, block_in, block_out)?;

        let characters = match block_out.symmetry() {
            None => None,
            Some(s) => Some(
                s.irrep()
                    .characters()
                    .iter()
                    .map(|&z| {
                        T::from_complex(z).ok_or_else(|| {
                            EdError::NumericCompatibility("complex character".into())
                        })
                    })
                    .collect::<Result<Vec<T>>>()?,
            ),
        };
        debug!(
            n_terms = terms.len(),
            dim_in = block_in.size(),
            dim_out = block_out.size(),
            "compiled operator"
        );
        Ok(Self {
            terms,
            same: block_in.same_space(block_out),
            block_in: block_in.clone(),
            block_out: block_out.clone(),
            characters,
        })
    }

    pub fn block_in(&self) -> &Block {
        &self.block_in
    }

    pub fn block_out(&self) -> &Block {
        &self.block_out
    }

    /// The primitive terms after lowering.
    pub fn terms(&self) -> &OpSum {
        &self.terms
    }

    /// Dense matrix with `block_out.size()` rows and `block_in.size()` columns.
    #[tracing::instrument(
        skip_all,
        fields(rows = self.block_out.size(), cols = self.block_in.size())
    )]
    pub fn matrix(&self) -> Result<DMatrix<T>> {
        let fill = DenseFill::zeros(self.block_out.size(), self.block_in.size());
        self.run(&fill)?;
        Ok(fill.into_matrix())
    }

    /// `v_out = H v_in`; `v_out` is overwritten.
    pub fn apply(&self, v_in: &DVector<T>, v_out: &mut DVector<T>) -> Result<()> {
        if v_in.len() != self.block_in.size() || v_out.len() != self.block_out.size() {
            return Err(EdError::invalid(format!(
                "vectors of length {} -> {} for an operator {} -> {}",
                v_in.len(),
                v_out.len(),
                self.block_in.size(),
                self.block_out.size()
            )));
        }
        let fill = MatvecFill::new(v_in.as_slice(), self.block_out.size());
        self.run(&fill)?;
        *v_out = fill.into_vector();
        Ok(())
    }

    /// Feed every element of the operator into `fill`.
    pub fn run<F: Fill<T>>(&self, fill: &F) -> Result<()> {
        let chars = self.characters.as_deref();
        let same = self.same;
        match (&self.block_in, &self.block_out) {
            (Block::Spinhalf(bi), Block::Spinhalf(bo)) => {
                for (c, op) in &self.terms {
                    run_spin(*c, op, bi.basis(), bo.basis(), chars, same, fill)?;
                }
            }
            (Block::Tj(bi), Block::Tj(bo)) => {
                for (c, op) in &self.terms {
                    run_two_channel(*c, op, true, bi.basis(), bo.basis(), chars, same, fill)?;
                }
            }
            (Block::Electron(bi), Block::Electron(bo)) => {
                for (c, op) in &self.terms {
                    run_two_channel(*c, op, false, bi.basis(), bo.basis(), chars, same, fill)?;
                }
            }
            (a, b) => {
                return Err(EdError::UnsupportedPairing(format!(
                    "{} block to {} block",
                    a.model(),
                    b.model()
                )));
            }
        }
        Ok(())
    }
}

fn run_spin<T: Scalar, F: Fill<T>>(
    c: crate::operators::Coupling,
    op: &Op,
    basis_in: &SpinhalfBasis,
    basis_out: &SpinhalfBasis,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) -> Result<()> {
    use SpinhalfBasis::*;
    match (basis_in, basis_out) {
        (Plain16(a), Plain16(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        (Plain32(a), Plain32(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        (Plain64(a), Plain64(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        (Symmetric16(a), Symmetric16(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        (Symmetric32(a), Symmetric32(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        (Symmetric64(a), Symmetric64(b)) => spin::apply_op(c, op, a, b, chars, same, fill),
        _ => Err(EdError::UnsupportedPairing(format!(
            "{op} between spin-1/2 bases of different kinds"
        ))),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_two_channel<T: Scalar, F: Fill<T>>(
    c: crate::operators::Coupling,
    op: &Op,
    tj: bool,
    basis_in: &TwoChannelBasis,
    basis_out: &TwoChannelBasis,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) -> Result<()> {
    use TwoChannelBasis::*;
    match (basis_in, basis_out) {
        (Plain16(a), Plain16(b)) => two_channel::apply_op(c, op, tj, a, b, chars, same, fill),
        (Plain32(a), Plain32(b)) => two_channel::apply_op(c, op, tj, a, b, chars, same, fill),
        (Plain64(a), Plain64(b)) => two_channel::apply_op(c, op, tj, a, b, chars, same, fill),
        (Symmetric16(a), Symmetric16(b)) => {
            two_channel::apply_op(c, op, tj, a, b, chars, same, fill)
        }
        (Symmetric32(a), Symmetric32(b)) => {
            two_channel::apply_op(c, op, tj, a, b, chars, same, fill)
        }
        (Symmetric64(a), Symmetric64(b)) => {
            two_channel::apply_op(c, op, tj, a, b, chars, same, fill)
        }
        _ => Err(EdError::UnsupportedPairing(format!(
            "{op} between two-channel bases of different kinds"
        ))),
    }
}

/// Dense matrix of `ops` from `block_in` to `block_out`.
pub fn matrix<T: Scalar>(ops: &OpSum, block_in: &Block, block_out: &Block) -> Result<DMatrix<T>> {
    Operator::new(ops, block_in, block_out)?.matrix()
}

/// Dense matrix of `ops` on a single block.
pub fn matrix_on<T: Scalar>(ops: &OpSum, block: &Block) -> Result<DMatrix<T>> {
    matrix(ops, block, block)
}

/// `v_out = ops v_in` without storing the matrix.
pub fn apply<T: Scalar>(
    ops: &OpSum,
    block_in: &Block,
    v_in: &DVector<T>,
    block_out: &Block,
    v_out: &mut DVector<T>,
) -> Result<()> {
    Operator::new(ops, block_in, block_out)?.apply(v_in, v_out)
}

/// The block `ops` maps `block` into.
///
/// Fixed particle numbers are shifted by the common change of all terms.
/// On a symmetric block the terms must conserve particle numbers, and the
/// irrep is multiplied by the representation of the terms. An unchanged
/// target is `block` itself.
pub fn target_block(ops: &OpSum, block: &Block) -> Result<Block> {
    derive_target(ops, block).context("deriving target block")
}

fn shift(n: Option<usize>, d: i64) -> Result<Option<usize>> {
    n.map(|n| {
        usize::try_from(n as i64 + d)
            .map_err(|_| EdError::invalid(format!("particle number {n} cannot change by {d}")))
    })
    .transpose()
}

fn derive_target(ops: &OpSum, block: &Block) -> Result<Block> {
    let model = model_of(block);
    let terms = compile(ops, model, block.n_sites())?;
    let mut change = None;
    for (_, op) in &terms {
        let d = qn_change(op, model)
            .ok_or_else(|| op.error("mixes different particle-number changes"))?;
        match change {
            Some(c) if c != d => {
                return Err(EdError::invalid(
                    "terms change particle numbers by different amounts",
                ));
            }
            _ => change = Some(d),
        }
    }
    let (d_up, d_dn) = change.unwrap_or((0, 0));
    let conserving = d_up == 0 && d_dn == 0;
    let np = shift(block.n_up(), d_up)?.zip(shift(block.n_dn(), d_dn)?);

    let Some(symmetry) = block.symmetry() else {
        return if conserving {
            Ok(block.clone())
        } else {
            block.rebuild(np, None)
        };
    };
    if !conserving {
        return Err(EdError::UnsupportedPairing(
            "terms that change particle numbers cannot act on symmetric blocks".into(),
        ));
    }
    let rep = representation(&terms, symmetry.group())?.ok_or_else(|| {
        EdError::UnsupportedPairing(
            "terms do not transform as a one-dimensional representation of the block symmetry"
                .into(),
        )
    })?;
    let irrep = rep.multiply(symmetry.irrep())?;
    if irrep.approx_eq(symmetry.irrep()) {
        return Ok(block.clone());
    }
    debug!("target block in another irrep");
    block.rebuild(np, Some(Symmetry::new(symmetry.group(), &irrep)?))
}

/// `<v| ops |v>`, the expectation value of `ops` in `v`.
pub fn inner<T: Scalar>(ops: &OpSum, block: &Block, v: &DVector<T>) -> Result<T> {
    inner_between(ops, block, v, block, v)
}

/// `<v| ops |w>` with `w` in `block_in` and `v` in `block_out`.
pub fn inner_between<T: Scalar>(
    ops: &OpSum,
    block_in: &Block,
    w: &DVector<T>,
    block_out: &Block,
    v: &DVector<T>,
) -> Result<T> {
    if v.len() != block_out.size() {
        return Err(EdError::invalid(format!(
            "bra of length {} for a block of size {}",
            v.len(),
            block_out.size()
        )));
    }
    let mut ops_w = DVector::zeros(block_out.size());
    Operator::new(ops, block_in, block_out)?.apply(w, &mut ops_w)?;
    Ok(phyz_math::dot(v, &ops_w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Electron, Spinhalf, Tj};
    use crate::symmetries::{Representation, cyclic_group};
    use approx::assert_relative_eq;
    use num_complex::Complex64;
    use phyz_math::{eigvals_sym, is_hermitian};
    use std::f64::consts::PI;

    fn heisenberg(n: usize) -> OpSum {
        let mut ops = OpSum::new();
        for i in 0..n {
            ops += (1.0, Op::new(OpType::SdotS, [i, (i + 1) % n]).unwrap());
        }
        ops
    }

    #[test]
    fn test_heisenberg_two_sites() {
        let block: Block = Spinhalf::with_sz(2, 1).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SdotS, [0, 1]).unwrap());
        let h = matrix_on::<f64>(&ops, &block).unwrap();
        let evals = eigvals_sym(&h);
        assert_relative_eq!(evals[0], -0.75, epsilon = 1e-12);
        assert_relative_eq!(evals[1], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_heisenberg_ring_ground_state() {
        let block: Block = Spinhalf::with_sz(6, 3).unwrap().into();
        let h = matrix_on::<f64>(&heisenberg(6), &block).unwrap();
        assert!(is_hermitian(&h, 1e-12));
        let e0 = eigvals_sym(&h)[0];
        assert!((e0 - -2.8027756377).abs() < 1e-8, "e0 = {e0}");
    }

    #[test]
    fn test_matvec_matches_matrix() {
        let block: Block = Tj::new(5, 2, 1).unwrap().into();
        let mut ops = OpSum::new();
        for i in 0..5 {
            ops += (1.0, Op::new(OpType::Hop, [i, (i + 1) % 5]).unwrap());
            ops += (0.4, Op::new(OpType::TjSdotS, [i, (i + 1) % 5]).unwrap());
        }
        let op = Operator::<f64>::on(&ops, &block).unwrap();
        let h = op.matrix().unwrap();
        let v = DVector::from_fn(block.size(), |i, _| ((i * 7) % 11) as f64 - 5.0);
        let mut w = DVector::from_element(block.size(), 100.0);
        op.apply(&v, &mut w).unwrap();
        let expected = &h * &v;
        assert!((w - expected).norm() < 1e-10);
    }

    #[test]
    fn test_real_operator_from_complex_terms() {
        let block: Block = Spinhalf::new(3).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::ScalarChirality, [0, 1, 2]).unwrap());
        let err = matrix_on::<f64>(&ops, &block).unwrap_err();
        assert!(matches!(err.root(), EdError::NumericCompatibility(_)));
        let h = matrix_on::<Complex64>(&ops, &block).unwrap();
        assert!(is_hermitian(&h, 1e-12));
    }

    #[test]
    fn test_real_operator_on_complex_irrep() {
        let n = 4;
        let group = cyclic_group(n).unwrap();
        let chars = (0..n)
            .map(|j| Complex64::from_polar(1.0, std::f64::consts::PI * j as f64 / 2.0))
            .collect();
        let block: Block = Spinhalf::symmetric_sz(n, 2, &group, &Representation::new(chars))
            .unwrap()
            .into();
        let err = matrix_on::<f64>(&heisenberg(n), &block).unwrap_err();
        assert!(matches!(err.root(), EdError::NumericCompatibility(_)));
    }

    #[test]
    fn test_raise_between_sectors() {
        let b1: Block = Spinhalf::with_sz(3, 1).unwrap().into();
        let b2: Block = Spinhalf::with_sz(3, 2).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SPlus, [0]).unwrap());
        let m = matrix::<f64>(&ops, &b1, &b2).unwrap();
        assert_eq!(m.shape(), (3, 3));
        assert_relative_eq!(m.sum(), 2.0);
        assert!(matrix::<f64>(&ops, &b1, &b1).is_err());
    }

    #[test]
    fn test_raise_on_symmetric_block_unsupported() {
        let group = cyclic_group(4).unwrap();
        let irrep = Representation::trivial(4);
        let b1: Block = Spinhalf::symmetric_sz(4, 1, &group, &irrep).unwrap().into();
        let b2: Block = Spinhalf::symmetric_sz(4, 2, &group, &irrep).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SMinus, [0]).unwrap());
        let err = matrix::<f64>(&ops, &b2, &b1).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
    }

    fn momentum(n: usize, k: usize) -> Representation {
        Representation::new(
            (0..n)
                .map(|j| Complex64::from_polar(1.0, 2.0 * PI * (k * j) as f64 / n as f64))
                .collect(),
        )
    }

    /// `sum_j exp(i q j) Sz_j` with `q = 2 pi m / n`.
    fn sz_wave(n: usize, m: usize) -> OpSum {
        (0..n)
            .map(|j| {
                let phase = Complex64::from_polar(1.0, 2.0 * PI * (m * j) as f64 / n as f64);
                (phase, Op::new(OpType::Sz, [j]).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_invariant_terms_between_momenta_unsupported() {
        let n = 4;
        let group = cyclic_group(n).unwrap();
        let k0: Block = Spinhalf::symmetric_sz(n, 2, &group, &momentum(n, 0)).unwrap().into();
        let k2: Block = Spinhalf::symmetric_sz(n, 2, &group, &momentum(n, 2)).unwrap().into();
        let err = matrix::<Complex64>(&heisenberg(n), &k0, &k2).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
        assert!(matrix::<Complex64>(&heisenberg(n), &k2, &k2).is_ok());
    }

    #[test]
    fn test_single_bond_on_momentum_block_unsupported() {
        let n = 4;
        let group = cyclic_group(n).unwrap();
        let k0: Block = Spinhalf::symmetric_sz(n, 2, &group, &momentum(n, 0)).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SdotS, [0, 1]).unwrap());
        let err = matrix_on::<f64>(&ops, &k0).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
        assert!(err.chain().starts_with("compiling operator"));

        let plain: Block = Spinhalf::with_sz(n, 2).unwrap().into();
        assert!(matrix_on::<f64>(&ops, &plain).is_ok());
    }

    #[test]
    fn test_momentum_transfer_pairs() {
        let (n, m) = (6, 2);
        let group = cyclic_group(n).unwrap();
        let ops = sz_wave(n, m);
        let blocks: Vec<Block> = (0..n)
            .map(|k| {
                Spinhalf::symmetric_sz(n, 3, &group, &momentum(n, k))
                    .unwrap()
                    .into()
            })
            .collect();
        for k in 0..n {
            for l in 0..n {
                let res = matrix::<Complex64>(&ops, &blocks[k], &blocks[l]);
                if l == (k + m) % n {
                    assert!(res.is_ok(), "{k} -> {l}");
                } else {
                    assert!(matches!(
                        res.unwrap_err().root(),
                        EdError::UnsupportedPairing(_)
                    ));
                }
            }
        }

        // the blocks together carry the whole operator
        let full: Block = Spinhalf::with_sz(n, 3).unwrap().into();
        let expected = matrix_on::<Complex64>(&ops, &full).unwrap().norm_squared();
        let total: f64 = (0..n)
            .map(|k| {
                matrix::<Complex64>(&ops, &blocks[k], &blocks[(k + m) % n])
                    .unwrap()
                    .norm_squared()
            })
            .sum();
        assert!(expected > 1.0);
        assert_relative_eq!(total, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_inner_singlet_and_triplet() {
        let block: Block = Spinhalf::with_sz(2, 1).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SdotS, [0, 1]).unwrap());
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let singlet = DVector::from_vec(vec![s, -s]);
        let triplet = DVector::from_vec(vec![s, s]);
        assert_relative_eq!(inner(&ops, &block, &singlet).unwrap(), -0.75, epsilon = 1e-12);
        assert_relative_eq!(inner(&ops, &block, &triplet).unwrap(), 0.25, epsilon = 1e-12);
        assert!(inner(&ops, &block, &DVector::from_element(3, s)).is_err());
    }

    #[test]
    fn test_inner_between_momenta() {
        let (n, m) = (6, 1);
        let group = cyclic_group(n).unwrap();
        let ops = sz_wave(n, m);
        let k1: Block = Spinhalf::symmetric_sz(n, 3, &group, &momentum(n, 1)).unwrap().into();
        let k2: Block = Spinhalf::symmetric_sz(n, 3, &group, &momentum(n, 2)).unwrap().into();
        let w = DVector::from_fn(k1.size(), |i, _| Complex64::new(i as f64, 1.0));
        let v = DVector::from_fn(k2.size(), |i, _| Complex64::new(1.0, -(i as f64)));
        let m12 = matrix::<Complex64>(&ops, &k1, &k2).unwrap();
        let expected = v.dotc(&(&m12 * &w));
        let got = inner_between(&ops, &k1, &w, &k2, &v).unwrap();
        assert!((got - expected).norm() < 1e-10);
        assert!(inner_between(&ops, &k2, &v, &k1, &w).is_err());
    }

    #[test]
    fn test_target_block_shifts_sector() {
        let block: Block = Spinhalf::with_sz(3, 1).unwrap().into();
        let mut raise = OpSum::new();
        raise += (1.0, Op::new(OpType::SPlus, [0]).unwrap());
        let target = target_block(&raise, &block).unwrap();
        assert_eq!(target.n_up(), Some(2));
        assert!(matrix::<f64>(&raise, &block, &target).is_ok());

        let electron: Block = Electron::with_np(3, 1, 1).unwrap().into();
        let mut create = OpSum::new();
        create += (1.0, Op::new(OpType::Cdagup, [2]).unwrap());
        let target = target_block(&create, &electron).unwrap();
        assert_eq!((target.n_up(), target.n_dn()), (Some(2), Some(1)));

        let empty: Block = Electron::with_np(3, 0, 1).unwrap().into();
        let mut annihilate = OpSum::new();
        annihilate += (1.0, Op::new(OpType::Cup, [0]).unwrap());
        assert!(target_block(&annihilate, &empty).is_err());

        raise += (1.0, Op::new(OpType::SMinus, [1]).unwrap());
        let err = target_block(&raise, &block).unwrap_err();
        assert!(err.chain().starts_with("deriving target block"));
    }

    #[test]
    fn test_target_block_moves_momentum() {
        let n = 6;
        let group = cyclic_group(n).unwrap();
        let k1: Block = Spinhalf::symmetric_sz(n, 3, &group, &momentum(n, 1)).unwrap().into();
        assert!(target_block(&heisenberg(n), &k1).unwrap().same_space(&k1));

        let ops = sz_wave(n, 2);
        let target = target_block(&ops, &k1).unwrap();
        let irrep = target.symmetry().unwrap().irrep();
        assert!(irrep.approx_eq(&momentum(n, 3)));
        let k3 = Spinhalf::symmetric_sz(n, 3, &group, &momentum(n, 3)).unwrap();
        assert_eq!(target.size(), k3.size());
        assert!(matrix::<Complex64>(&ops, &k1, &target).is_ok());

        let mut bond = OpSum::new();
        bond += (1.0, Op::new(OpType::SdotS, [0, 1]).unwrap());
        let err = target_block(&bond, &k1).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
    }

    #[test]
    fn test_model_mismatch() {
        let a: Block = Tj::new(3, 1, 1).unwrap().into();
        let b: Block = Electron::with_np(3, 1, 1).unwrap().into();
        let err = matrix::<f64>(&OpSum::new(), &a, &b).unwrap_err();
        assert!(matches!(err.root(), EdError::UnsupportedPairing(_)));
    }

    #[test]
    fn test_hubbard_atom() {
        let block: Block = Electron::with_np(1, 1, 1).unwrap().into();
        let mut ops = OpSum::new();
        ops += (4.0, Op::new(OpType::HubbardU, Vec::new()).unwrap());
        let h = matrix_on::<f64>(&ops, &block).unwrap();
        assert_relative_eq!(h[(0, 0)], 4.0);
    }

    #[test]
    fn test_number_terms_count_particles() {
        let block: Block = Electron::with_np(4, 2, 1).unwrap().into();
        let mut ops = OpSum::new();
        for i in 0..4 {
            ops += (1.0, Op::new(OpType::Ntot, [i]).unwrap());
        }
        let h = matrix_on::<f64>(&ops, &block).unwrap();
        assert_relative_eq!(h, DMatrix::identity(block.size(), block.size()) * 3.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let block: Block = Spinhalf::with_sz(4, 2).unwrap().into();
        let op = Operator::<f64>::on(&heisenberg(4), &block).unwrap();
        let v = DVector::zeros(5);
        let mut w = DVector::zeros(6);
        assert!(op.apply(&v, &mut w).is_err());
    }
}
