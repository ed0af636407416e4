//! Spin-1/2 terms and their kernel.

use super::element;
use super::fill::Fill;
use crate::basis::SpinIndexing;
use crate::bits::BitWord;
use crate::error::{EdError, Result};
use crate::operators::{Coupling, Op, OpType};
use crate::parallel;
use phyz_math::Scalar;
use std::marker::PhantomData;

/// A spin-1/2 term acting on a single basis state.
pub(crate) trait SpinTerm<B: BitWord, T: Scalar>: Sync {
    /// The term maps every state onto itself.
    const DIAGONAL: bool = false;

    /// Call `emit(target, amplitude)` for every non-zero `<target|term|state>`.
    fn apply<E: FnMut(B, T)>(&self, state: B, emit: E);
}

fn scalar<T: Scalar>(c: Coupling, op: &Op) -> Result<T> {
    c.to_scalar().ok_or_else(|| {
        EdError::NumericCompatibility(format!("complex coupling on {op} in a real computation"))
    })
}

fn half<T: Scalar>() -> T {
    T::from_real(0.5)
}

pub(crate) struct SzSz<B, T> {
    s1: usize,
    s2: usize,
    val: T,
    _word: PhantomData<B>,
}

impl<B: BitWord, T: Scalar> SzSz<B, T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        let (s1, s2) = (op.site(0), op.site(1));
        Ok(Self {
            s1,
            s2,
            val: scalar::<T>(c, op)? * T::from_real(0.25),
            _word: PhantomData,
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for SzSz<B, T> {
    const DIAGONAL: bool = true;

    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        if state.gbit(self.s1) == state.gbit(self.s2) {
            emit(state, self.val);
        } else {
            emit(state, -self.val);
        }
    }
}

pub(crate) struct Sz<T> {
    site: usize,
    val: T,
}

impl<T: Scalar> Sz<T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        Ok(Self {
            site: op.site(0),
            val: scalar::<T>(c, op)? * half(),
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for Sz<T> {
    const DIAGONAL: bool = true;

    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        if state.gbit(self.site) {
            emit(state, self.val);
        } else {
            emit(state, -self.val);
        }
    }
}

pub(crate) struct Exchange<B, T> {
    s1: usize,
    mask: B,
    /// Amplitude when the up spin sits on `s1`.
    val_fwd: T,
    val_bwd: T,
}

impl<B: BitWord, T: Scalar> Exchange<B, T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        let j: T = scalar(c, op)?;
        let (s1, s2) = (op.site(0), op.site(1));
        Ok(Self {
            s1,
            mask: B::bit(s1) | B::bit(s2),
            val_fwd: j * half(),
            val_bwd: j.conjugate() * half(),
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for Exchange<B, T> {
    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        if (state & self.mask).popcount() != 1 {
            return;
        }
        let val = if state.gbit(self.s1) {
            self.val_fwd
        } else {
            self.val_bwd
        };
        emit(state ^ self.mask, val);
    }
}

/// `S+` (raise) or `S-` (lower) on one site.
pub(crate) struct RaiseLower<T> {
    site: usize,
    raise: bool,
    val: T,
}

impl<T: Scalar> RaiseLower<T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        Ok(Self {
            site: op.site(0),
            raise: op.kind() == OpType::SPlus,
            val: scalar(c, op)?,
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for RaiseLower<T> {
    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        if state.gbit(self.site) != self.raise {
            emit(state.flip(self.site), self.val);
        }
    }
}

/// Three-site scalar chirality, rotating the three spins either way.
pub(crate) struct ScalarChirality<B, T> {
    sites: [usize; 3],
    mask: B,
    val_cyclic: T,
    val_acyclic: T,
}

impl<B: BitWord, T: Scalar> ScalarChirality<B, T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        if !T::IS_COMPLEX {
            return Err(EdError::NumericCompatibility(format!(
                "{op} requires complex coefficients"
            )));
        }
        let j = c.to_complex() * phyz_math::I * 0.25;
        let to_t = |z| {
            T::from_complex(z).ok_or_else(|| {
                EdError::NumericCompatibility(format!("{op} requires complex coefficients"))
            })
        };
        let sites = [op.site(0), op.site(1), op.site(2)];
        Ok(Self {
            sites,
            mask: B::bit(sites[0]) | B::bit(sites[1]) | B::bit(sites[2]),
            val_cyclic: to_t(j)?,
            val_acyclic: to_t(j.conj())?,
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for ScalarChirality<B, T> {
    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        let n_up = (state & self.mask).popcount();
        if n_up == 0 || n_up == 3 {
            return;
        }
        let [s1, s2, s3] = self.sites;
        let bit = |b: bool, s: usize| if b { B::bit(s) } else { B::ZERO };
        let (b1, b2, b3) = (state.gbit(s1), state.gbit(s2), state.gbit(s3));
        let rest = state & !self.mask;
        emit(rest | bit(b1, s2) | bit(b2, s3) | bit(b3, s1), self.val_cyclic);
        emit(rest | bit(b1, s3) | bit(b2, s1) | bit(b3, s2), self.val_acyclic);
    }
}

/// A dense local operator on `k` sites.
pub(crate) struct LocalMatrix<B, T> {
    sites: Vec<usize>,
    mask: B,
    /// Non-zero entries `(row, value)` of each column.
    columns: Vec<Vec<(usize, T)>>,
}

impl<B: BitWord, T: Scalar> LocalMatrix<B, T> {
    pub fn new(c: Coupling, op: &Op) -> Result<Self> {
        let m = op
            .local_matrix()
            .ok_or_else(|| op.error("matrix term without a matrix"))?;
        let c = c.to_complex();
        let mut columns = Vec::with_capacity(m.ncols());
        for col in 0..m.ncols() {
            let mut entries = Vec::new();
            for row in 0..m.nrows() {
                let z = c * m[(row, col)];
                if z.norm() == 0.0 {
                    continue;
                }
                let val = T::from_complex(z).ok_or_else(|| {
                    EdError::NumericCompatibility(format!(
                        "complex matrix entry in {op} in a real computation"
                    ))
                })?;
                entries.push((row, val));
            }
            columns.push(entries);
        }
        let sites = op.sites().to_vec();
        let mask = sites.iter().fold(B::ZERO, |m, &s| m | B::bit(s));
        Ok(Self {
            sites,
            mask,
            columns,
        })
    }

    #[inline]
    fn local_state(&self, state: B) -> usize {
        self.sites
            .iter()
            .enumerate()
            .fold(0, |acc, (k, &s)| acc | (usize::from(state.gbit(s)) << k))
    }

    #[inline]
    fn embed(&self, rest: B, local: usize) -> B {
        self.sites.iter().enumerate().fold(rest, |acc, (k, &s)| {
            if (local >> k) & 1 == 1 { acc | B::bit(s) } else { acc }
        })
    }
}

impl<B: BitWord, T: Scalar> SpinTerm<B, T> for LocalMatrix<B, T> {
    #[inline]
    fn apply<E: FnMut(B, T)>(&self, state: B, mut emit: E) {
        let rest = state & !self.mask;
        for &(row, val) in &self.columns[self.local_state(state)] {
            emit(self.embed(rest, row), val);
        }
    }
}

/// Accumulate the elements of `term` between two spin-1/2 bases.
///
/// `chars` are the output basis characters narrowed to `T`; `same` marks
/// in and out as one basis, which lets diagonal terms skip resolution.
pub(crate) fn apply_term<B, T, Tm, Bi, Bo, F>(
    term: &Tm,
    basis_in: &Bi,
    basis_out: &Bo,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) where
    B: BitWord,
    T: Scalar,
    Tm: SpinTerm<B, T>,
    Bi: SpinIndexing<B>,
    Bo: SpinIndexing<B>,
    F: Fill<T>,
{
    parallel::for_each_range(basis_in.size(), |range| {
        basis_in.for_each_in(range, |idx_in, state| {
            if Tm::DIAGONAL && same {
                term.apply(state, |_, val| fill.fill(idx_in, idx_in, val));
                return;
            }
            let norm_in = basis_in.norm(idx_in);
            term.apply(state, |target, val| {
                if let Some(r) = basis_out.resolve(target) {
                    fill.fill(r.index, idx_in, element(val, &r, norm_in, chars));
                }
            });
        });
    });
}

/// Build the concrete term for `op` and run the kernel.
pub(crate) fn apply_op<B, T, Bi, Bo, F>(
    c: Coupling,
    op: &Op,
    basis_in: &Bi,
    basis_out: &Bo,
    chars: Option<&[T]>,
    same: bool,
    fill: &F,
) -> Result<()>
where
    B: BitWord,
    T: Scalar,
    Bi: SpinIndexing<B>,
    Bo: SpinIndexing<B>,
    F: Fill<T>,
{
    match op.kind() {
        OpType::SzSz => {
            let term = SzSz::<B, T>::new(c, op)?;
            apply_term(&term, basis_in, basis_out, chars, same, fill);
        }
        OpType::Sz => {
            let term = Sz::<T>::new(c, op)?;
            apply_term::<B, _, _, _, _, _>(&term, basis_in, basis_out, chars, same, fill);
        }
        OpType::Exchange => {
            let term = Exchange::<B, T>::new(c, op)?;
            apply_term(&term, basis_in, basis_out, chars, same, fill);
        }
        OpType::SPlus | OpType::SMinus => {
            let term = RaiseLower::<T>::new(c, op)?;
            apply_term::<B, _, _, _, _, _>(&term, basis_in, basis_out, chars, same, fill);
        }
        OpType::ScalarChirality => {
            let term = ScalarChirality::<B, T>::new(c, op)?;
            apply_term(&term, basis_in, basis_out, chars, same, fill);
        }
        OpType::Matrix => {
            let term = LocalMatrix::<B, T>::new(c, op)?;
            apply_term(&term, basis_in, basis_out, chars, same, fill);
        }
        _ => return Err(op.error("not a spin-1/2 primitive")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn collect<Tm: SpinTerm<u16, Complex64>>(term: &Tm, state: u16) -> Vec<(u16, Complex64)> {
        let mut out = Vec::new();
        term.apply(state, |s, v| out.push((s, v)));
        out
    }

    #[test]
    fn test_exchange_flips_antiparallel() {
        let op = Op::new(OpType::Exchange, [0, 2]).unwrap();
        let j = Complex64::new(1.0, 0.5);
        let term = Exchange::<u16, Complex64>::new(j.into(), &op).unwrap();
        assert_eq!(collect(&term, 0b001), vec![(0b100, j * 0.5)]);
        assert_eq!(collect(&term, 0b100), vec![(0b001, j.conj() * 0.5)]);
        assert!(collect(&term, 0b101).is_empty());
        assert!(collect(&term, 0b010).is_empty());
    }

    #[test]
    fn test_raise_lower_annihilate() {
        let op = Op::new(OpType::SPlus, [1]).unwrap();
        let term = RaiseLower::<Complex64>::new(Coupling::Real(2.0), &op).unwrap();
        assert!(collect(&term, 0b10).is_empty());
        assert_eq!(collect(&term, 0b01), vec![(0b11, Complex64::new(2.0, 0.0))]);
    }

    #[test]
    fn test_chirality_rotations() {
        let op = Op::new(OpType::ScalarChirality, [0, 1, 2]).unwrap();
        let term = ScalarChirality::<u16, Complex64>::new(Coupling::Real(1.0), &op).unwrap();
        assert!(collect(&term, 0b000).is_empty());
        assert!(collect(&term, 0b111).is_empty());
        let out = collect(&term, 0b001);
        assert_eq!(out[0], (0b010, Complex64::new(0.0, 0.25)));
        assert_eq!(out[1], (0b100, Complex64::new(0.0, -0.25)));
    }

    #[test]
    fn test_chirality_rejects_real() {
        let op = Op::new(OpType::ScalarChirality, [0, 1, 2]).unwrap();
        assert!(matches!(
            ScalarChirality::<u16, f64>::new(Coupling::Real(1.0), &op),
            Err(EdError::NumericCompatibility(_))
        ));
    }

    #[test]
    fn test_local_matrix_matches_exchange() {
        // 0.5 (S+S- + S-S+) on two sites, local index bit k = site k
        let mut m = nalgebra::DMatrix::<f64>::zeros(4, 4);
        m[(0b01, 0b10)] = 0.5;
        m[(0b10, 0b01)] = 0.5;
        let op = Op::real_matrix([3, 1], &m).unwrap();
        let term = LocalMatrix::<u16, Complex64>::new(Coupling::Real(1.0), &op).unwrap();
        assert_eq!(
            collect(&term, 0b1000),
            vec![(0b0010, Complex64::new(0.5, 0.0))]
        );
        assert!(collect(&term, 0b1010).is_empty());
    }
}
