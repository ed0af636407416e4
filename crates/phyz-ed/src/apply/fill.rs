//! Sinks for matrix elements.

use crate::parallel::AtomicBuffer;
use nalgebra::{DMatrix, DVector};
use phyz_math::Scalar;

/// Receives the element `<out|H|in> = val`.
///
/// Implementations accumulate, so several terms (or several paths of one
/// term) may contribute to the same element.
pub trait Fill<T: Scalar>: Sync {
    fn fill(&self, out: usize, inp: usize, val: T);
}

/// Accumulates into a dense column-major matrix.
pub struct DenseFill<T> {
    data: AtomicBuffer<T>,
    nrows: usize,
    ncols: usize,
}

impl<T: Scalar> DenseFill<T> {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: AtomicBuffer::zeros(nrows * ncols),
            nrows,
            ncols,
        }
    }

    pub fn into_matrix(self) -> DMatrix<T> {
        DMatrix::from_vec(self.nrows, self.ncols, self.data.into_vec())
    }
}

impl<T: Scalar> Fill<T> for DenseFill<T> {
    #[inline]
    fn fill(&self, out: usize, inp: usize, val: T) {
        self.data.add(out + inp * self.nrows, val);
    }
}

/// Accumulates `H v_in` without storing `H`.
pub struct MatvecFill<'a, T> {
    v_in: &'a [T],
    v_out: AtomicBuffer<T>,
}

impl<'a, T: Scalar> MatvecFill<'a, T> {
    pub fn new(v_in: &'a [T], dim_out: usize) -> Self {
        Self {
            v_in,
            v_out: AtomicBuffer::zeros(dim_out),
        }
    }

    pub fn into_vector(self) -> DVector<T> {
        DVector::from_vec(self.v_out.into_vec())
    }
}

impl<T: Scalar> Fill<T> for MatvecFill<'_, T> {
    #[inline]
    fn fill(&self, out: usize, inp: usize, val: T) {
        self.v_out.add(out, val * self.v_in[inp]);
    }
}
