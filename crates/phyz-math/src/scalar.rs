//! Coefficient types for operators and state vectors.
//!
//! Every kernel in the workspace is generic over [`Scalar`], which is
//! implemented for `f64` and `Complex64`. The trait sits on top of
//! nalgebra's `ComplexField`, so `conjugate`, `modulus`, `real`, and
//! `from_real` come for free.

use nalgebra::ComplexField;
use num_complex::Complex64;
use std::fmt::Debug;

/// A real or complex coefficient with `f64` precision.
pub trait Scalar: ComplexField<RealField = f64> + Copy + Default + Debug {
    /// Whether the type carries an imaginary part.
    const IS_COMPLEX: bool;

    /// Number of `f64` components (1 for real, 2 for complex).
    const N_COMPONENTS: usize;

    /// Narrow a complex number to this type.
    ///
    /// Returns `None` for `f64` when the imaginary part is not zero.
    fn from_complex(z: Complex64) -> Option<Self>;

    /// Widen to a complex number.
    fn to_complex(self) -> Complex64;

    /// Build from real and imaginary parts; `im` is ignored for `f64`.
    fn from_parts(re: f64, im: f64) -> Self;

    /// The k-th `f64` component (0 = real, 1 = imaginary).
    fn component(self, k: usize) -> f64;
}

/// Imaginary parts below this are treated as zero when narrowing.
pub const REAL_TOLERANCE: f64 = 1e-12;

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;
    const N_COMPONENTS: usize = 1;

    #[inline]
    fn from_complex(z: Complex64) -> Option<Self> {
        if z.im.abs() < REAL_TOLERANCE {
            Some(z.re)
        } else {
            None
        }
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }

    #[inline]
    fn from_parts(re: f64, _im: f64) -> Self {
        re
    }

    #[inline]
    fn component(self, _k: usize) -> f64 {
        self
    }
}

impl Scalar for Complex64 {
    const IS_COMPLEX: bool = true;
    const N_COMPONENTS: usize = 2;

    #[inline]
    fn from_complex(z: Complex64) -> Option<Self> {
        Some(z)
    }

    #[inline]
    fn to_complex(self) -> Complex64 {
        self
    }

    #[inline]
    fn from_parts(re: f64, im: f64) -> Self {
        Complex64::new(re, im)
    }

    #[inline]
    fn component(self, k: usize) -> f64 {
        if k == 0 { self.re } else { self.im }
    }
}
