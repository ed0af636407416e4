//! Dense linear algebra and scalar types for phyz exact diagonalization.
//!
//! Thin layer over nalgebra: container aliases, a [`Scalar`] trait that
//! unifies real and complex coefficients, the dense symmetric/Hermitian
//! eigensolver, the matrix exponential, and the handful of BLAS-1 style
//! vector operations the Krylov solvers need.

pub mod linalg;
pub mod scalar;

pub use linalg::{axpy, dot, eig_sym, eigvals_sym, expm, is_hermitian, norm, normalize, scale};
pub use num_complex::Complex64;
pub use scalar::Scalar;

use nalgebra as na;

/// Dynamic real vector.
pub type DVec = na::DVector<f64>;
/// Dynamic real matrix.
pub type DMat = na::DMatrix<f64>;
/// Dynamic complex vector.
pub type CVec = na::DVector<Complex64>;
/// Dynamic complex matrix.
pub type CMat = na::DMatrix<Complex64>;

/// Imaginary unit.
pub const I: Complex64 = Complex64::new(0.0, 1.0);
