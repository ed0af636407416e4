//! Stopping criteria evaluated once per Lanczos step.

use super::Tmatrix;
use crate::error::{EdError, Result};
use nalgebra::DMatrix;
use num_complex::Complex64;
use phyz_math::expm;

/// A last beta below this means the Krylov space is invariant.
pub const BETA_INVARIANT: f64 = 1e-8;

/// Whether the `n_eigenvalue`-th lowest Ritz value (1-based) has converged.
///
/// Compares against the projection one step shorter; converged when the
/// relative change is below `precision`, or when the space is invariant.
pub fn converged_eigenvalues(tmat: &Tmatrix, n_eigenvalue: usize, precision: f64) -> Result<bool> {
    if n_eigenvalue < 1 {
        return Err(EdError::invalid(
            "convergence of eigenvalue number 0 requested, counting starts at 1",
        ));
    }
    if tmat.size() <= n_eigenvalue + 1 {
        return Ok(false);
    }
    if tmat.last_beta().abs() < BETA_INVARIANT {
        return Ok(true);
    }
    let mut previous = tmat.clone();
    previous.pop();
    let e = tmat.eigenvalues()[n_eigenvalue - 1];
    let e_prev = previous.eigenvalues()[n_eigenvalue - 1];
    let scale = if e.abs() > f64::MIN_POSITIVE { e.abs() } else { 1.0 };
    Ok((e - e_prev).abs() / scale < precision)
}

/// Whether `exp(tau T) e_0`, scaled by `nrm`, has converged.
///
/// Extends `T` by two rows: the coupling `beta` to the next, unbuilt Krylov
/// vector and a unit entry beyond it. The first column of the exponential
/// of the extended matrix then carries two auxiliary amplitudes `phi1`, `phi2`
/// that bound the truncation error.
pub fn converged_time_evolution(
    tmat: &Tmatrix,
    tau: Complex64,
    precision: f64,
    nrm: f64,
) -> bool {
    let size = tmat.size();
    if size < 2 {
        return false;
    }
    let beta = tmat.last_beta();
    if beta.abs() < BETA_INVARIANT {
        return true;
    }
    let t = tmat.mat();
    let mut ext = DMatrix::<Complex64>::zeros(size + 2, size + 2);
    for j in 0..size {
        for i in 0..size {
            ext[(i, j)] = Complex64::new(t[(i, j)], 0.0);
        }
    }
    ext[(size, size - 1)] = Complex64::new(beta, 0.0);
    ext[(size + 1, size)] = Complex64::new(1.0, 0.0);
    let e = expm(&(ext * tau));
    let phi1 = (e[(size, 0)] * nrm).norm();
    let phi2 = (e[(size + 1, 0)] * nrm).norm();
    let error = if phi1 > 10.0 * phi2 {
        phi2
    } else if phi1 > phi2 {
        phi1 * phi2 / (phi1 - phi2)
    } else {
        phi1
    };
    error < precision
}
