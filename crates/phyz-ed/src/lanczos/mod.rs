//! Lanczos tridiagonalization, eigenvalue solvers and Krylov time evolution.
//!
//! [`lanczos`] is the generic driver: a matrix-free multiply, a start
//! vector and a stopping predicate on the [`Tmatrix`]. The solvers build on
//! it:
//!
//! - [`eigvals_lanczos`], [`eigvals_lanczos_from`]: lowest eigenvalues
//! - [`eigs_lanczos`]: plus the ground state, rebuilt in a second pass
//! - [`exp_sym_v`], [`evolve_lanczos`]: `exp(tau H) v` and `exp(-iHt) psi`
//!
//! Lanczos vectors are not stored unless reorthogonalization is requested.
//! Anything that needs them (eigenvectors, time evolution) reruns the
//! recurrence from the same start vector and sees each vector through the
//! `on_vector` callback.

mod convergence;
mod eigs;
mod evolve;
mod tmatrix;

pub use convergence::{BETA_INVARIANT, converged_eigenvalues, converged_time_evolution};
pub use eigs::{eigs_lanczos, eigvals_lanczos, eigvals_lanczos_from};
pub use evolve::{evolve_lanczos, exp_sym_v};
pub use tmatrix::Tmatrix;

use crate::error::Result;
use crate::params::LanczosParams;
use nalgebra::DVector;
use phyz_math::{DVec, Scalar, axpy, dot, norm};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

/// Start vectors with a norm below this give an empty run.
pub const START_NORM_TOL: f64 = 1e-12;

/// Why a Lanczos run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    /// The stopping predicate returned `true`.
    Converged,
    /// `beta` fell below the deflation tolerance.
    Deflated,
    MaxIterations,
    /// The start vector was numerically zero; no step was taken.
    EmptyStart,
}

/// Outcome of a Lanczos run.
#[derive(Debug, Clone, PartialEq)]
pub struct LanczosResult {
    pub alphas: Vec<f64>,
    pub betas: Vec<f64>,
    /// Ritz values of the final projection, ascending.
    pub eigenvalues: DVec,
    pub n_iterations: usize,
    pub criterion: Criterion,
}

impl LanczosResult {
    fn empty() -> Self {
        Self {
            alphas: Vec::new(),
            betas: Vec::new(),
            eigenvalues: DVec::zeros(0),
            n_iterations: 0,
            criterion: Criterion::EmptyStart,
        }
    }

    fn from_tmatrix(tmat: &Tmatrix, criterion: Criterion) -> Self {
        Self {
            alphas: tmat.alphas().to_vec(),
            betas: tmat.betas().to_vec(),
            eigenvalues: tmat.eigenvalues(),
            n_iterations: tmat.size(),
            criterion,
        }
    }

    pub fn tmatrix(&self) -> Tmatrix {
        let mut t = Tmatrix::new();
        for (&a, &b) in self.alphas.iter().zip(&self.betas) {
            t.append(a, b);
        }
        t
    }
}

/// Run the Lanczos recurrence
/// `beta_{i+1} v_{i+1} = H v_i - alpha_i v_i - beta_i v_{i-1}`.
///
/// `mult(v, w)` must overwrite `w` with `H v` for a Hermitian `H`.
/// `converged` is asked after every step; `on_vector(i, v_i)` sees every
/// normalized Lanczos vector before it is multiplied.
pub fn lanczos<T, M, C, V>(
    mut mult: M,
    v0: &DVector<T>,
    mut converged: C,
    params: &LanczosParams,
    mut on_vector: V,
) -> Result<LanczosResult>
where
    T: Scalar,
    M: FnMut(&DVector<T>, &mut DVector<T>) -> Result<()>,
    C: FnMut(&Tmatrix) -> Result<bool>,
    V: FnMut(usize, &DVector<T>) -> Result<()>,
{
    let dim = v0.len();
    let mut v1 = v0.clone();
    let nrm = norm(&v1);
    if nrm <= START_NORM_TOL {
        info!(nrm, "lanczos: start vector is zero, nothing to do");
        return Ok(LanczosResult::empty());
    }
    v1 /= T::from_real(nrm);

    let mut v_prev = DVector::<T>::zeros(dim);
    let mut w = DVector::<T>::zeros(dim);
    let mut stored: Vec<DVector<T>> = Vec::new();
    let mut tmat = Tmatrix::new();
    let mut beta = 0.0;

    for iteration in 0..params.max_iterations {
        on_vector(iteration, &v1)?;
        mult(&v1, &mut w)?;
        let alpha = dot(&v1, &w).real();
        axpy(T::from_real(-alpha), &v1, &mut w);
        axpy(T::from_real(-beta), &v_prev, &mut w);

        if params.reorthogonalize {
            stored.push(v1.clone());
            for v in &stored {
                let overlap = dot(v, &w);
                axpy(-overlap, v, &mut w);
            }
        }

        beta = norm(&w);
        tmat.append(alpha, beta);
        trace!(iteration, alpha, beta, "lanczos step");

        if converged(&tmat)? {
            info!(n_iterations = tmat.size(), "lanczos converged");
            return Ok(LanczosResult::from_tmatrix(&tmat, Criterion::Converged));
        }
        if beta <= params.deflation_tol {
            info!(n_iterations = tmat.size(), beta, "lanczos deflated");
            return Ok(LanczosResult::from_tmatrix(&tmat, Criterion::Deflated));
        }

        std::mem::swap(&mut v_prev, &mut v1);
        v1.copy_from(&w);
        v1 /= T::from_real(beta);
    }

    warn!(
        max_iterations = params.max_iterations,
        "lanczos stopped at the iteration limit without converging"
    );
    Ok(LanczosResult::from_tmatrix(&tmat, Criterion::MaxIterations))
}
