use super::{LanczosResult, converged_eigenvalues, lanczos};
use crate::apply::Operator;
use crate::block::Block;
use crate::error::{EdError, Result, ResultExt};
use crate::operators::OpSum;
use crate::params::LanczosParams;
use nalgebra::DVector;
use num_complex::Complex64;
use phyz_math::Scalar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random vector with entries uniform in `[-0.5, 0.5)` (both parts if complex).
pub(crate) fn random_vector<T: Scalar>(dim: usize, seed: u64) -> DVector<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    DVector::from_fn(dim, |_, _| {
        let re = rng.r#gen::<f64>() - 0.5;
        let im = if T::IS_COMPLEX {
            rng.r#gen::<f64>() - 0.5
        } else {
            0.0
        };
        T::from_parts(re, im)
    })
}

fn run<T: Scalar>(
    op: &Operator<T>,
    v0: &DVector<T>,
    n_eigenvalues: usize,
    params: &LanczosParams,
) -> Result<LanczosResult> {
    lanczos(
        |v, w| op.apply(v, w),
        v0,
        |t| converged_eigenvalues(t, n_eigenvalues, params.precision),
        params,
        |_, _| Ok(()),
    )
}

/// Lowest eigenvalues of `ops` on `block` from a seeded random start vector.
///
/// Runs in real arithmetic when the block and every term are real.
#[tracing::instrument(skip_all, fields(dim = block.size(), n_eigenvalues = n_eigenvalues))]
pub fn eigvals_lanczos(
    ops: &OpSum,
    block: &Block,
    n_eigenvalues: usize,
    params: &LanczosParams,
) -> Result<LanczosResult> {
    let dim = block.size();
    if block.is_real() && ops.is_real() {
        let v0 = random_vector::<f64>(dim, params.seed);
        eigvals_lanczos_from(ops, block, &v0, n_eigenvalues, params)
    } else {
        let v0 = random_vector::<Complex64>(dim, params.seed);
        eigvals_lanczos_from(ops, block, &v0, n_eigenvalues, params)
    }
}

/// Lowest eigenvalues of `ops` on `block` from a given start vector.
pub fn eigvals_lanczos_from<T: Scalar>(
    ops: &OpSum,
    block: &Block,
    v0: &DVector<T>,
    n_eigenvalues: usize,
    params: &LanczosParams,
) -> Result<LanczosResult> {
    if v0.len() != block.size() {
        return Err(EdError::invalid(format!(
            "start vector of length {} for a block of dimension {}",
            v0.len(),
            block.size()
        )));
    }
    let op = Operator::on(ops, block)?;
    run(&op, v0, n_eigenvalues, params).context("eigvals_lanczos")
}

/// Lowest eigenvalues and the ground state of `ops` on `block`.
///
/// The second pass reruns the recurrence for exactly as many steps as the
/// first and accumulates the lowest Ritz vector.
#[tracing::instrument(skip_all, fields(dim = block.size(), n_eigenvalues = n_eigenvalues))]
pub fn eigs_lanczos<T: Scalar>(
    ops: &OpSum,
    block: &Block,
    n_eigenvalues: usize,
    params: &LanczosParams,
) -> Result<(LanczosResult, DVector<T>)> {
    let op = Operator::<T>::on(ops, block)?;
    let v0 = random_vector::<T>(block.size(), params.seed);
    let result = run(&op, &v0, n_eigenvalues, params).context("eigs_lanczos")?;
    if result.n_iterations == 0 {
        return Err(EdError::invalid("eigs_lanczos on an empty block"));
    }

    let n_steps = result.n_iterations;
    let coefficients = result.tmatrix().eigenvectors().column(0).into_owned();
    let mut ground_state = DVector::<T>::zeros(block.size());
    lanczos(
        |v, w| op.apply(v, w),
        &v0,
        |t| Ok(t.size() >= n_steps),
        &LanczosParams {
            deflation_tol: 0.0,
            ..*params
        },
        |i, v| {
            if i < n_steps {
                ground_state.axpy(T::from_real(coefficients[i]), v, T::from_real(1.0));
            }
            Ok(())
        },
    )
    .context("eigs_lanczos: ground state pass")?;
    let nrm = ground_state.norm();
    ground_state /= T::from_real(nrm);
    Ok((result, ground_state))
}
