use super::{LanczosResult, START_NORM_TOL, converged_time_evolution, lanczos};
use crate::apply::Operator;
use crate::block::Block;
use crate::error::{EdError, Result, ResultExt};
use crate::operators::OpSum;
use crate::params::{EvolveParams, LanczosParams};
use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use phyz_math::{Scalar, expm, is_hermitian, norm};
use tracing::debug;

/// Blocks up to this dimension get a dense Hermiticity check before evolving.
pub const HERMITICITY_CHECK_DIM: usize = 1024;

/// `exp(tau (H - shift)) v` in the Krylov space of `v`.
///
/// The first pass builds the tridiagonal matrix until the a-posteriori error
/// bound drops below `params.precision`; the second pass reruns the
/// recurrence and sums the Lanczos vectors with the first column of
/// `exp(tau T)`. The result keeps the norm of `v` unless `params.normalize`.
pub fn exp_sym_v<T, M>(
    mut mult: M,
    v: &DVector<T>,
    tau: T,
    params: &EvolveParams,
) -> Result<(DVector<T>, LanczosResult)>
where
    T: Scalar,
    M: FnMut(&DVector<T>, &mut DVector<T>) -> Result<()>,
{
    let nrm = norm(v);
    if nrm <= START_NORM_TOL {
        return Err(EdError::invalid("time evolution of a zero-norm state"));
    }
    let lanczos_params = LanczosParams {
        precision: params.precision,
        max_iterations: params.max_iterations,
        deflation_tol: params.deflation_tol,
        reorthogonalize: false,
        ..Default::default()
    };

    let tau_c = tau.to_complex();
    let first = lanczos(
        |a, b| mult(a, b),
        v,
        |t| Ok(converged_time_evolution(t, tau_c, params.precision, nrm)),
        &lanczos_params,
        |_, _| Ok(()),
    )?;
    let n_steps = first.n_iterations;

    let mut tmat = first.tmatrix().mat();
    for i in 0..n_steps {
        tmat[(i, i)] -= params.shift;
    }
    let texp: DMatrix<T> = expm(&(tmat.map(T::from_real) * tau));

    let mut result = DVector::<T>::zeros(v.len());
    lanczos(
        |a, b| mult(a, b),
        v,
        |t| Ok(t.size() >= n_steps),
        &LanczosParams {
            deflation_tol: 0.0,
            ..lanczos_params
        },
        |i, vi| {
            if i < n_steps {
                result.axpy(texp[(i, 0)], vi, T::from_real(1.0));
            }
            Ok(())
        },
    )?;

    let scale = if params.normalize {
        1.0 / norm(&result)
    } else {
        nrm
    };
    result *= T::from_real(scale);
    debug!(n_steps, criterion = ?first.criterion, "exp_sym_v done");
    Ok((result, first))
}

/// `exp(-i H t) psi` for the Hermitian operator `ops` on `block`.
#[tracing::instrument(skip_all, fields(dim = block.size(), t = t))]
pub fn evolve_lanczos(
    ops: &OpSum,
    block: &Block,
    psi: &DVector<Complex64>,
    t: f64,
    params: &EvolveParams,
) -> Result<DVector<Complex64>> {
    let op = Operator::<Complex64>::on(ops, block).context("evolve_lanczos")?;
    if block.size() <= HERMITICITY_CHECK_DIM && !is_hermitian(&op.matrix()?, 1e-12) {
        return Err(EdError::invalid("evolve_lanczos requires a Hermitian operator"));
    }
    let tau = Complex64::new(0.0, -t);
    let (psi_t, _) = exp_sym_v(|a, b| op.apply(a, b), psi, tau, params)
        .context("evolve_lanczos")?;
    Ok(psi_t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Spinhalf, Tj};
    use crate::operators::{Op, OpType};

    fn dense_evolution(
        h: &DMatrix<Complex64>,
        psi: &DVector<Complex64>,
        t: f64,
    ) -> DVector<Complex64> {
        expm(&(h * Complex64::new(0.0, -t))) * psi
    }

    #[test]
    fn test_matches_dense_exponential() {
        let block: Block = Tj::new(5, 2, 1).unwrap().into();
        let mut ops = OpSum::new();
        for i in 0..5 {
            ops += (1.0, Op::new(OpType::Hop, [i, (i + 1) % 5]).unwrap());
            ops += (0.3, Op::new(OpType::TjSdotS, [i, (i + 1) % 5]).unwrap());
        }
        let psi = DVector::from_fn(block.size(), |i, _| Complex64::new(1.0, 0.1 * i as f64));
        let params = EvolveParams {
            precision: 1e-10,
            ..Default::default()
        };
        let psi_t = evolve_lanczos(&ops, &block, &psi, 0.7, &params).unwrap();
        let h = Operator::<Complex64>::on(&ops, &block).unwrap().matrix().unwrap();
        let exact = dense_evolution(&h, &psi, 0.7);
        assert!((&psi_t - &exact).norm() < 1e-8 * psi.norm());
        assert!((psi_t.norm() - psi.norm()).abs() < 1e-8);
    }

    #[test]
    fn test_imaginary_time_with_shift() {
        let block: Block = Spinhalf::with_sz(4, 2).unwrap().into();
        let mut ops = OpSum::new();
        for i in 0..4 {
            ops += (1.0, Op::new(OpType::SdotS, [i, (i + 1) % 4]).unwrap());
        }
        let op = Operator::<f64>::on(&ops, &block).unwrap();
        let v = DVector::from_fn(block.size(), |i, _| 1.0 + 0.3 * i as f64);
        let params = EvolveParams {
            normalize: true,
            shift: -2.0,
            ..Default::default()
        };
        let (w, _) = exp_sym_v(|a, b| op.apply(a, b), &v, -20.0, &params).unwrap();
        assert!((w.norm() - 1.0).abs() < 1e-12);
        // long imaginary time projects onto the ground state
        let mut hw = DVector::zeros(block.size());
        op.apply(&w, &mut hw).unwrap();
        assert!((&hw + &w * 2.0).norm() < 1e-6);
    }

    #[test]
    fn test_zero_state_is_error() {
        let block: Block = Spinhalf::with_sz(4, 2).unwrap().into();
        let mut ops = OpSum::new();
        ops += (1.0, Op::new(OpType::SzSz, [0, 1]).unwrap());
        let psi = DVector::zeros(block.size());
        assert!(evolve_lanczos(&ops, &block, &psi, 1.0, &EvolveParams::default()).is_err());
    }

    #[test]
    fn test_rejects_non_hermitian() {
        let block: Block = Spinhalf::with_sz(3, 1).unwrap().into();
        let mut ops = OpSum::new();
        ops += (
            Complex64::new(1.0, 1.0),
            Op::new(OpType::SzSz, [0, 1]).unwrap(),
        );
        let psi = DVector::from_element(block.size(), Complex64::new(1.0, 0.0));
        let err = evolve_lanczos(&ops, &block, &psi, 1.0, &EvolveParams::default()).unwrap_err();
        assert!(err.to_string().contains("Hermitian"));
    }
}
