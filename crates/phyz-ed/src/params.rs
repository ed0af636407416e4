//! Solver and runtime parameters.
//!
//! Plain structs with `Default` and serde derives, so a driver can load them
//! from any serde format and override single fields.

use serde::{Deserialize, Serialize};

/// Parameters of the Lanczos eigenvalue solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanczosParams {
    /// Relative change of the target eigenvalue regarded as converged.
    pub precision: f64,
    /// Hard cap on the number of Lanczos steps.
    pub max_iterations: usize,
    /// `beta` below which the Krylov space is exhausted.
    pub deflation_tol: f64,
    /// Orthogonalize every new vector against all previous ones.
    pub reorthogonalize: bool,
    /// Seed of the random start vector.
    pub seed: u64,
}

impl Default for LanczosParams {
    fn default() -> Self {
        Self {
            precision: 1e-12,
            max_iterations: 1000,
            deflation_tol: 1e-7,
            reorthogonalize: false,
            seed: 42,
        }
    }
}

/// Parameters of Krylov time evolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolveParams {
    /// Bound on the a-posteriori truncation error.
    pub precision: f64,
    pub max_iterations: usize,
    pub deflation_tol: f64,
    /// Return a unit vector instead of preserving the input norm.
    pub normalize: bool,
    /// Energy shift subtracted from the tridiagonal matrix before exponentiation.
    pub shift: f64,
}

impl Default for EvolveParams {
    fn default() -> Self {
        Self {
            precision: 1e-12,
            max_iterations: 1000,
            deflation_tol: 1e-7,
            normalize: false,
            shift: 0.0,
        }
    }
}

/// Worker pool size; `0` uses every available core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelParams {
    pub n_threads: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let params: LanczosParams =
            serde_json::from_str(r#"{ "precision": 1e-8, "reorthogonalize": true }"#).unwrap();
        assert_eq!(params.precision, 1e-8);
        assert!(params.reorthogonalize);
        assert_eq!(params.max_iterations, 1000);
    }

    #[test]
    fn test_round_trip() {
        let params = EvolveParams {
            normalize: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        let back: EvolveParams = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }
}
