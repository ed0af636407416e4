use phyz_math::{DMat, DVec, eig_sym, eigvals_sym};

/// The tridiagonal projection built by the Lanczos recurrence.
///
/// Step `i` appends `alpha_i` (diagonal) and `beta_i`, the norm of the
/// residual coupling step `i` to step `i + 1`. The last beta is therefore
/// not part of [`mat`](Self::mat); it measures how far the Krylov space is
/// from invariant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tmatrix {
    alphas: Vec<f64>,
    betas: Vec<f64>,
}

impl Tmatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, alpha: f64, beta: f64) {
        self.alphas.push(alpha);
        self.betas.push(beta);
    }

    /// Drop the last step.
    pub fn pop(&mut self) {
        self.alphas.pop();
        self.betas.pop();
    }

    pub fn size(&self) -> usize {
        self.alphas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alphas.is_empty()
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    /// The residual norm of the last step, zero when empty.
    pub fn last_beta(&self) -> f64 {
        self.betas.last().copied().unwrap_or(0.0)
    }

    pub fn mat(&self) -> DMat {
        let n = self.size();
        let mut t = DMat::zeros(n, n);
        for i in 0..n {
            t[(i, i)] = self.alphas[i];
            if i + 1 < n {
                t[(i, i + 1)] = self.betas[i];
                t[(i + 1, i)] = self.betas[i];
            }
        }
        t
    }

    /// Eigenvalues of [`mat`](Self::mat), ascending.
    pub fn eigenvalues(&self) -> DVec {
        eigvals_sym(&self.mat())
    }

    /// Eigenvectors of [`mat`](Self::mat) as columns, ascending eigenvalue order.
    pub fn eigenvectors(&self) -> DMat {
        eig_sym(&self.mat()).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mat_and_spectrum() {
        let mut t = Tmatrix::new();
        t.append(0.0, 1.0);
        t.append(0.0, 0.5);
        assert_eq!(t.mat(), DMat::from_row_slice(2, 2, &[0.0, 1.0, 1.0, 0.0]));
        let evals = t.eigenvalues();
        assert_relative_eq!(evals[0], -1.0, epsilon = 1e-14);
        assert_relative_eq!(evals[1], 1.0, epsilon = 1e-14);
        assert_eq!(t.last_beta(), 0.5);
        t.pop();
        assert_eq!(t.size(), 1);
        assert_eq!(t.last_beta(), 1.0);
    }

    #[test]
    fn test_eigenvectors_diagonalize() {
        let mut t = Tmatrix::new();
        for (a, b) in [(1.0, 0.3), (-2.0, 0.7), (0.5, 0.0)] {
            t.append(a, b);
        }
        let m = t.mat();
        let v = t.eigenvectors();
        let d = v.transpose() * &m * &v;
        for (i, e) in t.eigenvalues().iter().enumerate() {
            assert_relative_eq!(d[(i, i)], *e, epsilon = 1e-12);
        }
    }
}
