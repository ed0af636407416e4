//! Dense eigensolver, matrix exponential, and vector arithmetic.

use crate::{DVec, Scalar};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Eigen-decomposition of a real symmetric or complex Hermitian matrix.
///
/// Eigenvalues are returned in ascending order, with eigenvectors as the
/// columns of the second matrix in the same order.
pub fn eig_sym<T: Scalar>(m: &DMatrix<T>) -> (DVec, DMatrix<T>) {
    let n = m.nrows();
    if n == 0 {
        return (DVec::zeros(0), DMatrix::zeros(0, 0));
    }
    let eig = SymmetricEigen::new(m.clone());

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| eig.eigenvalues[a].total_cmp(&eig.eigenvalues[b]));

    let values = DVec::from_iterator(n, order.iter().map(|&i| eig.eigenvalues[i]));
    let mut vectors = DMatrix::<T>::zeros(n, n);
    for (col, &i) in order.iter().enumerate() {
        vectors.set_column(col, &eig.eigenvectors.column(i));
    }
    (values, vectors)
}

/// Eigenvalues only, ascending.
pub fn eigvals_sym<T: Scalar>(m: &DMatrix<T>) -> DVec {
    if m.nrows() == 0 {
        return DVec::zeros(0);
    }
    let mut values: Vec<f64> = m.clone().symmetric_eigenvalues().iter().copied().collect();
    values.sort_by(f64::total_cmp);
    DVec::from_vec(values)
}

/// Matrix exponential via nalgebra's scaling-and-squaring Padé approximant.
pub fn expm<T: Scalar>(m: &DMatrix<T>) -> DMatrix<T> {
    m.exp()
}

/// Whether `m` equals its conjugate transpose within `tol` (entrywise).
pub fn is_hermitian<T: Scalar>(m: &DMatrix<T>, tol: f64) -> bool {
    if m.nrows() != m.ncols() {
        return false;
    }
    let n = m.nrows();
    for i in 0..n {
        for j in i..n {
            if (m[(i, j)] - m[(j, i)].conjugate()).modulus() > tol {
                return false;
            }
        }
    }
    true
}

/// Inner product ⟨a|b⟩, conjugate-linear in `a`.
#[inline]
pub fn dot<T: Scalar>(a: &DVector<T>, b: &DVector<T>) -> T {
    a.dotc(b)
}

/// Euclidean norm.
#[inline]
pub fn norm<T: Scalar>(a: &DVector<T>) -> f64 {
    a.norm()
}

/// In-place `a *= alpha`.
#[inline]
pub fn scale<T: Scalar>(alpha: T, a: &mut DVector<T>) {
    *a *= alpha;
}

/// In-place `y += alpha * x`.
#[inline]
pub fn axpy<T: Scalar>(alpha: T, x: &DVector<T>, y: &mut DVector<T>) {
    y.axpy(alpha, x, T::from_real(1.0));
}

/// Normalize in place and return the previous norm.
///
/// A zero vector is left untouched and reports a norm of zero.
pub fn normalize<T: Scalar>(a: &mut DVector<T>) -> f64 {
    let nrm = a.norm();
    if nrm > 0.0 {
        *a /= T::from_real(nrm);
    }
    nrm
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CMat, Complex64, DMat};
    use approx::assert_relative_eq;

    #[test]
    fn test_eig_sym_sorted() {
        let m = DMat::from_row_slice(3, 3, &[2.0, 1.0, 0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0]);
        let (vals, vecs) = eig_sym(&m);
        let s2 = 2.0_f64.sqrt();
        assert_relative_eq!(vals[0], 2.0 - s2, epsilon = 1e-12);
        assert_relative_eq!(vals[1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(vals[2], 2.0 + s2, epsilon = 1e-12);

        for k in 0..3 {
            let v = vecs.column(k).into_owned();
            let mv = &m * &v;
            assert!((mv - &v * vals[k]).norm() < 1e-10, "eigenpair {k}");
        }
    }

    #[test]
    fn test_eig_hermitian() {
        // Pauli-y has eigenvalues ±1
        let i = Complex64::new(0.0, 1.0);
        let z = Complex64::new(0.0, 0.0);
        let m = CMat::from_row_slice(2, 2, &[z, -i, i, z]);
        let vals = eigvals_sym(&m);
        assert_relative_eq!(vals[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(vals[1], 1.0, epsilon = 1e-12);
        assert!(is_hermitian(&m, 1e-14));
    }

    #[test]
    fn test_expm_diagonal() {
        let m = DMat::from_diagonal(&DVec::from_vec(vec![0.0, 1.0, -2.0]));
        let e = expm(&m);
        assert_relative_eq!(e[(0, 0)], 1.0, epsilon = 1e-12);
        assert_relative_eq!(e[(1, 1)], 1.0_f64.exp(), epsilon = 1e-12);
        assert_relative_eq!(e[(2, 2)], (-2.0_f64).exp(), epsilon = 1e-12);
        assert!(e[(0, 1)].abs() < 1e-14);
    }

    #[test]
    fn test_expm_rotation() {
        // exp(-i θ σx) = cos θ - i sin θ σx
        let theta = 0.3;
        let z = Complex64::new(0.0, 0.0);
        let a = Complex64::new(0.0, -theta);
        let m = CMat::from_row_slice(2, 2, &[z, a, a, z]);
        let e = expm(&m);
        assert!((e[(0, 0)] - Complex64::new(theta.cos(), 0.0)).norm() < 1e-12);
        assert!((e[(0, 1)] - Complex64::new(0.0, -theta.sin())).norm() < 1e-12);
    }

    #[test]
    fn test_vector_ops() {
        let mut a = DVec::from_vec(vec![3.0, 4.0]);
        let b = DVec::from_vec(vec![1.0, 1.0]);
        assert_relative_eq!(dot(&a, &b), 7.0);
        assert_relative_eq!(norm(&a), 5.0);
        axpy(2.0, &b, &mut a);
        assert_relative_eq!(a[0], 5.0);
        scale(0.5, &mut a);
        assert_relative_eq!(a[1], 3.0);
        let prev = normalize(&mut a);
        assert_relative_eq!(prev, (2.5_f64 * 2.5 + 9.0).sqrt());
        assert_relative_eq!(norm(&a), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_dot_is_conjugate_linear() {
        let i = Complex64::new(0.0, 1.0);
        let a = crate::CVec::from_vec(vec![i]);
        let b = crate::CVec::from_vec(vec![Complex64::new(1.0, 0.0)]);
        assert_eq!(dot(&a, &b), -i);
    }
}
