//! Fixed-Size Matrix Operations
//!
//! The minimal linear algebra the Kalman estimator needs, on const-generic
//! stack arrays. No heap allocation; every dimension is known at compile
//! time (the filter is 3-state with 1 or 2 measurement channels, so all
//! matrices here are tiny).

/// Matrix type using const generics.
pub type Matrix<const R: usize, const C: usize> = [[f32; C]; R];

/// Square matrix type.
pub type SquareMatrix<const N: usize> = Matrix<N, N>;

/// Vector type.
pub type Vector<const N: usize> = [f32; N];

/// Matrix multiplication: result = A × B.
pub fn multiply<const R: usize, const K: usize, const C: usize>(
    a: &Matrix<R, K>,
    b: &Matrix<K, C>,
    result: &mut Matrix<R, C>,
) {
    for i in 0..R {
        for j in 0..C {
            result[i][j] = 0.0;
            for k in 0..K {
                result[i][j] += a[i][k] * b[k][j];
            }
        }
    }
}

/// Matrix-vector multiplication: result = A × x.
pub fn matvec<const R: usize, const C: usize>(
    a: &Matrix<R, C>,
    x: &Vector<C>,
    result: &mut Vector<R>,
) {
    for i in 0..R {
        result[i] = 0.0;
        for j in 0..C {
            result[i] += a[i][j] * x[j];
        }
    }
}

/// Matrix transpose: result = Aᵀ.
pub fn transpose<const R: usize, const C: usize>(a: &Matrix<R, C>, result: &mut Matrix<C, R>) {
    for i in 0..R {
        for j in 0..C {
            result[j][i] = a[i][j];
        }
    }
}

/// Matrix addition: result = A + B.
pub fn add<const R: usize, const C: usize>(
    a: &Matrix<R, C>,
    b: &Matrix<R, C>,
    result: &mut Matrix<R, C>,
) {
    for i in 0..R {
        for j in 0..C {
            result[i][j] = a[i][j] + b[i][j];
        }
    }
}

/// Symmetrize in place: A = (A + Aᵀ) / 2.
///
/// Covariance updates accumulate asymmetric rounding error; this keeps
/// the matrix a valid covariance.
pub fn make_symmetric<const N: usize>(a: &mut SquareMatrix<N>) {
    for i in 0..N {
        for j in i + 1..N {
            let avg = (a[i][j] + a[j][i]) * 0.5;
            a[i][j] = avg;
            a[j][i] = avg;
        }
    }
}

/// Diagonal-dominance conditioning check.
///
/// A cheap stand-in for a condition-number estimate: rejects covariances
/// whose diagonal has collapsed or spread over more than six orders of
/// magnitude.
pub fn is_well_conditioned<const N: usize>(a: &SquareMatrix<N>) -> bool {
    const MIN_DIAGONAL: f32 = 1e-6;
    const MAX_CONDITION: f32 = 1e6;

    let mut min_diag = f32::INFINITY;
    let mut max_diag = 0.0f32;
    for i in 0..N {
        let diag = a[i][i].abs();
        min_diag = min_diag.min(diag);
        max_diag = max_diag.max(diag);
    }

    min_diag >= MIN_DIAGONAL && max_diag / min_diag <= MAX_CONDITION
}

/// Matrix inversion by Gauss-Jordan elimination with partial pivoting.
///
/// Only the innovation covariance (1×1 or 2×2) is ever inverted here, so
/// the augmented buffer is sized for N ≤ 4. Returns false if the matrix
/// is singular (or larger than the buffer).
pub fn invert<const N: usize>(a: &SquareMatrix<N>, inv: &mut SquareMatrix<N>) -> bool {
    // Fixed maximum size sidesteps const-generic arithmetic limits.
    const MAX_N: usize = 4;
    if N > MAX_N {
        return false;
    }

    // Augmented matrix [A | I]
    let mut aug: [[f32; MAX_N * 2]; MAX_N] = [[0.0; MAX_N * 2]; MAX_N];
    for i in 0..N {
        for j in 0..N {
            aug[i][j] = a[i][j];
            aug[i][j + N] = if i == j { 1.0 } else { 0.0 };
        }
    }

    for k in 0..N {
        // Partial pivot
        let mut max_row = k;
        let mut max_val = aug[k][k].abs();
        for i in (k + 1)..N {
            if aug[i][k].abs() > max_val {
                max_val = aug[i][k].abs();
                max_row = i;
            }
        }
        if max_val < 1e-10 {
            return false;
        }
        if max_row != k {
            aug.swap(k, max_row);
        }

        // Scale pivot row
        let pivot = aug[k][k];
        for j in 0..(N * 2) {
            aug[k][j] /= pivot;
        }

        // Eliminate the column in every other row
        for i in 0..N {
            if i != k {
                let factor = aug[i][k];
                for j in 0..(N * 2) {
                    aug[i][j] -= factor * aug[k][j];
                }
            }
        }
    }

    for i in 0..N {
        for j in 0..N {
            inv[i][j] = aug[i][j + N];
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiply_identity() {
        let a: Matrix<2, 2> = [[1.0, 2.0], [3.0, 4.0]];
        let i: Matrix<2, 2> = [[1.0, 0.0], [0.0, 1.0]];
        let mut result = [[0.0; 2]; 2];
        multiply(&a, &i, &mut result);
        assert_eq!(result, a);
    }

    #[test]
    fn matvec_basic() {
        let a: Matrix<2, 3> = [[1.0, 0.0, 2.0], [0.0, 1.0, 0.0]];
        let x = [3.0, 4.0, 5.0];
        let mut y = [0.0; 2];
        matvec(&a, &x, &mut y);
        assert_eq!(y, [13.0, 4.0]);
    }

    #[test]
    fn transpose_rectangular() {
        let a: Matrix<2, 3> = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mut t = [[0.0; 2]; 3];
        transpose(&a, &mut t);
        assert_eq!(t, [[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
    }

    #[test]
    fn symmetrize_averages_off_diagonal() {
        let mut a: SquareMatrix<2> = [[1.0, 0.4], [0.2, 1.0]];
        make_symmetric(&mut a);
        assert!((a[0][1] - 0.3).abs() < 1e-7);
        assert_eq!(a[0][1], a[1][0]);
    }

    #[test]
    fn invert_2x2() {
        let a: SquareMatrix<2> = [[4.0, 7.0], [2.0, 6.0]];
        let mut inv = [[0.0; 2]; 2];
        assert!(invert(&a, &mut inv));

        let mut product = [[0.0; 2]; 2];
        multiply(&a, &inv, &mut product);
        for i in 0..2 {
            for j in 0..2 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[i][j] - expected).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn invert_rejects_singular() {
        let a: SquareMatrix<2> = [[1.0, 2.0], [2.0, 4.0]];
        let mut inv = [[0.0; 2]; 2];
        assert!(!invert(&a, &mut inv));
    }

    #[test]
    fn conditioning_check() {
        let good: SquareMatrix<3> = [[1.0, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]];
        assert!(is_well_conditioned(&good));

        let collapsed: SquareMatrix<3> = [[1e-9, 0.0, 0.0], [0.0, 5.0, 0.0], [0.0, 0.0, 5.0]];
        assert!(!is_well_conditioned(&collapsed));
    }
}
