//! Leaf solver.
//!
//! Fits `β = argmin Σ(rᵢ - zᵢᵀβ)² + λ‖β‖²` over a row subset via the normal
//! equations `(ZᵀZ + λI)β = Zᵀr`, solved with the dense Cholesky in
//! [`crate::linalg`]. Dimensions are small (q typically ≤ 16) so this is a
//! handful of flops per leaf.

use crate::data::DenseMatrix;
use crate::linalg::{self, GramMatrix, MIN_LAMBDA};

pub struct LeafFit {
    pub beta: Vec<f64>,
    pub gain: f64,
}

/// Accumulates `H = ZᵀZ` and `g = Zᵀr` over `rows`, then solves for β.
pub fn solve_leaf(rows: &[usize], extra: &DenseMatrix, residual: &[f64], lambda: f64) -> LeafFit {
    let q = extra.cols();
    let mut h = GramMatrix::zeros(q);
    let mut g = vec![0.0; q];

    for &i in rows {
        let z = extra.row(i);
        h.add_outer(z);
        let r = residual[i];
        for k in 0..q {
            g[k] += z[k] * r;
        }
    }

    let (beta, singular) = linalg::solve_regularized(&h, &g, lambda);
    if singular {
        return LeafFit {
            beta: vec![0.0; q],
            gain: 0.0,
        };
    }

    let gain = linalg::dot(&g, &beta) - 0.5 * lambda.max(MIN_LAMBDA) * linalg::dot(&beta, &beta);
    LeafFit { beta, gain }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_leaf_with_zero_lambda_is_the_mean() {
        // q = 1, Z ≡ 1, λ = 0 ⇒ β = mean(residuals) on the leaf's rows.
        let extra = DenseMatrix::from_rows(4, 1, vec![1.0, 1.0, 1.0, 1.0]).unwrap();
        let residual = vec![1.0, 2.0, 3.0, 4.0];
        let rows = vec![0, 1, 2, 3];
        let fit = solve_leaf(&rows, &extra, &residual, 0.0);
        assert!((fit.beta[0] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn empty_rows_give_zero_leaf() {
        let extra = DenseMatrix::from_rows(1, 2, vec![1.0, 0.5]).unwrap();
        let residual = vec![0.0];
        let fit = solve_leaf(&[], &extra, &residual, 1e-4);
        assert_eq!(fit.beta, vec![0.0, 0.0]);
        assert_eq!(fit.gain, 0.0);
    }

    #[test]
    fn extra_feature_linear_fit() {
        // y = 0.2 + 0.5 t, z = (1, t) ⇒ β ≈ (0.2, 0.5).
        let n = 10;
        let mut data = Vec::with_capacity(n * 2);
        let mut residual = Vec::with_capacity(n);
        for k in 0..n {
            let t = k as f64 / (n - 1) as f64;
            data.push(1.0);
            data.push(t);
            residual.push(0.2 + 0.5 * t);
        }
        let extra = DenseMatrix::from_rows(n, 2, data).unwrap();
        let rows: Vec<usize> = (0..n).collect();
        let fit = solve_leaf(&rows, &extra, &residual, 0.0);
        assert!((fit.beta[0] - 0.2).abs() < 1e-8);
        assert!((fit.beta[1] - 0.5).abs() < 1e-8);
    }
}
