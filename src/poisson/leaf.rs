//! Newton-step leaf solver for the Poisson variant.
//!
//! Replaces the least-squares normal equations with a Hessian-diagonal
//! weighted Gram system: at the current raw score F(x), the Poisson
//! negative log-likelihood's gradient and Hessian per row are
//! `g_i = freq_i - exp(F_i)` and `h_i = exp(F_i)`. The leaf solves for a
//! correction `β` regularised toward a prior `ψ` (zero unless the caller
//! supplies one): `(H + λI)(β − ψ) = g`.

use crate::data::DenseMatrix;
use crate::leaf::LeafFit;
use crate::linalg::{self, GramMatrix, MIN_LAMBDA};
use std::collections::HashMap;

/// Per-row Newton gradient/Hessian, rescaled by `unbalanced_penalty`
/// against each row's group-total frequency relative to the mean group
/// total among the rows under consideration.
pub(super) fn row_gradients(
    rows: &[usize],
    bjid: &[u64],
    freq: &[f64],
    raw_scores: &[f64],
    unbalanced_penalty: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut group_totals: HashMap<u64, f64> = HashMap::new();
    for &i in rows {
        *group_totals.entry(bjid[i]).or_insert(0.0) += freq[i];
    }
    let mean_group_total = if group_totals.is_empty() {
        0.0
    } else {
        group_totals.values().sum::<f64>() / group_totals.len() as f64
    };

    let mut g = Vec::with_capacity(rows.len());
    let mut h = Vec::with_capacity(rows.len());
    for &i in rows {
        let mu = raw_scores[i].exp();
        let weight = if unbalanced_penalty > 0.0 && mean_group_total > 0.0 {
            let total = group_totals[&bjid[i]];
            1.0 + unbalanced_penalty * (total - mean_group_total) / mean_group_total
        } else {
            1.0
        };
        g.push(weight * (freq[i] - mu));
        h.push(weight * mu);
    }
    (g, h)
}

#[allow(clippy::too_many_arguments)]
pub(super) fn solve_poisson_leaf(
    rows: &[usize],
    extra: &DenseMatrix,
    bjid: &[u64],
    freq: &[f64],
    raw_scores: &[f64],
    lambda: f64,
    unbalanced_penalty: f64,
    psi: &[f64],
) -> LeafFit {
    let q = extra.cols();
    if rows.is_empty() {
        return LeafFit {
            beta: psi.to_vec(),
            gain: 0.0,
        };
    }

    let (row_g, row_h) = row_gradients(rows, bjid, freq, raw_scores, unbalanced_penalty);

    let mut h = GramMatrix::zeros(q);
    let mut g = vec![0.0; q];
    for (idx, &i) in rows.iter().enumerate() {
        let z = extra.row(i);
        let scaled_z: Vec<f64> = z.iter().map(|v| v * row_h[idx].sqrt()).collect();
        h.add_outer(&scaled_z);
        for k in 0..q {
            g[k] += z[k] * row_g[idx];
        }
    }

    let (delta, singular) = linalg::solve_regularized(&h, &g, lambda);
    if singular {
        return LeafFit {
            beta: psi.to_vec(),
            gain: 0.0,
        };
    }

    let gain = linalg::dot(&g, &delta) - 0.5 * lambda.max(MIN_LAMBDA) * linalg::dot(&delta, &delta);
    let beta: Vec<f64> = delta.iter().zip(psi).map(|(d, p)| d + p).collect();
    LeafFit { beta, gain }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_rate_matches_newton_step() {
        // q = 1, z ≡ 1, ψ = 0: β should move freq toward exp(F) equality.
        let extra = DenseMatrix::from_rows(4, 1, vec![1.0; 4]).unwrap();
        let bjid = vec![0, 1, 2, 3];
        let freq = vec![10.0, 10.0, 10.0, 10.0];
        let raw_scores = vec![0.0; 4]; // exp(F) = 1 for all rows
        let rows = vec![0, 1, 2, 3];

        let fit = solve_poisson_leaf(&rows, &extra, &bjid, &freq, &raw_scores, 0.0, 0.0, &[0.0]);
        // Newton step for constant freq=10, mu=1: delta = sum(g)/sum(h) = (10-1)*4 / (1*4) = 9
        assert!((fit.beta[0] - 9.0).abs() < 1e-6);
    }

    #[test]
    fn empty_rows_fall_back_to_psi() {
        let extra = DenseMatrix::from_rows(1, 1, vec![1.0]).unwrap();
        let fit = solve_poisson_leaf(&[], &extra, &[0], &[0.0], &[0.0], 1e-4, 0.0, &[2.5]);
        assert_eq!(fit.beta, vec![2.5]);
    }
}
