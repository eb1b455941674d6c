//! Split finder — the core of the training loop.
//!
//! For a node's row set S, each candidate feature sweeps its bins in
//! threshold order, maintaining running left-side Gram/gradient
//! aggregates; the right side is `total - left`. Features are sharded
//! across the worker pool (each worker owns its own scratch q×q buffer),
//! then reduced to a single global best in ascending feature order so the
//! result is independent of thread scheduling.

use crate::bucketize::Bucketiser;
use crate::concurrency::WorkerPool;
use crate::data::DenseMatrix;
use crate::linalg::{self, GramMatrix};
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct SplitCandidate {
    pub feature: usize,
    pub boundary: usize,
    pub threshold: f64,
    pub gain: f64,
}

struct FeatureHistogram {
    counts: Vec<usize>,
    gram: Vec<GramMatrix>,
    grad: Vec<Vec<f64>>,
}

impl FeatureHistogram {
    fn build(
        feature: usize,
        rows: &[usize],
        bucketiser: &Bucketiser,
        extra: &DenseMatrix,
        residual: &[f64],
        q: usize,
    ) -> Self {
        let n_bins = bucketiser.n_bins(feature);
        let mut counts = vec![0usize; n_bins];
        let mut gram: Vec<GramMatrix> = (0..n_bins).map(|_| GramMatrix::zeros(q)).collect();
        let mut grad: Vec<Vec<f64>> = vec![vec![0.0; q]; n_bins];

        for &i in rows {
            let b = bucketiser.bin(i, feature) as usize;
            counts[b] += 1;
            let z = extra.row(i);
            gram[b].add_outer(z);
            let r = residual[i];
            for k in 0..q {
                grad[b][k] += z[k] * r;
            }
        }

        Self {
            counts,
            gram,
            grad,
        }
    }
}

/// Best split for a single feature, scanning bin boundaries left to right.
#[allow(clippy::too_many_arguments)]
fn best_split_for_feature(
    feature: usize,
    rows: &[usize],
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    residual: &[f64],
    lambda: f64,
    unbalanced_loss: f64,
    min_rows: usize,
    h_total: &GramMatrix,
    g_total: &[f64],
    parent_gain: f64,
) -> Option<SplitCandidate> {
    let q = h_total.q();
    let n_bins = bucketiser.n_bins(feature);
    if n_bins <= 1 {
        return None;
    }

    let hist = FeatureHistogram::build(feature, rows, bucketiser, extra, residual, q);
    if hist.counts.iter().filter(|&&c| c > 0).count() <= 1 {
        return None;
    }

    let n_total = rows.len();
    let thresholds = bucketiser.thresholds(feature);

    let mut h_l = GramMatrix::zeros(q);
    let mut g_l = vec![0.0; q];
    let mut left_count = 0usize;
    let mut best: Option<SplitCandidate> = None;

    for b in 0..n_bins - 1 {
        h_l.add_assign(&hist.gram[b]);
        for k in 0..q {
            g_l[k] += hist.grad[b][k];
        }
        left_count += hist.counts[b];
        let right_count = n_total - left_count;

        if left_count < min_rows || right_count < min_rows {
            continue;
        }

        let mut h_r = h_total.clone();
        h_r.sub_assign(&h_l);
        let g_r: Vec<f64> = g_total.iter().zip(&g_l).map(|(t, l)| t - l).collect();

        let mut gain = linalg::gain_of(&h_l, &g_l, lambda) + linalg::gain_of(&h_r, &g_r, lambda)
            - parent_gain;

        if unbalanced_loss > 0.0 {
            let imbalance = (left_count as f64 - right_count as f64).abs() / n_total as f64;
            gain -= unbalanced_loss * imbalance;
        }

        if gain > 0.0 && best.as_ref().map(|c| gain > c.gain).unwrap_or(true) {
            best = Some(SplitCandidate {
                feature,
                boundary: b,
                threshold: thresholds[b],
                gain,
            });
        }
    }

    best
}

/// Scans every inter-feature in parallel and reduces to the single best
/// split, or `None` if no feature yields positive gain.
#[allow(clippy::too_many_arguments)]
pub fn find_best_split(
    rows: &[usize],
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    residual: &[f64],
    lambda: f64,
    unbalanced_loss: f64,
    min_rows: usize,
    parent_gain: f64,
    pool: &WorkerPool,
) -> Option<SplitCandidate> {
    let q = extra.cols();
    let n_features = bucketiser.n_features();

    let mut h_total = GramMatrix::zeros(q);
    let mut g_total = vec![0.0; q];
    for &i in rows {
        let z = extra.row(i);
        h_total.add_outer(z);
        let r = residual[i];
        for k in 0..q {
            g_total[k] += z[k] * r;
        }
    }

    let candidates: Vec<Option<SplitCandidate>> = pool.install(|| {
        (0..n_features)
            .into_par_iter()
            .map(|feature| {
                best_split_for_feature(
                    feature,
                    rows,
                    bucketiser,
                    extra,
                    residual,
                    lambda,
                    unbalanced_loss,
                    min_rows,
                    &h_total,
                    &g_total,
                    parent_gain,
                )
            })
            .collect()
    });

    // Reduce in ascending feature order so the result never depends on
    // worker scheduling.
    let mut best: Option<SplitCandidate> = None;
    for candidate in candidates.into_iter().flatten() {
        if best.as_ref().map(|b| candidate.gain > b.gain).unwrap_or(true) {
            best = Some(candidate);
        }
    }
    best
}
