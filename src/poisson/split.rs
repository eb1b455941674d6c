//! Histogram split search for the Poisson variant — structurally the same
//! sweep as [`crate::split`], but each row contributes its Newton
//! gradient/Hessian instead of a plain `(z, residual)` pair, and
//! `check_zero` can veto a boundary outright before gain is even scored.

use crate::bucketize::Bucketiser;
use crate::concurrency::WorkerPool;
use crate::data::DenseMatrix;
use crate::linalg::{self, GramMatrix};
use crate::split::SplitCandidate;
use rayon::prelude::*;

use super::leaf::row_gradients;

struct FeatureHistogram {
    counts: Vec<usize>,
    gram: Vec<GramMatrix>,
    grad: Vec<Vec<f64>>,
    freq_sum: Vec<f64>,
}

#[allow(clippy::too_many_arguments)]
fn build_histogram(
    feature: usize,
    rows: &[usize],
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    freq: &[f64],
    row_g: &[f64],
    row_h: &[f64],
    q: usize,
) -> FeatureHistogram {
    let n_bins = bucketiser.n_bins(feature);
    let mut counts = vec![0usize; n_bins];
    let mut gram: Vec<GramMatrix> = (0..n_bins).map(|_| GramMatrix::zeros(q)).collect();
    let mut grad: Vec<Vec<f64>> = vec![vec![0.0; q]; n_bins];
    let mut freq_sum = vec![0.0; n_bins];

    for (idx, &i) in rows.iter().enumerate() {
        let b = bucketiser.bin(i, feature) as usize;
        counts[b] += 1;
        freq_sum[b] += freq[i];
        let z = extra.row(i);
        let scaled_z: Vec<f64> = z.iter().map(|v| v * row_h[idx].sqrt()).collect();
        gram[b].add_outer(&scaled_z);
        for k in 0..q {
            grad[b][k] += z[k] * row_g[idx];
        }
    }

    FeatureHistogram {
        counts,
        gram,
        grad,
        freq_sum,
    }
}

#[allow(clippy::too_many_arguments)]
fn best_split_for_feature(
    feature: usize,
    rows: &[usize],
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    freq: &[f64],
    row_g: &[f64],
    row_h: &[f64],
    lambda: f64,
    min_rows: usize,
    check_zero: bool,
    h_total: &GramMatrix,
    g_total: &[f64],
    freq_total: f64,
    parent_gain: f64,
) -> Option<SplitCandidate> {
    let q = h_total.q();
    let n_bins = bucketiser.n_bins(feature);
    if n_bins <= 1 {
        return None;
    }

    let hist = build_histogram(feature, rows, bucketiser, extra, freq, row_g, row_h, q);
    if hist.counts.iter().filter(|&&c| c > 0).count() <= 1 {
        return None;
    }

    let n_total = rows.len();
    let thresholds = bucketiser.thresholds(feature);

    let mut h_l = GramMatrix::zeros(q);
    let mut g_l = vec![0.0; q];
    let mut freq_l = 0.0;
    let mut left_count = 0usize;
    let mut best: Option<SplitCandidate> = None;

    for b in 0..n_bins - 1 {
        h_l.add_assign(&hist.gram[b]);
        for k in 0..q {
            g_l[k] += hist.grad[b][k];
        }
        freq_l += hist.freq_sum[b];
        left_count += hist.counts[b];
        let right_count = n_total - left_count;
        let freq_r = freq_total - freq_l;

        if left_count < min_rows || right_count < min_rows {
            continue;
        }
        if check_zero && (freq_l <= 0.0 || freq_r <= 0.0) {
            continue;
        }

        let mut h_r = h_total.clone();
        h_r.sub_assign(&h_l);
        let g_r: Vec<f64> = g_total.iter().zip(&g_l).map(|(t, l)| t - l).collect();

        let gain = linalg::gain_of(&h_l, &g_l, lambda) + linalg::gain_of(&h_r, &g_r, lambda) - parent_gain;

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

#[allow(clippy::too_many_arguments)]
pub(super) fn find_best_split(
    rows: &[usize],
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    bjid: &[u64],
    freq: &[f64],
    raw_scores: &[f64],
    lambda: f64,
    unbalanced_penalty: f64,
    check_zero: bool,
    min_rows: usize,
    parent_gain: f64,
    pool: &WorkerPool,
) -> Option<SplitCandidate> {
    let q = extra.cols();
    let n_features = bucketiser.n_features();

    let (row_g, row_h) = row_gradients(rows, bjid, freq, raw_scores, unbalanced_penalty);

    let mut h_total = GramMatrix::zeros(q);
    let mut g_total = vec![0.0; q];
    let mut freq_total = 0.0;
    for (idx, &i) in rows.iter().enumerate() {
        let z = extra.row(i);
        let scaled_z: Vec<f64> = z.iter().map(|v| v * row_h[idx].sqrt()).collect();
        h_total.add_outer(&scaled_z);
        for k in 0..q {
            g_total[k] += z[k] * row_g[idx];
        }
        freq_total += freq[i];
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
                    freq,
                    &row_g,
                    &row_h,
                    lambda,
                    min_rows,
                    check_zero,
                    &h_total,
                    &g_total,
                    freq_total,
                    parent_gain,
                )
            })
            .collect()
    });

    let mut best: Option<SplitCandidate> = None;
    for candidate in candidates.into_iter().flatten() {
        if best.as_ref().map(|b| candidate.gain > b.gain).unwrap_or(true) {
            best = Some(candidate);
        }
    }
    best
}
