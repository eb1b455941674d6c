//! Feature bucketiser.
//!
//! Precomputes, once per `train()` call, a per-feature sorted threshold set
//! and a compact bin-index matrix. Histogramming in the split finder then
//! becomes an O(n) accumulation per node regardless of `|unique(Xⱼ)|`.

use crate::data::DenseMatrix;

/// Per-feature thresholds plus the quantised bin-index matrix for X.
pub struct Bucketiser {
    /// `thresholds[j]` is feature j's sorted boundary set, length <= max_bins - 1.
    thresholds: Vec<Vec<f64>>,
    /// Row-major n x p bin indices, one byte per cell.
    bins: Vec<u8>,
    n_rows: usize,
    n_features: usize,
}

impl Bucketiser {
    /// Builds thresholds and bins for every column of `inter`.
    pub fn build(inter: &DenseMatrix, max_bins: usize) -> Self {
        let n_rows = inter.rows();
        let n_features = inter.cols();
        let mut thresholds = Vec::with_capacity(n_features);

        for j in 0..n_features {
            let mut column: Vec<f64> = (0..n_rows).map(|i| inter.get(i, j)).collect();
            thresholds.push(Self::thresholds_for_column(&mut column, max_bins));
        }

        let mut bins = vec![0u8; n_rows * n_features];
        for j in 0..n_features {
            let t = &thresholds[j];
            for i in 0..n_rows {
                bins[i * n_features + j] = Self::bin_of(t, inter.get(i, j));
            }
        }

        Self {
            thresholds,
            bins,
            n_rows,
            n_features,
        }
    }

    fn thresholds_for_column(column: &mut [f64], max_bins: usize) -> Vec<f64> {
        let mut sorted = column.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut uniques = Vec::with_capacity(sorted.len());
        for &v in &sorted {
            if uniques.last().map(|&u| u != v).unwrap_or(true) {
                uniques.push(v);
            }
        }

        if uniques.len() <= max_bins {
            uniques
                .windows(2)
                .map(|pair| 0.5 * (pair[0] + pair[1]))
                .collect()
        } else {
            let n = sorted.len();
            let mut thresholds = Vec::with_capacity(max_bins - 1);
            for k in 1..max_bins {
                let idx = ((k * n) / max_bins).min(n - 1);
                let candidate = sorted[idx];
                if thresholds.last().map(|&t| t != candidate).unwrap_or(true) {
                    thresholds.push(candidate);
                }
            }
            thresholds
        }
    }

    /// Number of thresholds strictly below `value`. Shared by training and
    /// inference so a row lands in the same bin both times.
    fn bin_of(thresholds: &[f64], value: f64) -> u8 {
        thresholds.partition_point(|&t| t < value) as u8
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[inline]
    pub fn bin(&self, row: usize, feature: usize) -> u8 {
        self.bins[row * self.n_features + feature]
    }

    /// Number of distinct bins for a feature (thresholds.len() + 1).
    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn thresholds(&self, feature: usize) -> &[f64] {
        &self.thresholds[feature]
    }

    /// Re-bucketises an arbitrary row for inference-time bin lookups.
    pub fn bin_of_value(&self, feature: usize, value: f64) -> u8 {
        Self::bin_of(&self.thresholds[feature], value)
    }

    pub fn all_thresholds(&self) -> &[Vec<f64>] {
        &self.thresholds
    }

    /// Rebuilds a bucketiser from persisted thresholds alone, for inference.
    /// `bin()` (which indexes the training-time bin matrix) is unavailable
    /// on the result; only `bin_of_value` is.
    pub fn from_thresholds(thresholds: Vec<Vec<f64>>) -> Self {
        let n_features = thresholds.len();
        Self {
            thresholds,
            bins: Vec::new(),
            n_rows: 0,
            n_features,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn few_uniques_use_midpoints() {
        let m = DenseMatrix::from_rows(4, 1, vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        let b = Bucketiser::build(&m, 255);
        assert_eq!(b.thresholds(0), &[0.5, 1.5, 2.5]);
        assert_eq!(b.bin(0, 0), 0);
        assert_eq!(b.bin(3, 0), 3);
    }

    #[test]
    fn many_uniques_use_quantiles() {
        let values: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let m = DenseMatrix::from_rows(1000, 1, values).unwrap();
        let b = Bucketiser::build(&m, 10);
        assert!(b.n_bins(0) <= 10);
        assert!(b.bin(999, 0) >= b.bin(0, 0));
    }

    #[test]
    fn rebucketise_matches_training_bins() {
        let m = DenseMatrix::from_rows(5, 1, vec![0.0, 2.0, 4.0, 6.0, 8.0]).unwrap();
        let b = Bucketiser::build(&m, 255);
        for i in 0..5 {
            assert_eq!(b.bin(i, 0), b.bin_of_value(0, m.get(i, 0)));
        }
    }
}
