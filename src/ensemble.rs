//! An ordered sequence of trees sharing a learning rate and base
//! prediction, the unit that persistence and inference operate on.

use crate::bucketize::Bucketiser;
use crate::config::LossKind;
use crate::data::DenseMatrix;
use crate::errors::{BoostError, BoostResult};
use crate::linalg;
use crate::tree::Tree;

pub struct Ensemble {
    pub trees: Vec<Tree>,
    pub learning_rate: f64,
    pub loss: LossKind,
    pub base_prediction: f64,
    pub inter_dim: usize,
    pub extra_dim: usize,
    pub bucketiser: Bucketiser,
}

impl Ensemble {
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Raw (pre-link) score for a single row, optionally truncated to the
    /// first `tree_limit` trees.
    pub fn raw_score(&self, inter_row: &[f64], extra_row: &[f64], tree_limit: Option<usize>) -> f64 {
        let limit = tree_limit.unwrap_or(self.trees.len()).min(self.trees.len());
        let mut score = self.base_prediction;
        for tree in &self.trees[..limit] {
            let beta = tree.leaf_for(inter_row, &self.bucketiser);
            score += self.learning_rate * linalg::dot(beta, extra_row);
        }
        score
    }

    /// Applies the loss function's link to the raw score: identity for
    /// MSE, sigmoid for LogLoss.
    pub fn predict_row(&self, inter_row: &[f64], extra_row: &[f64], tree_limit: Option<usize>) -> f64 {
        let raw = self.raw_score(inter_row, extra_row, tree_limit);
        match self.loss {
            LossKind::Mse => raw,
            LossKind::LogLoss => crate::metrics::sigmoid(raw),
            LossKind::Poisson => raw.exp(),
        }
    }

    /// Checks shapes against both the inputs and the trained dimensions
    /// before doing any prediction work, per the fail-fast policy on
    /// `ShapeMismatch`.
    pub fn predict(
        &self,
        inter: &DenseMatrix,
        extra: &DenseMatrix,
        tree_limit: Option<usize>,
    ) -> BoostResult<Vec<f64>> {
        if inter.rows() != extra.rows() {
            return Err(BoostError::ShapeMismatch(format!(
                "inter has {} rows, extra has {}",
                inter.rows(),
                extra.rows()
            )));
        }
        if inter.cols() != self.inter_dim {
            return Err(BoostError::ShapeMismatch(format!(
                "inter has {} columns, model was trained on {}",
                inter.cols(),
                self.inter_dim
            )));
        }
        if extra.cols() != self.extra_dim {
            return Err(BoostError::ShapeMismatch(format!(
                "extra has {} columns, model was trained on {}",
                extra.cols(),
                self.extra_dim
            )));
        }
        Ok((0..inter.rows())
            .map(|i| self.predict_row(inter.row(i), extra.row(i), tree_limit))
            .collect())
    }
}
