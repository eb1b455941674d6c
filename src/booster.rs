//! The training driver and the handle it returns.
//!
//! `BoosterHandle` is a plain owned value — no global handle table, no
//! thread-local "last error" string. Errors come back as `Result` from the
//! call that produced them; `close()` detaches the ensemble explicitly,
//! after which every other method returns `BoostError::HandleClosed`
//! rather than panicking or dangling.

use crate::bucketize::Bucketiser;
use crate::config::{LossKind, TrainConfig};
use crate::data::{MonitorDataset, TrainingMatrix};
use crate::ensemble::Ensemble;
use crate::errors::{BoostError, BoostResult};
use crate::metrics::{sigmoid, Metric};
use crate::tree::{GrowParams, Tree};
use crate::concurrency::WorkerPool;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Metric values recorded for every monitored dataset after a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: usize,
    pub dataset: String,
    pub metric: String,
    pub value: f64,
}

/// Owns the trained ensemble and its per-stage metric history. A plain
/// value with no global table and no thread-local error string: dropping
/// it frees everything, the ordinary way. `close()`/`into_inner()` exist
/// only for callers that want to detach the `Ensemble` explicitly (e.g.
/// before handing it to [`crate::predict`] directly); after `close()`,
/// every other method returns [`BoostError::HandleClosed`] instead of
/// panicking or dangling.
pub struct BoosterHandle {
    ensemble: Option<Ensemble>,
    pub history: Vec<StageRecord>,
}

impl BoosterHandle {
    /// Used by both training drivers (the main loss family and
    /// [`crate::poisson`]) to wrap a freshly grown ensemble.
    pub(crate) fn from_parts(ensemble: Ensemble, history: Vec<StageRecord>) -> Self {
        Self {
            ensemble: Some(ensemble),
            history,
        }
    }

    /// Borrows the trained ensemble, or `HandleClosed` once `close()` has
    /// been called.
    pub fn ensemble(&self) -> BoostResult<&Ensemble> {
        self.ensemble.as_ref().ok_or(BoostError::HandleClosed)
    }

    pub fn predict(
        &self,
        inter: &crate::data::DenseMatrix,
        extra: &crate::data::DenseMatrix,
        tree_limit: Option<usize>,
    ) -> BoostResult<Vec<f64>> {
        self.ensemble()?.predict(inter, extra, tree_limit)
    }

    /// Detaches the ensemble, leaving the handle closed. Returns `None` if
    /// already closed.
    pub fn close(&mut self) -> Option<Ensemble> {
        self.ensemble.take()
    }

    /// Consumes the handle for its ensemble.
    pub fn into_inner(self) -> BoostResult<Ensemble> {
        self.ensemble.ok_or(BoostError::HandleClosed)
    }
}

fn base_prediction(loss: LossKind, target: &[f64]) -> f64 {
    let mean = target.iter().sum::<f64>() / target.len() as f64;
    match loss {
        LossKind::Mse => mean,
        LossKind::LogLoss => {
            let p = mean.clamp(1e-6, 1.0 - 1e-6);
            (p / (1.0 - p)).ln().clamp(-10.0, 10.0)
        }
        LossKind::Poisson => mean.max(1e-6).ln(),
    }
}

fn residual_of(loss: LossKind, target: f64, raw_score: f64) -> f64 {
    match loss {
        LossKind::Mse => target - raw_score,
        LossKind::LogLoss => target - sigmoid(raw_score),
        LossKind::Poisson => target - raw_score.exp(),
    }
}

fn metric_for(loss: LossKind) -> Metric {
    match loss {
        LossKind::Mse => Metric::Rmse,
        LossKind::LogLoss => Metric::LogLoss,
        LossKind::Poisson => Metric::PoissonDeviance,
    }
}

/// Trains a new ensemble, growing one tree per stage and updating the
/// running raw score for the training set and every monitor dataset.
pub fn train(
    config: &TrainConfig,
    train_data: &TrainingMatrix,
    monitors: &[MonitorDataset],
) -> BoostResult<BoosterHandle> {
    config.validate()?;

    let n = train_data.n_rows();
    let mu0 = base_prediction(config.loss, &train_data.target);
    let bucketiser = Bucketiser::build(&train_data.inter, config.max_bins);
    let pool = WorkerPool::new(config.threads_num);

    let mut raw_scores = vec![mu0; n];
    let mut monitor_scores: Vec<Vec<f64>> = monitors
        .iter()
        .map(|m| vec![mu0; m.data.n_rows()])
        .collect();

    let mut trees = Vec::with_capacity(config.n_stages);
    let mut history = Vec::new();
    let metric = metric_for(config.loss);

    let grow_params = GrowParams {
        max_depth: config.max_depth,
        min_rows_per_leaf: config.min_rows_per_leaf,
        reg_lambda: config.reg_lambda,
        unbalanced_loss: config.unbalanced_loss,
    };

    for stage in 0..config.n_stages {
        let residual: Vec<f64> = (0..n)
            .map(|i| residual_of(config.loss, train_data.target[i], raw_scores[i]))
            .collect();

        let rows: Vec<usize> = (0..n).collect();
        let tree = Tree::grow(
            rows,
            &bucketiser,
            &train_data.extra,
            &residual,
            &grow_params,
            &pool,
        );

        pool.install(|| {
            raw_scores
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, score)| {
                    let beta = tree.leaf_for(train_data.inter.row(i), &bucketiser);
                    *score += config.learning_rate * crate::linalg::dot(beta, train_data.extra.row(i));
                });
        });

        let train_predictions: Vec<f64> = raw_scores
            .iter()
            .map(|&raw| match config.loss {
                LossKind::Mse => raw,
                LossKind::LogLoss => sigmoid(raw),
                LossKind::Poisson => raw.exp(),
            })
            .collect();
        let train_metric = metric.compute(&train_predictions, &train_data.target);
        log::info!(
            "stage {stage}/{}: train {} = {train_metric:.6}",
            config.n_stages,
            metric.name()
        );
        history.push(StageRecord {
            stage,
            dataset: "train".to_string(),
            metric: metric.name().to_string(),
            value: train_metric,
        });

        for (m_idx, monitor) in monitors.iter().enumerate() {
            let scores = &mut monitor_scores[m_idx];
            pool.install(|| {
                scores
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, score)| {
                        let beta = tree.leaf_for(monitor.data.inter.row(i), &bucketiser);
                        *score += config.learning_rate
                            * crate::linalg::dot(beta, monitor.data.extra.row(i));
                    });
            });
            let predictions: Vec<f64> = scores
                .iter()
                .map(|&raw| match config.loss {
                    LossKind::Mse => raw,
                    LossKind::LogLoss => sigmoid(raw),
                    LossKind::Poisson => raw.exp(),
                })
                .collect();
            history.push(StageRecord {
                stage,
                dataset: monitor.name.clone(),
                metric: metric.name().to_string(),
                value: metric.compute(&predictions, &monitor.data.target),
            });
        }

        trees.push(tree);
    }

    let ensemble = Ensemble {
        trees,
        learning_rate: config.learning_rate,
        loss: config.loss,
        base_prediction: mu0,
        inter_dim: train_data.n_inter(),
        extra_dim: train_data.n_extra(),
        bucketiser,
    };

    Ok(BoosterHandle::from_parts(ensemble, history))
}

impl BoosterHandle {
    pub fn require_not_empty(&self) -> BoostResult<()> {
        if self.ensemble()?.num_trees() == 0 {
            return Err(BoostError::BadParameter(
                "ensemble has no trees; n_stages must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
