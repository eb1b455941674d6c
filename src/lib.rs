//! A gradient-boosted decision-tree engine whose leaves hold a coefficient
//! vector instead of a scalar, fitted against a small "extra" feature
//! basis while the tree structure itself is grown over "inter" features
//! via histogram-based split search.
//!
//! The core surface is five free functions: [`train`], [`predict`],
//! [`save`], [`load`], [`dump_learning_curves`]. [`poisson`] is a
//! secondary variant for grouped (id, frequency) targets.

pub mod booster;
pub mod bucketize;
pub mod concurrency;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod errors;
pub mod leaf;
pub mod linalg;
pub mod metrics;
pub mod persistence;
pub mod poisson;
pub mod split;
pub mod tree;

pub use booster::{train, BoosterHandle, StageRecord};
pub use config::{LossKind, PoissonConfig, PoissonConfigBuilder, TrainConfig, TrainConfigBuilder};
pub use data::{DenseMatrix, MonitorDataset, TrainingMatrix};
pub use ensemble::Ensemble;
pub use errors::{BoostError, BoostResult};
pub use persistence::{dump_learning_curves, load, save};

/// Predicts against an already-trained ensemble, optionally truncated to
/// the first `tree_limit` trees. Fails fast with `ShapeMismatch` if
/// `inter`/`extra` don't agree on row count or don't match the
/// dimensions the ensemble was trained on.
pub fn predict(
    ensemble: &Ensemble,
    inter: &DenseMatrix,
    extra: &DenseMatrix,
    tree_limit: Option<usize>,
) -> BoostResult<Vec<f64>> {
    ensemble.predict(inter, extra, tree_limit)
}
