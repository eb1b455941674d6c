//! Training configuration.
//!
//! A `derive_builder` struct with per-field defaults and plain accessors.
//! Cross-field validation lives outside the builder, in
//! [`TrainConfig::validate`], since the builder macro has no hook for it.

use crate::errors::{BoostError, BoostResult};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Loss function governing the residual computation in the booster driver,
/// and the link applied to the raw score at prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossKind {
    /// r = y - ŷ, identity link
    Mse,
    /// r = y - σ(ŷ), raw logit predicted, sigmoid link
    LogLoss,
    /// Poisson negative log-likelihood, exp link; only ever produced by
    /// [`crate::poisson`]'s training driver.
    Poisson,
}

impl LossKind {
    pub fn parse(input: &str) -> BoostResult<Self> {
        match input.to_lowercase().as_str() {
            "mse" => Ok(Self::Mse),
            "logloss" | "log_loss" => Ok(Self::LogLoss),
            "poisson" => Ok(Self::Poisson),
            other => Err(BoostError::BadParameter(format!(
                "unknown loss '{other}', expected one of: mse, logloss, poisson"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(pattern = "mutable", build_fn(skip))]
pub struct TrainConfig {
    pub n_stages: usize,

    #[builder(default = "1e-4")]
    pub reg_lambda: f64,

    #[builder(default = "6")]
    pub max_depth: usize,

    #[builder(default = "0.3")]
    pub learning_rate: f64,

    #[builder(default = "LossKind::Mse")]
    pub loss: LossKind,

    #[builder(default = "1")]
    pub threads_num: usize,

    #[builder(default = "0.0")]
    pub unbalanced_loss: f64,

    #[builder(default = "1")]
    pub min_rows_per_leaf: usize,

    #[builder(default = "255")]
    pub max_bins: usize,

    #[builder(default = "0")]
    pub seed: u64,
}

impl TrainConfig {
    pub fn builder() -> TrainConfigBuilder {
        TrainConfigBuilder::default()
    }

    /// Checks every `BadParameter` condition in the error table up front,
    /// before any histogram or tree work begins.
    pub fn validate(&self) -> BoostResult<()> {
        if self.n_stages == 0 {
            return Err(BoostError::BadParameter(
                "n_stages must be >= 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(BoostError::BadParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if !(1..=32).contains(&self.max_depth) {
            return Err(BoostError::BadParameter(
                "max_depth must be in [1, 32]".to_string(),
            ));
        }
        if self.reg_lambda < 0.0 {
            return Err(BoostError::BadParameter(
                "reg_lambda must be >= 0".to_string(),
            ));
        }
        if self.unbalanced_loss < 0.0 {
            return Err(BoostError::BadParameter(
                "unbalanced_loss must be >= 0".to_string(),
            ));
        }
        if self.min_rows_per_leaf == 0 {
            return Err(BoostError::BadParameter(
                "min_rows_per_leaf must be >= 1".to_string(),
            ));
        }
        if self.max_bins == 0 || self.max_bins > 255 {
            return Err(BoostError::BadParameter(
                "max_bins must be in [1, 255]".to_string(),
            ));
        }
        if self.loss == LossKind::Poisson {
            return Err(BoostError::BadParameter(
                "loss = Poisson requires grouped (id, frequency) targets; use crate::poisson::train instead".to_string(),
            ));
        }
        Ok(())
    }
}

impl TrainConfigBuilder {
    pub fn build(&self) -> BoostResult<TrainConfig> {
        let config = TrainConfig {
            n_stages: self.n_stages.ok_or_else(|| {
                BoostError::BadParameter("n_stages is required".to_string())
            })?,
            reg_lambda: self.reg_lambda.unwrap_or(1e-4),
            max_depth: self.max_depth.unwrap_or(6),
            learning_rate: self.learning_rate.unwrap_or(0.3),
            loss: self.loss.unwrap_or(LossKind::Mse),
            threads_num: self.threads_num.unwrap_or(1),
            unbalanced_loss: self.unbalanced_loss.unwrap_or(0.0),
            min_rows_per_leaf: self.min_rows_per_leaf.unwrap_or(1),
            max_bins: self.max_bins.unwrap_or(255),
            seed: self.seed.unwrap_or(0),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the Poisson-loss variant.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(pattern = "mutable", build_fn(skip))]
pub struct PoissonConfig {
    pub n_stages: usize,

    #[builder(default = "1e-4")]
    pub reg_lambda: f64,

    #[builder(default = "6")]
    pub max_depth: usize,

    #[builder(default = "0.3")]
    pub learning_rate: f64,

    #[builder(default = "1")]
    pub threads_num: usize,

    #[builder(default = "0.0")]
    pub unbalanced_penalty: f64,

    #[builder(default = "true")]
    pub check_zero: bool,

    #[builder(default = "1")]
    pub min_rows_per_leaf: usize,

    #[builder(default = "255")]
    pub max_bins: usize,

    /// Fraction of rows sampled without replacement for each stage's tree,
    /// drawn deterministically from `seed`. `1.0` disables sub-sampling.
    #[builder(default = "1.0")]
    pub row_subsample: f64,

    #[builder(default = "0")]
    pub seed: u64,

    /// Reference coefficient vector the Newton leaf step regularizes
    /// toward: each leaf solves `(H + λI)(β − ψ) = g` instead of
    /// `(H + λI)β = g`. `None` behaves as the zero vector. When set, its
    /// length must equal the extra-feature count passed to `train`.
    #[builder(default = "None")]
    pub psi: Option<Vec<f64>>,
}

impl PoissonConfig {
    pub fn builder() -> PoissonConfigBuilder {
        PoissonConfigBuilder::default()
    }

    pub fn validate(&self) -> BoostResult<()> {
        if self.n_stages == 0 {
            return Err(BoostError::BadParameter(
                "n_stages must be >= 1".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(BoostError::BadParameter(
                "learning_rate must be in (0, 1]".to_string(),
            ));
        }
        if !(1..=32).contains(&self.max_depth) {
            return Err(BoostError::BadParameter(
                "max_depth must be in [1, 32]".to_string(),
            ));
        }
        if self.unbalanced_penalty < 0.0 {
            return Err(BoostError::BadParameter(
                "unbalanced_penalty must be >= 0".to_string(),
            ));
        }
        if !(self.row_subsample > 0.0 && self.row_subsample <= 1.0) {
            return Err(BoostError::BadParameter(
                "row_subsample must be in (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

impl PoissonConfigBuilder {
    pub fn build(&self) -> BoostResult<PoissonConfig> {
        let config = PoissonConfig {
            n_stages: self.n_stages.ok_or_else(|| {
                BoostError::BadParameter("n_stages is required".to_string())
            })?,
            reg_lambda: self.reg_lambda.unwrap_or(1e-4),
            max_depth: self.max_depth.unwrap_or(6),
            learning_rate: self.learning_rate.unwrap_or(0.3),
            threads_num: self.threads_num.unwrap_or(1),
            unbalanced_penalty: self.unbalanced_penalty.unwrap_or(0.0),
            check_zero: self.check_zero.unwrap_or(true),
            min_rows_per_leaf: self.min_rows_per_leaf.unwrap_or(1),
            max_bins: self.max_bins.unwrap_or(255),
            row_subsample: self.row_subsample.unwrap_or(1.0),
            seed: self.seed.unwrap_or(0),
            psi: self.psi.clone().unwrap_or(None),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_reasonable() {
        let cfg = TrainConfig::builder().n_stages(10).build().unwrap();
        assert_eq!(cfg.max_depth, 6);
        assert_eq!(cfg.loss, LossKind::Mse);
    }

    #[test]
    fn rejects_bad_learning_rate() {
        let err = TrainConfig::builder()
            .n_stages(10)
            .learning_rate(0.0)
            .build();
        assert!(matches!(err, Err(BoostError::BadParameter(_))));
    }

    #[test]
    fn rejects_zero_stages() {
        let err = TrainConfig::builder().n_stages(0).build();
        assert!(matches!(err, Err(BoostError::BadParameter(_))));
    }

    #[test]
    fn loss_kind_parse() {
        assert_eq!(LossKind::parse("MSE").unwrap(), LossKind::Mse);
        assert_eq!(LossKind::parse("logloss").unwrap(), LossKind::LogLoss);
        assert!(LossKind::parse("bogus").is_err());
    }
}
