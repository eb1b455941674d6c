//! Poisson-loss variant over grouped (id, frequency) targets.
//!
//! Shares the tree/ensemble/persistence types with the main variant; only
//! the leaf solver and split-scoring weights differ, since the Poisson
//! Newton step replaces the least-squares normal equations with a
//! Hessian-diagonal-weighted Gram system. When no extra-features are
//! supplied beyond the implicit intercept, leaves reduce to a scalar rate
//! correction (β of length one).

mod data;
mod leaf;
mod split;
mod tree;

pub use data::PoissonTarget;

use crate::booster::{BoosterHandle, StageRecord};
use crate::bucketize::Bucketiser;
use crate::config::{LossKind, PoissonConfig};
use crate::data::DenseMatrix;
use crate::ensemble::Ensemble;
use crate::errors::{BoostError, BoostResult};
use crate::metrics::Metric;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tree::PoissonGrowParams;

/// Trains a Poisson-loss ensemble. `target.bjid`/`target.freq` replace the
/// main variant's single `target` vector; `inter`/`extra` have the same
/// shape contract as [`crate::data::TrainingMatrix`].
pub fn train(
    config: &PoissonConfig,
    inter: &DenseMatrix,
    extra: &DenseMatrix,
    target: &PoissonTarget,
    monitors: &[(String, DenseMatrix, DenseMatrix, PoissonTarget)],
) -> BoostResult<BoosterHandle> {
    config.validate()?;
    target.validate(inter.rows())?;

    let n = inter.rows();
    let mu0 = base_prediction(&target.freq);
    let bucketiser = Bucketiser::build(inter, config.max_bins);
    let pool = crate::concurrency::WorkerPool::new(config.threads_num);

    let mut raw_scores = vec![mu0; n];
    let mut monitor_scores: Vec<Vec<f64>> = monitors.iter().map(|(_, i, _, _)| vec![mu0; i.rows()]).collect();

    let psi = match &config.psi {
        Some(psi) if psi.len() == extra.cols() => psi.clone(),
        Some(psi) => {
            return Err(BoostError::ShapeMismatch(format!(
                "psi has length {} but extra has {} columns",
                psi.len(),
                extra.cols()
            )))
        }
        None => vec![0.0; extra.cols()],
    };
    let mut trees = Vec::with_capacity(config.n_stages);
    let mut history = Vec::new();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

    let grow_params = PoissonGrowParams {
        max_depth: config.max_depth,
        min_rows_per_leaf: config.min_rows_per_leaf,
        reg_lambda: config.reg_lambda,
        unbalanced_penalty: config.unbalanced_penalty,
        check_zero: config.check_zero,
        psi: psi.clone(),
    };

    for stage in 0..config.n_stages {
        let rows = sample_rows(n, config.row_subsample, &mut rng);
        let tree = tree::grow(
            rows,
            &bucketiser,
            extra,
            &target.bjid,
            &target.freq,
            &raw_scores,
            &grow_params,
            &pool,
        );

        pool.install(|| {
            raw_scores
                .par_iter_mut()
                .enumerate()
                .for_each(|(i, score)| {
                    let beta = tree.leaf_for(inter.row(i), &bucketiser);
                    *score += config.learning_rate * crate::linalg::dot(beta, extra.row(i));
                });
        });

        let train_predictions: Vec<f64> = raw_scores.iter().map(|r| r.exp()).collect();
        let train_deviance = Metric::PoissonDeviance.compute(&train_predictions, &target.freq);
        log::info!(
            "stage {stage}/{}: train poisson_deviance = {train_deviance:.6}",
            config.n_stages
        );
        history.push(StageRecord {
            stage,
            dataset: "train".to_string(),
            metric: Metric::PoissonDeviance.name().to_string(),
            value: train_deviance,
        });

        for (m_idx, (name, m_inter, m_extra, m_target)) in monitors.iter().enumerate() {
            let scores = &mut monitor_scores[m_idx];
            pool.install(|| {
                scores
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(i, score)| {
                        let beta = tree.leaf_for(m_inter.row(i), &bucketiser);
                        *score += config.learning_rate * crate::linalg::dot(beta, m_extra.row(i));
                    });
            });
            let predictions: Vec<f64> = scores.iter().map(|r| r.exp()).collect();
            history.push(StageRecord {
                stage,
                dataset: name.clone(),
                metric: Metric::PoissonDeviance.name().to_string(),
                value: Metric::PoissonDeviance.compute(&predictions, &m_target.freq),
            });
        }

        trees.push(tree);
    }

    let ensemble = Ensemble {
        trees,
        learning_rate: config.learning_rate,
        loss: LossKind::Poisson,
        base_prediction: mu0,
        inter_dim: inter.cols(),
        extra_dim: extra.cols(),
        bucketiser,
    };

    Ok(BoosterHandle::from_parts(ensemble, history))
}

fn base_prediction(freq: &[f64]) -> f64 {
    let mean = freq.iter().sum::<f64>() / freq.len() as f64;
    mean.max(1e-6).ln()
}

/// Bernoulli row sub-sampling at rate `fraction`, falling back to the full
/// row set if every row is excluded by chance. `fraction >= 1.0` always
/// returns every row without touching `rng`.
fn sample_rows(n: usize, fraction: f64, rng: &mut ChaCha8Rng) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let rows: Vec<usize> = (0..n).filter(|_| rng.gen::<f64>() < fraction).collect();
    if rows.is_empty() {
        (0..n).collect()
    } else {
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DenseMatrix;

    #[test]
    fn same_seed_samples_the_same_rows() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(sample_rows(100, 0.5, &mut a), sample_rows(100, 0.5, &mut b));
    }

    #[test]
    fn full_fraction_skips_sampling_entirely() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(sample_rows(10, 1.0, &mut rng), (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn scalar_rate_leaf_fits_a_step_function() {
        let n = 20;
        let inter = DenseMatrix::from_rows(n, 1, (0..n).map(|i| i as f64).collect()).unwrap();
        let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
        let bjid: Vec<u64> = (0..n as u64).collect();
        let freq: Vec<f64> = (0..n).map(|i| if i < n / 2 { 1.0 } else { 20.0 }).collect();
        let target = PoissonTarget { bjid, freq };

        let config = PoissonConfig::builder()
            .n_stages(3)
            .max_depth(2)
            .learning_rate(0.5)
            .build()
            .unwrap();

        let handle = train(&config, &inter, &extra, &target, &[]).unwrap();
        let ensemble = handle.ensemble().unwrap();
        let low = ensemble.predict_row(&[1.0], &[1.0], None);
        let high = ensemble.predict_row(&[18.0], &[1.0], None);
        assert!(high > low);
    }

    #[test]
    fn psi_of_the_wrong_length_is_a_shape_mismatch() {
        let n = 10;
        let inter = DenseMatrix::from_rows(n, 1, (0..n).map(|i| i as f64).collect()).unwrap();
        let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
        let bjid: Vec<u64> = (0..n as u64).collect();
        let freq: Vec<f64> = vec![2.0; n];
        let target = PoissonTarget { bjid, freq };

        let config = PoissonConfig::builder()
            .n_stages(1)
            .psi(Some(vec![0.0, 0.0]))
            .build()
            .unwrap();

        let err = train(&config, &inter, &extra, &target, &[]);
        assert!(matches!(err, Err(BoostError::ShapeMismatch(_))));
    }

    #[test]
    fn nonzero_psi_shifts_the_fitted_leaf_coefficient() {
        let n = 10;
        let inter = DenseMatrix::from_rows(n, 1, vec![0.0; n]).unwrap();
        let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
        let bjid: Vec<u64> = (0..n as u64).collect();
        let freq: Vec<f64> = vec![2.0; n];
        let target = PoissonTarget { bjid, freq };

        let zero_psi = PoissonConfig::builder()
            .n_stages(1)
            .learning_rate(1.0)
            .build()
            .unwrap();
        let shifted_psi = PoissonConfig::builder()
            .n_stages(1)
            .learning_rate(1.0)
            .psi(Some(vec![5.0]))
            .build()
            .unwrap();

        let zero_handle = train(&zero_psi, &inter, &extra, &target, &[]).unwrap();
        let shifted_handle = train(&shifted_psi, &inter, &extra, &target, &[]).unwrap();
        let zero_pred = zero_handle.ensemble().unwrap().predict_row(&[0.0], &[1.0], None);
        let shifted_pred = shifted_handle.ensemble().unwrap().predict_row(&[0.0], &[1.0], None);
        assert_ne!(zero_pred, shifted_pred);
    }
}
