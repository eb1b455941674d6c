//! Regression and classification metrics recorded against monitor datasets
//! after each boosting stage: a small closed set of named metrics, each a
//! pure function of `(predictions, targets)`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Rmse,
    Mae,
    R2,
    LogLoss,
    PoissonDeviance,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Rmse => "rmse",
            Metric::Mae => "mae",
            Metric::R2 => "r2",
            Metric::LogLoss => "logloss",
            Metric::PoissonDeviance => "poisson_deviance",
        }
    }

    pub fn compute(&self, predictions: &[f64], targets: &[f64]) -> f64 {
        match self {
            Metric::Rmse => rmse(predictions, targets),
            Metric::Mae => mae(predictions, targets),
            Metric::R2 => r2(predictions, targets),
            Metric::LogLoss => log_loss(predictions, targets),
            Metric::PoissonDeviance => poisson_deviance(predictions, targets),
        }
    }
}

fn rmse(predictions: &[f64], targets: &[f64]) -> f64 {
    mean_squared_error(predictions, targets).sqrt()
}

fn mean_squared_error(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len() as f64;
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| (p - t).powi(2))
        .sum();
    sum / n
}

fn mae(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len() as f64;
    let sum: f64 = predictions.iter().zip(targets).map(|(p, t)| (p - t).abs()).sum();
    sum / n
}

fn r2(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = targets.len() as f64;
    let mean = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }
    let ss_res: f64 = predictions.iter().zip(targets).map(|(p, t)| (p - t).powi(2)).sum();
    1.0 - ss_res / ss_tot
}

/// Binary cross-entropy. `predictions` are probabilities in (0, 1);
/// callers pass `sigmoid(raw logit)`, never the raw logit itself.
fn log_loss(predictions: &[f64], targets: &[f64]) -> f64 {
    const EPS: f64 = 1e-12;
    let n = predictions.len() as f64;
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(p, t)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    sum / n
}

/// `predictions` are predicted rates λ > 0.
fn poisson_deviance(predictions: &[f64], targets: &[f64]) -> f64 {
    let n = predictions.len() as f64;
    let sum: f64 = predictions
        .iter()
        .zip(targets)
        .map(|(lambda, y)| {
            let lambda = lambda.max(1e-12);
            let term = if *y > 0.0 {
                y * (y / lambda).ln() - (y - lambda)
            } else {
                lambda
            };
            2.0 * term
        })
        .sum();
    sum / n
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
