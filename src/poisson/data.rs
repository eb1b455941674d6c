use crate::errors::{BoostError, BoostResult};

/// Grouped (id, frequency) targets for the Poisson variant: `bjid[i]`
/// names the exposure group row `i` belongs to, `freq[i]` is its observed
/// count.
#[derive(Debug, Clone)]
pub struct PoissonTarget {
    pub bjid: Vec<u64>,
    pub freq: Vec<f64>,
}

impl PoissonTarget {
    pub fn validate(&self, n_rows: usize) -> BoostResult<()> {
        if self.bjid.len() != n_rows || self.freq.len() != n_rows {
            return Err(BoostError::ShapeMismatch(format!(
                "expected {n_rows} rows, got bjid={} freq={}",
                self.bjid.len(),
                self.freq.len()
            )));
        }
        if self.freq.iter().any(|&f| f < 0.0) {
            return Err(BoostError::BadParameter(
                "freq entries must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
