//! Binary persistence for a trained ensemble, plus a JSON dump of the
//! per-stage metric history for external plotting.
//!
//! Format: a fixed magic + version prefix, then a `bincode`-encoded
//! [`PersistedModel`]. The version is bumped whenever the encoded shape
//! changes so `load` can reject a file from an incompatible build instead
//! of misreading it.

use crate::booster::{BoosterHandle, StageRecord};
use crate::bucketize::Bucketiser;
use crate::config::LossKind;
use crate::ensemble::Ensemble;
use crate::errors::{BoostError, BoostResult};
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 8] = b"XBOOSTM1";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedModel {
    loss: LossKind,
    learning_rate: f64,
    base_prediction: f64,
    inter_dim: usize,
    extra_dim: usize,
    thresholds: Vec<Vec<f64>>,
    trees: Vec<Tree>,
}

pub fn save(handle: &BoosterHandle, path: impl AsRef<Path>) -> BoostResult<()> {
    let path = path.as_ref();
    let ensemble = handle.ensemble()?;
    let model = PersistedModel {
        loss: ensemble.loss,
        learning_rate: ensemble.learning_rate,
        base_prediction: ensemble.base_prediction,
        inter_dim: ensemble.inter_dim,
        extra_dim: ensemble.extra_dim,
        thresholds: ensemble.bucketiser.all_thresholds().to_vec(),
        trees: ensemble.trees.clone(),
    };

    let mut file = BufWriter::new(File::create(path).map_err(|source| BoostError::Io {
        path: path.to_path_buf(),
        source,
    })?);
    file.write_all(MAGIC).map_err(|source| BoostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    file.write_all(&FORMAT_VERSION.to_le_bytes())
        .map_err(|source| BoostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    bincode::serialize_into(&mut file, &model).map_err(|source| BoostError::FormatMismatch {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    Ok(())
}

pub fn load(path: impl AsRef<Path>) -> BoostResult<Ensemble> {
    let path = path.as_ref();
    let mut file = BufReader::new(File::open(path).map_err(|source| BoostError::Io {
        path: path.to_path_buf(),
        source,
    })?);

    let mut magic = [0u8; 8];
    file.read_exact(&mut magic).map_err(|source| BoostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if &magic != MAGIC {
        return Err(BoostError::FormatMismatch {
            path: path.to_path_buf(),
            reason: "missing or corrupt magic header".to_string(),
        });
    }

    let mut version_bytes = [0u8; 4];
    file.read_exact(&mut version_bytes)
        .map_err(|source| BoostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let version = u32::from_le_bytes(version_bytes);
    if version != FORMAT_VERSION {
        return Err(BoostError::FormatMismatch {
            path: path.to_path_buf(),
            reason: format!("unsupported format version {version}, expected {FORMAT_VERSION}"),
        });
    }

    let model: PersistedModel =
        bincode::deserialize_from(&mut file).map_err(|source| BoostError::FormatMismatch {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;

    Ok(Ensemble {
        trees: model.trees,
        learning_rate: model.learning_rate,
        loss: model.loss,
        base_prediction: model.base_prediction,
        inter_dim: model.inter_dim,
        extra_dim: model.extra_dim,
        bucketiser: Bucketiser::from_thresholds(model.thresholds),
    })
}

pub fn dump_learning_curves(history: &[StageRecord], path: impl AsRef<Path>) -> BoostResult<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| BoostError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(file, history).map_err(|source| BoostError::FormatMismatch {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })?;
    Ok(())
}
