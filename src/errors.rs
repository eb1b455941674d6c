//! Error types surfaced by the public API.
//!
//! Local recoveries (a singular Gram matrix, a node with no viable split)
//! never reach this type — they alter control flow inside the grower and
//! resolve to an ordinary leaf. Only the conditions in the table below are
//! ever constructed.

use std::path::PathBuf;

/// Discriminable error kinds for every core operation.
#[derive(thiserror::Error, Debug)]
pub enum BoostError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("operation attempted on a freed handle")]
    HandleClosed,

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("format mismatch in {path}: {reason}")]
    FormatMismatch { path: PathBuf, reason: String },
}

pub type BoostResult<T> = Result<T, BoostError>;
