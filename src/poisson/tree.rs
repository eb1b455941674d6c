//! Recursive tree growth for the Poisson variant, mirroring
//! [`crate::tree`]'s shape but driving [`super::leaf::solve_poisson_leaf`]
//! and [`super::split::find_best_split`] instead of the least-squares
//! pair. Produces an ordinary [`crate::tree::Tree`] so the rest of the
//! pipeline (ensemble scoring, persistence) needs no Poisson-specific
//! branch.

use crate::bucketize::Bucketiser;
use crate::concurrency::WorkerPool;
use crate::data::DenseMatrix;
use crate::split::SplitCandidate;
use crate::tree::{Tree, TreeNode};

use super::leaf::solve_poisson_leaf;
use super::split::find_best_split;

pub(super) struct PoissonGrowParams {
    pub max_depth: usize,
    pub min_rows_per_leaf: usize,
    pub reg_lambda: f64,
    pub unbalanced_penalty: f64,
    pub check_zero: bool,
    pub psi: Vec<f64>,
}

#[allow(clippy::too_many_arguments)]
pub(super) fn grow(
    rows: Vec<usize>,
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    bjid: &[u64],
    freq: &[f64],
    raw_scores: &[f64],
    params: &PoissonGrowParams,
    pool: &WorkerPool,
) -> Tree {
    let root = grow_node(rows, bucketiser, extra, bjid, freq, raw_scores, params, pool, 0);
    Tree { root }
}

#[allow(clippy::too_many_arguments)]
fn grow_node(
    rows: Vec<usize>,
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    bjid: &[u64],
    freq: &[f64],
    raw_scores: &[f64],
    params: &PoissonGrowParams,
    pool: &WorkerPool,
    depth: usize,
) -> TreeNode {
    let fit = solve_poisson_leaf(
        &rows,
        extra,
        bjid,
        freq,
        raw_scores,
        params.reg_lambda,
        params.unbalanced_penalty,
        &params.psi,
    );
    log::debug!("depth {depth}: {} rows, leaf gain {:.6}", rows.len(), fit.gain);

    if depth >= params.max_depth || rows.len() < 2 * params.min_rows_per_leaf {
        return TreeNode::Leaf { beta: fit.beta };
    }

    let split = find_best_split(
        &rows,
        bucketiser,
        extra,
        bjid,
        freq,
        raw_scores,
        params.reg_lambda,
        params.unbalanced_penalty,
        params.check_zero,
        params.min_rows_per_leaf,
        fit.gain,
        pool,
    );

    match split {
        None => TreeNode::Leaf { beta: fit.beta },
        Some(SplitCandidate {
            feature, threshold, ..
        }) => {
            let boundary = bucketiser
                .thresholds(feature)
                .partition_point(|&t| t < threshold) as u8;
            let mut left_rows = Vec::with_capacity(rows.len());
            let mut right_rows = Vec::with_capacity(rows.len());
            for row in rows {
                if bucketiser.bin(row, feature) <= boundary {
                    left_rows.push(row);
                } else {
                    right_rows.push(row);
                }
            }

            let left = grow_node(
                left_rows, bucketiser, extra, bjid, freq, raw_scores, params, pool, depth + 1,
            );
            let right = grow_node(
                right_rows, bucketiser, extra, bjid, freq, raw_scores, params, pool, depth + 1,
            );

            TreeNode::Internal {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
    }
}
