//! A single regression tree whose leaves hold coefficient vectors instead
//! of scalars.
//!
//! Growth is recursive: at each node the split finder proposes a feature
//! and threshold; if none clears `min_rows_per_leaf` on both sides or the
//! node has reached `max_depth`, the node becomes a leaf fit by
//! [`crate::leaf::solve_leaf`]. Partitioning is stable — row order within
//! each child matches its order in the parent — which keeps tie-breaking
//! and testing deterministic.

use crate::bucketize::Bucketiser;
use crate::concurrency::WorkerPool;
use crate::data::DenseMatrix;
use crate::leaf::{self, LeafFit};
use crate::split::{self, SplitCandidate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        beta: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub root: TreeNode,
}

pub struct GrowParams {
    pub max_depth: usize,
    pub min_rows_per_leaf: usize,
    pub reg_lambda: f64,
    pub unbalanced_loss: f64,
}

impl Tree {
    /// Grows a single tree over `rows` against the running `residual`.
    pub fn grow(
        rows: Vec<usize>,
        bucketiser: &Bucketiser,
        extra: &DenseMatrix,
        residual: &[f64],
        params: &GrowParams,
        pool: &WorkerPool,
    ) -> Self {
        let root = grow_node(rows, bucketiser, extra, residual, params, pool, 0);
        Self { root }
    }

    /// Routes a single row down the tree and returns its leaf's β.
    pub fn leaf_for<'a>(&'a self, inter_row: &[f64], bucketiser: &Bucketiser) -> &'a [f64] {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { beta } => return beta,
                TreeNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = inter_row[*feature];
                    let bin = bucketiser.bin_of_value(*feature, value);
                    let boundary = bin_boundary(bucketiser, *feature, *threshold);
                    node = if bin <= boundary { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Internal { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

fn grow_node(
    rows: Vec<usize>,
    bucketiser: &Bucketiser,
    extra: &DenseMatrix,
    residual: &[f64],
    params: &GrowParams,
    pool: &WorkerPool,
    depth: usize,
) -> TreeNode {
    let LeafFit { beta, gain } = leaf::solve_leaf(&rows, extra, residual, params.reg_lambda);
    log::debug!("depth {depth}: {} rows, leaf gain {gain:.6}", rows.len());

    if depth >= params.max_depth || rows.len() < 2 * params.min_rows_per_leaf {
        return TreeNode::Leaf { beta };
    }

    let split = split::find_best_split(
        &rows,
        bucketiser,
        extra,
        residual,
        params.reg_lambda,
        params.unbalanced_loss,
        params.min_rows_per_leaf,
        gain,
        pool,
    );

    match split {
        None => TreeNode::Leaf { beta },
        Some(SplitCandidate {
            feature,
            threshold,
            ..
        }) => {
            let boundary = bin_boundary(bucketiser, feature, threshold);
            let mut left_rows = Vec::with_capacity(rows.len());
            let mut right_rows = Vec::with_capacity(rows.len());
            for row in rows {
                if bucketiser.bin(row, feature) <= boundary {
                    left_rows.push(row);
                } else {
                    right_rows.push(row);
                }
            }

            let left = grow_node(left_rows, bucketiser, extra, residual, params, pool, depth + 1);
            let right = grow_node(right_rows, bucketiser, extra, residual, params, pool, depth + 1);

            TreeNode::Internal {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
    }
}

/// The bin index that `threshold` sits at the boundary of: rows whose bin
/// index is `<=` this value go left.
fn bin_boundary(bucketiser: &Bucketiser, feature: usize, threshold: f64) -> u8 {
    bucketiser
        .thresholds(feature)
        .partition_point(|&t| t < threshold) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> GrowParams {
        GrowParams {
            max_depth: 4,
            min_rows_per_leaf: 1,
            reg_lambda: 0.0,
            unbalanced_loss: 0.0,
        }
    }

    #[test]
    fn single_stump_splits_a_step_function() {
        let n = 10;
        let inter = DenseMatrix::from_rows(n, 1, (0..n).map(|i| i as f64).collect()).unwrap();
        let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
        let residual: Vec<f64> = (0..n).map(|i| if i < 5 { 0.0 } else { 10.0 }).collect();
        let bucketiser = Bucketiser::build(&inter, 255);
        let pool = WorkerPool::new(1);

        let tree = Tree::grow(
            (0..n).collect(),
            &bucketiser,
            &extra,
            &residual,
            &default_params(),
            &pool,
        );

        assert!(matches!(tree.root, TreeNode::Internal { .. }));
        let low = tree.leaf_for(&[1.0], &bucketiser);
        let high = tree.leaf_for(&[8.0], &bucketiser);
        assert!(low[0] < high[0]);
    }

    #[test]
    fn zero_depth_always_gives_a_single_leaf() {
        let n = 6;
        let inter = DenseMatrix::from_rows(n, 1, (0..n).map(|i| i as f64).collect()).unwrap();
        let extra = DenseMatrix::from_rows(n, 1, vec![1.0; n]).unwrap();
        let residual: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let bucketiser = Bucketiser::build(&inter, 255);
        let pool = WorkerPool::new(1);
        let params = GrowParams {
            max_depth: 0,
            ..default_params()
        };

        let tree = Tree::grow((0..n).collect(), &bucketiser, &extra, &residual, &params, &pool);
        assert!(matches!(tree.root, TreeNode::Leaf { .. }));
    }
}
