//! Dataset builders and tree walkers shared by integration tests.
//!
//! For assertion helpers, use `arbor::testing`.

#![allow(dead_code)]

use std::collections::HashMap;

use arbor::tree::NodeId;
use arbor::{LabeledPoint, Node, PartitionedDataset};

#[allow(unused_imports)]
pub use arbor::assert_approx_eq;

/// Partitioned dataset from `(label, features)` rows.
pub fn dataset(rows: Vec<(f64, Vec<f64>)>, num_partitions: usize) -> PartitionedDataset<LabeledPoint> {
    let points = rows.into_iter().map(|(label, features)| LabeledPoint::new(label, features)).collect();
    PartitionedDataset::from_vec(points, num_partitions)
}

/// Every node of the tree rooted at `root`, in depth-first order.
pub fn all_nodes(root: &Node) -> Vec<&Node> {
    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        nodes.push(node);
        if let (Some(left), Some(right)) = (node.left(), node.right()) {
            stack.push(right);
            stack.push(left);
        }
    }
    nodes
}

/// Number of points passing through every node id.
pub fn path_counts(root: &Node, input: &PartitionedDataset<LabeledPoint>) -> HashMap<NodeId, usize> {
    let mut counts = HashMap::new();
    for point in input.iter() {
        let mut node = root;
        loop {
            *counts.entry(node.id()).or_insert(0) += 1;
            let (Some(split), Some(left), Some(right)) = (node.split(), node.left(), node.right())
            else {
                break;
            };
            node = if split.goes_left(point.features[split.feature]) { left } else { right };
        }
    }
    counts
}
