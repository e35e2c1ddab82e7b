//! One data pass: route every bagged point to its frontier node and fold it
//! into the batch histogram.
//!
//! Every partition folds into its own [`StatsAggregator`]; partition results
//! are merged with a pairwise tree reduction of [`StatsAggregator::combine`].

use std::sync::Arc;

use super::catalog::SplitBinCatalog;
use super::metadata::Metadata;
use super::scheduler::NodeBatch;
use super::stats::{AggregatorLayout, StatsAggregator};
use crate::data::{BaggedPoint, PartitionedDataset, TreePoint};
use crate::tree::Node;
use crate::utils::Parallelism;

/// Build the histogram of `batch` from one pass over `input`.
///
/// `roots[t]` is the current root of tree `t`; points that do not reach a
/// node of the batch are skipped.
pub fn aggregate_batch(
    input: &PartitionedDataset<BaggedPoint<TreePoint>>,
    roots: &[Node],
    batch: &NodeBatch,
    metadata: &Metadata,
    catalog: &SplitBinCatalog,
    parallelism: Parallelism,
) -> StatsAggregator {
    let layout = Arc::new(AggregatorLayout::new(metadata, &batch.node_subsets()));
    input.fold(
        parallelism,
        || StatsAggregator::from_layout(Arc::clone(&layout)),
        |mut agg, point| {
            bin_seq_op(&mut agg, point, roots, batch, metadata, catalog);
            agg
        },
        StatsAggregator::combine,
    )
}

/// Fold one bagged point into `agg` for every tree of the batch.
pub fn bin_seq_op(
    agg: &mut StatsAggregator,
    point: &BaggedPoint<TreePoint>,
    roots: &[Node],
    batch: &NodeBatch,
    metadata: &Metadata,
    catalog: &SplitBinCatalog,
) {
    let unordered = metadata.has_unordered_features();
    for (&tree, nodes) in batch.trees() {
        let weight = point.subsample_weights[tree];
        if weight == 0.0 {
            continue;
        }
        let id = roots[tree].route(&point.datum, catalog.bins());
        let Some(info) = nodes.get(&id) else {
            continue;
        };
        let node = info.node_index_in_group;
        if unordered {
            mixed_update(agg, &point.datum, node, weight, metadata, catalog);
        } else {
            ordered_update(agg, &point.datum, node, weight);
        }
    }
}

/// One bin per assigned feature.
#[inline]
fn ordered_update(agg: &mut StatsAggregator, point: &TreePoint, node: usize, weight: f64) {
    for slot in 0..agg.num_slots(node) {
        let bin = point.binned_features[agg.feature(node, slot)] as usize;
        agg.node_update(node, slot, bin, point.label, weight);
    }
}

/// Ordered features bump one bin; unordered features update the left or
/// right accumulator of every subset split.
fn mixed_update(
    agg: &mut StatsAggregator,
    point: &TreePoint,
    node: usize,
    weight: f64,
    metadata: &Metadata,
    catalog: &SplitBinCatalog,
) {
    for slot in 0..agg.num_slots(node) {
        let feature = agg.feature(node, slot);
        let bin = point.binned_features[feature] as usize;
        if metadata.is_unordered(feature) {
            let (left, right) = agg.left_right_node_feature_offsets(node, slot);
            for (split_index, split) in catalog.splits()[feature].iter().enumerate() {
                let goes_left =
                    split.left_categories().is_some_and(|cats| cats.contains(bin as u32));
                let offset = if goes_left { left } else { right };
                agg.feature_update(offset, split_index, point.label, weight);
            }
        } else {
            agg.node_update(node, slot, bin, point.label, weight);
        }
    }
}
