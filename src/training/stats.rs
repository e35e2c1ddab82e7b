//! Sufficient-statistics histograms for one batch of nodes.
//!
//! A [`StatsAggregator`] holds one flat `f64` buffer indexed by
//! `(node, feature slot, bin, stat)`. Nodes occupy contiguous regions, so the
//! buffer splits into independent per-node [`NodeStatsView`]s for selection.
//!
//! # Layouts
//!
//! - **Fixed**: every node uses every feature. The offset of `(node, slot)` is
//!   `node * node_stride + feature_offsets[slot]`.
//! - **Subsampled**: each node has its own sorted feature subset and its own
//!   offset table.
//!
//! # Unordered features
//!
//! An unordered feature with `s` subset splits owns `2 * s` bins: the left
//! accumulator of split `i` is bin `i` and its right accumulator is bin `s + i`.

use std::sync::Arc;

use super::metadata::Metadata;
use crate::impurity::{Impurity, ImpurityCalculator};

// =============================================================================
// Layout
// =============================================================================

#[derive(Debug)]
enum LayoutKind {
    Fixed {
        /// Offset of every feature inside a node region.
        feature_offsets: Vec<usize>,
        node_stride: usize,
    },
    Subsampled {
        /// Start of each node region, plus the total length at the end.
        node_starts: Vec<usize>,
        /// Per node: assigned features, ascending.
        features: Vec<Vec<usize>>,
        /// Per node: offset of each slot relative to the node start.
        slot_offsets: Vec<Vec<usize>>,
    },
}

/// Shared, immutable indexing scheme of an aggregator.
#[derive(Debug)]
pub struct AggregatorLayout {
    impurity: Impurity,
    stats_size: usize,
    num_nodes: usize,
    /// Histogram slots per feature (global feature index).
    num_bins: Vec<usize>,
    /// Whether each feature (global index) is unordered.
    unordered: Vec<bool>,
    kind: LayoutKind,
}

impl AggregatorLayout {
    /// Layout for `node_subsets.len()` nodes; `None` means all features.
    ///
    /// The fixed layout is used when no node carries a subset.
    pub fn new(metadata: &Metadata, node_subsets: &[Option<Vec<usize>>]) -> Self {
        let stats_size = metadata.stats_size();
        let unordered = (0..metadata.num_features).map(|f| metadata.is_unordered(f)).collect();
        let kind = if node_subsets.iter().all(Option::is_none) {
            let (feature_offsets, node_stride) =
                region_offsets(&metadata.num_bins, stats_size, 0..metadata.num_features);
            LayoutKind::Fixed { feature_offsets, node_stride }
        } else {
            let mut node_starts = Vec::with_capacity(node_subsets.len() + 1);
            let mut features = Vec::with_capacity(node_subsets.len());
            let mut slot_offsets = Vec::with_capacity(node_subsets.len());
            let mut start = 0;
            for subset in node_subsets {
                let node_features: Vec<usize> = match subset {
                    Some(s) => s.clone(),
                    None => (0..metadata.num_features).collect(),
                };
                let (offsets, size) =
                    region_offsets(&metadata.num_bins, stats_size, node_features.iter().copied());
                node_starts.push(start);
                start += size;
                features.push(node_features);
                slot_offsets.push(offsets);
            }
            node_starts.push(start);
            LayoutKind::Subsampled { node_starts, features, slot_offsets }
        };

        Self {
            impurity: metadata.impurity,
            stats_size,
            num_nodes: node_subsets.len(),
            num_bins: metadata.num_bins.clone(),
            unordered,
            kind,
        }
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    #[inline]
    pub fn stats_size(&self) -> usize {
        self.stats_size
    }

    #[inline]
    pub fn impurity(&self) -> Impurity {
        self.impurity
    }

    #[inline]
    pub fn is_subsampled(&self) -> bool {
        matches!(self.kind, LayoutKind::Subsampled { .. })
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        match &self.kind {
            LayoutKind::Fixed { node_stride, .. } => node_stride * self.num_nodes,
            LayoutKind::Subsampled { node_starts, .. } => node_starts.last().copied().unwrap_or(0),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `[start, end)` of a node region.
    #[inline]
    pub fn node_range(&self, node: usize) -> (usize, usize) {
        match &self.kind {
            LayoutKind::Fixed { node_stride, .. } => (node * node_stride, (node + 1) * node_stride),
            LayoutKind::Subsampled { node_starts, .. } => (node_starts[node], node_starts[node + 1]),
        }
    }

    /// Number of features assigned to a node.
    #[inline]
    pub fn num_slots(&self, node: usize) -> usize {
        match &self.kind {
            LayoutKind::Fixed { feature_offsets, .. } => feature_offsets.len(),
            LayoutKind::Subsampled { features, .. } => features[node].len(),
        }
    }

    /// Global feature index of a node slot.
    #[inline]
    pub fn feature(&self, node: usize, slot: usize) -> usize {
        match &self.kind {
            LayoutKind::Fixed { .. } => slot,
            LayoutKind::Subsampled { features, .. } => features[node][slot],
        }
    }

    /// Offset of a slot relative to its node region.
    #[inline]
    fn relative_offset(&self, node: usize, slot: usize) -> usize {
        match &self.kind {
            LayoutKind::Fixed { feature_offsets, .. } => feature_offsets[slot],
            LayoutKind::Subsampled { slot_offsets, .. } => slot_offsets[node][slot],
        }
    }

    /// Absolute offset of `(node, slot)`.
    #[inline]
    pub fn node_feature_offset(&self, node: usize, slot: usize) -> usize {
        match &self.kind {
            LayoutKind::Fixed { feature_offsets, node_stride } => {
                node * node_stride + feature_offsets[slot]
            }
            LayoutKind::Subsampled { node_starts, slot_offsets, .. } => {
                node_starts[node] + slot_offsets[node][slot]
            }
        }
    }

    /// Number of bins of a node slot.
    #[inline]
    pub fn num_bins(&self, node: usize, slot: usize) -> usize {
        self.num_bins[self.feature(node, slot)]
    }

    #[inline]
    pub fn is_unordered(&self, node: usize, slot: usize) -> bool {
        self.unordered[self.feature(node, slot)]
    }
}

/// Offsets of consecutive features inside one node region, and the region size.
fn region_offsets(
    num_bins: &[usize],
    stats_size: usize,
    features: impl Iterator<Item = usize>,
) -> (Vec<usize>, usize) {
    let mut offsets = Vec::new();
    let mut total = 0;
    for f in features {
        offsets.push(total);
        total += num_bins[f] * stats_size;
    }
    (offsets, total)
}

// =============================================================================
// StatsAggregator
// =============================================================================

/// Mutable histogram over the nodes of one batch.
#[derive(Clone, Debug)]
pub struct StatsAggregator {
    layout: Arc<AggregatorLayout>,
    all_stats: Vec<f64>,
}

impl PartialEq for StatsAggregator {
    fn eq(&self, other: &Self) -> bool {
        self.layout.num_nodes == other.layout.num_nodes && self.all_stats == other.all_stats
    }
}

impl StatsAggregator {
    /// Zeroed aggregator for a batch whose node `i` uses `node_subsets[i]`.
    pub fn new(metadata: &Metadata, node_subsets: &[Option<Vec<usize>>]) -> Self {
        Self::from_layout(Arc::new(AggregatorLayout::new(metadata, node_subsets)))
    }

    /// Zeroed aggregator sharing `layout`.
    pub fn from_layout(layout: Arc<AggregatorLayout>) -> Self {
        let all_stats = vec![0.0; layout.len()];
        Self { layout, all_stats }
    }

    #[inline]
    pub fn layout(&self) -> &Arc<AggregatorLayout> {
        &self.layout
    }

    #[inline]
    pub fn all_stats(&self) -> &[f64] {
        &self.all_stats
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.layout.num_nodes
    }

    #[inline]
    pub fn num_slots(&self, node: usize) -> usize {
        self.layout.num_slots(node)
    }

    #[inline]
    pub fn feature(&self, node: usize, slot: usize) -> usize {
        self.layout.feature(node, slot)
    }

    #[inline]
    pub fn node_feature_offset(&self, node: usize, slot: usize) -> usize {
        self.layout.node_feature_offset(node, slot)
    }

    /// Offsets of the left and right accumulators of an unordered feature.
    #[inline]
    pub fn left_right_node_feature_offsets(&self, node: usize, slot: usize) -> (usize, usize) {
        let offset = self.node_feature_offset(node, slot);
        let num_splits = self.layout.num_bins(node, slot) >> 1;
        (offset, offset + num_splits * self.layout.stats_size)
    }

    /// Add one observation to bin `bin` of `(node, slot)`.
    #[inline]
    pub fn node_update(&mut self, node: usize, slot: usize, bin: usize, label: f64, weight: f64) {
        let offset = self.node_feature_offset(node, slot);
        self.feature_update(offset, bin, label, weight);
    }

    /// Add one observation to bin `bin` of the feature starting at `offset`.
    #[inline]
    pub fn feature_update(&mut self, offset: usize, bin: usize, label: f64, weight: f64) {
        let at = offset + bin * self.layout.stats_size;
        self.layout.impurity.update(&mut self.all_stats, at, label, weight);
    }

    /// Copy of the statistics of bin `bin` of the feature at `offset`.
    #[inline]
    pub fn calculator(&self, offset: usize, bin: usize) -> ImpurityCalculator {
        let size = self.layout.stats_size;
        self.layout.impurity.calculator(&self.all_stats, offset + bin * size, size)
    }

    /// `stats[bin] += stats[other_bin]` within one feature.
    #[inline]
    pub fn merge_for_feature(&mut self, offset: usize, bin: usize, other_bin: usize) {
        merge_bins(&mut self.all_stats, self.layout.stats_size, offset, bin, other_bin);
    }

    /// Element-wise sum with an aggregator of the same layout.
    pub fn merge(&mut self, other: &StatsAggregator) {
        debug_assert_eq!(self.all_stats.len(), other.all_stats.len());
        for (a, b) in self.all_stats.iter_mut().zip(&other.all_stats) {
            *a += b;
        }
    }

    /// Consume both operands and return their sum.
    pub fn combine(mut self, other: StatsAggregator) -> StatsAggregator {
        self.merge(&other);
        self
    }

    /// Split the buffer into one mutable view per node.
    pub fn node_views_mut(&mut self) -> Vec<NodeStatsView<'_>> {
        let layout = &*self.layout;
        let mut views = Vec::with_capacity(layout.num_nodes);
        let mut rest: &mut [f64] = &mut self.all_stats;
        let mut consumed = 0;
        for node in 0..layout.num_nodes {
            let (start, end) = layout.node_range(node);
            let (region, tail) = std::mem::take(&mut rest).split_at_mut(end - consumed);
            let region = &mut region[start - consumed..];
            consumed = end;
            rest = tail;
            views.push(NodeStatsView { layout, node, stats: region });
        }
        views
    }
}

#[inline]
fn merge_bins(stats: &mut [f64], stats_size: usize, offset: usize, bin: usize, other_bin: usize) {
    let dst = offset + bin * stats_size;
    let src = offset + other_bin * stats_size;
    for i in 0..stats_size {
        stats[dst + i] += stats[src + i];
    }
}

// =============================================================================
// NodeStatsView
// =============================================================================

/// Exclusive view of one node's histogram region.
///
/// Offsets are relative to the node region.
#[derive(Debug)]
pub struct NodeStatsView<'a> {
    layout: &'a AggregatorLayout,
    node: usize,
    stats: &'a mut [f64],
}

impl NodeStatsView<'_> {
    /// Dense index of the node in its batch.
    #[inline]
    pub fn node(&self) -> usize {
        self.node
    }

    #[inline]
    pub fn num_slots(&self) -> usize {
        self.layout.num_slots(self.node)
    }

    #[inline]
    pub fn feature(&self, slot: usize) -> usize {
        self.layout.feature(self.node, slot)
    }

    #[inline]
    pub fn num_bins(&self, slot: usize) -> usize {
        self.layout.num_bins(self.node, slot)
    }

    #[inline]
    pub fn impurity(&self) -> Impurity {
        self.layout.impurity
    }

    #[inline]
    pub fn stats_size(&self) -> usize {
        self.layout.stats_size
    }

    #[inline]
    pub fn feature_offset(&self, slot: usize) -> usize {
        self.layout.relative_offset(self.node, slot)
    }

    #[inline]
    pub fn left_right_feature_offsets(&self, slot: usize) -> (usize, usize) {
        let offset = self.feature_offset(slot);
        (offset, offset + (self.num_bins(slot) >> 1) * self.layout.stats_size)
    }

    #[inline]
    pub fn calculator(&self, offset: usize, bin: usize) -> ImpurityCalculator {
        let size = self.layout.stats_size;
        self.layout.impurity.calculator(self.stats, offset + bin * size, size)
    }

    #[inline]
    pub fn merge_for_feature(&mut self, offset: usize, bin: usize, other_bin: usize) {
        merge_bins(self.stats, self.layout.stats_size, offset, bin, other_bin);
    }

    /// Statistics of every example of the node, read from one slot.
    pub fn node_total(&self, slot: usize) -> ImpurityCalculator {
        let offset = self.feature_offset(slot);
        let mut total = ImpurityCalculator::zeros(self.layout.impurity, self.layout.stats_size);
        if self.layout.is_unordered(self.node, slot) {
            // Every subset split sees every example once, left or right.
            let (left, right) = self.left_right_feature_offsets(slot);
            if self.num_bins(slot) >= 2 {
                total.add(&self.calculator(left, 0)).add(&self.calculator(right, 0));
            }
        } else {
            for bin in 0..self.num_bins(slot) {
                total.add(&self.calculator(offset, bin));
            }
        }
        total
    }
}
