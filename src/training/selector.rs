//! Best split of a node from its histogram.
//!
//! # Feature kinds
//!
//! - **Continuous**: bins are turned into prefix sums in place, so bin `k`
//!   holds every example with value `<= threshold[k]`. Split `k` has
//!   `left = prefix[k]` and `right = prefix[last] - left`.
//! - **Unordered categorical**: left and right accumulators of every subset
//!   split are already separate.
//! - **Ordered categorical**: categories are sorted by centroid (impurity for
//!   multiclass, class-1 fraction for binary classification, mean label for
//!   regression; empty categories last) and then scanned like a continuous
//!   feature. The chosen split sends the first `k + 1` sorted categories left.
//!   Binary classification deliberately orders by the class-1 fraction rather
//!   than the raw class-1 count, so large categories do not sort above small
//!   ones with a higher hit rate.
//!
//! The first evaluated candidate also yields the node prediction and
//! impurity (both sides merged).

use super::catalog::SplitBinCatalog;
use super::gain::{calculate_gain_for_split, calculate_predict, InformationGainStats};
use super::metadata::Metadata;
use super::stats::NodeStatsView;
use crate::error::{Result, TrainError};
use crate::impurity::ImpurityCalculator;
use crate::tree::{CatBitset, Predict, Split};

/// Outcome of split selection for one node.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitCandidate {
    /// Winning split, `None` when no feature has a candidate.
    pub split: Option<Split>,
    pub stats: InformationGainStats,
    pub predict: Predict,
    pub impurity: f64,
}

/// Node summary captured once, from the first candidate.
struct NodeSummary {
    predict: Predict,
    impurity: f64,
}

impl NodeSummary {
    fn from_sides(left: &ImpurityCalculator, right: &ImpurityCalculator) -> Self {
        let mut total = left.clone();
        total.add(right);
        Self::from_total(&total)
    }

    fn from_total(total: &ImpurityCalculator) -> Self {
        Self { predict: calculate_predict(total), impurity: total.calculate() }
    }
}

/// Per-feature best: split index (or ordered category prefix) and gain stats.
struct FeatureBest {
    index: usize,
    stats: InformationGainStats,
}

/// Pick the best split of one node. The view is consumed destructively:
/// prefix sums are computed in place.
///
/// # Errors
///
/// [`TrainError::Internal`] when the node has no assigned feature.
pub fn select_best_split(
    view: &mut NodeStatsView<'_>,
    metadata: &Metadata,
    catalog: &SplitBinCatalog,
) -> Result<SplitCandidate> {
    if view.num_slots() == 0 {
        return Err(TrainError::Internal(format!("node {} has no features", view.node())));
    }

    let mut summary: Option<NodeSummary> = None;
    let mut best: Option<(Split, InformationGainStats)> = None;

    for slot in 0..view.num_slots() {
        let feature = view.feature(slot);
        let num_splits = metadata.num_splits(feature);
        if num_splits == 0 {
            continue;
        }

        let (split, stats) = if metadata.is_continuous(feature) {
            let fb = best_continuous(view, slot, num_splits, metadata, &mut summary);
            (catalog.split(feature, fb.index).clone(), fb.stats)
        } else if metadata.is_unordered(feature) {
            let fb = best_unordered(view, slot, num_splits, metadata, &mut summary);
            (catalog.split(feature, fb.index).clone(), fb.stats)
        } else {
            let (order, fb) = best_ordered_categorical(view, slot, num_splits, metadata, &mut summary);
            let left: CatBitset = order[..=fb.index].iter().map(|&c| c as u32).collect();
            (Split::categorical(feature, left), fb.stats)
        };

        if best.as_ref().map_or(true, |(_, b)| stats.gain > b.gain) {
            best = Some((split, stats));
        }
    }

    let summary = match summary {
        Some(summary) => summary,
        None => NodeSummary::from_total(&view.node_total(0)),
    };
    let (split, stats) = match best {
        Some((split, stats)) => (Some(split), stats),
        None => (None, InformationGainStats::invalid()),
    };
    Ok(SplitCandidate { split, stats, predict: summary.predict, impurity: summary.impurity })
}

/// Evaluate one candidate, recording the node summary on first use.
#[inline]
fn evaluate(
    left: &ImpurityCalculator,
    right: &ImpurityCalculator,
    metadata: &Metadata,
    summary: &mut Option<NodeSummary>,
) -> InformationGainStats {
    if summary.is_none() {
        *summary = Some(NodeSummary::from_sides(left, right));
    }
    calculate_gain_for_split(left, right, metadata)
}

/// Keep the first maximum.
#[inline]
fn keep_best(best: &mut FeatureBest, index: usize, stats: InformationGainStats) {
    if stats.gain > best.stats.gain {
        *best = FeatureBest { index, stats };
    }
}

fn best_continuous(
    view: &mut NodeStatsView<'_>,
    slot: usize,
    num_splits: usize,
    metadata: &Metadata,
    summary: &mut Option<NodeSummary>,
) -> FeatureBest {
    let offset = view.feature_offset(slot);
    for bin in 1..=num_splits {
        view.merge_for_feature(offset, bin, bin - 1);
    }
    let total = view.calculator(offset, num_splits);

    let mut best = FeatureBest { index: 0, stats: InformationGainStats::invalid() };
    for index in 0..num_splits {
        let left = view.calculator(offset, index);
        let mut right = total.clone();
        right.subtract(&left);
        let stats = evaluate(&left, &right, metadata, summary);
        keep_best(&mut best, index, stats);
    }
    best
}

fn best_unordered(
    view: &mut NodeStatsView<'_>,
    slot: usize,
    num_splits: usize,
    metadata: &Metadata,
    summary: &mut Option<NodeSummary>,
) -> FeatureBest {
    let (left_offset, right_offset) = view.left_right_feature_offsets(slot);
    let mut best = FeatureBest { index: 0, stats: InformationGainStats::invalid() };
    for index in 0..num_splits {
        let left = view.calculator(left_offset, index);
        let right = view.calculator(right_offset, index);
        let stats = evaluate(&left, &right, metadata, summary);
        keep_best(&mut best, index, stats);
    }
    best
}

/// Returns the centroid order of the categories and the best prefix length
/// minus one.
fn best_ordered_categorical(
    view: &mut NodeStatsView<'_>,
    slot: usize,
    num_splits: usize,
    metadata: &Metadata,
    summary: &mut Option<NodeSummary>,
) -> (Vec<usize>, FeatureBest) {
    let offset = view.feature_offset(slot);
    let num_categories = num_splits + 1;

    let centroids: Vec<f64> = (0..num_categories)
        .map(|category| category_centroid(&view.calculator(offset, category), metadata))
        .collect();
    let order = centroid_order(&centroids);

    for k in 1..num_categories {
        view.merge_for_feature(offset, order[k], order[k - 1]);
    }
    let total = view.calculator(offset, order[num_categories - 1]);

    let mut best = FeatureBest { index: 0, stats: InformationGainStats::invalid() };
    for index in 0..num_splits {
        let left = view.calculator(offset, order[index]);
        let mut right = total.clone();
        right.subtract(&left);
        let stats = evaluate(&left, &right, metadata, summary);
        keep_best(&mut best, index, stats);
    }
    (order, best)
}

/// Ordering key of one category; empty categories get `f64::MAX`.
pub fn category_centroid(stats: &ImpurityCalculator, metadata: &Metadata) -> f64 {
    stats.centroid(metadata.is_multiclass())
}

/// Categories sorted by centroid ascending; ties keep category order.
pub fn centroid_order(centroids: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..centroids.len()).collect();
    order.sort_by(|&a, &b| centroids[a].total_cmp(&centroids[b]));
    order
}
