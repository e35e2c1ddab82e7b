//! Tree growth.
//!
//! - [`Metadata`]: dataset-derived layout (bins, arities, unordered features)
//! - [`SplitBinCatalog`]: candidate splits and bins per feature
//! - [`StatsAggregator`]: flat per-node, per-feature, per-bin histogram
//! - [`select_best_split`]: best split of one node from its histogram
//! - [`GrowthScheduler`]: breadth-first, memory-bounded growth of all trees
//! - [`DecisionTree`] / [`RandomForest`]: training entry points

mod aggregation;
mod catalog;
mod forest;
mod gain;
mod metadata;
mod scheduler;
mod selector;
mod stats;
mod timing;

pub use aggregation::{aggregate_batch, bin_seq_op};
pub use catalog::{continuous_thresholds, extract_multiclass_categories, SplitBinCatalog};
pub use forest::{DecisionTree, RandomForest};
pub use gain::{calculate_gain_for_split, calculate_predict, InformationGainStats};
pub use metadata::{max_categories_for_unordered, num_unordered_bins, Metadata};
pub use scheduler::{
    sample_features, select_nodes_to_split, GrowthScheduler, NodeBatch, NodeIndexInfo,
};
pub use selector::{category_centroid, centroid_order, select_best_split, SplitCandidate};
pub use stats::{AggregatorLayout, NodeStatsView, StatsAggregator};
pub use timing::TimeTracker;
