//! Per-run dataset and feature layout facts.
//!
//! [`Metadata`] is computed once from the raw input and the [`Strategy`] and
//! is read-only afterwards. It decides, per feature:
//!
//! - continuous: `num_bins = min(max_bins, num_examples)`
//! - unordered categorical (multiclass only, small arity):
//!   `num_bins = 2 * (2^(arity - 1) - 1)` (left and right accumulator per subset split)
//! - ordered categorical: `num_bins = arity`

use log::debug;

use crate::config::{Algo, FeatureSubsetStrategy, QuantileStrategy, Strategy};
use crate::data::{LabeledPoint, PartitionedDataset};
use crate::error::{Result, TrainError};
use crate::impurity::Impurity;

/// Read-only layout facts for one training run.
#[derive(Clone, Debug, PartialEq)]
pub struct Metadata {
    pub num_features: usize,
    pub num_examples: usize,
    /// Number of classes, 0 for regression.
    pub num_classes: usize,
    /// Effective bin ceiling: `min(max_bins, num_examples)`.
    pub max_bins: usize,
    /// Arity per feature, 0 for continuous features.
    pub feature_arity: Vec<usize>,
    /// Sorted indices of unordered categorical features.
    pub unordered_features: Vec<usize>,
    /// Histogram slots per feature.
    pub num_bins: Vec<usize>,
    pub impurity: Impurity,
    pub quantile_strategy: QuantileStrategy,
    pub max_depth: u32,
    pub min_instances_per_node: usize,
    pub min_info_gain: f64,
    pub num_trees: usize,
    pub num_features_per_node: usize,
}

impl Metadata {
    /// Inspect the input and derive the layout.
    ///
    /// # Errors
    ///
    /// - [`TrainError::EmptyInput`] for an empty dataset
    /// - [`TrainError::FeatureCountMismatch`] for ragged examples
    /// - [`TrainError::UnknownCategoricalFeature`] for an out-of-range arity key
    /// - [`TrainError::TooManyCategories`] when the bin ceiling is below an arity
    pub fn build(
        input: &PartitionedDataset<LabeledPoint>,
        strategy: &Strategy,
        num_trees: usize,
        feature_subset_strategy: FeatureSubsetStrategy,
    ) -> Result<Self> {
        let num_features = input
            .iter()
            .next()
            .map(|p| p.features.len())
            .ok_or(TrainError::EmptyInput)?;
        if let Some(p) = input.iter().find(|p| p.features.len() != num_features) {
            return Err(TrainError::FeatureCountMismatch {
                expected: num_features,
                found: p.features.len(),
            });
        }
        let num_examples = input.count();

        let mut feature_arity = vec![0; num_features];
        for (&feature, &arity) in &strategy.categorical_features_info {
            if feature >= num_features {
                return Err(TrainError::UnknownCategoricalFeature { feature, num_features });
            }
            feature_arity[feature] = arity;
        }

        let max_bins = strategy.max_bins.min(num_examples);
        let max_arity = feature_arity.iter().copied().max().unwrap_or(0);
        if max_arity > max_bins {
            return Err(TrainError::TooManyCategories { max_bins, max_arity });
        }

        let num_classes = strategy.effective_num_classes();
        let multiclass = strategy.algo == Algo::Classification && num_classes > 2;
        let max_unordered_arity = max_categories_for_unordered(max_bins);

        let mut unordered_features = Vec::new();
        let num_bins = feature_arity
            .iter()
            .enumerate()
            .map(|(feature, &arity)| match arity {
                0 => max_bins,
                a if multiclass && a <= max_unordered_arity => {
                    unordered_features.push(feature);
                    num_unordered_bins(a)
                }
                a => a,
            })
            .collect();

        let subset = feature_subset_strategy.resolve(strategy.algo, num_trees);
        let num_features_per_node = subset.num_features_per_node(num_features);

        let metadata = Self {
            num_features,
            num_examples,
            num_classes,
            max_bins,
            feature_arity,
            unordered_features,
            num_bins,
            impurity: strategy.impurity(),
            quantile_strategy: strategy.quantile_strategy,
            max_depth: strategy.max_depth,
            min_instances_per_node: strategy.min_instances_per_node,
            min_info_gain: strategy.min_info_gain,
            num_trees,
            num_features_per_node,
        };
        debug!(
            "metadata: {} features, {} examples, {} classes, {} unordered features, {} max bins, {} features per node",
            metadata.num_features,
            metadata.num_examples,
            metadata.num_classes,
            metadata.unordered_features.len(),
            metadata.max_bins,
            metadata.num_features_per_node,
        );
        Ok(metadata)
    }

    #[inline]
    pub fn is_classification(&self) -> bool {
        self.num_classes > 0
    }

    #[inline]
    pub fn is_multiclass(&self) -> bool {
        self.num_classes > 2
    }

    #[inline]
    pub fn is_categorical(&self, feature: usize) -> bool {
        self.feature_arity[feature] > 0
    }

    #[inline]
    pub fn is_continuous(&self, feature: usize) -> bool {
        self.feature_arity[feature] == 0
    }

    #[inline]
    pub fn is_unordered(&self, feature: usize) -> bool {
        self.unordered_features.binary_search(&feature).is_ok()
    }

    #[inline]
    pub fn has_unordered_features(&self) -> bool {
        !self.unordered_features.is_empty()
    }

    /// Number of candidate splits of a feature.
    #[inline]
    pub fn num_splits(&self, feature: usize) -> usize {
        if self.is_unordered(feature) {
            self.num_bins[feature] >> 1
        } else {
            self.num_bins[feature].saturating_sub(1)
        }
    }

    /// Whether nodes draw random feature subsets.
    #[inline]
    pub fn subsampling_features(&self) -> bool {
        self.num_features_per_node < self.num_features
    }

    /// Length of one statistics vector.
    #[inline]
    pub fn stats_size(&self) -> usize {
        self.impurity.stats_size(self.num_classes)
    }

    /// Histogram bytes for one node using `features` (all features when `None`).
    pub fn node_histogram_bytes(&self, features: Option<&[usize]>) -> u64 {
        let bins: usize = match features {
            Some(features) => features.iter().map(|&f| self.num_bins[f]).sum(),
            None => self.num_bins.iter().sum(),
        };
        (bins * self.stats_size() * std::mem::size_of::<f64>()) as u64
    }

    /// Largest histogram one node can need: the `num_features_per_node`
    /// widest features.
    pub fn max_node_histogram_bytes(&self) -> u64 {
        let mut bins = self.num_bins.clone();
        bins.sort_unstable_by(|a, b| b.cmp(a));
        let widest: usize = bins.iter().take(self.num_features_per_node).sum();
        (widest * self.stats_size() * std::mem::size_of::<f64>()) as u64
    }
}

/// Largest arity whose subset splits fit in `max_bins` bins.
#[inline]
pub fn max_categories_for_unordered(max_bins: usize) -> usize {
    ((max_bins / 2 + 1) as f64).log2().floor() as usize + 1
}

/// Histogram slots of an unordered feature: a left and a right accumulator
/// for each of its `2^(arity - 1) - 1` subset splits.
#[inline]
pub fn num_unordered_bins(arity: usize) -> usize {
    2 * ((1usize << (arity - 1)) - 1)
}
