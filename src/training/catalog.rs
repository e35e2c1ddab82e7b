//! Candidate splits and bins per feature.
//!
//! Built once per training run from a data sample:
//!
//! - **Continuous**: `num_bins - 1` thresholds cut the sorted sample at equal
//!   count strides. Bin `k` covers `(threshold[k-1], threshold[k]]`, the
//!   outer bins are bounded by `-inf` / `+inf`.
//! - **Unordered categorical**: one subset split per `i` in
//!   `1..2^(arity-1)`, routing left the categories at the set bits of `i`.
//! - **Ordered categorical**: one bin per category; splits are chosen while
//!   training by ordering categories.

use log::{debug, warn};

use super::metadata::Metadata;
use crate::config::QuantileStrategy;
use crate::data::{LabeledPoint, PartitionedDataset};
use crate::error::{Result, TrainError};
use crate::tree::{Bin, CatBitset, Split};
use crate::utils::Parallelism;

/// Minimum number of examples sampled to place continuous thresholds.
const MIN_QUANTILE_SAMPLE: usize = 10_000;

/// Splits and bins of every feature.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitBinCatalog {
    splits: Vec<Vec<Split>>,
    bins: Vec<Vec<Bin>>,
}

impl SplitBinCatalog {
    /// Build the catalog from a sample of `input`.
    ///
    /// # Errors
    ///
    /// [`TrainError::UnsupportedQuantileStrategy`] for any strategy other
    /// than [`QuantileStrategy::Sort`].
    pub fn find_splits_bins(
        input: &PartitionedDataset<LabeledPoint>,
        metadata: &Metadata,
        seed: u64,
        parallelism: Parallelism,
    ) -> Result<Self> {
        if metadata.quantile_strategy != QuantileStrategy::Sort {
            return Err(TrainError::UnsupportedQuantileStrategy(metadata.quantile_strategy));
        }

        let has_continuous = (0..metadata.num_features).any(|f| metadata.is_continuous(f));
        let sample = if has_continuous {
            let required = (metadata.max_bins * metadata.max_bins).max(MIN_QUANTILE_SAMPLE);
            let fraction = required as f64 / metadata.num_examples as f64;
            let mut sample = input.sample(parallelism, fraction, seed);
            if sample.is_empty() {
                sample = input.iter().cloned().collect();
            }
            debug!("sampled {} of {} examples for thresholds", sample.len(), metadata.num_examples);
            sample
        } else {
            Vec::new()
        };

        let mut splits = Vec::with_capacity(metadata.num_features);
        let mut bins = Vec::with_capacity(metadata.num_features);
        for feature in 0..metadata.num_features {
            let arity = metadata.feature_arity[feature];
            if metadata.is_continuous(feature) {
                let mut values: Vec<f64> = sample.iter().map(|p| p.features[feature]).collect();
                values.sort_by(f64::total_cmp);
                if values.first() == values.last() {
                    warn!("feature {feature}: sample holds a single distinct value");
                }
                let thresholds = continuous_thresholds(&values, metadata.num_bins[feature]);
                let (s, b) = continuous_splits_bins(feature, &thresholds);
                splits.push(s);
                bins.push(b);
            } else if metadata.is_unordered(feature) {
                let s = (0..metadata.num_splits(feature))
                    .map(|i| Split::categorical(feature, extract_multiclass_categories(i as u64 + 1, arity)))
                    .collect();
                splits.push(s);
                bins.push(category_bins(feature, arity));
            } else {
                splits.push(Vec::new());
                bins.push(category_bins(feature, arity));
            }
        }
        Ok(Self { splits, bins })
    }

    /// Catalog from explicit parts.
    pub fn from_parts(splits: Vec<Vec<Split>>, bins: Vec<Vec<Bin>>) -> Self {
        Self { splits, bins }
    }

    #[inline]
    pub fn splits(&self) -> &[Vec<Split>] {
        &self.splits
    }

    #[inline]
    pub fn bins(&self) -> &[Vec<Bin>] {
        &self.bins
    }

    #[inline]
    pub fn split(&self, feature: usize, index: usize) -> &Split {
        &self.splits[feature][index]
    }

    /// Bin of a raw continuous value: the first bin whose upper bound is
    /// `>= value`. Categorical values are their own bin.
    #[inline]
    pub fn bin_index(&self, metadata: &Metadata, feature: usize, value: f64) -> u32 {
        if metadata.is_categorical(feature) {
            return value as u32;
        }
        self.bins[feature].partition_point(|bin| bin.upper_threshold() < value) as u32
    }
}

/// Thresholds at equal count strides of the sorted `values`.
///
/// Threshold `k` is the midpoint of the values at positions
/// `stride * (k + 1) - 1` and `stride * (k + 1)`, clamped into the sample.
pub fn continuous_thresholds(values: &[f64], num_bins: usize) -> Vec<f64> {
    let num_splits = num_bins.saturating_sub(1);
    if values.is_empty() {
        return vec![0.0; num_splits];
    }
    let last = values.len() - 1;
    let stride = (values.len() / num_bins.max(1)).max(1);
    (0..num_splits)
        .map(|k| {
            let hi = (stride * (k + 1)).min(last);
            let lo = (stride * (k + 1) - 1).min(last);
            (values[lo] + values[hi]) / 2.0
        })
        .collect()
}

fn continuous_splits_bins(feature: usize, thresholds: &[f64]) -> (Vec<Split>, Vec<Bin>) {
    let splits: Vec<Split> = thresholds.iter().map(|&t| Split::continuous(feature, t)).collect();
    let mut bins = Vec::with_capacity(splits.len() + 1);
    let mut low = Split::dummy_low(feature);
    for split in &splits {
        bins.push(Bin::continuous(low, split.clone()));
        low = split.clone();
    }
    bins.push(Bin::continuous(low, Split::dummy_high(feature)));
    (splits, bins)
}

fn category_bins(feature: usize, arity: usize) -> Vec<Bin> {
    (0..arity as u32).map(|c| Bin::category(feature, c)).collect()
}

/// Categories of the subset split with 1-based code `input`: the positions of
/// the set bits of `input` below `arity`. Higher bits are masked off.
///
/// `extract_multiclass_categories(13, 5)` is `{0, 2, 3}`.
pub fn extract_multiclass_categories(input: u64, arity: usize) -> CatBitset {
    let mask = if arity >= 64 { u64::MAX } else { (1u64 << arity) - 1 };
    CatBitset::from_subset_code(input & mask)
}
