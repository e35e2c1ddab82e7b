//! Raw and binned training examples.

use serde::{Deserialize, Serialize};

use crate::data::PartitionedDataset;
use crate::error::{Result, TrainError};
use crate::training::{Metadata, SplitBinCatalog};
use crate::utils::Parallelism;

/// A raw training example.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: f64,
    pub features: Vec<f64>,
}

impl LabeledPoint {
    #[inline]
    pub fn new(label: f64, features: Vec<f64>) -> Self {
        Self { label, features }
    }
}

/// A training example reduced to one bin index per feature.
///
/// For categorical features the bin index is the category value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreePoint {
    pub label: f64,
    pub binned_features: Vec<u32>,
}

impl TreePoint {
    #[inline]
    pub fn new(label: f64, binned_features: Vec<u32>) -> Self {
        Self { label, binned_features }
    }

    /// Discretize one raw example.
    ///
    /// # Errors
    ///
    /// - [`TrainError::FeatureCountMismatch`] for a wrong number of features
    /// - [`TrainError::InvalidLabel`] for a classification label that is not
    ///   a class index
    /// - [`TrainError::InvalidCategory`] for a categorical value that is not
    ///   an integer in `[0, arity)`
    pub fn from_labeled(
        point: &LabeledPoint,
        catalog: &SplitBinCatalog,
        metadata: &Metadata,
    ) -> Result<Self> {
        if point.features.len() != metadata.num_features {
            return Err(TrainError::FeatureCountMismatch {
                expected: metadata.num_features,
                found: point.features.len(),
            });
        }
        if metadata.is_classification() && !is_index_below(point.label, metadata.num_classes) {
            return Err(TrainError::InvalidLabel {
                label: point.label,
                num_classes: metadata.num_classes,
            });
        }

        let binned_features = point
            .features
            .iter()
            .enumerate()
            .map(|(feature, &value)| {
                let arity = metadata.feature_arity[feature];
                if arity > 0 && !is_index_below(value, arity) {
                    return Err(TrainError::InvalidCategory { feature, value, arity });
                }
                Ok(catalog.bin_index(metadata, feature, value))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { label: point.label, binned_features })
    }
}

#[inline]
fn is_index_below(value: f64, bound: usize) -> bool {
    value >= 0.0 && value.fract() == 0.0 && value < bound as f64
}

/// Discretize every example, partition by partition.
pub fn convert_to_tree_points(
    input: &PartitionedDataset<LabeledPoint>,
    catalog: &SplitBinCatalog,
    metadata: &Metadata,
    parallelism: Parallelism,
) -> Result<PartitionedDataset<TreePoint>> {
    input.try_map_partitions(parallelism, |_, part| {
        part.iter().map(|p| TreePoint::from_labeled(p, catalog, metadata)).collect()
    })
}
