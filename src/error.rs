//! Error types for tree training.

use crate::config::{ConfigError, QuantileStrategy};

/// Errors returned by the training entry points and their building blocks.
///
/// Invalid candidate splits are *not* errors: they are represented by
/// [`InformationGainStats::invalid`](crate::training::InformationGainStats::invalid)
/// and simply lose every comparison.
#[derive(Debug, thiserror::Error)]
pub enum TrainError {
    /// The training strategy failed validation.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Only the sample-and-sort quantile strategy is implemented.
    #[error("quantile strategy {0:?} is not supported")]
    UnsupportedQuantileStrategy(QuantileStrategy),

    /// The input dataset has no examples.
    #[error("training input is empty")]
    EmptyInput,

    /// An example has a different number of features than the first one.
    #[error("example has {found} features, expected {expected}")]
    FeatureCountMismatch { expected: usize, found: usize },

    /// A classification label is not an integer in `[0, num_classes)`.
    #[error("label {label} is not a class index in [0, {num_classes})")]
    InvalidLabel { label: f64, num_classes: usize },

    /// A categorical value is not an integer in `[0, arity)`.
    #[error("feature {feature}: value {value} is not a category in [0, {arity})")]
    InvalidCategory { feature: usize, value: f64, arity: usize },

    /// A categorical feature index points past the last feature.
    #[error("categorical feature {feature} does not exist (dataset has {num_features} features)")]
    UnknownCategoricalFeature { feature: usize, num_features: usize },

    /// `max_bins` is smaller than the arity of some categorical feature.
    ///
    /// Ordered categorical features use one bin per category and are never capped.
    #[error("max_bins (= {max_bins}) must be >= the largest categorical arity (= {max_arity})")]
    TooManyCategories { max_bins: usize, max_arity: usize },

    /// A single node's histogram does not fit the memory budget.
    #[error("max_memory_in_mb = {budget_mb} is too small: one node needs {required_bytes} bytes")]
    MemoryBudgetTooSmall { budget_mb: usize, required_bytes: u64 },

    /// An internal invariant of the growth loop was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TrainError>;
