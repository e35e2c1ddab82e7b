//! Training strategy with builder pattern.
//!
//! [`Strategy`] gathers every knob read by the growth loop. It is built with
//! the `bon` builder and validated when the builder finishes, so a
//! `Strategy` value is always internally consistent.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use arbor::config::{Algo, Strategy};
//! use arbor::Impurity;
//!
//! // Defaults: binary classification with Gini impurity
//! let strategy = Strategy::builder().build().unwrap();
//! assert_eq!(strategy.impurity(), Impurity::Gini);
//!
//! // Regression with one categorical feature of arity 4
//! let strategy = Strategy::builder()
//!     .algo(Algo::Regression)
//!     .max_depth(8)
//!     .categorical_features_info(HashMap::from([(2, 4)]))
//!     .build()
//!     .unwrap();
//! assert_eq!(strategy.impurity(), Impurity::Variance);
//! ```

use std::collections::HashMap;

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::impurity::Impurity;

/// Deepest tree supported: node ids are `u32` and level 30 is the last full level.
pub const MAX_SUPPORTED_DEPTH: u32 = 30;

// =============================================================================
// Enums
// =============================================================================

/// Learning task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algo {
    #[default]
    Classification,
    Regression,
}

/// How continuous features are discretized into bins.
///
/// Only [`QuantileStrategy::Sort`] is implemented; the other two are rejected
/// when the split/bin catalog is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantileStrategy {
    /// Sort a data sample and cut it at equal-count strides.
    #[default]
    Sort,
    MinMax,
    ApproxHist,
}

/// Number of features considered at each node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureSubsetStrategy {
    /// `All` for a single tree; `Sqrt` for classification forests, `OneThird`
    /// for regression forests.
    #[default]
    Auto,
    All,
    Sqrt,
    Log2,
    OneThird,
}

impl FeatureSubsetStrategy {
    /// Resolve `Auto` for the given task and forest size.
    pub fn resolve(self, algo: Algo, num_trees: usize) -> Self {
        match self {
            Self::Auto if num_trees == 1 => Self::All,
            Self::Auto => match algo {
                Algo::Classification => Self::Sqrt,
                Algo::Regression => Self::OneThird,
            },
            other => other,
        }
    }

    /// Number of features per node out of `num_features`.
    ///
    /// `Auto` must be resolved first; it is treated as `All` here.
    pub fn num_features_per_node(self, num_features: usize) -> usize {
        let n = num_features as f64;
        let k = match self {
            Self::Auto | Self::All => num_features,
            Self::Sqrt => n.sqrt().ceil() as usize,
            Self::Log2 => (n.log2().ceil() as usize).max(1),
            Self::OneThird => (n / 3.0).ceil() as usize,
        };
        k.clamp(1, num_features.max(1))
    }
}

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur during strategy validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_depth must be <= 30, got {0}")]
    InvalidMaxDepth(u32),

    #[error("max_bins must be >= 2, got {0}")]
    InvalidMaxBins(usize),

    #[error("classification needs num_classes >= 2, got {0}")]
    InvalidNumClasses(usize),

    #[error("impurity {impurity:?} cannot be used for {algo:?}")]
    ImpurityMismatch { algo: Algo, impurity: Impurity },

    #[error("categorical feature {feature} must have arity >= 2, got {arity}")]
    InvalidArity { feature: usize, arity: usize },

    #[error("min_instances_per_node must be >= 1, got {0}")]
    InvalidMinInstances(usize),

    #[error("min_info_gain must be finite and >= 0, got {0}")]
    InvalidMinInfoGain(f64),

    #[error("max_memory_in_mb must be >= 1, got {0}")]
    InvalidMaxMemory(usize),

    #[error("subsampling_rate must be in (0, 1], got {0}")]
    InvalidSubsamplingRate(f64),

    #[error("num_trees must be >= 1, got {0}")]
    InvalidNumTrees(usize),
}

// =============================================================================
// Strategy
// =============================================================================

/// Configuration read (never mutated) by the growth loop.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct Strategy {
    /// Classification or regression. Default: classification.
    #[builder(default)]
    pub algo: Algo,

    /// Impurity criterion. `None` picks Gini for classification and Variance
    /// for regression.
    pub impurity: Option<Impurity>,

    /// Maximum depth; the root is at depth 0. Default: 5.
    #[builder(default = 5)]
    pub max_depth: u32,

    /// Number of classes for classification. Ignored for regression. Default: 2.
    #[builder(default = 2)]
    pub num_classes: usize,

    /// Maximum number of bins for continuous features. Default: 32.
    #[builder(default = 32)]
    pub max_bins: usize,

    /// Quantile strategy for continuous features. Default: sort.
    #[builder(default)]
    pub quantile_strategy: QuantileStrategy,

    /// Categorical feature index → number of categories. Features absent from
    /// the map are continuous.
    #[builder(default)]
    pub categorical_features_info: HashMap<usize, usize>,

    /// Minimum (weighted) number of examples each child must receive. Default: 1.
    #[builder(default = 1)]
    pub min_instances_per_node: usize,

    /// Minimum information gain for a split to be considered. Default: 0.
    #[builder(default = 0.0)]
    pub min_info_gain: f64,

    /// Memory ceiling for the histograms of one batch, in MiB. Default: 256.
    #[builder(default = 256)]
    pub max_memory_in_mb: usize,

    /// Fraction of the data used to grow each tree. Default: 1.
    #[builder(default = 1.0)]
    pub subsampling_rate: f64,

    /// Random seed for sampling, bagging and feature subsets. Default: 42.
    #[builder(default = 42)]
    pub seed: u64,

    /// Number of threads: 0 = auto, 1 = sequential. Default: 0.
    #[builder(default = 0)]
    pub n_threads: usize,
}

/// Custom finishing function that validates the strategy.
impl<S: strategy_builder::IsComplete> StrategyBuilder<S> {
    /// Build and validate the strategy.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for out-of-range parameters or an impurity that
    /// does not match the task.
    pub fn build(self) -> Result<Strategy, ConfigError> {
        let strategy = self.__build_internal();
        strategy.validate()?;
        Ok(strategy)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::builder().__build_internal()
    }
}

impl Strategy {
    /// Effective impurity criterion.
    pub fn impurity(&self) -> Impurity {
        self.impurity.unwrap_or(match self.algo {
            Algo::Classification => Impurity::Gini,
            Algo::Regression => Impurity::Variance,
        })
    }

    #[inline]
    pub fn is_classification(&self) -> bool {
        self.algo == Algo::Classification
    }

    /// Number of classes seen by the statistics, 0 for regression.
    #[inline]
    pub fn effective_num_classes(&self) -> usize {
        match self.algo {
            Algo::Classification => self.num_classes,
            Algo::Regression => 0,
        }
    }

    /// Validate the strategy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::InvalidMaxDepth(self.max_depth));
        }
        if self.max_bins < 2 {
            return Err(ConfigError::InvalidMaxBins(self.max_bins));
        }
        if self.is_classification() && self.num_classes < 2 {
            return Err(ConfigError::InvalidNumClasses(self.num_classes));
        }

        let impurity = self.impurity();
        let compatible = match self.algo {
            Algo::Classification => matches!(impurity, Impurity::Gini | Impurity::Entropy),
            Algo::Regression => impurity == Impurity::Variance,
        };
        if !compatible {
            return Err(ConfigError::ImpurityMismatch { algo: self.algo, impurity });
        }

        if let Some((&feature, &arity)) =
            self.categorical_features_info.iter().find(|(_, &arity)| arity < 2)
        {
            return Err(ConfigError::InvalidArity { feature, arity });
        }
        if self.min_instances_per_node < 1 {
            return Err(ConfigError::InvalidMinInstances(self.min_instances_per_node));
        }
        if !self.min_info_gain.is_finite() || self.min_info_gain < 0.0 {
            return Err(ConfigError::InvalidMinInfoGain(self.min_info_gain));
        }
        if self.max_memory_in_mb < 1 {
            return Err(ConfigError::InvalidMaxMemory(self.max_memory_in_mb));
        }
        if !(self.subsampling_rate > 0.0 && self.subsampling_rate <= 1.0) {
            return Err(ConfigError::InvalidSubsamplingRate(self.subsampling_rate));
        }
        Ok(())
    }

    /// Memory ceiling in bytes.
    #[inline]
    pub fn max_memory_bytes(&self) -> u64 {
        self.max_memory_in_mb as u64 * 1024 * 1024
    }
}
