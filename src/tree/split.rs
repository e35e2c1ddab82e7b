//! Split rules and bins.

use serde::{Deserialize, Serialize};

use super::categorical::CatBitset;

/// Kind of a feature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    Continuous,
    Categorical,
}

/// Decision rule of a split.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SplitRule {
    /// Go left iff `value <= threshold`.
    Continuous { threshold: f64 },
    /// Go left iff the category is in `left_categories`.
    Categorical { left_categories: CatBitset },
}

/// A candidate or chosen split on one feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub feature: usize,
    pub rule: SplitRule,
}

impl Split {
    #[inline]
    pub fn continuous(feature: usize, threshold: f64) -> Self {
        Self { feature, rule: SplitRule::Continuous { threshold } }
    }

    #[inline]
    pub fn categorical(feature: usize, left_categories: CatBitset) -> Self {
        Self { feature, rule: SplitRule::Categorical { left_categories } }
    }

    /// Lower sentinel bounding the first continuous bin.
    #[inline]
    pub fn dummy_low(feature: usize) -> Self {
        Self::continuous(feature, f64::NEG_INFINITY)
    }

    /// Upper sentinel bounding the last continuous bin.
    #[inline]
    pub fn dummy_high(feature: usize) -> Self {
        Self::continuous(feature, f64::INFINITY)
    }

    #[inline]
    pub fn feature_type(&self) -> FeatureType {
        match self.rule {
            SplitRule::Continuous { .. } => FeatureType::Continuous,
            SplitRule::Categorical { .. } => FeatureType::Categorical,
        }
    }

    /// Threshold of a continuous split.
    #[inline]
    pub fn threshold(&self) -> Option<f64> {
        match self.rule {
            SplitRule::Continuous { threshold } => Some(threshold),
            SplitRule::Categorical { .. } => None,
        }
    }

    /// Categories routed left by a categorical split.
    #[inline]
    pub fn left_categories(&self) -> Option<&CatBitset> {
        match &self.rule {
            SplitRule::Continuous { .. } => None,
            SplitRule::Categorical { left_categories } => Some(left_categories),
        }
    }

    /// Route a raw feature value.
    #[inline]
    pub fn goes_left(&self, value: f64) -> bool {
        match &self.rule {
            SplitRule::Continuous { threshold } => value <= *threshold,
            SplitRule::Categorical { left_categories } => {
                value >= 0.0 && left_categories.contains(value as u32)
            }
        }
    }
}

/// A discretization bucket of one feature.
///
/// Continuous bins cover `(low_split.threshold, high_split.threshold]`;
/// categorical bins hold exactly one category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bin {
    pub low_split: Split,
    pub high_split: Split,
    pub feature_type: FeatureType,
    /// Category of a categorical bin.
    pub category: Option<u32>,
}

impl Bin {
    pub fn continuous(low_split: Split, high_split: Split) -> Self {
        Self { low_split, high_split, feature_type: FeatureType::Continuous, category: None }
    }

    pub fn category(feature: usize, category: u32) -> Self {
        let only = CatBitset::singleton(category);
        Self {
            low_split: Split::categorical(feature, only.clone()),
            high_split: Split::categorical(feature, only),
            feature_type: FeatureType::Categorical,
            category: Some(category),
        }
    }

    /// Upper threshold of a continuous bin (`+inf` for the last one).
    #[inline]
    pub fn upper_threshold(&self) -> f64 {
        self.high_split.threshold().unwrap_or(f64::INFINITY)
    }
}
