//! Information gain of a candidate split.
//!
//! `gain = iP - nL/n * iL - nR/n * iR` where `iP` is the impurity of the
//! union of both sides. Candidates violating the minimum-instances or
//! minimum-gain constraints get the [`InformationGainStats::invalid`]
//! sentinel, which loses every comparison.

use serde::{Deserialize, Serialize};

use super::metadata::Metadata;
use crate::impurity::ImpurityCalculator;
use crate::tree::Predict;

/// Gain and per-side summary of one candidate split.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InformationGainStats {
    pub gain: f64,
    /// Impurity of the parent (both sides merged).
    pub impurity: f64,
    pub left_impurity: f64,
    pub right_impurity: f64,
    pub left_count: f64,
    pub right_count: f64,
    pub left_predict: Predict,
    pub right_predict: Predict,
}

impl InformationGainStats {
    /// Sentinel for a split that violates a constraint.
    pub fn invalid() -> Self {
        Self {
            gain: f64::NEG_INFINITY,
            impurity: 0.0,
            left_impurity: 0.0,
            right_impurity: 0.0,
            left_count: 0.0,
            right_count: 0.0,
            left_predict: Predict::default(),
            right_predict: Predict::default(),
        }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.gain > f64::NEG_INFINITY
    }
}

/// Prediction of one side of a split.
#[inline]
pub fn calculate_predict(calc: &ImpurityCalculator) -> Predict {
    let predict = calc.predict();
    Predict::new(predict, calc.prob(predict))
}

/// Gain of splitting a node into `left` and `right`.
pub fn calculate_gain_for_split(
    left: &ImpurityCalculator,
    right: &ImpurityCalculator,
    metadata: &Metadata,
) -> InformationGainStats {
    let left_count = left.count();
    let right_count = right.count();
    let min_instances = metadata.min_instances_per_node as f64;
    if left_count < min_instances || right_count < min_instances {
        return InformationGainStats::invalid();
    }
    let total_count = left_count + right_count;
    if total_count <= 0.0 {
        return InformationGainStats::invalid();
    }

    let mut parent = left.clone();
    parent.add(right);
    let impurity = parent.calculate();
    let left_impurity = left.calculate();
    let right_impurity = right.calculate();

    let gain = impurity
        - left_count / total_count * left_impurity
        - right_count / total_count * right_impurity;
    if gain < metadata.min_info_gain {
        return InformationGainStats::invalid();
    }

    InformationGainStats {
        gain,
        impurity,
        left_impurity,
        right_impurity,
        left_count,
        right_count,
        left_predict: calculate_predict(left),
        right_predict: calculate_predict(right),
    }
}
