//! Impurity measures and their sufficient statistics.
//!
//! Every histogram slot holds a small statistics vector from which impurity
//! and a point prediction can be computed without revisiting examples:
//!
//! - Gini / Entropy: one weighted count per class (`num_classes` values)
//! - Variance: `[count, sum, sum_of_squares]` (3 values)
//!
//! Statistics are additive: the vector of a union of disjoint example sets is
//! the element-wise sum of their vectors.

use serde::{Deserialize, Serialize};

/// Impurity criterion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Impurity {
    /// `1 - Σ p_i²` (classification).
    Gini,
    /// `-Σ p_i log2 p_i` (classification).
    Entropy,
    /// Label variance (regression).
    Variance,
}

impl Impurity {
    /// Length of one statistics vector.
    #[inline]
    pub fn stats_size(self, num_classes: usize) -> usize {
        match self {
            Impurity::Gini | Impurity::Entropy => num_classes,
            Impurity::Variance => 3,
        }
    }

    /// Add one weighted observation to the statistics vector starting at `offset`.
    #[inline]
    pub fn update(self, all_stats: &mut [f64], offset: usize, label: f64, weight: f64) {
        match self {
            Impurity::Gini | Impurity::Entropy => {
                all_stats[offset + label as usize] += weight;
            }
            Impurity::Variance => {
                all_stats[offset] += weight;
                all_stats[offset + 1] += weight * label;
                all_stats[offset + 2] += weight * label * label;
            }
        }
    }

    /// Impurity of a statistics vector.
    pub fn calculate(self, stats: &[f64]) -> f64 {
        match self {
            Impurity::Gini => {
                let total: f64 = stats.iter().sum();
                if total == 0.0 {
                    return 0.0;
                }
                1.0 - stats.iter().map(|&c| (c / total) * (c / total)).sum::<f64>()
            }
            Impurity::Entropy => {
                let total: f64 = stats.iter().sum();
                if total == 0.0 {
                    return 0.0;
                }
                stats
                    .iter()
                    .filter(|&&c| c > 0.0)
                    .map(|&c| {
                        let p = c / total;
                        -p * p.log2()
                    })
                    .sum()
            }
            Impurity::Variance => {
                let count = stats[0];
                if count == 0.0 {
                    return 0.0;
                }
                let mean = stats[1] / count;
                (stats[2] / count - mean * mean).max(0.0)
            }
        }
    }

    /// Copy the statistics vector at `offset` into a standalone calculator.
    #[inline]
    pub fn calculator(self, all_stats: &[f64], offset: usize, stats_size: usize) -> ImpurityCalculator {
        ImpurityCalculator {
            impurity: self,
            stats: all_stats[offset..offset + stats_size].to_vec(),
        }
    }
}

// =============================================================================
// ImpurityCalculator
// =============================================================================

/// Owned copy of one statistics vector.
#[derive(Clone, Debug, PartialEq)]
pub struct ImpurityCalculator {
    impurity: Impurity,
    stats: Vec<f64>,
}

impl ImpurityCalculator {
    /// Calculator with all statistics zeroed.
    pub fn zeros(impurity: Impurity, stats_size: usize) -> Self {
        Self { impurity, stats: vec![0.0; stats_size] }
    }

    /// Calculator over an explicit statistics vector.
    pub fn from_stats(impurity: Impurity, stats: Vec<f64>) -> Self {
        Self { impurity, stats }
    }

    #[inline]
    pub fn stats(&self) -> &[f64] {
        &self.stats
    }

    /// Add the statistics of a disjoint example set.
    pub fn add(&mut self, other: &ImpurityCalculator) -> &mut Self {
        debug_assert_eq!(self.stats.len(), other.stats.len());
        for (a, b) in self.stats.iter_mut().zip(&other.stats) {
            *a += b;
        }
        self
    }

    /// Remove the statistics of a subset.
    pub fn subtract(&mut self, other: &ImpurityCalculator) -> &mut Self {
        debug_assert_eq!(self.stats.len(), other.stats.len());
        for (a, b) in self.stats.iter_mut().zip(&other.stats) {
            *a -= b;
        }
        self
    }

    /// Weighted number of examples.
    #[inline]
    pub fn count(&self) -> f64 {
        match self.impurity {
            Impurity::Gini | Impurity::Entropy => self.stats.iter().sum(),
            Impurity::Variance => self.stats[0],
        }
    }

    /// Impurity of these statistics.
    #[inline]
    pub fn calculate(&self) -> f64 {
        self.impurity.calculate(&self.stats)
    }

    /// Point prediction: majority class (lowest index on ties) or mean label.
    pub fn predict(&self) -> f64 {
        match self.impurity {
            Impurity::Gini | Impurity::Entropy => {
                let mut best = 0;
                for (class, &c) in self.stats.iter().enumerate() {
                    if c > self.stats[best] {
                        best = class;
                    }
                }
                best as f64
            }
            Impurity::Variance => {
                let count = self.stats[0];
                if count == 0.0 {
                    0.0
                } else {
                    self.stats[1] / count
                }
            }
        }
    }

    /// Probability of `label` (classification only).
    pub fn prob(&self, label: f64) -> Option<f64> {
        match self.impurity {
            Impurity::Gini | Impurity::Entropy => {
                let total = self.count();
                let count = self.stats.get(label as usize).copied()?;
                Some(if total == 0.0 { 0.0 } else { count / total })
            }
            Impurity::Variance => None,
        }
    }

    /// Un-thresholded prediction used to order categories.
    ///
    /// Fraction of class 1 for binary classification, mean label for
    /// regression. Multiclass ordering uses [`calculate`](Self::calculate) instead.
    pub fn raw_prediction(&self) -> f64 {
        match self.impurity {
            Impurity::Gini | Impurity::Entropy => self.prob(1.0).unwrap_or(0.0),
            Impurity::Variance => self.predict(),
        }
    }

    /// Ordering key of a category: impurity for multiclass problems,
    /// [`raw_prediction`](Self::raw_prediction) otherwise, `f64::MAX` when
    /// the category holds no examples.
    pub fn centroid(&self, multiclass: bool) -> f64 {
        if self.count() == 0.0 {
            f64::MAX
        } else if multiclass {
            self.calculate()
        } else {
            self.raw_prediction()
        }
    }
}
