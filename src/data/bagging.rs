//! Bootstrap weights for growing several trees from one data pass.
//!
//! Each datum carries one weight per tree. A weight of 0 removes the datum
//! from that tree's sample; larger weights count it several times.

use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Poisson};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use crate::data::PartitionedDataset;
use crate::error::{Result, TrainError};
use crate::utils::Parallelism;

/// A datum with one subsample weight per tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaggedPoint<T> {
    pub datum: T,
    pub subsample_weights: Vec<f64>,
}

impl<T> BaggedPoint<T> {
    #[inline]
    pub fn new(datum: T, subsample_weights: Vec<f64>) -> Self {
        Self { datum, subsample_weights }
    }
}

impl<T: Clone + Send + Sync> BaggedPoint<T> {
    /// Attach `num_subsamples` weights to every datum.
    ///
    /// - with replacement: `Poisson(rate)` counts
    /// - without replacement: `Bernoulli(rate)` 0/1 weights
    /// - `rate == 1` without replacement: all ones, no random draws
    ///
    /// Partition `i` is seeded with `seed + i`.
    pub fn convert(
        input: &PartitionedDataset<T>,
        subsampling_rate: f64,
        num_subsamples: usize,
        with_replacement: bool,
        seed: u64,
        parallelism: Parallelism,
    ) -> Result<PartitionedDataset<Self>> {
        if !with_replacement && subsampling_rate >= 1.0 {
            return Ok(input.map_partitions(parallelism, |_, part| {
                part.iter()
                    .map(|d| BaggedPoint::new(d.clone(), vec![1.0; num_subsamples]))
                    .collect()
            }));
        }

        if with_replacement {
            let poisson = Poisson::new(subsampling_rate)
                .map_err(|e| TrainError::Internal(format!("poisson({subsampling_rate}): {e}")))?;
            Ok(input.map_partitions(parallelism, |i, part| {
                let mut rng = partition_rng(seed, i);
                part.iter()
                    .map(|d| {
                        let weights = (0..num_subsamples).map(|_| poisson.sample(&mut rng)).collect();
                        BaggedPoint::new(d.clone(), weights)
                    })
                    .collect()
            }))
        } else {
            Ok(input.map_partitions(parallelism, |i, part| {
                let mut rng = partition_rng(seed, i);
                part.iter()
                    .map(|d| {
                        let weights = (0..num_subsamples)
                            .map(|_| if rng.gen::<f64>() < subsampling_rate { 1.0 } else { 0.0 })
                            .collect();
                        BaggedPoint::new(d.clone(), weights)
                    })
                    .collect()
            }))
        }
    }
}

#[inline]
fn partition_rng(seed: u64, partition: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(partition as u64))
}
