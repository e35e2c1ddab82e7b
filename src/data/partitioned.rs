//! In-process partitioned collection.
//!
//! [`PartitionedDataset`] is the data-parallel substrate of training: a list
//! of partitions that are processed independently and merged with an
//! associative combine. Every per-partition operation runs under a
//! [`Parallelism`] hint, one task per partition.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::utils::{tree_reduce, Parallelism};

/// Items split into independent partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionedDataset<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> PartitionedDataset<T> {
    /// Wrap pre-built partitions.
    pub fn from_partitions(partitions: Vec<Vec<T>>) -> Self {
        Self { partitions }
    }

    /// Split `items` into `num_partitions` contiguous partitions of near-equal size.
    ///
    /// `num_partitions` is clamped to `[1, items.len()]` (one empty partition
    /// for an empty input).
    pub fn from_vec(items: Vec<T>, num_partitions: usize) -> Self {
        let n = items.len();
        let num_partitions = num_partitions.clamp(1, n.max(1));
        let base = n / num_partitions;
        let extra = n % num_partitions;

        let mut partitions = Vec::with_capacity(num_partitions);
        let mut it = items.into_iter();
        for p in 0..num_partitions {
            let size = base + usize::from(p < extra);
            partitions.push(it.by_ref().take(size).collect());
        }
        Self { partitions }
    }

    #[inline]
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    #[inline]
    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    /// Total number of items.
    pub fn count(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Iterate all items in partition order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }

    /// Unwrap into the flat item list.
    pub fn into_vec(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }
}

impl<T: Sync> PartitionedDataset<T> {
    /// Transform every partition; `f` receives the partition index.
    pub fn map_partitions<U, F>(&self, parallelism: Parallelism, f: F) -> PartitionedDataset<U>
    where
        U: Send,
        F: Fn(usize, &[T]) -> Vec<U> + Sync + Send,
    {
        let partitions = parallelism.maybe_par_map(self.indexed(), |(i, part)| f(i, part));
        PartitionedDataset { partitions }
    }

    /// Fallible [`map_partitions`](Self::map_partitions); the first error wins.
    pub fn try_map_partitions<U, E, F>(
        &self,
        parallelism: Parallelism,
        f: F,
    ) -> Result<PartitionedDataset<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(usize, &[T]) -> Result<Vec<U>, E> + Sync + Send,
    {
        let partitions = parallelism
            .maybe_par_map(self.indexed(), |(i, part)| f(i, part))
            .into_iter()
            .collect::<Result<Vec<_>, E>>()?;
        Ok(PartitionedDataset { partitions })
    }

    /// Fold every partition into its own accumulator created by `zero`, then
    /// merge the accumulators with a pairwise tree reduction.
    ///
    /// `comb_op` must be associative. The result for an empty dataset is `zero()`.
    pub fn fold<A, Z, S, C>(&self, parallelism: Parallelism, zero: Z, seq_op: S, comb_op: C) -> A
    where
        A: Send,
        Z: Fn() -> A + Sync + Send,
        S: Fn(A, &T) -> A + Sync + Send,
        C: Fn(A, A) -> A + Sync + Send,
    {
        let partials = parallelism.maybe_par_map(self.indexed(), |(_, part)| {
            part.iter().fold(zero(), &seq_op)
        });
        tree_reduce(parallelism, partials, comb_op).unwrap_or_else(zero)
    }

    fn indexed(&self) -> Vec<(usize, &[T])> {
        self.partitions.iter().map(Vec::as_slice).enumerate().collect()
    }
}

impl<T: Clone + Send + Sync> PartitionedDataset<T> {
    /// Bernoulli sample without replacement: each item is kept with
    /// probability `fraction`.
    ///
    /// Partition `i` draws from a generator seeded with `seed + i`, so the
    /// sample does not depend on thread scheduling.
    pub fn sample(&self, parallelism: Parallelism, fraction: f64, seed: u64) -> Vec<T> {
        if fraction >= 1.0 {
            return self.iter().cloned().collect();
        }
        let sampled = self.map_partitions(parallelism, |i, part| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(i as u64));
            part.iter().filter(|_| rng.gen::<f64>() < fraction).cloned().collect()
        });
        sampled.into_vec()
    }
}
