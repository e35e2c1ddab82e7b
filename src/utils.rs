//! Common utilities used across the crate.
//!
//! Parallelism configuration and the tree-shaped reduction used to merge
//! per-partition results.

use rayon::prelude::*;

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// This is a simple flag passed through training components. When
/// `Parallel`, components may use `rayon` parallel iterators; when
/// `Sequential`, they must iterate sequentially.
///
/// The thread pool itself is set up once per training run by
/// [`run_with_threads`]. Components don't manage thread pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }

    /// Map preserving input order.
    #[inline]
    pub fn maybe_par_map<T, B, I, F>(self, iter: I, f: F) -> Vec<B>
    where
        T: Send,
        B: Send,
        I: IntoIterator<Item = T> + IntoParallelIterator<Item = T>,
        F: Fn(T) -> B + Sync + Send,
    {
        if self.is_parallel() {
            iter.into_par_iter().map(f).collect()
        } else {
            iter.into_iter().map(f).collect()
        }
    }
}

// =============================================================================
// Thread Pool Setup
// =============================================================================

/// Run a closure with the appropriate thread pool.
///
/// Thread count semantics:
/// - `0` = auto (use the global pool)
/// - `1` = sequential (no thread pool)
/// - `n > 1` = use exactly `n` threads
///
/// If a dedicated pool cannot be created the closure runs on the global pool.
#[inline]
pub fn run_with_threads<T: Send>(n_threads: usize, f: impl FnOnce(Parallelism) -> T + Send) -> T {
    let parallelism = Parallelism::from_threads(n_threads);

    match parallelism {
        Parallelism::Sequential => f(Parallelism::Sequential),
        Parallelism::Parallel if n_threads == 0 => f(Parallelism::Parallel),
        Parallelism::Parallel => {
            match rayon::ThreadPoolBuilder::new().num_threads(n_threads).build() {
                Ok(pool) => pool.install(|| f(Parallelism::Parallel)),
                Err(err) => {
                    log::warn!("could not build a {n_threads}-thread pool ({err}); using the global pool");
                    f(Parallelism::Parallel)
                }
            }
        }
    }
}

// =============================================================================
// Reduction
// =============================================================================

/// Reduce `items` by combining neighbours pairwise, level by level.
///
/// With an associative `combine` the result equals a left fold, but the
/// combine depth is `ceil(log2(n))` and each level runs under `parallelism`.
/// Returns `None` for an empty input.
pub fn tree_reduce<A, F>(parallelism: Parallelism, items: Vec<A>, combine: F) -> Option<A>
where
    A: Send,
    F: Fn(A, A) -> A + Sync + Send,
{
    let mut level = items;
    while level.len() > 1 {
        let mut pairs = Vec::with_capacity(level.len().div_ceil(2));
        let mut it = level.into_iter();
        while let Some(a) = it.next() {
            pairs.push((a, it.next()));
        }
        level = parallelism.maybe_par_map(pairs, |(a, b)| match b {
            Some(b) => combine(a, b),
            None => a,
        });
    }
    level.pop()
}

// =============================================================================
// Seeding
// =============================================================================

/// Random consumers of a training run. Each draws from its own stream so
/// that per-partition offsets of one never replay another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeedStream {
    /// Example sample for continuous thresholds.
    ThresholdSample,
    /// Bootstrap weights.
    Bagging,
    /// Per-node feature subsets.
    FeatureSubsets,
}

impl SeedStream {
    /// Base seed of this stream for `run_seed`. Partition `i` adds `i`.
    #[inline]
    pub fn seed(self, run_seed: u64) -> u64 {
        let tag = match self {
            SeedStream::ThresholdSample => 1,
            SeedStream::Bagging => 2,
            SeedStream::FeatureSubsets => 3,
        };
        splitmix64(run_seed ^ splitmix64(tag))
    }
}

/// SplitMix64 finalizer.
#[inline]
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
