//! Training entry points.
//!
//! [`DecisionTree`] grows one tree on the full data; [`RandomForest`] grows
//! many trees on bootstrap samples with per-node feature subsets. Both share
//! the same pipeline:
//!
//! 1. derive [`Metadata`] from the data and the strategy
//! 2. build the split/bin catalog from a data sample
//! 3. bin every point and attach per-tree bootstrap weights
//! 4. grow all trees together, breadth first, under the memory budget

use log::{debug, info};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use super::catalog::SplitBinCatalog;
use super::metadata::Metadata;
use super::scheduler::GrowthScheduler;
use super::timing::TimeTracker;
use crate::config::{ConfigError, FeatureSubsetStrategy, Strategy};
use crate::data::{convert_to_tree_points, BaggedPoint, LabeledPoint, PartitionedDataset};
use crate::error::{Result, TrainError};
use crate::tree::{DecisionTreeModel, RandomForestModel};
use crate::utils::{run_with_threads, Parallelism, SeedStream};

/// Single decision tree trainer.
///
/// # Example
///
/// ```
/// use arbor::config::Strategy;
/// use arbor::data::{LabeledPoint, PartitionedDataset};
/// use arbor::training::DecisionTree;
///
/// let points = (0..20)
///     .map(|i| LabeledPoint::new((i >= 10) as u8 as f64, vec![i as f64]))
///     .collect();
/// let input = PartitionedDataset::from_vec(points, 2);
/// let strategy = Strategy::builder().max_depth(2).build().unwrap();
///
/// let model = DecisionTree::train(&input, &strategy).unwrap();
/// assert_eq!(model.predict(&[3.0]), 0.0);
/// assert_eq!(model.predict(&[15.0]), 1.0);
/// ```
pub struct DecisionTree;

impl DecisionTree {
    /// Grow one tree on all of `input`.
    pub fn train(
        input: &PartitionedDataset<LabeledPoint>,
        strategy: &Strategy,
    ) -> Result<DecisionTreeModel> {
        let forest = RandomForest::train(input, strategy, 1, FeatureSubsetStrategy::All)?;
        forest
            .into_trees()
            .into_iter()
            .next()
            .ok_or_else(|| TrainError::Internal("forest of one tree came back empty".into()))
    }
}

/// Random forest trainer.
pub struct RandomForest;

impl RandomForest {
    /// Grow `num_trees` trees.
    ///
    /// With more than one tree every tree sees a Poisson bootstrap sample of
    /// the data and every node a random subset of the features, sized by
    /// `feature_subset_strategy`.
    ///
    /// # Errors
    ///
    /// Configuration errors, invalid data (labels, categories, ragged rows)
    /// or a memory budget that cannot hold one node's histogram.
    pub fn train(
        input: &PartitionedDataset<LabeledPoint>,
        strategy: &Strategy,
        num_trees: usize,
        feature_subset_strategy: FeatureSubsetStrategy,
    ) -> Result<RandomForestModel> {
        strategy.validate()?;
        if num_trees == 0 {
            return Err(ConfigError::InvalidNumTrees(num_trees).into());
        }
        run_with_threads(strategy.n_threads, |parallelism| {
            train_in_pool(input, strategy, num_trees, feature_subset_strategy, parallelism)
        })
    }
}

fn train_in_pool(
    input: &PartitionedDataset<LabeledPoint>,
    strategy: &Strategy,
    num_trees: usize,
    feature_subset_strategy: FeatureSubsetStrategy,
    parallelism: Parallelism,
) -> Result<RandomForestModel> {
    let mut timer = TimeTracker::new();
    timer.start("total");

    timer.start("init");
    let metadata = Metadata::build(input, strategy, num_trees, feature_subset_strategy)?;

    timer.start("find_splits_bins");
    let catalog = SplitBinCatalog::find_splits_bins(
        input,
        &metadata,
        SeedStream::ThresholdSample.seed(strategy.seed),
        parallelism,
    )?;
    timer.stop("find_splits_bins");

    let tree_points = convert_to_tree_points(input, &catalog, &metadata, parallelism)?;
    let with_replacement = num_trees > 1;
    let bagged = BaggedPoint::convert(
        &tree_points,
        strategy.subsampling_rate,
        num_trees,
        with_replacement,
        SeedStream::Bagging.seed(strategy.seed),
        parallelism,
    )?;
    timer.stop("init");
    debug!(
        "bagged {} points for {num_trees} trees (with replacement: {with_replacement})",
        bagged.count()
    );

    let rng = Xoshiro256PlusPlus::seed_from_u64(SeedStream::FeatureSubsets.seed(strategy.seed));
    let mut scheduler =
        GrowthScheduler::new(&metadata, &catalog, strategy.max_memory_bytes(), parallelism, rng)?;
    let roots = scheduler.grow(&bagged, num_trees, &mut timer)?;

    let trees = roots
        .into_iter()
        .map(|root| DecisionTreeModel::new(root, strategy.algo))
        .collect::<Result<Vec<_>>>()?;
    timer.stop("total");

    info!("training finished\n{timer}");
    Ok(RandomForestModel::new(trees, strategy.algo))
}
