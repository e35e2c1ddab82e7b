//! Forests grown jointly from bootstrap samples.

use arbor::config::{Algo, FeatureSubsetStrategy, Strategy};
use arbor::training::Metadata;
use arbor::{assert_approx_eq, DecisionTree, RandomForest};
use rstest::rstest;

use crate::common::{all_nodes, dataset};

/// y = 0 below 32, 10 from 32 on; 64 points and 32 bins put a threshold at 31.5.
fn step_rows() -> Vec<(f64, Vec<f64>)> {
    (0..64).map(|i| (if i < 32 { 0.0 } else { 10.0 }, vec![i as f64])).collect()
}

#[test_log::test]
fn regression_forest_averages_pure_stumps() {
    let input = dataset(step_rows(), 4);
    let strategy = Strategy::builder().algo(Algo::Regression).seed(11).build().unwrap();

    let forest = RandomForest::train(&input, &strategy, 6, FeatureSubsetStrategy::All).unwrap();
    assert_eq!(forest.num_trees(), 6);
    for tree in forest.trees() {
        // zero bootstrap weights near the step may move the threshold down a bin
        assert_eq!(tree.depth(), 1);
        let threshold = tree.root().split().and_then(|s| s.threshold()).unwrap();
        assert!(threshold <= 31.5);
    }
    assert_approx_eq!(forest.predict(&[5.0]), 0.0);
    assert_approx_eq!(forest.predict(&[50.0]), 10.0);
}

#[rstest]
#[case::auto(FeatureSubsetStrategy::Auto)]
#[case::sqrt(FeatureSubsetStrategy::Sqrt)]
#[case::log2(FeatureSubsetStrategy::Log2)]
#[case::one_third(FeatureSubsetStrategy::OneThird)]
fn classification_forest_with_feature_subsets(#[case] subset: FeatureSubsetStrategy) {
    // feature 0 decides the label; features 1..6 are noise
    let rows = (0..120)
        .map(|i| {
            let x = (i % 12) as f64;
            let noise = (1..6).map(|f| ((i * 7 + f * 13) % 11) as f64);
            ((x >= 6.0) as u8 as f64, std::iter::once(x).chain(noise).collect::<Vec<f64>>())
        })
        .collect();
    let input = dataset(rows, 5);
    let strategy = Strategy::builder().max_depth(4).seed(3).build().unwrap();

    let forest = RandomForest::train(&input, &strategy, 8, subset).unwrap();
    assert_eq!(forest.num_trees(), 8);
    assert_eq!(forest.algo(), Algo::Classification);
    for tree in forest.trees() {
        assert!(tree.depth() <= 4);
        for node in all_nodes(tree.root()) {
            assert!(!node.is_pending());
            let predict = node.predict().unwrap().predict;
            assert!(predict == 0.0 || predict == 1.0);
        }
    }
    let prediction = forest.predict(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    assert!(prediction == 0.0 || prediction == 1.0);
}

#[test]
fn forest_output_does_not_depend_on_thread_count() {
    let input = dataset(step_rows(), 4);
    let sequential =
        Strategy::builder().algo(Algo::Regression).seed(5).n_threads(1).build().unwrap();
    let parallel =
        Strategy::builder().algo(Algo::Regression).seed(5).n_threads(3).build().unwrap();

    let a = RandomForest::train(&input, &sequential, 4, FeatureSubsetStrategy::All).unwrap();
    let b = RandomForest::train(&input, &parallel, 4, FeatureSubsetStrategy::All).unwrap();
    assert_eq!(a, b);
}

#[test]
fn twenty_trees_grow_together_under_one_budget() {
    let input = dataset(step_rows(), 2);
    // one node needs 32 bins x 3 stats x 8 bytes = 768 bytes; 1 MiB holds all
    let strategy = Strategy::builder()
        .algo(Algo::Regression)
        .max_memory_in_mb(1)
        .seed(9)
        .build()
        .unwrap();
    let forest = RandomForest::train(&input, &strategy, 20, FeatureSubsetStrategy::All).unwrap();
    assert_eq!(forest.num_trees(), 20);
    assert!(forest.trees().iter().all(|t| !t.root().has_pending()));
    assert_eq!(forest.predict(&[1.0]), 0.0);
}

/// 1200 rows of 40 spread-out features; the label needs two features.
fn wide_rows() -> Vec<(f64, Vec<f64>)> {
    (0..1200)
        .map(|i| {
            let features: Vec<f64> =
                (0..40).map(|f| ((i * (2 * f + 1) + f * 31) % 1000) as f64).collect();
            let label = (features[0] >= 300.0 && features[1] < 700.0) as u8 as f64;
            (label, features)
        })
        .collect()
}

#[test]
fn one_node_per_pass_grows_the_same_trees() {
    let input = dataset(wide_rows(), 4);
    let tight = Strategy::builder().max_bins(1000).max_memory_in_mb(1).seed(13).build().unwrap();
    let loose = Strategy::builder().max_bins(1000).max_memory_in_mb(256).seed(13).build().unwrap();

    // 40 features x 1000 bins x 2 classes x 8 bytes: one node fits, two do not
    let metadata = Metadata::build(&input, &tight, 1, FeatureSubsetStrategy::All).unwrap();
    let node_bytes = metadata.max_node_histogram_bytes();
    assert_eq!(node_bytes, 640_000);
    assert!(node_bytes <= tight.max_memory_bytes());
    assert!(2 * node_bytes > tight.max_memory_bytes());

    let tree = DecisionTree::train(&input, &tight).unwrap();
    // below the root every level holds several nodes, each aggregated alone
    assert!(tree.depth() >= 2, "depth {}", tree.depth());
    assert!(!tree.root().has_pending());
    assert_eq!(tree, DecisionTree::train(&input, &loose).unwrap());

    let forest = RandomForest::train(&input, &tight, 3, FeatureSubsetStrategy::All).unwrap();
    assert!(forest.trees().iter().all(|t| !t.root().has_pending()));
    assert_eq!(forest, RandomForest::train(&input, &loose, 3, FeatureSubsetStrategy::All).unwrap());
}
