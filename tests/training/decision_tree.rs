//! Single-tree growth, split statistics and input validation.

use std::collections::HashMap;

use arbor::config::{Algo, FeatureSubsetStrategy, Strategy};
use arbor::error::TrainError;
use arbor::training::Metadata;
use arbor::tree::SplitRule;
use arbor::{assert_approx_eq, DecisionTree, Impurity, QuantileStrategy};
use proptest::prelude::{prop, prop_assert, prop_assert_eq, proptest, ProptestConfig};
use rstest::rstest;

use crate::common::{all_nodes, dataset, path_counts};

fn two_value_rows() -> Vec<(f64, Vec<f64>)> {
    (0..10).map(|i| ((i % 2) as f64, vec![(i % 2) as f64])).collect()
}

#[test_log::test]
fn pure_split_yields_depth_one_tree() {
    let input = dataset(two_value_rows(), 3);
    let strategy = Strategy::builder().max_bins(2).build().unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    let root = model.root();
    assert_eq!(model.depth(), 1);
    assert_eq!(model.num_nodes(), 3);

    let split = root.split().unwrap();
    assert_eq!(split.feature, 0);
    assert_eq!(split.rule, SplitRule::Continuous { threshold: 0.5 });

    let stats = root.stats().unwrap();
    assert_approx_eq!(stats.impurity, 0.5);
    assert_approx_eq!(stats.gain, stats.impurity);
    assert_approx_eq!(stats.left_impurity, 0.0);
    assert_approx_eq!(stats.right_impurity, 0.0);

    let (left, right) = (root.left().unwrap(), root.right().unwrap());
    assert!(left.is_leaf() && right.is_leaf());
    assert_eq!(left.predict().unwrap().predict, 0.0);
    assert_eq!(right.predict().unwrap().predict, 1.0);
    assert_eq!(right.predict().unwrap().prob, Some(1.0));
    assert_eq!(model.predict(&[0.0]), 0.0);
    assert_eq!(model.predict(&[1.0]), 1.0);
}

#[rstest]
#[case::stump(0)]
#[case::one_level(1)]
#[case::two_levels(2)]
fn nodes_at_max_depth_are_leaves(#[case] max_depth: u32) {
    // label alternates every 4 values: never pure before depth 3
    let rows = (0..64).map(|i| (((i / 4) % 2) as f64, vec![i as f64])).collect();
    let input = dataset(rows, 4);
    let strategy = Strategy::builder().max_depth(max_depth).build().unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    assert!(model.depth() <= max_depth);
    for node in all_nodes(model.root()) {
        if node.level() == max_depth {
            assert!(node.is_leaf(), "node {} at max depth is not a leaf", node.id());
        }
        assert!(!node.is_pending());
    }
}

#[test]
fn max_depth_zero_keeps_gain_on_root_leaf() {
    let input = dataset(two_value_rows(), 1);
    let strategy = Strategy::builder().max_depth(0).max_bins(2).build().unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    let root = model.root();
    assert!(root.is_leaf());
    assert_approx_eq!(root.stats().unwrap().gain, 0.5);
    // tie between the two classes goes to the lowest one
    assert_eq!(root.predict().unwrap().predict, 0.0);
}

#[test]
fn regression_splits_on_step() {
    // thresholds fall between every pair of values: 64 points, 32 bins
    let rows = (0..64).map(|i| (if i < 32 { 1.0 } else { 5.0 }, vec![i as f64])).collect();
    let input = dataset(rows, 2);
    let strategy = Strategy::builder().algo(Algo::Regression).build().unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    let root = model.root();
    assert_eq!(root.split().and_then(|s| s.threshold()), Some(31.5));
    assert_approx_eq!(root.impurity().unwrap(), 4.0);
    assert_eq!(model.depth(), 1);
    assert_approx_eq!(model.predict(&[3.0]), 1.0);
    assert_approx_eq!(model.predict(&[40.0]), 5.0);
}

#[test]
fn min_instances_blocks_small_children() {
    let rows = (0..20).map(|i| (if i == 0 { 1.0 } else { 0.0 }, vec![i as f64])).collect();
    let input = dataset(rows, 2);
    let strategy = Strategy::builder().min_instances_per_node(2).build().unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    for node in all_nodes(model.root()) {
        if let Some(stats) = node.split().and(node.stats()) {
            assert!(stats.left_count >= 2.0 && stats.right_count >= 2.0);
        }
    }
}

#[test]
fn entropy_impurity_is_used_when_requested() {
    let input = dataset(two_value_rows(), 2);
    let strategy = Strategy::builder().max_bins(2).impurity(Impurity::Entropy).build().unwrap();
    let model = DecisionTree::train(&input, &strategy).unwrap();
    assert_approx_eq!(model.root().stats().unwrap().gain, 1.0);
}

#[rstest]
#[case::min_max(QuantileStrategy::MinMax)]
#[case::approx_hist(QuantileStrategy::ApproxHist)]
fn unsupported_quantile_strategy_fails_fast(#[case] quantile_strategy: QuantileStrategy) {
    let input = dataset(two_value_rows(), 1);
    let strategy = Strategy::builder().quantile_strategy(quantile_strategy).build().unwrap();
    let result = DecisionTree::train(&input, &strategy);
    assert!(matches!(result, Err(TrainError::UnsupportedQuantileStrategy(q)) if q == quantile_strategy));
}

#[test]
fn invalid_inputs_are_rejected() {
    let strategy = Strategy::default();

    let empty = dataset(Vec::new(), 2);
    assert!(matches!(DecisionTree::train(&empty, &strategy), Err(TrainError::EmptyInput)));

    let ragged = dataset(vec![(0.0, vec![1.0, 2.0]), (1.0, vec![1.0])], 1);
    assert!(matches!(
        DecisionTree::train(&ragged, &strategy),
        Err(TrainError::FeatureCountMismatch { expected: 2, found: 1 })
    ));

    let bad_label = dataset(vec![(0.0, vec![1.0]), (2.0, vec![2.0])], 1);
    assert!(matches!(
        DecisionTree::train(&bad_label, &strategy),
        Err(TrainError::InvalidLabel { num_classes: 2, .. })
    ));
}

#[test]
fn memory_budget_below_one_node_is_rejected() {
    let rows = (0..2000)
        .map(|i| ((i % 2) as f64, (0..50).map(|f| ((i * (f + 1)) % 997) as f64).collect()))
        .collect();
    let input = dataset(rows, 4);
    // 50 features x 1000 bins x 3 classes x 8 bytes = 1.2 MB per node, above 1 MiB
    let strategy = Strategy::builder()
        .num_classes(3)
        .max_bins(1000)
        .max_memory_in_mb(1)
        .build()
        .unwrap();
    let result = DecisionTree::train(&input, &strategy);
    assert!(matches!(
        result,
        Err(TrainError::MemoryBudgetTooSmall { budget_mb: 1, required_bytes: 1_200_000 })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn split_counts_match_routed_points(
        rows in prop::collection::vec(
            (0u8..3, prop::collection::vec(0u8..12, 3), 0u8..3, 0u8..5),
            8..80,
        ),
        max_depth in 1u32..5,
    ) {
        // features 0..3 continuous, 3 unordered (arity 3), 4 ordered (arity 5)
        let rows: Vec<(f64, Vec<f64>)> = rows
            .into_iter()
            .map(|(label, continuous, unordered, ordered)| {
                let mut features: Vec<f64> = continuous.into_iter().map(f64::from).collect();
                features.extend([f64::from(unordered), f64::from(ordered)]);
                (label as f64, features)
            })
            .collect();
        let input = dataset(rows, 3);
        let strategy = Strategy::builder()
            .num_classes(3)
            .max_bins(8)
            .max_depth(max_depth)
            .categorical_features_info(HashMap::from([(3, 3), (4, 5)]))
            .n_threads(1)
            .build()
            .unwrap();
        let metadata = Metadata::build(&input, &strategy, 1, FeatureSubsetStrategy::All).unwrap();
        prop_assert!(metadata.is_unordered(3));
        prop_assert!(metadata.is_categorical(4) && !metadata.is_unordered(4));

        let model = DecisionTree::train(&input, &strategy).unwrap();
        let counts = path_counts(model.root(), &input);
        prop_assert_eq!(counts[&1], input.count());
        for node in all_nodes(model.root()) {
            let (Some(stats), Some(left)) = (node.split().and(node.stats()), node.left()) else {
                continue;
            };
            let total = counts[&node.id()] as f64;
            prop_assert_eq!(stats.left_count + stats.right_count, total);
            prop_assert_eq!(stats.left_count, counts.get(&left.id()).copied().unwrap_or(0) as f64);
        }
    }
}
