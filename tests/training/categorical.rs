//! Ordered and unordered categorical features.

use std::collections::HashMap;

use arbor::config::{Algo, FeatureSubsetStrategy, Strategy};
use arbor::error::TrainError;
use arbor::training::{extract_multiclass_categories, Metadata, SplitBinCatalog};
use arbor::tree::{CatBitset, SplitRule};
use arbor::utils::Parallelism;
use arbor::{assert_approx_eq, DecisionTree, DecisionTreeModel, RandomForest, RandomForestModel};

use crate::common::dataset;

fn left_categories(rule: &SplitRule) -> Vec<u32> {
    match rule {
        SplitRule::Categorical { left_categories } => left_categories.iter().collect(),
        SplitRule::Continuous { .. } => panic!("expected a categorical split, got {rule:?}"),
    }
}

#[test]
fn ordered_categories_are_sorted_by_class_one_fraction() {
    // categories 0 and 2 are always class 1, category 1 always class 0
    let rows = (0..9)
        .map(|i| {
            let category = i % 3;
            (if category == 1 { 0.0 } else { 1.0 }, vec![category as f64])
        })
        .collect();
    let input = dataset(rows, 2);
    let strategy = Strategy::builder()
        .categorical_features_info(HashMap::from([(0, 3)]))
        .build()
        .unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    let root = model.root();
    assert_eq!(model.depth(), 1);
    assert_eq!(left_categories(&root.split().unwrap().rule), vec![1]);
    assert_approx_eq!(root.stats().unwrap().gain, 4.0 / 9.0);

    assert_eq!(model.predict(&[0.0]), 1.0);
    assert_eq!(model.predict(&[1.0]), 0.0);
    assert_eq!(model.predict(&[2.0]), 1.0);
}

#[test]
fn ordered_regression_groups_low_means_left() {
    // category means: 0 -> 10, 1 -> 0, 2 -> 1, 3 -> 11
    let means = [10.0, 0.0, 1.0, 11.0];
    let rows = (0..16).map(|i| (means[i % 4], vec![(i % 4) as f64])).collect();
    let input = dataset(rows, 3);
    let strategy = Strategy::builder()
        .algo(Algo::Regression)
        .max_depth(1)
        .categorical_features_info(HashMap::from([(0, 4)]))
        .build()
        .unwrap();

    let model = DecisionTree::train(&input, &strategy).unwrap();
    assert_eq!(left_categories(&model.root().split().unwrap().rule), vec![1, 2]);
    assert_approx_eq!(model.predict(&[2.0]), 0.5);
    assert_approx_eq!(model.predict(&[3.0]), 10.5);
}

#[test]
fn unordered_multiclass_split_isolates_categories() {
    // three classes, label equals category
    let rows = (0..9).map(|i| ((i % 3) as f64, vec![(i % 3) as f64])).collect();
    let input = dataset(rows, 3);
    let strategy = Strategy::builder()
        .num_classes(3)
        .categorical_features_info(HashMap::from([(0, 3)]))
        .build()
        .unwrap();

    let metadata = Metadata::build(&input, &strategy, 1, FeatureSubsetStrategy::All).unwrap();
    assert!(metadata.is_unordered(0));
    assert_eq!(metadata.num_bins[0], 6);

    let model = DecisionTree::train(&input, &strategy).unwrap();
    let root = model.root();
    // three subset splits tie on gain 1/3; the first one wins
    assert_eq!(left_categories(&root.split().unwrap().rule), vec![0]);
    assert_approx_eq!(root.stats().unwrap().gain, 1.0 / 3.0);
    assert_eq!(model.depth(), 2);
    for category in 0..3 {
        assert_eq!(model.predict(&[category as f64]), category as f64);
    }
}

#[test]
fn unordered_subset_splits_never_repeat_a_partition() {
    let arity = 5;
    let rows = (0..40).map(|i| ((i % 4) as f64, vec![(i % arity) as f64])).collect();
    let input = dataset(rows, 2);
    let strategy = Strategy::builder()
        .num_classes(4)
        .categorical_features_info(HashMap::from([(0, arity)]))
        .build()
        .unwrap();
    let metadata = Metadata::build(&input, &strategy, 1, FeatureSubsetStrategy::All).unwrap();
    assert!(metadata.is_unordered(0));
    let catalog =
        SplitBinCatalog::find_splits_bins(&input, &metadata, 0, Parallelism::Sequential).unwrap();

    let splits = &catalog.splits()[0];
    assert_eq!(splits.len(), (1 << (arity - 1)) - 1);
    let all: CatBitset = (0..arity as u32).collect();
    let mut seen = Vec::new();
    for (index, split) in splits.iter().enumerate() {
        let left = split.left_categories().unwrap();
        assert_eq!(left, &extract_multiclass_categories(index as u64 + 1, arity));
        let right: CatBitset = all.iter().filter(|&c| !left.contains(c)).collect();
        assert!(!left.is_empty() && !right.is_empty());
        // every category lands on exactly one side
        for c in 0..arity as u32 {
            assert!(left.contains(c) ^ right.contains(c));
        }
        assert!(!seen.contains(&right), "split {index} mirrors an earlier split");
        seen.push(left.clone());
    }
}

#[test]
fn categories_must_fit_max_bins() {
    let rows = (0..20).map(|i| ((i % 2) as f64, vec![(i % 10) as f64])).collect();
    let input = dataset(rows, 2);
    let strategy = Strategy::builder()
        .max_bins(8)
        .categorical_features_info(HashMap::from([(0, 10)]))
        .build()
        .unwrap();
    assert!(matches!(
        DecisionTree::train(&input, &strategy),
        Err(TrainError::TooManyCategories { max_bins: 8, max_arity: 10 })
    ));
}

#[test]
fn out_of_range_category_is_rejected() {
    let rows = vec![(0.0, vec![0.0]), (1.0, vec![3.0])];
    let input = dataset(rows, 1);
    let strategy = Strategy::builder()
        .categorical_features_info(HashMap::from([(0, 2)]))
        .build()
        .unwrap();
    assert!(matches!(
        DecisionTree::train(&input, &strategy),
        Err(TrainError::InvalidCategory { feature: 0, arity: 2, .. })
    ));
}

#[test]
fn trained_models_survive_json_round_trip() {
    // feature 0 unordered with three classes, feature 1 continuous
    let rows = (0..30)
        .map(|i| ((i % 3) as f64, vec![((i / 3) % 3) as f64, (i % 7) as f64]))
        .collect();
    let input = dataset(rows, 3);
    let strategy = Strategy::builder()
        .num_classes(3)
        .max_depth(3)
        .categorical_features_info(HashMap::from([(0, 3)]))
        .build()
        .unwrap();

    let tree = DecisionTree::train(&input, &strategy).unwrap();
    let json = serde_json::to_string(&tree).unwrap();
    let restored: DecisionTreeModel = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, tree);
    assert_eq!(restored.to_string(), tree.to_string());

    let forest = RandomForest::train(&input, &strategy, 4, FeatureSubsetStrategy::All).unwrap();
    let restored: RandomForestModel =
        serde_json::from_str(&serde_json::to_string(&forest).unwrap()).unwrap();
    assert_eq!(restored, forest);
    for row in 0..7 {
        let features = [(row % 3) as f64, row as f64];
        assert_eq!(restored.predict(&features), forest.predict(&features));
    }
}
