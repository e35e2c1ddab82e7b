//! Histogram aggregation: partition results merge into the full-data histogram.

use std::collections::HashMap;

use arbor::config::{FeatureSubsetStrategy, Strategy};
use arbor::data::convert_to_tree_points;
use arbor::training::{aggregate_batch, Metadata, NodeBatch, SplitBinCatalog, StatsAggregator};
use arbor::utils::Parallelism;
use arbor::{BaggedPoint, LabeledPoint, Node, PartitionedDataset, TreePoint};
use proptest::prelude::{prop, prop_assert_eq, proptest, ProptestConfig};
use proptest::strategy::Strategy as _;

use crate::common::dataset;

struct Setup {
    metadata: Metadata,
    catalog: SplitBinCatalog,
}

/// Feature 0 continuous, feature 1 categorical with arity 4, feature 2
/// categorical with arity 3.
fn setup(input: &PartitionedDataset<LabeledPoint>, num_classes: usize) -> Setup {
    let strategy = Strategy::builder()
        .num_classes(num_classes)
        .max_bins(8)
        .categorical_features_info(HashMap::from([(1, 4), (2, 3)]))
        .build()
        .unwrap();
    let metadata = Metadata::build(input, &strategy, 1, FeatureSubsetStrategy::All).unwrap();
    let catalog =
        SplitBinCatalog::find_splits_bins(input, &metadata, 0, Parallelism::Sequential).unwrap();
    Setup { metadata, catalog }
}

fn bagged(
    input: &PartitionedDataset<LabeledPoint>,
    setup: &Setup,
) -> PartitionedDataset<BaggedPoint<TreePoint>> {
    let points =
        convert_to_tree_points(input, &setup.catalog, &setup.metadata, Parallelism::Sequential)
            .unwrap();
    BaggedPoint::convert(&points, 1.0, 1, false, 0, Parallelism::Sequential).unwrap()
}

fn root_histogram(input: &PartitionedDataset<LabeledPoint>, setup: &Setup) -> StatsAggregator {
    let mut batch = NodeBatch::default();
    batch.push(0, 1, None);
    aggregate_batch(
        &bagged(input, setup),
        &[Node::empty_root()],
        &batch,
        &setup.metadata,
        &setup.catalog,
        Parallelism::Parallel,
    )
}

fn rows_strategy(num_classes: u8) -> impl proptest::strategy::Strategy<Value = Vec<(f64, Vec<f64>)>> {
    prop::collection::vec((0..num_classes, 0u8..20, 0u8..4, 0u8..3), 8..60).prop_map(|rows| {
        rows.into_iter()
            .map(|(label, x, a, b)| (label as f64, vec![x as f64, a as f64, b as f64]))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn combined_halves_equal_full_histogram(
        rows in rows_strategy(3),
        cut in 1usize..7,
        num_classes in 2usize..4,
    ) {
        let rows: Vec<_> = rows
            .into_iter()
            .map(|(label, features)| (label % num_classes as f64, features))
            .collect();
        let full = dataset(rows.clone(), 3);
        let setup = setup(&full, num_classes);
        prop_assert_eq!(setup.metadata.is_unordered(2), num_classes == 3);

        let split_at = rows.len() * cut / 8;
        let (head, tail) = rows.split_at(split_at);
        let head = dataset(head.to_vec(), 2);
        let tail = dataset(tail.to_vec(), 2);

        let whole = root_histogram(&full, &setup);
        let combined = root_histogram(&head, &setup).combine(root_histogram(&tail, &setup));
        // integer weights: sums are exact in any order
        prop_assert_eq!(whole.all_stats(), combined.all_stats());

        let mut merged = root_histogram(&tail, &setup);
        merged.merge(&root_histogram(&head, &setup));
        prop_assert_eq!(merged.all_stats(), whole.all_stats());
    }

    #[test]
    fn every_split_accumulator_sees_every_point(rows in rows_strategy(3)) {
        let input = dataset(rows, 4);
        let setup = setup(&input, 3);
        let agg = root_histogram(&input, &setup);
        let n = input.count() as f64;

        for slot in 0..agg.num_slots(0) {
            let feature = agg.feature(0, slot);
            if setup.metadata.is_unordered(feature) {
                let (left, right) = agg.left_right_node_feature_offsets(0, slot);
                for split in 0..setup.metadata.num_splits(feature) {
                    let total = agg.calculator(left, split).count() + agg.calculator(right, split).count();
                    prop_assert_eq!(total, n);
                }
            } else {
                let offset = agg.node_feature_offset(0, slot);
                let total: f64 = (0..setup.metadata.num_bins[feature])
                    .map(|bin| agg.calculator(offset, bin).count())
                    .sum();
                prop_assert_eq!(total, n);
            }
        }
    }
}
