//! arbor: distributed-style decision tree and random forest training.
//!
//! Training data lives in a [`PartitionedDataset`]: every partition is folded
//! into its own histogram and partition results are merged pairwise, so one
//! pass over the data evaluates every candidate split of a whole group of
//! frontier nodes.
//!
//! ```
//! use arbor::{FeatureSubsetStrategy, LabeledPoint, PartitionedDataset, RandomForest, Strategy};
//!
//! let points = (0..100)
//!     .map(|i| LabeledPoint::new((i % 10 >= 5) as u8 as f64, vec![(i % 10) as f64, i as f64]))
//!     .collect();
//! let input = PartitionedDataset::from_vec(points, 4);
//!
//! let strategy = Strategy::builder().max_depth(3).seed(1).build().unwrap();
//! let forest = RandomForest::train(&input, &strategy, 10, FeatureSubsetStrategy::Auto).unwrap();
//! assert_eq!(forest.num_trees(), 10);
//! ```

pub mod testing;

pub mod config;
pub mod data;
pub mod error;
pub mod impurity;
pub mod training;
pub mod tree;
pub mod utils;

pub use config::{Algo, FeatureSubsetStrategy, QuantileStrategy, Strategy};
pub use data::{BaggedPoint, LabeledPoint, PartitionedDataset, TreePoint};
pub use error::{Result, TrainError};
pub use impurity::{Impurity, ImpurityCalculator};
pub use training::{DecisionTree, RandomForest};
pub use tree::{DecisionTreeModel, Node, NodeState, Predict, RandomForestModel, Split};
pub use utils::{Parallelism, SeedStream};
