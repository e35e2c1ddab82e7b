//! Training data: raw and binned points, bootstrap weights and the
//! partitioned collection they live in.

mod bagging;
mod partitioned;
mod point;

pub use bagging::BaggedPoint;
pub use partitioned::PartitionedDataset;
pub use point::{convert_to_tree_points, LabeledPoint, TreePoint};
