//! Tree structures produced by training.
//!
//! - [`Node`] / [`NodeState`]: nodes addressed by heap ids
//! - [`Split`] / [`Bin`]: decision rules and discretization buckets
//! - [`CatBitset`]: category sets for categorical splits
//! - [`DecisionTreeModel`] / [`RandomForestModel`]: trained models

mod categorical;
pub mod model;
pub mod node;
mod split;

pub use categorical::CatBitset;
pub use model::{DecisionTreeModel, RandomForestModel};
pub use node::{
    index_to_level, is_left_child, left_child_index, max_nodes_in_level, parent_index,
    right_child_index, start_index_in_level, Node, NodeId, NodeState, Predict, ROOT_ID,
};
pub use split::{Bin, FeatureType, Split, SplitRule};
