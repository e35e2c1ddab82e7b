//! Tree nodes addressed by their position in a complete binary tree.
//!
//! Node ids follow the heap numbering: the root is `1`, the children of `id`
//! are `2 * id` and `2 * id + 1`, and the level of `id` is `floor(log2(id))`.
//! Ids are `u32`, which bounds the depth at [`MAX_SUPPORTED_DEPTH`].
//!
//! Each node carries exactly one [`NodeState`]. A pending node has not been
//! decided yet; a split node always owns both children; a leaf never holds a
//! split.
//!
//! [`MAX_SUPPORTED_DEPTH`]: crate::config::MAX_SUPPORTED_DEPTH

use serde::{Deserialize, Serialize};

use super::split::{Bin, Split, SplitRule};
use crate::data::TreePoint;
use crate::error::{Result, TrainError};
use crate::training::InformationGainStats;

/// Type alias for global node ids.
pub type NodeId = u32;

/// Id of every tree root.
pub const ROOT_ID: NodeId = 1;

// =============================================================================
// Id arithmetic
// =============================================================================

#[inline]
pub fn left_child_index(id: NodeId) -> NodeId {
    id << 1
}

#[inline]
pub fn right_child_index(id: NodeId) -> NodeId {
    (id << 1) + 1
}

/// Parent id; the root has no parent.
#[inline]
pub fn parent_index(id: NodeId) -> Option<NodeId> {
    (id > ROOT_ID).then_some(id >> 1)
}

/// Depth of `id`, with the root at level 0.
#[inline]
pub fn index_to_level(id: NodeId) -> u32 {
    debug_assert!(id >= ROOT_ID, "node ids start at 1");
    31 - id.leading_zeros()
}

#[inline]
pub fn is_left_child(id: NodeId) -> bool {
    id > ROOT_ID && id & 1 == 0
}

/// Number of nodes a full level holds.
#[inline]
pub fn max_nodes_in_level(level: u32) -> u32 {
    1 << level
}

/// Id of the leftmost node of `level`.
#[inline]
pub fn start_index_in_level(level: u32) -> NodeId {
    1 << level
}

// =============================================================================
// Predict
// =============================================================================

/// Point prediction of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Predict {
    /// Class index (classification) or mean label (regression).
    pub predict: f64,
    /// Probability of the predicted class; `None` for regression.
    pub prob: Option<f64>,
}

impl Predict {
    #[inline]
    pub fn new(predict: f64, prob: Option<f64>) -> Self {
        Self { predict, prob }
    }
}

// =============================================================================
// Node
// =============================================================================

/// Decision state of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum NodeState {
    /// Waiting in the frontier queue.
    Pending,
    /// Terminal. `stats` holds the best candidate when one was valid.
    Leaf {
        predict: Predict,
        impurity: f64,
        stats: Option<InformationGainStats>,
    },
    /// Internal node with two owned children.
    Split {
        predict: Predict,
        impurity: f64,
        split: Split,
        stats: InformationGainStats,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// A tree node and, for split nodes, its whole subtree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    state: NodeState,
}

impl Node {
    /// A pending node.
    #[inline]
    pub fn pending(id: NodeId) -> Self {
        Self { id, state: NodeState::Pending }
    }

    /// A pending tree root.
    #[inline]
    pub fn empty_root() -> Self {
        Self::pending(ROOT_ID)
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn level(&self) -> u32 {
        index_to_level(self.id)
    }

    #[inline]
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self.state, NodeState::Pending)
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.state, NodeState::Leaf { .. })
    }

    pub fn predict(&self) -> Option<&Predict> {
        match &self.state {
            NodeState::Pending => None,
            NodeState::Leaf { predict, .. } | NodeState::Split { predict, .. } => Some(predict),
        }
    }

    pub fn impurity(&self) -> Option<f64> {
        match self.state {
            NodeState::Pending => None,
            NodeState::Leaf { impurity, .. } | NodeState::Split { impurity, .. } => Some(impurity),
        }
    }

    pub fn stats(&self) -> Option<&InformationGainStats> {
        match &self.state {
            NodeState::Pending => None,
            NodeState::Leaf { stats, .. } => stats.as_ref(),
            NodeState::Split { stats, .. } => Some(stats),
        }
    }

    pub fn split(&self) -> Option<&Split> {
        match &self.state {
            NodeState::Split { split, .. } => Some(split),
            _ => None,
        }
    }

    pub fn left(&self) -> Option<&Node> {
        match &self.state {
            NodeState::Split { left, .. } => Some(&**left),
            _ => None,
        }
    }

    pub fn right(&self) -> Option<&Node> {
        match &self.state {
            NodeState::Split { right, .. } => Some(&**right),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Finalize a pending node as a leaf.
    pub fn set_leaf(
        &mut self,
        predict: Predict,
        impurity: f64,
        stats: Option<InformationGainStats>,
    ) -> Result<()> {
        self.ensure_pending()?;
        self.state = NodeState::Leaf { predict, impurity, stats };
        Ok(())
    }

    /// Split a pending node, creating two pending children.
    pub fn set_split(
        &mut self,
        predict: Predict,
        impurity: f64,
        split: Split,
        stats: InformationGainStats,
    ) -> Result<()> {
        self.ensure_pending()?;
        let left = Box::new(Node::pending(left_child_index(self.id)));
        let right = Box::new(Node::pending(right_child_index(self.id)));
        self.state = NodeState::Split { predict, impurity, split, stats, left, right };
        Ok(())
    }

    fn ensure_pending(&self) -> Result<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(TrainError::Internal(format!("node {} was already decided", self.id)))
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Find the descendant with global id `id` by following the bits of `id`
    /// below its leading one.
    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id < self.id {
            return None;
        }
        let depth = index_to_level(id).checked_sub(self.level())?;
        if id >> depth != self.id {
            return None;
        }
        let mut node = self;
        for shift in (0..depth).rev() {
            node = match &mut node.state {
                NodeState::Split { left, right, .. } => {
                    if (id >> shift) & 1 == 0 {
                        &mut **left
                    } else {
                        &mut **right
                    }
                }
                _ => return None,
            };
        }
        Some(node)
    }

    /// Id of the node a binned point currently reaches: the first pending or
    /// leaf node on its path.
    ///
    /// Continuous splits send the point left when the upper bound of its bin
    /// does not exceed the split threshold.
    pub fn route(&self, point: &TreePoint, bins: &[Vec<Bin>]) -> NodeId {
        let mut node = self;
        loop {
            let NodeState::Split { split, left, right, .. } = &node.state else {
                return node.id;
            };
            let bin = point.binned_features[split.feature] as usize;
            let goes_left = match &split.rule {
                SplitRule::Continuous { threshold } => {
                    bins[split.feature][bin].upper_threshold() <= *threshold
                }
                SplitRule::Categorical { left_categories } => left_categories.contains(bin as u32),
            };
            node = if goes_left { &**left } else { &**right };
        }
    }

    /// Terminal node reached by a raw feature vector.
    pub fn descend(&self, features: &[f64]) -> &Node {
        let mut node = self;
        while let NodeState::Split { split, left, right, .. } = &node.state {
            node = if split.goes_left(features[split.feature]) { &**left } else { &**right };
        }
        node
    }

    /// Number of nodes in this subtree, excluding `self`.
    pub fn num_descendants(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let NodeState::Split { left, right, .. } = &node.state {
                count += 2;
                stack.push(left);
                stack.push(right);
            }
        }
        count
    }

    /// Depth of this subtree; a single node has depth 0.
    pub fn subtree_depth(&self) -> u32 {
        let mut depth = 0;
        let mut stack = vec![(self, 0u32)];
        while let Some((node, d)) = stack.pop() {
            depth = depth.max(d);
            if let NodeState::Split { left, right, .. } = &node.state {
                stack.push((&**left, d + 1));
                stack.push((&**right, d + 1));
            }
        }
        depth
    }

    /// Whether any node of this subtree is still pending.
    pub fn has_pending(&self) -> bool {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match &node.state {
                NodeState::Pending => return true,
                NodeState::Leaf { .. } => {}
                NodeState::Split { left, right, .. } => {
                    stack.push(left);
                    stack.push(right);
                }
            }
        }
        false
    }
}
