//! Trained tree and forest models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::{Node, NodeState};
use super::split::SplitRule;
use crate::config::Algo;
use crate::error::{Result, TrainError};

// =============================================================================
// DecisionTreeModel
// =============================================================================

/// A fully grown decision tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    root: Node,
    algo: Algo,
}

impl DecisionTreeModel {
    /// Wrap a fully decided root.
    ///
    /// # Errors
    ///
    /// [`TrainError::Internal`] if some node of the tree is still pending.
    pub fn new(root: Node, algo: Algo) -> Result<Self> {
        if root.has_pending() {
            return Err(TrainError::Internal("tree still has pending nodes".into()));
        }
        Ok(Self { root, algo })
    }

    #[inline]
    pub fn root(&self) -> &Node {
        &self.root
    }

    #[inline]
    pub fn algo(&self) -> Algo {
        self.algo
    }

    /// Predict one raw feature vector.
    pub fn predict(&self, features: &[f64]) -> f64 {
        // Every terminal node is a decided leaf once the model exists.
        self.root.descend(features).predict().map_or(f64::NAN, |p| p.predict)
    }

    /// Depth of the tree; a lone root has depth 0.
    pub fn depth(&self) -> u32 {
        self.root.subtree_depth()
    }

    pub fn num_nodes(&self) -> usize {
        1 + self.root.num_descendants()
    }

    /// Consume the model and return its root.
    pub fn into_root(self) -> Node {
        self.root
    }
}

impl fmt::Display for DecisionTreeModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "DecisionTreeModel {:?} of depth {} with {} nodes",
            self.algo,
            self.depth(),
            self.num_nodes()
        )?;
        write_subtree(f, &self.root, 1)
    }
}

fn write_subtree(f: &mut fmt::Formatter<'_>, node: &Node, indent: usize) -> fmt::Result {
    let pad = " ".repeat(indent);
    match node.state() {
        NodeState::Pending => writeln!(f, "{pad}Pending ({})", node.id()),
        NodeState::Leaf { predict, .. } => writeln!(f, "{pad}Predict: {}", predict.predict),
        NodeState::Split { split, left, right, .. } => {
            let (go_left, go_right) = match &split.rule {
                SplitRule::Continuous { threshold } => (
                    format!("feature {} <= {threshold}", split.feature),
                    format!("feature {} > {threshold}", split.feature),
                ),
                SplitRule::Categorical { left_categories } => (
                    format!("feature {} in {left_categories:?}", split.feature),
                    format!("feature {} not in {left_categories:?}", split.feature),
                ),
            };
            writeln!(f, "{pad}If ({go_left})")?;
            write_subtree(f, left, indent + 1)?;
            writeln!(f, "{pad}Else ({go_right})")?;
            write_subtree(f, right, indent + 1)
        }
    }
}

// =============================================================================
// RandomForestModel
// =============================================================================

/// An ensemble of independently grown trees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    trees: Vec<DecisionTreeModel>,
    algo: Algo,
}

impl RandomForestModel {
    pub fn new(trees: Vec<DecisionTreeModel>, algo: Algo) -> Self {
        Self { trees, algo }
    }

    #[inline]
    pub fn trees(&self) -> &[DecisionTreeModel] {
        &self.trees
    }

    #[inline]
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn into_trees(self) -> Vec<DecisionTreeModel> {
        self.trees
    }

    #[inline]
    pub fn algo(&self) -> Algo {
        self.algo
    }

    /// Majority vote (classification, lowest class on ties) or mean of the
    /// tree predictions (regression).
    pub fn predict(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        let predictions = self.trees.iter().map(|t| t.predict(features));
        match self.algo {
            Algo::Regression => predictions.sum::<f64>() / self.trees.len() as f64,
            Algo::Classification => {
                let mut votes: Vec<usize> = Vec::new();
                for p in predictions {
                    let class = p as usize;
                    if class >= votes.len() {
                        votes.resize(class + 1, 0);
                    }
                    votes[class] += 1;
                }
                let mut best = 0;
                for (class, &count) in votes.iter().enumerate() {
                    if count > votes[best] {
                        best = class;
                    }
                }
                best as f64
            }
        }
    }

    /// Total number of nodes across all trees.
    pub fn total_num_nodes(&self) -> usize {
        self.trees.iter().map(DecisionTreeModel::num_nodes).sum()
    }
}

impl fmt::Display for RandomForestModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "RandomForestModel {:?} with {} trees and {} nodes",
            self.algo,
            self.num_trees(),
            self.total_num_nodes()
        )?;
        for (i, tree) in self.trees.iter().enumerate() {
            writeln!(f, " Tree {i}:")?;
            write_subtree(f, tree.root(), 2)?;
        }
        Ok(())
    }
}
