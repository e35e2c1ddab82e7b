//! Breadth-first growth of one or many trees.
//!
//! Frontier nodes of every tree share one FIFO queue. Each iteration pops a
//! group of nodes whose histograms fit the memory budget, builds their
//! histograms in one data pass, selects a split per node and enqueues the
//! children of every split node.

use std::collections::VecDeque;

use log::{debug, trace};
use rand::Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use rustc_hash::FxHashMap;

use super::aggregation::aggregate_batch;
use super::catalog::SplitBinCatalog;
use super::metadata::Metadata;
use super::selector::{select_best_split, SplitCandidate};
use super::timing::TimeTracker;
use crate::data::{BaggedPoint, PartitionedDataset, TreePoint};
use crate::error::{Result, TrainError};
use crate::tree::{left_child_index, right_child_index, Node, NodeId, ROOT_ID};
use crate::utils::Parallelism;

// =============================================================================
// NodeBatch
// =============================================================================

/// Where a frontier node lives in the batch histogram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeIndexInfo {
    /// Dense index of the node inside the batch.
    pub node_index_in_group: usize,
    /// Assigned features, ascending; `None` means all features.
    pub feature_subset: Option<Vec<usize>>,
}

/// Frontier nodes grown together in one data pass.
#[derive(Clone, Debug, Default)]
pub struct NodeBatch {
    /// `(tree, node id)` in dense order.
    nodes: Vec<(usize, NodeId)>,
    tree_to_node_info: FxHashMap<usize, FxHashMap<NodeId, NodeIndexInfo>>,
}

impl NodeBatch {
    /// Append a node; its dense index is the current batch size.
    pub fn push(&mut self, tree: usize, id: NodeId, feature_subset: Option<Vec<usize>>) {
        let info = NodeIndexInfo { node_index_in_group: self.nodes.len(), feature_subset };
        self.nodes.push((tree, id));
        self.tree_to_node_info.entry(tree).or_default().insert(id, info);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `(tree, node id)` pairs in dense order.
    #[inline]
    pub fn nodes(&self) -> &[(usize, NodeId)] {
        &self.nodes
    }

    /// Trees touched by the batch with their node lookup tables.
    pub fn trees(&self) -> impl Iterator<Item = (&usize, &FxHashMap<NodeId, NodeIndexInfo>)> {
        self.tree_to_node_info.iter()
    }

    pub fn info(&self, tree: usize, id: NodeId) -> Option<&NodeIndexInfo> {
        self.tree_to_node_info.get(&tree)?.get(&id)
    }

    /// Feature subsets in dense order.
    pub fn node_subsets(&self) -> Vec<Option<Vec<usize>>> {
        self.nodes
            .iter()
            .map(|&(tree, id)| self.info(tree, id).and_then(|info| info.feature_subset.clone()))
            .collect()
    }
}

// =============================================================================
// Node selection
// =============================================================================

/// `k` distinct features out of `num_features`, ascending.
pub fn sample_features(num_features: usize, k: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let k = k.min(num_features);
    let mut indices: Vec<usize> = (0..num_features).collect();

    // Partial Fisher-Yates shuffle
    for i in 0..k {
        let j = rng.gen_range(i..num_features);
        indices.swap(i, j);
    }

    indices.truncate(k);
    indices.sort_unstable();
    indices
}

/// Pop frontier nodes while their histograms fit `max_memory_bytes`.
///
/// The first node is always admitted. Nodes draw their feature subset when
/// they are considered, so a node left in the queue draws again next time.
pub fn select_nodes_to_split(
    queue: &mut VecDeque<(usize, NodeId)>,
    max_memory_bytes: u64,
    metadata: &Metadata,
    rng: &mut Xoshiro256PlusPlus,
) -> NodeBatch {
    let mut batch = NodeBatch::default();
    let mut memory = 0u64;
    while let Some(&(tree, id)) = queue.front() {
        let subset = metadata.subsampling_features().then(|| {
            sample_features(metadata.num_features, metadata.num_features_per_node, rng)
        });
        let node_bytes = metadata.node_histogram_bytes(subset.as_deref());
        if !batch.is_empty() && memory + node_bytes > max_memory_bytes {
            break;
        }
        queue.pop_front();
        memory += node_bytes;
        batch.push(tree, id, subset);
    }
    trace!("selected {} nodes using {memory} bytes", batch.len());
    batch
}

// =============================================================================
// GrowthScheduler
// =============================================================================

/// Drives the breadth-first growth loop.
pub struct GrowthScheduler<'a> {
    metadata: &'a Metadata,
    catalog: &'a SplitBinCatalog,
    max_memory_bytes: u64,
    parallelism: Parallelism,
    rng: Xoshiro256PlusPlus,
}

impl<'a> GrowthScheduler<'a> {
    /// # Errors
    ///
    /// [`TrainError::MemoryBudgetTooSmall`] when a single node's histogram
    /// does not fit `max_memory_bytes`.
    pub fn new(
        metadata: &'a Metadata,
        catalog: &'a SplitBinCatalog,
        max_memory_bytes: u64,
        parallelism: Parallelism,
        rng: Xoshiro256PlusPlus,
    ) -> Result<Self> {
        let required_bytes = metadata.max_node_histogram_bytes();
        if required_bytes > max_memory_bytes {
            return Err(TrainError::MemoryBudgetTooSmall {
                budget_mb: (max_memory_bytes / (1024 * 1024)) as usize,
                required_bytes,
            });
        }
        Ok(Self { metadata, catalog, max_memory_bytes, parallelism, rng })
    }

    /// Grow one pending root per tree until no pending node remains.
    pub fn grow(
        &mut self,
        input: &PartitionedDataset<BaggedPoint<TreePoint>>,
        num_trees: usize,
        timer: &mut TimeTracker,
    ) -> Result<Vec<Node>> {
        let mut roots: Vec<Node> = (0..num_trees).map(|_| Node::empty_root()).collect();
        let mut queue: VecDeque<(usize, NodeId)> = (0..num_trees).map(|t| (t, ROOT_ID)).collect();
        let mut passes = 0usize;

        while !queue.is_empty() {
            let batch =
                select_nodes_to_split(&mut queue, self.max_memory_bytes, self.metadata, &mut self.rng);
            passes += 1;

            timer.start("aggregation");
            let mut agg =
                aggregate_batch(input, &roots, &batch, self.metadata, self.catalog, self.parallelism);
            timer.stop("aggregation");
            debug!(
                "pass {passes}: {} nodes across {} trees, {} histogram bytes, {} nodes still queued",
                batch.len(),
                batch.trees().count(),
                agg.all_stats().len() * std::mem::size_of::<f64>(),
                queue.len()
            );

            timer.start("selection");
            let (metadata, catalog) = (self.metadata, self.catalog);
            let candidates = self.parallelism.maybe_par_map(agg.node_views_mut(), |mut view| {
                select_best_split(&mut view, metadata, catalog)
            });
            for (&(tree, id), candidate) in batch.nodes().iter().zip(candidates) {
                for child in self.apply(&mut roots[tree], id, candidate?)? {
                    queue.push_back((tree, child));
                }
            }
            timer.stop("selection");
        }

        debug!("grew {num_trees} trees in {passes} data passes");
        Ok(roots)
    }

    /// Decide one pending node and return the ids of its new children.
    fn apply(&self, root: &mut Node, id: NodeId, candidate: SplitCandidate) -> Result<Vec<NodeId>> {
        let node = root
            .find_mut(id)
            .ok_or_else(|| TrainError::Internal(format!("frontier node {id} is not reachable")))?;
        let SplitCandidate { split, stats, predict, impurity } = candidate;
        let is_leaf = stats.gain <= 0.0 || node.level() >= self.metadata.max_depth;

        match split {
            Some(split) if !is_leaf => {
                trace!("node {id}: split on feature {} with gain {}", split.feature, stats.gain);
                node.set_split(predict, impurity, split, stats)?;
                Ok(vec![left_child_index(id), right_child_index(id)])
            }
            _ => {
                node.set_leaf(predict, impurity, stats.is_valid().then_some(stats))?;
                Ok(Vec::new())
            }
        }
    }
}
