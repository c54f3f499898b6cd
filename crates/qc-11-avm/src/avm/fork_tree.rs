//! # Fork Tree
//!
//! Arena of parent-linked nodes shared by the world-state journal and the
//! bytecode hints cache. Children are forked for nested calls and later
//! either merged into their parent or discarded.
//!
//! Nodes are never removed from the arena during a transaction, so a
//! [`NodeId`] stays valid for the whole simulation.

use crate::errors::ForkTreeError;
use serde::Serialize;

/// Index of a node in a [`ForkTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub u32);

/// Lifecycle of a fork node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NodeStatus {
    /// Still accepting writes.
    Live,
    /// Folded into its parent.
    Merged,
    /// Dropped together with its data.
    Discarded,
}

/// Data carried by a fork node.
pub trait ForkNode: Default {
    /// Folds a merged child's data into this node. Later entries win.
    fn absorb(&mut self, child: Self);
}

#[derive(Debug)]
struct Slot<N> {
    parent: Option<NodeId>,
    status: NodeStatus,
    data: N,
}

/// Parent-linked arena.
#[derive(Debug)]
pub struct ForkTree<N: ForkNode> {
    nodes: Vec<Slot<N>>,
}

impl<N: ForkNode> Default for ForkTree<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: ForkNode> ForkTree<N> {
    /// Creates a tree with an empty root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Slot {
                parent: None,
                status: NodeStatus::Live,
                data: N::default(),
            }],
        }
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever allocated.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    fn slot(&self, id: NodeId) -> Result<&Slot<N>, ForkTreeError> {
        self.nodes
            .get(id.0 as usize)
            .ok_or(ForkTreeError::UnknownNode(id.0))
    }

    fn live_slot(&self, id: NodeId) -> Result<&Slot<N>, ForkTreeError> {
        let slot = self.slot(id)?;
        if slot.status == NodeStatus::Live {
            Ok(slot)
        } else {
            Err(ForkTreeError::AlreadyFinalized(id.0))
        }
    }

    /// Creates an empty child of `parent`.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is unknown or already finalized.
    pub fn fork(&mut self, parent: NodeId) -> Result<NodeId, ForkTreeError> {
        self.live_slot(parent)?;
        let id = u32::try_from(self.nodes.len())
            .map_err(|_| ForkTreeError::UnknownNode(u32::MAX))?;
        self.nodes.push(Slot {
            parent: Some(parent),
            status: NodeStatus::Live,
            data: N::default(),
        });
        Ok(NodeId(id))
    }

    /// Folds `child` into its parent and marks it merged.
    ///
    /// # Errors
    ///
    /// Fails for the root, unknown ids and finalized nodes (either side).
    pub fn merge(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        let parent = self
            .live_slot(child)?
            .parent
            .ok_or(ForkTreeError::RootFinalization)?;
        self.live_slot(parent)?;

        let slot = &mut self.nodes[child.0 as usize];
        slot.status = NodeStatus::Merged;
        let data = std::mem::take(&mut slot.data);
        self.nodes[parent.0 as usize].data.absorb(data);
        Ok(parent)
    }

    /// Drops `child`'s data and marks it discarded.
    ///
    /// # Errors
    ///
    /// Fails for the root, unknown ids and finalized nodes.
    pub fn discard(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        let parent = self
            .live_slot(child)?
            .parent
            .ok_or(ForkTreeError::RootFinalization)?;
        let slot = &mut self.nodes[child.0 as usize];
        slot.status = NodeStatus::Discarded;
        slot.data = N::default();
        Ok(parent)
    }

    /// Node data.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn get(&self, id: NodeId) -> Result<&N, ForkTreeError> {
        Ok(&self.slot(id)?.data)
    }

    /// Mutable node data. Only live nodes can be written.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown or finalized.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut N, ForkTreeError> {
        self.live_slot(id)?;
        Ok(&mut self.nodes[id.0 as usize].data)
    }

    /// Node status.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn status(&self, id: NodeId) -> Result<NodeStatus, ForkTreeError> {
        Ok(self.slot(id)?.status)
    }

    /// Parent of a node, `None` for the root.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, ForkTreeError> {
        Ok(self.slot(id)?.parent)
    }

    /// `id` followed by its ancestors up to the root.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn lineage(&self, id: NodeId) -> Result<Vec<NodeId>, ForkTreeError> {
        let mut chain = vec![id];
        let mut current = self.slot(id)?.parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.slot(parent)?.parent;
        }
        Ok(chain)
    }

    /// Data of `id` and its ancestors, nearest first.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown.
    pub fn lineage_data(&self, id: NodeId) -> Result<Vec<&N>, ForkTreeError> {
        self.lineage(id)?
            .into_iter()
            .map(|node| self.get(node))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Log(Vec<u32>);

    impl ForkNode for Log {
        fn absorb(&mut self, child: Self) {
            self.0.extend(child.0);
        }
    }

    #[test]
    fn test_fork_and_merge() {
        let mut tree = ForkTree::<Log>::new();
        let root = tree.root();
        tree.get_mut(root).unwrap().0.push(1);

        let child = tree.fork(root).unwrap();
        tree.get_mut(child).unwrap().0.push(2);
        assert_eq!(tree.lineage(child).unwrap(), vec![child, root]);

        assert_eq!(tree.merge(child).unwrap(), root);
        assert_eq!(tree.get(root).unwrap(), &Log(vec![1, 2]));
        assert_eq!(tree.status(child).unwrap(), NodeStatus::Merged);
    }

    #[test]
    fn test_discard_drops_data() {
        let mut tree = ForkTree::<Log>::new();
        let child = tree.fork(tree.root()).unwrap();
        tree.get_mut(child).unwrap().0.push(7);
        tree.discard(child).unwrap();
        assert!(tree.get(tree.root()).unwrap().0.is_empty());
        assert!(tree.get(child).unwrap().0.is_empty());
    }

    #[test]
    fn test_finalized_node_rejected() {
        let mut tree = ForkTree::<Log>::new();
        let child = tree.fork(tree.root()).unwrap();
        tree.merge(child).unwrap();
        assert_eq!(tree.merge(child), Err(ForkTreeError::AlreadyFinalized(1)));
        assert_eq!(tree.discard(child), Err(ForkTreeError::AlreadyFinalized(1)));
        assert!(tree.get_mut(child).is_err());
        assert!(tree.fork(child).is_err());
    }

    #[test]
    fn test_root_cannot_be_finalized() {
        let mut tree = ForkTree::<Log>::new();
        assert_eq!(tree.merge(tree.root()), Err(ForkTreeError::RootFinalization));
        assert_eq!(tree.discard(tree.root()), Err(ForkTreeError::RootFinalization));
    }

    #[test]
    fn test_unknown_node() {
        let tree = ForkTree::<Log>::new();
        assert_eq!(tree.lineage(NodeId(5)), Err(ForkTreeError::UnknownNode(5)));
    }

    #[test]
    fn test_merge_empty_child_is_noop() {
        let mut tree = ForkTree::<Log>::new();
        let root = tree.root();
        tree.get_mut(root).unwrap().0.extend([1, 2, 3]);
        let child = tree.fork(root).unwrap();
        tree.merge(child).unwrap();
        assert_eq!(tree.get(root).unwrap(), &Log(vec![1, 2, 3]));
    }
}
