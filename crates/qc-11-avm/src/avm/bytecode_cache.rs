//! # Bytecode Hints Cache
//!
//! Decoded bytecode per contract class, forked and merged alongside the
//! journal. The number of distinct classes visible from a node is capped
//! per transaction; exceeding the cap rejects the transaction.

use super::bytecode::decode_bytecode;
use super::fork_tree::{ForkNode, ForkTree, NodeId};
use super::instruction::Instruction;
use crate::domain::entities::ContractClass;
use crate::domain::value_objects::{Address, Fr};
use crate::errors::{FatalError, ForkTreeError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Decoded program.
pub type Program = Arc<[Instruction]>;

/// Classes first seen in one call.
#[derive(Debug, Default)]
pub struct BytecodeHintsNode {
    classes: HashMap<Fr, Program>,
}

impl ForkNode for BytecodeHintsNode {
    fn absorb(&mut self, child: Self) {
        self.classes.extend(child.classes);
    }
}

/// Transaction-wide bytecode cache.
#[derive(Debug)]
pub struct BytecodeHintsCache {
    tree: ForkTree<BytecodeHintsNode>,
    max_unique_classes: usize,
}

impl BytecodeHintsCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(max_unique_classes: usize) -> Self {
        Self {
            tree: ForkTree::new(),
            max_unique_classes,
        }
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Forks a node for a nested call.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is unknown or finalized.
    pub fn fork(&mut self, parent: NodeId) -> Result<NodeId, ForkTreeError> {
        self.tree.fork(parent)
    }

    /// Keeps the classes a successful call loaded.
    ///
    /// # Errors
    ///
    /// Fails if `child` is the root, unknown or finalized.
    pub fn merge(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        self.tree.merge(child)
    }

    /// Forgets the classes a failed call loaded.
    ///
    /// # Errors
    ///
    /// Fails if `child` is the root, unknown or finalized.
    pub fn discard(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        self.tree.discard(child)
    }

    /// Number of distinct classes visible from `node`.
    ///
    /// # Errors
    ///
    /// Fails if `node` is unknown.
    pub fn unique_classes(&self, node: NodeId) -> Result<usize, ForkTreeError> {
        Ok(self
            .tree
            .lineage_data(node)?
            .iter()
            .map(|n| n.classes.len())
            .sum())
    }

    fn lookup(&self, node: NodeId, class_id: &Fr) -> Result<Option<Program>, ForkTreeError> {
        Ok(self
            .tree
            .lineage_data(node)?
            .into_iter()
            .find_map(|n| n.classes.get(class_id).cloned()))
    }

    /// Returns the decoded program for `class`, decoding it on first use.
    ///
    /// # Errors
    ///
    /// - `ProtocolLimitExceeded` if this class would exceed the unique-class cap
    /// - `Decode` if the bytecode is malformed
    pub fn get_or_decode(
        &mut self,
        node: NodeId,
        address: Address,
        class: &ContractClass,
    ) -> Result<Program, FatalError> {
        if let Some(program) = self.lookup(node, &class.id)? {
            return Ok(program);
        }

        let seen = self.unique_classes(node)?;
        if seen + 1 > self.max_unique_classes {
            return Err(FatalError::ProtocolLimitExceeded {
                limit: self.max_unique_classes,
            });
        }

        let program: Program = decode_bytecode(&class.bytecode)
            .map_err(|source| FatalError::Decode { address, source })?
            .into();
        debug!(
            %address,
            instructions = program.len(),
            unique_classes = seen + 1,
            "decoded contract class"
        );
        self.tree
            .get_mut(node)?
            .classes
            .insert(class.id, Arc::clone(&program));
        Ok(program)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DecodeError;

    fn class(id: u64, bytecode: Vec<u8>) -> ContractClass {
        ContractClass {
            id: Fr::from(id),
            bytecode,
        }
    }

    // INTERNALRETURN
    const TRIVIAL: [u8; 1] = [0x23];

    #[test]
    fn test_cached_lookup_through_ancestors() {
        let mut cache = BytecodeHintsCache::new(4);
        let root = cache.root();
        let a = class(1, TRIVIAL.to_vec());
        let first = cache.get_or_decode(root, Address::from_u64(1), &a).unwrap();

        let child = cache.fork(root).unwrap();
        let second = cache.get_or_decode(child, Address::from_u64(1), &a).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.unique_classes(child).unwrap(), 1);
    }

    #[test]
    fn test_unique_class_limit_is_fatal() {
        let mut cache = BytecodeHintsCache::new(2);
        let root = cache.root();
        for id in 1..=2 {
            cache
                .get_or_decode(root, Address::from_u64(id), &class(id, TRIVIAL.to_vec()))
                .unwrap();
        }
        // already-seen class is free
        cache
            .get_or_decode(root, Address::from_u64(9), &class(1, TRIVIAL.to_vec()))
            .unwrap();
        assert_eq!(
            cache.get_or_decode(root, Address::from_u64(3), &class(3, TRIVIAL.to_vec())),
            Err(FatalError::ProtocolLimitExceeded { limit: 2 })
        );
    }

    #[test]
    fn test_discarded_classes_do_not_count() {
        let mut cache = BytecodeHintsCache::new(1);
        let root = cache.root();
        let child = cache.fork(root).unwrap();
        cache
            .get_or_decode(child, Address::from_u64(1), &class(1, TRIVIAL.to_vec()))
            .unwrap();
        cache.discard(child).unwrap();
        assert_eq!(cache.unique_classes(root).unwrap(), 0);
        assert!(cache
            .get_or_decode(root, Address::from_u64(2), &class(2, TRIVIAL.to_vec()))
            .is_ok());
    }

    #[test]
    fn test_decode_failure_is_fatal() {
        let mut cache = BytecodeHintsCache::new(4);
        let root = cache.root();
        let err = cache
            .get_or_decode(root, Address::from_u64(1), &class(1, vec![0xEE]))
            .unwrap_err();
        assert_eq!(
            err,
            FatalError::Decode {
                address: Address::from_u64(1),
                source: DecodeError::InvalidOpcode {
                    byte: 0xEE,
                    position: 0
                }
            }
        );
    }
}
