//! # World State Journal
//!
//! Pending side effects of a transaction, organised as a [`ForkTree`].
//! Each call writes into its own node; reads walk the lineage and fall back
//! to the [`WorldStateReader`] at the root.
//!
//! The journal never writes through to persistent storage. Accepted effects
//! are handed to the orchestrator in [`TxExecutionResult`].
//!
//! [`TxExecutionResult`]: crate::domain::entities::TxExecutionResult

use super::fork_tree::{ForkNode, ForkTree, NodeId};
use crate::domain::entities::{
    L2ToL1Message, NoteHash, Nullifier, PublicDataWrite, SideEffectLimits, SideEffects,
    UnencryptedLog,
};
use crate::domain::value_objects::{serde_fr, Address, Fr};
use crate::errors::{AvmError, ExecutionError, ForkTreeError, SideEffectKind};
use crate::ports::outbound::WorldStateReader;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::trace;

// =============================================================================
// JOURNAL NODE
// =============================================================================

/// Side effects pending in one call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JournalNode {
    /// Latest value per `(contract, slot)`.
    pub storage: HashMap<(Address, Fr), Fr>,
    /// Every storage write in order.
    pub storage_writes: Vec<PublicDataWrite>,
    /// Emitted note hashes.
    pub note_hashes: Vec<NoteHash>,
    /// Emitted nullifiers.
    pub nullifiers: Vec<Nullifier>,
    nullifier_set: HashSet<(Address, Fr)>,
    /// Unencrypted logs.
    pub unencrypted_logs: Vec<UnencryptedLog>,
    /// L2 to L1 messages.
    pub l2_to_l1_messages: Vec<L2ToL1Message>,
}

impl JournalNode {
    fn count(&self, kind: SideEffectKind) -> usize {
        match kind {
            SideEffectKind::PublicDataWrites => self.storage_writes.len(),
            SideEffectKind::NoteHashes => self.note_hashes.len(),
            SideEffectKind::Nullifiers => self.nullifiers.len(),
            SideEffectKind::UnencryptedLogs => self.unencrypted_logs.len(),
            SideEffectKind::L2ToL1Messages => self.l2_to_l1_messages.len(),
        }
    }
}

impl ForkNode for JournalNode {
    fn absorb(&mut self, child: Self) {
        self.storage.extend(child.storage);
        self.storage_writes.extend(child.storage_writes);
        self.note_hashes.extend(child.note_hashes);
        self.nullifiers.extend(child.nullifiers);
        self.nullifier_set.extend(child.nullifier_set);
        self.unencrypted_logs.extend(child.unencrypted_logs);
        self.l2_to_l1_messages.extend(child.l2_to_l1_messages);
    }
}

// =============================================================================
// JOURNAL EVENTS
// =============================================================================

/// One journal operation, recorded for the execution trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    /// Storage read and the value observed.
    StorageRead {
        address: Address,
        #[serde(with = "serde_fr")]
        slot: Fr,
        #[serde(with = "serde_fr")]
        value: Fr,
    },
    /// Storage write.
    StorageWrite {
        address: Address,
        #[serde(with = "serde_fr")]
        slot: Fr,
        #[serde(with = "serde_fr")]
        value: Fr,
        counter: u32,
    },
    /// Note hash membership check.
    NoteHashCheck {
        #[serde(with = "serde_fr")]
        note_hash: Fr,
        #[serde(with = "serde_fr")]
        leaf_index: Fr,
        exists: bool,
    },
    /// Note hash emission.
    NoteHashEmit {
        address: Address,
        #[serde(with = "serde_fr")]
        note_hash: Fr,
        counter: u32,
    },
    /// Nullifier membership check.
    NullifierCheck {
        address: Address,
        #[serde(with = "serde_fr")]
        nullifier: Fr,
        exists: bool,
    },
    /// Nullifier emission.
    NullifierEmit {
        address: Address,
        #[serde(with = "serde_fr")]
        nullifier: Fr,
        counter: u32,
    },
    /// L1 to L2 message membership check.
    L1ToL2MessageCheck {
        #[serde(with = "serde_fr")]
        message_hash: Fr,
        #[serde(with = "serde_fr")]
        leaf_index: Fr,
        exists: bool,
    },
    /// Unencrypted log emission.
    LogEmit {
        address: Address,
        length: usize,
        counter: u32,
    },
    /// L2 to L1 message emission.
    L2ToL1MessageEmit {
        address: Address,
        #[serde(with = "serde_fr")]
        recipient: Fr,
        #[serde(with = "serde_fr")]
        content: Fr,
        counter: u32,
    },
    /// Child node created for a nested call.
    Fork { parent: NodeId, child: NodeId },
    /// Child node folded into its parent.
    Merge { child: NodeId, parent: NodeId },
    /// Child node dropped.
    Discard { child: NodeId },
}

// =============================================================================
// JOURNAL
// =============================================================================

/// Transaction-wide journal.
pub struct WorldStateJournal<'a> {
    world_state: &'a dyn WorldStateReader,
    tree: ForkTree<JournalNode>,
    limits: SideEffectLimits,
    side_effect_counter: u32,
    record_events: bool,
    events: Vec<JournalEvent>,
}

impl<'a> WorldStateJournal<'a> {
    /// Creates an empty journal over committed world state.
    #[must_use]
    pub fn new(
        world_state: &'a dyn WorldStateReader,
        limits: SideEffectLimits,
        record_events: bool,
    ) -> Self {
        Self {
            world_state,
            tree: ForkTree::new(),
            limits,
            side_effect_counter: 0,
            record_events,
            events: Vec::new(),
        }
    }

    /// Transaction root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    fn record(&mut self, event: JournalEvent) {
        if self.record_events {
            self.events.push(event);
        }
    }

    fn next_counter(&mut self) -> u32 {
        let counter = self.side_effect_counter;
        self.side_effect_counter += 1;
        counter
    }

    /// Side effects emitted so far, including ones later discarded.
    #[must_use]
    pub fn side_effect_counter(&self) -> u32 {
        self.side_effect_counter
    }

    /// Number of recorded events.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Drains the recorded events.
    pub fn take_events(&mut self) -> Vec<JournalEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending data of a node.
    ///
    /// # Errors
    ///
    /// Fails if `node` is unknown.
    pub fn node(&self, node: NodeId) -> Result<&JournalNode, ForkTreeError> {
        self.tree.get(node)
    }

    // -------------------------------------------------------------------------
    // Fork / merge
    // -------------------------------------------------------------------------

    /// Forks a child node for a nested call.
    ///
    /// # Errors
    ///
    /// Fails if `parent` is unknown or finalized.
    pub fn fork(&mut self, parent: NodeId) -> Result<NodeId, ForkTreeError> {
        let child = self.tree.fork(parent)?;
        trace!(parent = parent.0, child = child.0, "journal fork");
        self.record(JournalEvent::Fork { parent, child });
        Ok(child)
    }

    /// Accepts a child's effects into its parent.
    ///
    /// # Errors
    ///
    /// Fails if `child` is the root, unknown or finalized.
    pub fn merge(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        let parent = self.tree.merge(child)?;
        trace!(child = child.0, parent = parent.0, "journal merge");
        self.record(JournalEvent::Merge { child, parent });
        Ok(parent)
    }

    /// Drops a child's effects.
    ///
    /// # Errors
    ///
    /// Fails if `child` is the root, unknown or finalized.
    pub fn discard(&mut self, child: NodeId) -> Result<NodeId, ForkTreeError> {
        let parent = self.tree.discard(child)?;
        trace!(child = child.0, parent = parent.0, "journal discard");
        self.record(JournalEvent::Discard { child });
        Ok(parent)
    }

    fn check_limit(&self, node: NodeId, kind: SideEffectKind) -> Result<(), ExecutionError> {
        let used: usize = self
            .tree
            .lineage_data(node)?
            .iter()
            .map(|n| n.count(kind))
            .sum();
        let limit = self.limits.limit(kind);
        if used >= limit {
            return Err(AvmError::SideEffectLimitReached { kind, limit }.into());
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Storage
    // -------------------------------------------------------------------------

    /// Reads a slot: pending writes along the lineage first, then world state.
    ///
    /// # Errors
    ///
    /// Propagates world-state and fork-tree failures (both fatal).
    pub fn read_storage(
        &mut self,
        node: NodeId,
        address: Address,
        slot: Fr,
    ) -> Result<Fr, ExecutionError> {
        let pending = self
            .tree
            .lineage_data(node)?
            .into_iter()
            .find_map(|n| n.storage.get(&(address, slot)).copied());
        let value = match pending {
            Some(value) => value,
            None => self.world_state.storage_read(address, slot)?,
        };
        self.record(JournalEvent::StorageRead {
            address,
            slot,
            value,
        });
        Ok(value)
    }

    /// Records a storage write in `node`.
    ///
    /// # Errors
    ///
    /// `SideEffectLimitReached` halt, or a fatal fork-tree error.
    pub fn write_storage(
        &mut self,
        node: NodeId,
        address: Address,
        slot: Fr,
        value: Fr,
    ) -> Result<(), ExecutionError> {
        self.check_limit(node, SideEffectKind::PublicDataWrites)?;
        let counter = self.next_counter();
        let data = self.tree.get_mut(node)?;
        data.storage.insert((address, slot), value);
        data.storage_writes.push(PublicDataWrite {
            contract_address: address,
            slot,
            value,
            counter,
        });
        self.record(JournalEvent::StorageWrite {
            address,
            slot,
            value,
            counter,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Note hashes
    // -------------------------------------------------------------------------

    /// Checks the note hash tree at `leaf_index`.
    ///
    /// Pending note hashes have no leaf index yet, so only committed state
    /// is consulted.
    ///
    /// # Errors
    ///
    /// Propagates world-state failures.
    pub fn check_note_hash_exists(
        &mut self,
        note_hash: Fr,
        leaf_index: Fr,
    ) -> Result<bool, ExecutionError> {
        let exists = self.world_state.note_hash_exists(note_hash, leaf_index)?;
        self.record(JournalEvent::NoteHashCheck {
            note_hash,
            leaf_index,
            exists,
        });
        Ok(exists)
    }

    /// Emits a note hash.
    ///
    /// # Errors
    ///
    /// `SideEffectLimitReached` halt, or a fatal fork-tree error.
    pub fn write_note_hash(
        &mut self,
        node: NodeId,
        address: Address,
        note_hash: Fr,
    ) -> Result<(), ExecutionError> {
        self.check_limit(node, SideEffectKind::NoteHashes)?;
        let counter = self.next_counter();
        self.tree.get_mut(node)?.note_hashes.push(NoteHash {
            contract_address: address,
            value: note_hash,
            counter,
        });
        self.record(JournalEvent::NoteHashEmit {
            address,
            note_hash,
            counter,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Nullifiers
    // -------------------------------------------------------------------------

    fn nullifier_pending(
        &self,
        node: NodeId,
        address: Address,
        nullifier: Fr,
    ) -> Result<bool, ForkTreeError> {
        Ok(self
            .tree
            .lineage_data(node)?
            .iter()
            .any(|n| n.nullifier_set.contains(&(address, nullifier))))
    }

    /// Checks pending nullifiers along the lineage, then world state.
    ///
    /// # Errors
    ///
    /// Propagates world-state and fork-tree failures.
    pub fn check_nullifier_exists(
        &mut self,
        node: NodeId,
        address: Address,
        nullifier: Fr,
    ) -> Result<bool, ExecutionError> {
        let exists = self.nullifier_pending(node, address, nullifier)?
            || self.world_state.nullifier_exists(address, nullifier)?;
        self.record(JournalEvent::NullifierCheck {
            address,
            nullifier,
            exists,
        });
        Ok(exists)
    }

    /// Emits a nullifier.
    ///
    /// # Errors
    ///
    /// `DuplicateNullifier` if it is pending or committed,
    /// `SideEffectLimitReached` past the limit.
    pub fn write_nullifier(
        &mut self,
        node: NodeId,
        address: Address,
        nullifier: Fr,
    ) -> Result<(), ExecutionError> {
        if self.nullifier_pending(node, address, nullifier)?
            || self.world_state.nullifier_exists(address, nullifier)?
        {
            return Err(AvmError::DuplicateNullifier.into());
        }
        self.check_limit(node, SideEffectKind::Nullifiers)?;
        let counter = self.next_counter();
        let data = self.tree.get_mut(node)?;
        data.nullifier_set.insert((address, nullifier));
        data.nullifiers.push(Nullifier {
            contract_address: address,
            value: nullifier,
            counter,
        });
        self.record(JournalEvent::NullifierEmit {
            address,
            nullifier,
            counter,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Messages and logs
    // -------------------------------------------------------------------------

    /// Checks the L1 to L2 message tree at `leaf_index`.
    ///
    /// # Errors
    ///
    /// Propagates world-state failures.
    pub fn check_l1_to_l2_message_exists(
        &mut self,
        message_hash: Fr,
        leaf_index: Fr,
    ) -> Result<bool, ExecutionError> {
        let exists = self
            .world_state
            .l1_to_l2_message_exists(message_hash, leaf_index)?;
        self.record(JournalEvent::L1ToL2MessageCheck {
            message_hash,
            leaf_index,
            exists,
        });
        Ok(exists)
    }

    /// Emits an unencrypted log.
    ///
    /// # Errors
    ///
    /// `SideEffectLimitReached` halt, or a fatal fork-tree error.
    pub fn write_unencrypted_log(
        &mut self,
        node: NodeId,
        address: Address,
        fields: Vec<Fr>,
    ) -> Result<(), ExecutionError> {
        self.check_limit(node, SideEffectKind::UnencryptedLogs)?;
        let counter = self.next_counter();
        let length = fields.len();
        self.tree.get_mut(node)?.unencrypted_logs.push(UnencryptedLog {
            contract_address: address,
            fields,
            counter,
        });
        self.record(JournalEvent::LogEmit {
            address,
            length,
            counter,
        });
        Ok(())
    }

    /// Emits an L2 to L1 message.
    ///
    /// # Errors
    ///
    /// `SideEffectLimitReached` halt, or a fatal fork-tree error.
    pub fn write_l2_to_l1_message(
        &mut self,
        node: NodeId,
        address: Address,
        recipient: Fr,
        content: Fr,
    ) -> Result<(), ExecutionError> {
        self.check_limit(node, SideEffectKind::L2ToL1Messages)?;
        let counter = self.next_counter();
        self.tree.get_mut(node)?.l2_to_l1_messages.push(L2ToL1Message {
            contract_address: address,
            recipient,
            content,
            counter,
        });
        self.record(JournalEvent::L2ToL1MessageEmit {
            address,
            recipient,
            content,
            counter,
        });
        Ok(())
    }

    /// Side effects held by `node` itself.
    ///
    /// After the top-level call merges, the root holds everything accepted.
    ///
    /// # Errors
    ///
    /// Fails if `node` is unknown.
    pub fn side_effects(&self, node: NodeId) -> Result<SideEffects, ForkTreeError> {
        let data = self.tree.get(node)?;
        Ok(SideEffects {
            public_data_writes: data.storage_writes.clone(),
            note_hashes: data.note_hashes.clone(),
            nullifiers: data.nullifiers.clone(),
            unencrypted_logs: data.unencrypted_logs.clone(),
            l2_to_l1_messages: data.l2_to_l1_messages.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
