//! # In-Memory Adapters
//!
//! World state and contracts database held in memory. Used by tests and
//! local simulation; production adapters talk to the state subsystem.

use crate::domain::entities::{ContractClass, ContractInstance, SideEffects};
use crate::domain::value_objects::{fr_from_be_bytes, fr_low_u128, Address, Fr, FunctionSelector};
use crate::errors::StateError;
use crate::ports::outbound::{ContractsDb, WorldStateReader};
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};
use std::collections::{HashMap, HashSet};

/// Class id of a bytecode: keccak256 reduced into the field.
#[must_use]
pub fn compute_class_id(bytecode: &[u8]) -> Fr {
    fr_from_be_bytes(&Keccak256::digest(bytecode))
}

// =============================================================================
// WORLD STATE
// =============================================================================

/// In-memory committed world state.
#[derive(Debug, Default)]
pub struct InMemoryWorldState {
    storage: RwLock<HashMap<(Address, Fr), Fr>>,
    note_hashes: RwLock<Vec<Fr>>,
    nullifiers: RwLock<HashSet<(Address, Fr)>>,
    l1_to_l2_messages: RwLock<Vec<Fr>>,
}

impl InMemoryWorldState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a storage slot.
    pub fn set_storage(&self, address: Address, slot: Fr, value: Fr) {
        self.storage.write().insert((address, slot), value);
    }

    /// Appends a note hash leaf and returns its index.
    pub fn add_note_hash(&self, note_hash: Fr) -> u64 {
        let mut leaves = self.note_hashes.write();
        leaves.push(note_hash);
        leaves.len() as u64 - 1
    }

    /// Marks a nullifier as committed.
    pub fn add_nullifier(&self, address: Address, nullifier: Fr) {
        self.nullifiers.write().insert((address, nullifier));
    }

    /// Appends an L1 to L2 message leaf and returns its index.
    pub fn add_l1_to_l2_message(&self, message_hash: Fr) -> u64 {
        let mut leaves = self.l1_to_l2_messages.write();
        leaves.push(message_hash);
        leaves.len() as u64 - 1
    }

    /// Applies the accepted side effects of a transaction.
    pub fn commit(&self, effects: &SideEffects) {
        {
            let mut storage = self.storage.write();
            for write in &effects.public_data_writes {
                storage.insert((write.contract_address, write.slot), write.value);
            }
        }
        self.note_hashes
            .write()
            .extend(effects.note_hashes.iter().map(|n| n.value));
        self.nullifiers.write().extend(
            effects
                .nullifiers
                .iter()
                .map(|n| (n.contract_address, n.value)),
        );
    }

    fn leaf_at(leaves: &[Fr], value: Fr, leaf_index: Fr) -> bool {
        usize::try_from(fr_low_u128(&leaf_index))
            .ok()
            .filter(|_| Fr::from(fr_low_u128(&leaf_index)) == leaf_index)
            .and_then(|i| leaves.get(i))
            .is_some_and(|leaf| *leaf == value)
    }
}

impl WorldStateReader for InMemoryWorldState {
    fn storage_read(&self, address: Address, slot: Fr) -> Result<Fr, StateError> {
        Ok(self
            .storage
            .read()
            .get(&(address, slot))
            .copied()
            .unwrap_or_default())
    }

    fn note_hash_exists(&self, note_hash: Fr, leaf_index: Fr) -> Result<bool, StateError> {
        Ok(Self::leaf_at(&self.note_hashes.read(), note_hash, leaf_index))
    }

    fn nullifier_exists(&self, address: Address, nullifier: Fr) -> Result<bool, StateError> {
        Ok(self.nullifiers.read().contains(&(address, nullifier)))
    }

    fn l1_to_l2_message_exists(&self, message_hash: Fr, leaf_index: Fr) -> Result<bool, StateError> {
        Ok(Self::leaf_at(
            &self.l1_to_l2_messages.read(),
            message_hash,
            leaf_index,
        ))
    }
}

// =============================================================================
// CONTRACTS DATABASE
// =============================================================================

/// In-memory contracts database.
#[derive(Debug, Default)]
pub struct InMemoryContractsDb {
    instances: RwLock<HashMap<Address, ContractInstance>>,
    classes: RwLock<HashMap<Fr, ContractClass>>,
    debug_names: RwLock<HashMap<(Address, FunctionSelector), String>>,
}

impl InMemoryContractsDb {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class, returning its id.
    pub fn add_class(&self, bytecode: Vec<u8>) -> Fr {
        let id = compute_class_id(&bytecode);
        self.classes
            .write()
            .insert(id, ContractClass { id, bytecode });
        id
    }

    /// Registers an instance.
    pub fn add_instance(&self, instance: ContractInstance) {
        self.instances.write().insert(instance.address, instance);
    }

    /// Registers `bytecode` and deploys an instance of it at `address`.
    pub fn deploy(&self, address: Address, bytecode: Vec<u8>) -> ContractInstance {
        let class_id = self.add_class(bytecode);
        let instance = ContractInstance {
            address,
            class_id,
            deployer: Address::zero(),
            initialization_hash: Fr::from(0u64),
        };
        self.add_instance(instance.clone());
        instance
    }

    /// Registers a function name for diagnostics.
    pub fn set_debug_name(&self, address: Address, selector: FunctionSelector, name: &str) {
        self.debug_names
            .write()
            .insert((address, selector), name.to_string());
    }
}

impl ContractsDb for InMemoryContractsDb {
    fn get_contract_instance(
        &self,
        address: Address,
    ) -> Result<Option<ContractInstance>, StateError> {
        Ok(self.instances.read().get(&address).cloned())
    }

    fn get_contract_class(&self, class_id: Fr) -> Result<Option<ContractClass>, StateError> {
        Ok(self.classes.read().get(&class_id).cloned())
    }

    fn get_debug_function_name(
        &self,
        address: Address,
        selector: FunctionSelector,
    ) -> Result<Option<String>, StateError> {
        Ok(self.debug_names.read().get(&(address, selector)).cloned())
    }
}

// =============================================================================
// TESTS
// =============================================================================
