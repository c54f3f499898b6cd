//! # Driven Ports (SPI - Outbound)
//!
//! Interfaces the public execution subsystem depends on:
//! - Committed world state (storage and membership trees)
//! - The contracts database (instances, classes, debug names)
//!
//! Both are synchronous. They are called from inside the deterministic
//! interpreter loop, which never suspends mid-instruction.

use crate::domain::entities::{ContractClass, ContractInstance};
use crate::domain::value_objects::{Address, Fr, FunctionSelector};
use crate::errors::StateError;

// =============================================================================
// WORLD STATE
// =============================================================================

/// Read-only view of committed world state.
///
/// The journal never writes through this interface; accepted writes are
/// committed by the world-state subsystem once the transaction is accepted.
pub trait WorldStateReader: Send + Sync {
    /// Value of a storage slot (zero if never written).
    fn storage_read(&self, address: Address, slot: Fr) -> Result<Fr, StateError>;

    /// True if the note hash tree holds `note_hash` at `leaf_index`.
    fn note_hash_exists(&self, note_hash: Fr, leaf_index: Fr) -> Result<bool, StateError>;

    /// True if `nullifier` was emitted by `address` in a committed block.
    fn nullifier_exists(&self, address: Address, nullifier: Fr) -> Result<bool, StateError>;

    /// True if the L1 to L2 message tree holds `message_hash` at `leaf_index`.
    fn l1_to_l2_message_exists(&self, message_hash: Fr, leaf_index: Fr) -> Result<bool, StateError>;
}

// =============================================================================
// CONTRACTS DATABASE
// =============================================================================

/// Contract metadata and bytecode.
pub trait ContractsDb: Send + Sync {
    /// Deployed instance at `address`.
    ///
    /// # Returns
    ///
    /// * `None` - Nothing is deployed there
    fn get_contract_instance(&self, address: Address)
        -> Result<Option<ContractInstance>, StateError>;

    /// Contract class by id.
    fn get_contract_class(&self, class_id: Fr) -> Result<Option<ContractClass>, StateError>;

    /// Human-readable function name for diagnostics.
    fn get_debug_function_name(
        &self,
        address: Address,
        selector: FunctionSelector,
    ) -> Result<Option<String>, StateError>;
}
