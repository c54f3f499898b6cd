//! # QC-11 AVM - Public Execution Subsystem
//!
//! **Subsystem ID:** 11
//! **Status:** Production-Ready (Phase 3)
//!
//! ## Purpose
//!
//! Executes the public part of rollup transactions on the AVM: a register
//! machine over 2^32 tagged memory cells, metered on three gas budgets, whose
//! world-state side effects are journaled in a fork tree so that a failed
//! nested call can be dropped without touching its caller.
//!
//! ## Call Outcomes
//!
//! | Outcome | Scope | Transaction |
//! |---------|-------|-------------|
//! | `RETURN` | current call | side effects merged into the caller |
//! | `REVERT` / exceptional halt | current call | side effects discarded, gas charged |
//! | `FatalError` | whole transaction | rejected, excluded from the block |
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas Limit Enforcement | `domain/invariants.rs` - `check_gas_limit_invariant()` |
//! | No Side Effects on Revert | `domain/invariants.rs` - `check_revert_isolation_invariant()` |
//! | Static Call Purity | `domain/invariants.rs` - `check_static_purity_invariant()` |
//! | Side-Effect Limits | `domain/invariants.rs` - `check_side_effect_limits_invariant()` |
//! | Emission Order | `domain/invariants.rs` - `check_emission_order_invariant()` |
//! | Call Depth Limit | `domain/invariants.rs` - `check_call_depth_invariant()` |
//!
//! ### Execution Limits
//!
//! | Limit | Default | Purpose |
//! |-------|---------|---------|
//! | `max_call_depth` | 16 | Bounded CALL recursion |
//! | `max_unique_contract_classes` | 21 | Bytecode per transaction |
//! | `max_internal_call_depth` | 1024 | INTERNALCALL stack |
//! | `simulation_timeout_ms` | 5 seconds | Caller-level timeout |
//!
//! ## Outbound Dependencies
//!
//! | Subsystem | Trait | Purpose |
//! |-----------|-------|---------|
//! | 4 (State Mgmt) | `WorldStateReader` | Committed storage and tree membership |
//! | 4 (State Mgmt) | `ContractsDb` | Contract instances, classes, debug names |
//!
//! ## AVM Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Simulator | `avm/simulator.rs` | Interpreter loop and nested calls |
//! | Memory | `avm/memory.rs` | Tagged memory |
//! | Gas | `avm/gas.rs` | Cost tables |
//! | Journal | `avm/journal.rs` | Forked pending state |
//! | Codec | `avm/bytecode.rs` | Bytecode decoding and encoding |
//!
//! ## Usage Example
//!
//! ```ignore
//! use qc_11_avm::prelude::*;
//!
//! let result = api.simulate(call).await?;
//! if let Some(reason) = &result.revert_reason {
//!     println!("Reverted: {reason}");
//! }
//! println!("Gas used: {}", result.gas_used);
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod avm;
pub mod domain;
pub mod errors;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod ports;
pub mod service;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AvmConfig, ContractClass, ContractInstance, EnqueuedCall, GlobalVariables, SideEffectLimits,
        SideEffects, TxExecutionResult,
    };

    // Value objects
    pub use crate::domain::value_objects::{Address, Fr, FunctionSelector, Gas, GasDimension};

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::{PublicExecutionApi, ServiceStats};
    pub use crate::ports::outbound::{ContractsDb, WorldStateReader};

    // Errors
    pub use crate::errors::{
        AvmError, DecodeError, FatalError, SimulationError, StateError,
    };

    // AVM components
    pub use crate::avm::{
        decode_bytecode, encode_bytecode, AvmSimulator, ExecutionTrace, Instruction, Opcode,
        RevertReason, TaggedValue, TypeTag,
    };

    // Adapters
    pub use crate::adapters::{compute_class_id, InMemoryContractsDb, InMemoryWorldState};

    // Service
    pub use crate::service::{create_test_service, PublicExecutionService, ServiceConfig};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Subsystem ID for IPC.
pub const SUBSYSTEM_ID: u8 = 11;

/// Subsystem name.
pub const SUBSYSTEM_NAME: &str = "Public Execution";

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsystem_id() {
        assert_eq!(SUBSYSTEM_ID, 11);
        assert_eq!(SUBSYSTEM_NAME, "Public Execution");
    }

    #[test]
    fn test_prelude_exports() {
        // Verify prelude exports compile
        use prelude::*;
        let _ = AvmConfig::default();
        let _ = Address::zero();
        let _ = Gas::zero();
    }
}
