//! # Error Types
//!
//! All error types for public execution.
//!
//! | Type | Scope | Outcome |
//! |------|-------|---------|
//! | [`AvmError`] | one instruction | exceptional halt, the call reverts |
//! | [`DecodeError`] | bytecode | fatal, the transaction is rejected |
//! | [`FatalError`] | transaction | fatal, the transaction is rejected |
//! | [`SimulationError`] | service | returned to the orchestrator |

use crate::avm::memory_types::TypeTag;
use crate::avm::opcodes::Opcode;
use crate::domain::value_objects::{Address, GasDimension};
use std::fmt;
use thiserror::Error;

// =============================================================================
// EXCEPTIONAL HALTS
// =============================================================================

/// Errors that halt the current call exceptionally.
///
/// An exceptional halt reverts the call's journal node. The caller observes
/// `success = false` and decides on its own whether to continue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AvmError {
    /// Operand tag differs from the tag the instruction requires.
    #[error("Tag mismatch at offset {offset}, got {found}, expected {expected}")]
    TagMismatch {
        offset: u32,
        expected: TypeTag,
        found: TypeTag,
    },

    /// The operation is undefined for this tag (e.g. bitwise ops on a field).
    #[error("Invalid tag {tag} for this operation")]
    InvalidTag { tag: TypeTag },

    /// Access outside the 2^32 address space.
    #[error("Memory access out of bounds: offset {offset}, size {size}")]
    MemoryOutOfBounds { offset: u64, size: u64 },

    /// One of the gas budgets is exhausted.
    #[error("Not enough {} gas left", .dimension.label())]
    OutOfGas { dimension: GasDimension },

    /// Program counter ran past the end of the bytecode.
    #[error("Invalid program counter {pc}, max is {max}")]
    InvalidProgramCounter { pc: u32, max: u32 },

    /// Integer or field division by zero.
    #[error("Division by zero")]
    DivisionByZero,

    /// INTERNALRETURN with an empty internal call stack.
    #[error("Internal call stack empty")]
    InternalCallStackUnderflow,

    /// INTERNALCALL beyond the configured internal depth.
    #[error("Internal call stack exceeded max depth {max}")]
    InternalCallStackOverflow { max: usize },

    /// State-modifying instruction inside a static call.
    #[error("Static call cannot update the state, emit L2->L1 messages or generate logs")]
    StaticCallAlteration,

    /// Nullifier already present in the pending journal or the world state.
    #[error("Attempted to emit duplicate nullifier")]
    DuplicateNullifier,

    /// Per-transaction side-effect limit reached.
    #[error("Reached the limit on number of {kind} per tx: {limit}")]
    SideEffectLimitReached { kind: SideEffectKind, limit: usize },

    /// TORADIXBE radix outside 2..=256.
    #[error("Invalid radix {radix}, must be between 2 and 256")]
    InvalidRadix { radix: u32 },
}

impl AvmError {
    /// Returns true for errors raised by a failed tag check.
    #[must_use]
    pub fn is_tag_error(&self) -> bool {
        matches!(self, Self::TagMismatch { .. } | Self::InvalidTag { .. })
    }

    /// Returns true if this halt was caused by gas exhaustion.
    #[must_use]
    pub fn is_out_of_gas(&self) -> bool {
        matches!(self, Self::OutOfGas { .. })
    }
}

/// Kinds of per-transaction side effects that are capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideEffectKind {
    /// Storage writes.
    PublicDataWrites,
    /// Emitted note hashes.
    NoteHashes,
    /// Emitted nullifiers.
    Nullifiers,
    /// Unencrypted logs.
    UnencryptedLogs,
    /// L2 to L1 messages.
    L2ToL1Messages,
}

impl SideEffectKind {
    /// Every kind, in reporting order.
    pub const ALL: [Self; 5] = [
        Self::PublicDataWrites,
        Self::NoteHashes,
        Self::Nullifiers,
        Self::UnencryptedLogs,
        Self::L2ToL1Messages,
    ];
}

impl fmt::Display for SideEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PublicDataWrites => "public data writes",
            Self::NoteHashes => "note hashes",
            Self::Nullifiers => "nullifiers",
            Self::UnencryptedLogs => "unencrypted logs",
            Self::L2ToL1Messages => "L2 to L1 messages",
        })
    }
}

// =============================================================================
// DECODE ERRORS
// =============================================================================

/// Malformed bytecode. Detected before execution starts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Byte does not name an opcode.
    #[error("invalid opcode 0x{byte:02x} at byte {position}")]
    InvalidOpcode { byte: u8, position: usize },

    /// Bytecode ended in the middle of an instruction.
    #[error("truncated operands for {opcode} at byte {position}")]
    Truncated { opcode: Opcode, position: usize },

    /// Type tag byte out of range.
    #[error("invalid tag value {value} at byte {position}")]
    InvalidTag { value: u8, position: usize },

    /// GETENVVAR selector out of range.
    #[error("invalid environment variable {value} at byte {position}")]
    InvalidEnvironmentVariable { value: u8, position: usize },

    /// GETCONTRACTINSTANCE member out of range.
    #[error("invalid contract instance member {value} at byte {position}")]
    InvalidContractMember { value: u8, position: usize },
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from the world-state and contracts database ports.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Backing store unreachable.
    #[error("state subsystem unavailable")]
    Unavailable,

    /// Backing store returned inconsistent data.
    #[error("state corruption detected: {0}")]
    Corrupted(String),

    /// Other state error.
    #[error("state error: {0}")]
    Other(String),
}

// =============================================================================
// FORK TREE ERRORS
// =============================================================================

/// Misuse of a fork tree (journal or bytecode hints).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForkTreeError {
    /// Node id was never allocated.
    #[error("unknown fork node {0}")]
    UnknownNode(u32),

    /// Node was already merged or discarded.
    #[error("fork node {0} has already been merged or discarded")]
    AlreadyFinalized(u32),

    /// The root has no parent to merge into.
    #[error("cannot merge or discard the root node")]
    RootFinalization,
}

// =============================================================================
// FATAL ERRORS
// =============================================================================

/// Errors that abort the whole transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// Contract bytecode could not be decoded.
    #[error("failed to decode bytecode of {address}: {source}")]
    Decode {
        address: Address,
        #[source]
        source: DecodeError,
    },

    /// Too many unique contract classes touched by one transaction.
    #[error("Reached the limit on number of unique contract classes per tx: {limit}")]
    ProtocolLimitExceeded { limit: usize },

    /// World-state or contracts database failure.
    #[error("world state access failed: {0}")]
    State(#[from] StateError),

    /// Journal or bytecode cache misuse.
    #[error("internal journal error: {0}")]
    ForkTree(#[from] ForkTreeError),
}

// =============================================================================
// INSTRUCTION OUTCOME
// =============================================================================

/// Error returned by an instruction handler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Halt the current call.
    #[error(transparent)]
    Halt(#[from] AvmError),

    /// Abort the transaction.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl From<StateError> for ExecutionError {
    fn from(err: StateError) -> Self {
        Self::Fatal(FatalError::State(err))
    }
}

impl From<ForkTreeError> for ExecutionError {
    fn from(err: ForkTreeError) -> Self {
        Self::Fatal(FatalError::ForkTree(err))
    }
}

// =============================================================================
// SERVICE ERRORS
// =============================================================================

/// Errors surfaced by the public execution service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// The transaction must be excluded from the block.
    #[error("transaction rejected: {0}")]
    Rejected(#[from] FatalError),

    /// Caller-level timeout abandoned the simulation.
    #[error("simulation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The blocking worker panicked or was cancelled.
    #[error("simulation worker failed: {0}")]
    Worker(String),
}

impl SimulationError {
    /// Returns true if re-running the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected(FatalError::State(_)) | Self::Timeout { .. } | Self::Worker(_) => true,
            Self::Rejected(_) => false,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
