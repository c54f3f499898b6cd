//! # AVM
//!
//! The interpreter and everything it executes against.
//!
//! ## Components
//!
//! - `memory_types.rs` / `memory.rs` - Tagged values and the 2^32-cell memory
//! - `addressing.rs` - Direct and indirect operand resolution
//! - `opcodes.rs` / `instruction.rs` / `bytecode.rs` - Instruction set and wire codec
//! - `gas.rs` - Three-dimensional gas costs
//! - `fork_tree.rs` - Fork/merge/discard tree shared by the journal and hints cache
//! - `journal.rs` - Pending world-state writes and side effects
//! - `bytecode_cache.rs` - Decoded programs and the unique-class limit
//! - `environment.rs` / `machine_state.rs` / `context.rs` - Per-call state
//! - `instructions/` - One handler per instruction class
//! - `simulator.rs` - The interpreter loop
//! - `revert_reason.rs` / `trace.rs` - Diagnostics and the execution trace

pub mod addressing;
pub mod bytecode;
pub mod bytecode_cache;
pub mod context;
pub mod environment;
pub mod fork_tree;
pub mod gas;
pub mod instruction;
mod instructions;
pub mod journal;
pub mod machine_state;
pub mod memory;
pub mod memory_types;
pub mod opcodes;
pub mod revert_reason;
pub mod simulator;
pub mod trace;

pub use bytecode::{decode_bytecode, encode_bytecode};
pub use context::AvmContext;
pub use instruction::Instruction;
pub use memory::TaggedMemory;
pub use memory_types::{TaggedValue, TypeTag, UintValue};
pub use opcodes::Opcode;
pub use revert_reason::RevertReason;
pub use simulator::AvmSimulator;
pub use trace::ExecutionTrace;
