//! # AVM Context
//!
//! One call's environment and machine state, plus the journal and bytecode
//! hint nodes it writes into.

use super::bytecode_cache::BytecodeHintsCache;
use super::environment::{CallKind, ExecutionEnvironment};
use super::fork_tree::NodeId;
use super::journal::WorldStateJournal;
use super::machine_state::MachineState;
use crate::domain::value_objects::{Address, Fr, FunctionSelector, Gas};
use crate::errors::ForkTreeError;

/// Execution context of one call.
#[derive(Debug)]
pub struct AvmContext {
    /// Immutable call data.
    pub env: ExecutionEnvironment,
    /// Mutable machine state.
    pub machine_state: MachineState,
    /// Journal node receiving this call's side effects.
    pub journal_node: NodeId,
    /// Bytecode hints node for classes loaded by this call.
    pub hints_node: NodeId,
}

impl AvmContext {
    /// Context for the top-level call.
    #[must_use]
    pub fn new(
        env: ExecutionEnvironment,
        gas: Gas,
        journal_node: NodeId,
        hints_node: NodeId,
        trace_memory: bool,
    ) -> Self {
        Self {
            env,
            machine_state: MachineState::new(gas, trace_memory),
            journal_node,
            hints_node,
        }
    }

    /// Forks a context for CALL or STATICCALL.
    ///
    /// # Errors
    ///
    /// Fails if this context's nodes are no longer live.
    #[allow(clippy::too_many_arguments)]
    pub fn create_nested_call(
        &self,
        journal: &mut WorldStateJournal<'_>,
        hints: &mut BytecodeHintsCache,
        target: Address,
        calldata: Vec<Fr>,
        function_selector: FunctionSelector,
        gas: Gas,
        kind: CallKind,
        trace_memory: bool,
    ) -> Result<Self, ForkTreeError> {
        let env = self
            .env
            .derive_nested(target, calldata, function_selector, kind);
        let journal_node = journal.fork(self.journal_node)?;
        let hints_node = hints.fork(self.hints_node)?;
        Ok(Self::new(env, gas, journal_node, hints_node, trace_memory))
    }
}
