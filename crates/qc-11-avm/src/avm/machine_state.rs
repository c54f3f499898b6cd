//! # Machine State
//!
//! Mutable per-call state: program counter, internal call stack, gas,
//! memory and halt status.

use super::memory::TaggedMemory;
use super::revert_reason::RevertReason;
use crate::domain::value_objects::{Fr, Gas};
use crate::errors::AvmError;
use serde::Serialize;

/// How a call ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HaltKind {
    /// RETURN.
    Success,
    /// REVERT.
    Revert,
    /// An instruction failed.
    ExceptionalError,
}

/// Interpreter state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ExecutionStatus {
    /// Fetching and executing instructions.
    Running,
    /// Terminal.
    Halted(HaltKind),
}

/// Per-call machine state.
#[derive(Debug)]
pub struct MachineState {
    /// Index of the next instruction.
    pub pc: u32,
    /// Return locations pushed by INTERNALCALL.
    pub internal_call_stack: Vec<u32>,
    /// Remaining gas in each budget.
    pub gas_left: Gas,
    /// Call memory.
    pub memory: TaggedMemory,
    /// Running or halted.
    pub status: ExecutionStatus,
    /// RETURN/REVERT payload once halted.
    pub output: Vec<Fr>,
    /// Output of the most recent nested call.
    pub nested_returndata: Vec<Fr>,
    /// Success flag of the most recent nested call.
    pub nested_call_success: bool,
    /// Revert reason of the most recent failed nested call.
    pub collected_revert_info: Option<RevertReason>,
    /// Why this call failed, once halted with REVERT or an error.
    pub revert_reason: Option<RevertReason>,
}

impl MachineState {
    /// Fresh state with `gas` allocated.
    #[must_use]
    pub fn new(gas: Gas, trace_memory: bool) -> Self {
        Self {
            pc: 0,
            internal_call_stack: Vec::new(),
            gas_left: gas,
            memory: TaggedMemory::new(trace_memory),
            status: ExecutionStatus::Running,
            output: Vec::new(),
            nested_returndata: Vec::new(),
            nested_call_success: false,
            collected_revert_info: None,
            revert_reason: None,
        }
    }

    /// True until a halt.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Deducts `cost` from all budgets.
    ///
    /// # Errors
    ///
    /// `OutOfGas` naming the first short budget. Every budget is then zero,
    /// so a call that runs out of gas consumes its whole allocation.
    pub fn consume_gas(&mut self, cost: Gas) -> Result<(), AvmError> {
        if let Some(dimension) = self.gas_left.first_shortfall(&cost) {
            self.gas_left = Gas::zero();
            return Err(AvmError::OutOfGas { dimension });
        }
        self.gas_left = self.gas_left.saturating_sub(&cost);
        Ok(())
    }

    /// Gives back gas a nested call did not use.
    pub fn refund_gas(&mut self, gas: Gas) {
        self.gas_left = self.gas_left.saturating_add(&gas);
    }

    /// Pushes a return location for INTERNALCALL.
    ///
    /// # Errors
    ///
    /// `InternalCallStackOverflow` past `max_depth`.
    pub fn push_internal_call(&mut self, return_pc: u32, max_depth: usize) -> Result<(), AvmError> {
        if self.internal_call_stack.len() >= max_depth {
            return Err(AvmError::InternalCallStackOverflow { max: max_depth });
        }
        self.internal_call_stack.push(return_pc);
        Ok(())
    }

    /// Pops a return location for INTERNALRETURN.
    ///
    /// # Errors
    ///
    /// `InternalCallStackUnderflow` if the stack is empty.
    pub fn pop_internal_call(&mut self) -> Result<u32, AvmError> {
        self.internal_call_stack
            .pop()
            .ok_or(AvmError::InternalCallStackUnderflow)
    }

    /// Halts with RETURN or REVERT data.
    pub fn halt(&mut self, kind: HaltKind, output: Vec<Fr>) {
        self.status = ExecutionStatus::Halted(kind);
        self.output = output;
    }

    /// The current pc followed by pending internal return locations,
    /// innermost first.
    #[must_use]
    pub fn pc_trace(&self) -> Vec<u32> {
        std::iter::once(self.pc)
            .chain(self.internal_call_stack.iter().rev().copied())
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::GasDimension;

    #[test]
    fn test_consume_gas() {
        let mut state = MachineState::new(Gas::new(100, 10, 0), false);
        state.consume_gas(Gas::new(40, 10, 0)).unwrap();
        assert_eq!(state.gas_left, Gas::new(60, 0, 0));
    }

    #[test]
    fn test_out_of_gas_clamps_to_zero() {
        let mut state = MachineState::new(Gas::new(100, 10, 0), false);
        let err = state.consume_gas(Gas::new(50, 11, 0)).unwrap_err();
        assert_eq!(
            err,
            AvmError::OutOfGas {
                dimension: GasDimension::Da
            }
        );
        assert_eq!(err.to_string(), "Not enough DAGAS gas left");
        assert_eq!(state.gas_left, Gas::zero());
    }

    #[test]
    fn test_exact_cost_leaves_zero_without_error() {
        let mut state = MachineState::new(Gas::new(100, 10, 0), false);
        state.consume_gas(Gas::new(100, 10, 0)).unwrap();
        assert_eq!(state.gas_left, Gas::zero());
    }

    #[test]
    fn test_internal_call_stack() {
        let mut state = MachineState::new(Gas::zero(), false);
        assert_eq!(
            state.pop_internal_call(),
            Err(AvmError::InternalCallStackUnderflow)
        );
        state.push_internal_call(5, 2).unwrap();
        state.push_internal_call(9, 2).unwrap();
        assert_eq!(
            state.push_internal_call(11, 2),
            Err(AvmError::InternalCallStackOverflow { max: 2 })
        );
        state.pc = 20;
        assert_eq!(state.pc_trace(), vec![20, 9, 5]);
        assert_eq!(state.pop_internal_call(), Ok(9));
    }

    #[test]
    fn test_halt() {
        let mut state = MachineState::new(Gas::zero(), false);
        assert!(state.is_running());
        state.halt(HaltKind::Revert, vec![Fr::from(42u64)]);
        assert_eq!(state.status, ExecutionStatus::Halted(HaltKind::Revert));
        assert_eq!(state.output, vec![Fr::from(42u64)]);
    }
}
