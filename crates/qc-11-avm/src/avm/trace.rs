//! # Execution Trace
//!
//! Per-instruction record of memory, gas and journal activity. It is the
//! witness input handed to the proving pipeline.

use super::journal::JournalEvent;
use super::memory::MemoryAccess;
use super::opcodes::Opcode;
use crate::domain::value_objects::{Address, Gas};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// One executed instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceRow {
    /// Depth of the executing call.
    pub call_depth: u32,
    /// Executing contract.
    pub address: Address,
    /// Instruction index.
    pub pc: u32,
    /// Executed opcode.
    pub opcode: Opcode,
    /// Gas before the instruction.
    pub gas_before: Gas,
    /// Gas after the instruction (including any nested call).
    pub gas_after: Gas,
    /// Memory reads and writes, in order.
    pub memory_accesses: Vec<MemoryAccess>,
    /// Indices into [`ExecutionTrace::journal_events`].
    pub journal_events: Range<usize>,
}

/// Whole-transaction trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionTrace {
    /// Rows in execution order. A CALL row follows the rows of its callee.
    pub rows: Vec<TraceRow>,
    /// Every journal operation of the transaction.
    pub journal_events: Vec<JournalEvent>,
}

impl ExecutionTrace {
    /// Number of executed instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if nothing executed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Journal events caused by one row.
    #[must_use]
    pub fn events_of(&self, row: &TraceRow) -> &[JournalEvent] {
        self.journal_events
            .get(row.journal_events.clone())
            .unwrap_or_default()
    }

    /// Execution count per opcode name.
    #[must_use]
    pub fn opcode_histogram(&self) -> BTreeMap<&'static str, usize> {
        let mut histogram = BTreeMap::new();
        for row in &self.rows {
            *histogram.entry(row.opcode.name()).or_insert(0) += 1;
        }
        histogram
    }

    /// Serializes the trace as JSON.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` failures.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// =============================================================================
// TESTS
// =============================================================================
