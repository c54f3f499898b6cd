//! # AVM Simulator
//!
//! The interpreter loop. One simulator executes one enqueued call: it owns
//! the transaction's journal and bytecode hints, and runs nested calls by
//! recursing into itself.
//!
//! ## Call outcome
//!
//! Every call, at any depth, resolves into a [`ContractCallResult`]. Halts
//! never unwind past the frame that raised them; only [`FatalError`]s abort
//! the whole transaction.

use super::bytecode_cache::{BytecodeHintsCache, Program};
use super::context::AvmContext;
use super::environment::ExecutionEnvironment;
use super::gas::instruction_gas;
use super::instruction::Instruction;
use super::journal::WorldStateJournal;
use super::machine_state::{ExecutionStatus, HaltKind};
use super::opcodes::Opcode;
use super::revert_reason::{FailingFunction, RevertReason};
use super::trace::{ExecutionTrace, TraceRow};
use crate::domain::entities::{AvmConfig, ContractCallResult, EnqueuedCall, TxExecutionResult};
use crate::domain::value_objects::Gas;
use crate::errors::{AvmError, ExecutionError, FatalError};
use crate::ports::outbound::{ContractsDb, WorldStateReader};
use tracing::{debug, trace};

/// Executes one enqueued call.
pub struct AvmSimulator<'a> {
    pub(crate) contracts: &'a dyn ContractsDb,
    pub(crate) config: AvmConfig,
    pub(crate) journal: WorldStateJournal<'a>,
    pub(crate) hints: BytecodeHintsCache,
    rows: Option<Vec<TraceRow>>,
    instructions_executed: u64,
}

impl<'a> AvmSimulator<'a> {
    /// Creates a simulator over committed state.
    #[must_use]
    pub fn new(
        world_state: &'a dyn WorldStateReader,
        contracts: &'a dyn ContractsDb,
        config: AvmConfig,
    ) -> Self {
        let collect_trace = config.collect_trace;
        Self {
            contracts,
            journal: WorldStateJournal::new(
                world_state,
                config.side_effect_limits.clone(),
                collect_trace,
            ),
            hints: BytecodeHintsCache::new(config.max_unique_contract_classes),
            config,
            rows: collect_trace.then(Vec::new),
            instructions_executed: 0,
        }
    }

    /// Runs `call` to completion.
    ///
    /// A reverted top-level call is still `Ok`: the transaction is includable,
    /// its gas is charged and its side effects are dropped.
    ///
    /// # Errors
    ///
    /// Returns a [`FatalError`] when the transaction must be rejected
    /// (malformed bytecode, protocol limit, world-state failure).
    pub fn simulate(mut self, call: EnqueuedCall) -> Result<TxExecutionResult, FatalError> {
        let tx_journal = self.journal.root();
        let tx_hints = self.hints.root();
        let journal_node = self.journal.fork(tx_journal)?;
        let hints_node = self.hints.fork(tx_hints)?;

        let ctx = AvmContext::new(
            ExecutionEnvironment::from_enqueued(&call),
            call.gas_limit,
            journal_node,
            hints_node,
            self.config.collect_trace,
        );
        debug!(address = %call.address, gas = %call.gas_limit, "simulating enqueued call");

        let result = self.run_call(ctx)?;
        if result.success {
            self.journal.merge(journal_node)?;
            self.hints.merge(hints_node)?;
        } else {
            self.journal.discard(journal_node)?;
            self.hints.discard(hints_node)?;
        }

        let gas_used = call.gas_limit.saturating_sub(&result.gas_left);
        let side_effects = self.journal.side_effects(tx_journal)?;
        let trace = self.rows.take().map(|rows| ExecutionTrace {
            rows,
            journal_events: self.journal.take_events(),
        });

        #[cfg(feature = "metrics")]
        crate::metrics::record_simulation(result.success, &gas_used, self.instructions_executed);

        debug!(
            reverted = !result.success,
            gas_used = %gas_used,
            instructions = self.instructions_executed,
            "enqueued call finished"
        );

        Ok(TxExecutionResult {
            reverted: !result.success,
            return_data: result.output,
            revert_reason: result.revert_reason,
            gas_limit: call.gas_limit,
            gas_used,
            side_effects,
            instructions_executed: self.instructions_executed,
            trace,
        })
    }

    /// Runs one call in `ctx`. The caller merges or discards its nodes.
    pub(crate) fn run_call(&mut self, mut ctx: AvmContext) -> Result<ContractCallResult, FatalError> {
        let Some(program) = self.load_program(&ctx)? else {
            let reason = RevertReason::plain(
                format!("No bytecode found at: {}", ctx.env.address),
                self.failing_function(&ctx.env),
                Vec::new(),
            );
            debug!(address = %ctx.env.address, "no bytecode at call target");
            return Ok(ContractCallResult {
                success: false,
                output: Vec::new(),
                gas_left: ctx.machine_state.gas_left,
                revert_reason: Some(reason),
            });
        };

        self.execute_program(&mut ctx, &program)?;

        let state = ctx.machine_state;
        let success = state.status == ExecutionStatus::Halted(HaltKind::Success);
        Ok(ContractCallResult {
            success,
            output: state.output,
            gas_left: state.gas_left,
            revert_reason: if success { None } else { state.revert_reason },
        })
    }

    fn load_program(&mut self, ctx: &AvmContext) -> Result<Option<Program>, FatalError> {
        let address = ctx.env.address;
        let Some(instance) = self.contracts.get_contract_instance(address)? else {
            return Ok(None);
        };
        let Some(class) = self.contracts.get_contract_class(instance.class_id)? else {
            return Ok(None);
        };
        self.hints
            .get_or_decode(ctx.hints_node, address, &class)
            .map(Some)
    }

    fn execute_program(
        &mut self,
        ctx: &mut AvmContext,
        program: &[Instruction],
    ) -> Result<(), FatalError> {
        while ctx.machine_state.is_running() {
            let pc = ctx.machine_state.pc;
            let Some(instruction) = program.get(pc as usize) else {
                let max = u32::try_from(program.len()).unwrap_or(u32::MAX);
                self.exceptional_halt(ctx, &AvmError::InvalidProgramCounter { pc, max });
                break;
            };

            let gas_before = ctx.machine_state.gas_left;
            let events_start = self.journal.event_count();
            let cost = instruction_gas(instruction);
            trace!(pc, opcode = %instruction.opcode(), "step");

            match self.execute_instruction(ctx, instruction, cost) {
                Ok(()) => {
                    if !sets_pc(instruction) && ctx.machine_state.is_running() {
                        ctx.machine_state.pc = pc.saturating_add(1);
                    }
                }
                Err(ExecutionError::Halt(err)) => self.exceptional_halt(ctx, &err),
                Err(ExecutionError::Fatal(err)) => return Err(err),
            }

            self.instructions_executed += 1;
            self.record_row(ctx, pc, instruction.opcode(), gas_before, events_start);
        }
        Ok(())
    }

    fn exceptional_halt(&self, ctx: &mut AvmContext, err: &AvmError) {
        debug!(
            address = %ctx.env.address,
            pc = ctx.machine_state.pc,
            depth = ctx.env.call_depth,
            error = %err,
            "exceptional halt"
        );
        let reason = RevertReason::exceptional(
            err,
            self.failing_function(&ctx.env),
            ctx.machine_state.pc_trace(),
        );
        ctx.machine_state.revert_reason = Some(reason);
        ctx.machine_state.halt(HaltKind::ExceptionalError, Vec::new());
    }

    /// Function identity for diagnostics. Lookup failures leave the name empty.
    pub(crate) fn failing_function(&self, env: &ExecutionEnvironment) -> FailingFunction {
        FailingFunction {
            address: env.address,
            selector: env.function_selector,
            debug_name: self
                .contracts
                .get_debug_function_name(env.address, env.function_selector)
                .ok()
                .flatten(),
        }
    }

    fn record_row(
        &mut self,
        ctx: &mut AvmContext,
        pc: u32,
        opcode: Opcode,
        gas_before: Gas,
        events_start: usize,
    ) {
        let Some(rows) = self.rows.as_mut() else {
            return;
        };
        rows.push(TraceRow {
            call_depth: ctx.env.call_depth,
            address: ctx.env.address,
            pc,
            opcode,
            gas_before,
            gas_after: ctx.machine_state.gas_left,
            memory_accesses: ctx.machine_state.memory.take_accesses(),
            journal_events: events_start..self.journal.event_count(),
        });
    }
}

/// Instructions that set the pc themselves.
fn sets_pc(instruction: &Instruction) -> bool {
    matches!(
        instruction,
        Instruction::Jump(_)
            | Instruction::JumpI(_)
            | Instruction::InternalCall(_)
            | Instruction::InternalReturn
    )
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryContractsDb, InMemoryWorldState};
    use crate::avm::bytecode::encode_bytecode;
    use crate::avm::instruction::{JumpOp, ReturnOp, SetOp, ThreeOperandOp};
    use crate::avm::memory_types::TypeTag;
    use crate::domain::value_objects::{Address, Fr, FunctionSelector};

    fn set(dst: u32, tag: TypeTag, value: u64) -> Instruction {
        Instruction::Set(SetOp {
            opcode: Opcode::Set8,
            indirect: 0,
            tag,
            value: Fr::from(value),
            dst_offset: dst,
        })
    }

    fn ret(offset: u32, size: u32) -> Instruction {
        Instruction::Return(ReturnOp {
            indirect: 0,
            ret_offset: offset,
            ret_size: size,
        })
    }

    fn run(program: &[Instruction], gas: Gas, config: AvmConfig) -> TxExecutionResult {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let address = Address::from_u64(1);
        contracts.deploy(address, encode_bytecode(program));
        let call = EnqueuedCall::new(address, Address::from_u64(99), vec![], gas);
        AvmSimulator::new(&world, &contracts, config)
            .simulate(call)
            .unwrap()
    }

    #[test]
    fn test_set_add_return() {
        let program = [
            set(0, TypeTag::U32, 1),
            set(1, TypeTag::U32, 2),
            Instruction::Add(ThreeOperandOp {
                indirect: 0,
                tag: TypeTag::U32,
                a_offset: 0,
                b_offset: 1,
                dst_offset: 2,
            }),
            ret(2, 1),
        ];
        let result = run(&program, Gas::new(10_000, 0, 0), AvmConfig::default());
        assert!(!result.reverted);
        assert_eq!(result.return_data, vec![Fr::from(3u64)]);
        let expected: Gas = program
            .iter()
            .map(instruction_gas)
            .fold(Gas::zero(), |acc, g| acc.saturating_add(&g));
        assert_eq!(result.gas_used, expected);
    }

    #[test]
    fn test_running_off_the_end_halts() {
        let result = run(&[set(0, TypeTag::U8, 1)], Gas::l2_only(1000), AvmConfig::default());
        assert!(result.reverted);
        let reason = result.revert_reason.unwrap();
        assert_eq!(reason.message, "Invalid program counter 1, max is 1");
    }

    #[test]
    fn test_out_of_gas_consumes_everything() {
        let program = [Instruction::Jump(JumpOp { loc: 0 })];
        let result = run(&program, Gas::l2_only(100), AvmConfig::default());
        assert!(result.reverted);
        assert_eq!(result.gas_used, Gas::l2_only(100));
        assert_eq!(
            result.revert_reason.unwrap().message,
            "Not enough L2GAS gas left"
        );
    }

    #[test]
    fn test_missing_contract_reverts() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let call = EnqueuedCall::new(
            Address::from_u64(5),
            Address::from_u64(6),
            vec![],
            Gas::l2_only(100),
        );
        let result = AvmSimulator::new(&world, &contracts, AvmConfig::default())
            .simulate(call)
            .unwrap();
        assert!(result.reverted);
        assert_eq!(result.gas_used, Gas::zero());
        assert!(result
            .revert_reason
            .unwrap()
            .message
            .starts_with("No bytecode found at: 0x"));
    }

    #[test]
    fn test_malformed_bytecode_rejects_transaction() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let address = Address::from_u64(1);
        contracts.deploy(address, vec![0xFF]);
        let call = EnqueuedCall::new(address, Address::zero(), vec![], Gas::l2_only(100));
        let err = AvmSimulator::new(&world, &contracts, AvmConfig::default())
            .simulate(call)
            .unwrap_err();
        assert!(matches!(err, FatalError::Decode { .. }));
    }

    #[test]
    fn test_trace_rows_collected() {
        let program = [set(0, TypeTag::U8, 7), ret(0, 1)];
        let result = run(&program, Gas::l2_only(1000), AvmConfig::default().with_trace());
        let trace = result.trace.unwrap();
        assert_eq!(trace.len(), 2);
        assert_eq!(trace.rows[0].opcode, Opcode::Set8);
        assert_eq!(trace.rows[1].opcode, Opcode::Return);
        assert!(trace.rows[1].gas_after.l2 < trace.rows[0].gas_before.l2);
        assert!(!trace.rows[0].memory_accesses.is_empty());
        assert_eq!(result.instructions_executed, 2);
    }

    #[test]
    fn test_debug_name_in_revert_reason() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let address = Address::from_u64(1);
        contracts.deploy(address, encode_bytecode(&[Instruction::InternalReturn]));
        contracts.set_debug_name(address, FunctionSelector(0), "main");
        let call = EnqueuedCall::new(address, Address::zero(), vec![], Gas::l2_only(100));
        let result = AvmSimulator::new(&world, &contracts, AvmConfig::default())
            .simulate(call)
            .unwrap();
        let reason = result.revert_reason.unwrap();
        assert_eq!(reason.message, "Internal call stack empty");
        assert_eq!(reason.function.debug_name.as_deref(), Some("main"));
    }
}
