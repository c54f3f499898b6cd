//! CALL, STATICCALL, RETURN, REVERT.
//!
//! A nested call runs to completion before the caller resumes. Its outcome
//! reaches the caller only through the success flag and return data written
//! into the caller's memory; a failing child never halts its caller.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::environment::CallKind;
use crate::avm::gas::cap_allocation;
use crate::avm::instruction::{CallOp, ReturnOp};
use crate::avm::machine_state::HaltKind;
use crate::avm::memory::TaggedMemory;
use crate::avm::memory_types::{TaggedValue, TypeTag};
use crate::avm::revert_reason::RevertReason;
use crate::avm::simulator::AvmSimulator;
use crate::domain::entities::ContractCallResult;
use crate::domain::value_objects::{Address, Fr, FunctionSelector, Gas};
use crate::errors::ExecutionError;
use tracing::debug;

/// Number of U32 cells in the gas operand: L2, DA, L1.
const GAS_OPERAND_CELLS: u32 = 3;

impl AvmSimulator<'_> {
    pub(super) fn external_call(
        &mut self,
        ctx: &mut AvmContext,
        op: &CallOp,
        cost: Gas,
        kind: CallKind,
    ) -> Result<(), ExecutionError> {
        let [gas, address, args, ret, success, selector] = resolve(
            ctx,
            op.indirect,
            [
                op.gas_offset,
                op.address_offset,
                op.args_offset,
                op.ret_offset,
                op.success_offset,
                op.function_selector_offset,
            ],
            cost,
        )?;
        let memory = &mut ctx.machine_state.memory;
        memory.check_tag_range(TypeTag::U32, gas, GAS_OPERAND_CELLS)?;
        memory.check_tags(TypeTag::Field, &[address, selector])?;
        TaggedMemory::check_range(ret, u64::from(op.ret_size))?;

        let requested = match memory.get_slice(gas, GAS_OPERAND_CELLS)?.as_slice() {
            [l2, da, l1] => Gas::new(
                u64::from(l2.as_u32()),
                u64::from(da.as_u32()),
                u64::from(l1.as_u32()),
            ),
            _ => Gas::zero(),
        };
        let target = Address::from(memory.get(address).to_field());
        let function_selector = FunctionSelector::from_field(&memory.get(selector).to_field());
        let calldata: Vec<Fr> = memory
            .get_slice(args, op.args_size)?
            .iter()
            .map(TaggedValue::to_field)
            .collect();

        let result = if ctx.env.call_depth.saturating_add(1) > self.config.max_call_depth {
            debug!(
                target = %target,
                depth = ctx.env.call_depth,
                max = self.config.max_call_depth,
                "max call depth reached, nested call fails"
            );
            ContractCallResult {
                success: false,
                output: Vec::new(),
                gas_left: Gas::zero(),
                revert_reason: Some(RevertReason::plain(
                    format!("Max call depth {} reached", self.config.max_call_depth),
                    self.failing_function(&ctx.env),
                    ctx.machine_state.pc_trace(),
                )),
            }
        } else {
            let allocated = cap_allocation(requested, ctx.machine_state.gas_left);
            ctx.machine_state.consume_gas(allocated)?;
            self.run_nested(ctx, target, calldata, function_selector, allocated, kind)?
        };

        ctx.machine_state.refund_gas(result.gas_left);
        let mut returned: Vec<TaggedValue> = result
            .output
            .iter()
            .take(op.ret_size as usize)
            .map(|f| TaggedValue::Field(*f))
            .collect();
        returned.resize(op.ret_size as usize, TaggedValue::default());

        let memory = &mut ctx.machine_state.memory;
        memory.set_slice(ret, &returned)?;
        memory.set(success, TaggedValue::from_bool(result.success));

        let state = &mut ctx.machine_state;
        state.nested_call_success = result.success;
        state.nested_returndata = result.output;
        state.collected_revert_info = result.revert_reason;
        Ok(())
    }

    fn run_nested(
        &mut self,
        ctx: &AvmContext,
        target: Address,
        calldata: Vec<Fr>,
        function_selector: FunctionSelector,
        allocated: Gas,
        kind: CallKind,
    ) -> Result<ContractCallResult, ExecutionError> {
        let child = ctx.create_nested_call(
            &mut self.journal,
            &mut self.hints,
            target,
            calldata,
            function_selector,
            allocated,
            kind,
            self.config.collect_trace,
        )?;
        let (journal_node, hints_node) = (child.journal_node, child.hints_node);
        debug!(
            target = %target,
            depth = child.env.call_depth,
            gas = %allocated,
            static_call = child.env.is_static_call,
            "nested call"
        );

        let result = self.run_call(child)?;
        if result.success {
            self.journal.merge(journal_node)?;
            self.hints.merge(hints_node)?;
        } else {
            self.journal.discard(journal_node)?;
            self.hints.discard(hints_node)?;
        }
        debug!(target = %target, success = result.success, gas_left = %result.gas_left, "nested call returned");
        Ok(result)
    }

    /// RETURN or REVERT with `ret_size` cells of output.
    pub(super) fn halt_with(
        &mut self,
        ctx: &mut AvmContext,
        op: &ReturnOp,
        cost: Gas,
        kind: HaltKind,
    ) -> Result<(), ExecutionError> {
        let [ret] = resolve(ctx, op.indirect, [op.ret_offset], cost)?;
        let output: Vec<Fr> = ctx
            .machine_state
            .memory
            .get_slice(ret, op.ret_size)?
            .iter()
            .map(TaggedValue::to_field)
            .collect();

        if kind == HaltKind::Revert {
            let nested = ctx.machine_state.collected_revert_info.take();
            ctx.machine_state.revert_reason = Some(RevertReason::explicit(
                output.clone(),
                self.failing_function(&ctx.env),
                ctx.machine_state.pc_trace(),
                nested,
            ));
        }
        ctx.machine_state.halt(kind, output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::in_memory::{InMemoryContractsDb, InMemoryWorldState};
    use crate::avm::bytecode::encode_bytecode;
    use crate::avm::gas::costs;
    use crate::avm::instruction::{CallOp, Instruction, ReturnOp, SStoreOp, SetOp};
    use crate::avm::memory_types::TypeTag;
    use crate::avm::opcodes::Opcode;
    use crate::avm::revert_reason::ASSERTION_PREFIX;
    use crate::avm::simulator::AvmSimulator;
    use crate::domain::entities::{AvmConfig, EnqueuedCall, TxExecutionResult};
    use crate::domain::value_objects::{Address, Fr, Gas};

    const CALLER: u64 = 1;
    const CALLEE: u64 = 2;

    fn set(dst: u32, tag: TypeTag, value: u64) -> Instruction {
        Instruction::Set(SetOp {
            opcode: Opcode::Set32,
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

    fn revert(offset: u32, size: u32) -> Instruction {
        Instruction::Revert(ReturnOp {
            indirect: 0,
            ret_offset: offset,
            ret_size: size,
        })
    }

    /// Calls CALLEE with 5000 of each gas budget; return data lands at 20,
    /// the success flag at 30.
    fn call_prologue(kind: Opcode, ret_size: u32) -> Vec<Instruction> {
        let op = CallOp {
            indirect: 0,
            gas_offset: 0,
            address_offset: 3,
            args_offset: 10,
            ret_offset: 20,
            success_offset: 30,
            function_selector_offset: 4,
            args_size: 0,
            ret_size,
        };
        vec![
            set(0, TypeTag::U32, 5000),
            set(1, TypeTag::U32, 5000),
            set(2, TypeTag::U32, 0),
            set(3, TypeTag::Field, CALLEE),
            set(4, TypeTag::Field, 0),
            if kind == Opcode::StaticCall {
                Instruction::StaticCall(op)
            } else {
                Instruction::Call(op)
            },
        ]
    }

    fn run(
        caller: &[Instruction],
        callee: &[Instruction],
        config: AvmConfig,
    ) -> (TxExecutionResult, InMemoryWorldState) {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        contracts.deploy(Address::from_u64(CALLER), encode_bytecode(caller));
        contracts.deploy(Address::from_u64(CALLEE), encode_bytecode(callee));
        let call = EnqueuedCall::new(
            Address::from_u64(CALLER),
            Address::zero(),
            vec![],
            Gas::new(100_000, 100_000, 0),
        );
        let result = AvmSimulator::new(&world, &contracts, config)
            .simulate(call)
            .unwrap();
        (result, world)
    }

    fn store_then(halt: Instruction) -> Vec<Instruction> {
        vec![
            set(0, TypeTag::Field, 7),
            Instruction::SStore(SStoreOp {
                indirect: 0,
                src_offset: 0,
                slot_offset: 0,
            }),
            halt,
        ]
    }

    #[test]
    fn test_call_returns_data_and_merges() {
        let mut caller = call_prologue(Opcode::Call, 2);
        caller.push(ret(20, 11));
        let (result, _) = run(&caller, &store_then(ret(0, 1)), AvmConfig::default());

        assert!(!result.reverted);
        assert_eq!(result.return_data[0], Fr::from(7u64));
        assert_eq!(result.return_data[1], Fr::from(0u64));
        assert_eq!(result.return_data[10], Fr::from(1u64));
        assert_eq!(result.side_effects.public_data_writes.len(), 1);
        assert_eq!(
            result.side_effects.public_data_writes[0].contract_address,
            Address::from_u64(CALLEE)
        );
    }

    #[test]
    fn test_reverted_child_is_isolated() {
        let mut caller = call_prologue(Opcode::Call, 1);
        caller.push(ret(30, 1));
        let (with_revert, _) = run(&caller, &store_then(revert(0, 1)), AvmConfig::default());
        let (with_return, _) = run(&caller, &store_then(ret(0, 1)), AvmConfig::default());

        assert!(!with_revert.reverted);
        assert_eq!(with_revert.return_data, vec![Fr::from(0u64)]);
        assert!(with_revert.side_effects.is_empty());
        // gas the child spent before reverting stays spent
        assert_eq!(with_revert.gas_used, with_return.gas_used);
    }

    #[test]
    fn test_static_call_cannot_write() {
        let mut caller = call_prologue(Opcode::StaticCall, 1);
        caller.push(ret(30, 1));
        let (result, _) = run(&caller, &store_then(ret(0, 1)), AvmConfig::default());

        assert!(!result.reverted);
        assert_eq!(result.return_data, vec![Fr::from(0u64)]);
        assert!(result.side_effects.is_empty());
    }

    #[test]
    fn test_max_call_depth_is_soft_failure() {
        let mut caller = call_prologue(Opcode::Call, 1);
        caller.push(ret(30, 1));
        let config = AvmConfig {
            max_call_depth: 0,
            ..AvmConfig::default()
        };
        let (result, _) = run(&caller, &store_then(ret(0, 1)), config);

        assert!(!result.reverted);
        assert_eq!(result.return_data, vec![Fr::from(0u64)]);
        assert!(result.side_effects.is_empty());
    }

    #[test]
    fn test_missing_callee_is_soft_failure() {
        let mut caller = call_prologue(Opcode::Call, 1);
        caller[3] = set(3, TypeTag::Field, 404);
        caller.push(ret(30, 1));
        let (result, _) = run(&caller, &[ret(0, 0)], AvmConfig::default());
        assert!(!result.reverted);
        assert_eq!(result.return_data, vec![Fr::from(0u64)]);
    }

    #[test]
    fn test_rethrown_revert_keeps_root_cause() {
        let mut caller = call_prologue(Opcode::Call, 1);
        caller.push(revert(20, 1));
        let (result, _) = run(&caller, &store_then(revert(0, 1)), AvmConfig::default());

        assert!(result.reverted);
        let reason = result.revert_reason.unwrap();
        assert_eq!(reason.depth(), 2);
        assert!(reason.message.starts_with(ASSERTION_PREFIX));
        assert_eq!(reason.root_cause().function.address, Address::from_u64(CALLEE));
        assert_eq!(reason.function.address, Address::from_u64(CALLER));
    }

    #[test]
    fn test_return_window_is_charged() {
        let mut narrow = call_prologue(Opcode::Call, 0);
        narrow.push(ret(30, 1));
        let mut wide = call_prologue(Opcode::Call, 8);
        wide.push(ret(30, 1));

        let (narrow_result, _) = run(&narrow, &[ret(0, 0)], AvmConfig::default());
        let (wide_result, _) = run(&wide, &[ret(0, 0)], AvmConfig::default());

        assert_eq!(narrow_result.return_data, vec![Fr::from(1u64)]);
        assert_eq!(wide_result.return_data, vec![Fr::from(1u64)]);
        assert_eq!(
            wide_result.gas_used.l2 - narrow_result.gas_used.l2,
            8 * costs::COPY_PER_ELEMENT
        );
    }

    #[test]
    fn test_oversized_return_window_runs_out_of_gas() {
        let mut caller = call_prologue(Opcode::Call, 2_000_000);
        caller.push(ret(30, 1));
        let (result, _) = run(&caller, &[ret(0, 0)], AvmConfig::default());

        assert!(result.reverted);
        assert_eq!(
            result.revert_reason.unwrap().message,
            "Not enough L2GAS gas left"
        );
        assert_eq!(result.gas_used, Gas::new(100_000, 100_000, 0));
    }

    #[test]
    fn test_allocation_capped_by_gas_left() {
        let mut caller = call_prologue(Opcode::Call, 0);
        caller[0] = set(0, TypeTag::U32, u32::MAX.into());
        caller.push(ret(30, 1));
        let (result, _) = run(&caller, &[ret(0, 0)], AvmConfig::default());
        assert!(!result.reverted);
        assert_eq!(result.return_data, vec![Fr::from(1u64)]);
        assert!(result.gas_used.l2 < 100_000);
    }
}
