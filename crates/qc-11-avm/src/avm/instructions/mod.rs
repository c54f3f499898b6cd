//! # Instruction Execution
//!
//! One handler per instruction class, implemented as methods on
//! [`AvmSimulator`]. Every handler follows the same order:
//!
//! 1. resolve addressing (indirect pointers must be U32)
//! 2. charge the instruction's gas
//! 3. check operand tags
//! 4. execute
//!
//! Nothing is written before step 4, so a failed check leaves memory and
//! the journal untouched.

mod accrued_substate;
mod arithmetic;
mod bitwise;
mod comparison;
mod control_flow;
mod conversion;
mod environment;
mod external_calls;
mod hashing;
mod memory_ops;
mod misc;
mod storage;

use super::addressing::Addressing;
use super::context::AvmContext;
use super::environment::CallKind;
use super::instruction::Instruction;
use super::machine_state::HaltKind;
use super::simulator::AvmSimulator;
use crate::domain::value_objects::Gas;
use crate::errors::{AvmError, ExecutionError};

/// Resolves `offsets`, then charges `cost`.
pub(crate) fn resolve<const N: usize>(
    ctx: &mut AvmContext,
    indirect: u8,
    offsets: [u32; N],
    cost: Gas,
) -> Result<[u32; N], AvmError> {
    let resolved = Addressing::<N>::from_wire(indirect).resolve(offsets, &mut ctx.machine_state.memory)?;
    ctx.machine_state.consume_gas(cost)?;
    Ok(resolved)
}

/// Fails inside a static call.
pub(crate) fn check_not_static(ctx: &AvmContext) -> Result<(), AvmError> {
    if ctx.env.is_static_call {
        return Err(AvmError::StaticCallAlteration);
    }
    Ok(())
}

impl AvmSimulator<'_> {
    /// Dispatches one instruction.
    pub(crate) fn execute_instruction(
        &mut self,
        ctx: &mut AvmContext,
        instruction: &Instruction,
        cost: Gas,
    ) -> Result<(), ExecutionError> {
        match instruction {
            Instruction::Add(op) => arithmetic::add(ctx, op, cost),
            Instruction::Sub(op) => arithmetic::sub(ctx, op, cost),
            Instruction::Mul(op) => arithmetic::mul(ctx, op, cost),
            Instruction::Div(op) => arithmetic::div(ctx, op, cost),
            Instruction::FDiv(op) => arithmetic::fdiv(ctx, op, cost),
            Instruction::Eq(op) => comparison::eq(ctx, op, cost),
            Instruction::Lt(op) => comparison::lt(ctx, op, cost),
            Instruction::Lte(op) => comparison::lte(ctx, op, cost),
            Instruction::And(op) => bitwise::and(ctx, op, cost),
            Instruction::Or(op) => bitwise::or(ctx, op, cost),
            Instruction::Xor(op) => bitwise::xor(ctx, op, cost),
            Instruction::Shl(op) => bitwise::shl(ctx, op, cost),
            Instruction::Shr(op) => bitwise::shr(ctx, op, cost),
            Instruction::Not(op) => bitwise::not(ctx, op, cost),
            Instruction::Cast(op) => conversion::cast(ctx, op, cost),
            Instruction::GetEnvVar(op) => environment::get_env_var(ctx, op, cost),
            Instruction::CalldataCopy(op) => environment::calldata_copy(ctx, op, cost),
            Instruction::ReturndataSize(op) => environment::returndata_size(ctx, op, cost),
            Instruction::ReturndataCopy(op) => environment::returndata_copy(ctx, op, cost),
            Instruction::SuccessCopy(op) => environment::success_copy(ctx, op, cost),
            Instruction::Jump(op) => control_flow::jump(ctx, op, cost),
            Instruction::JumpI(op) => control_flow::jumpi(ctx, op, cost),
            Instruction::InternalCall(op) => {
                control_flow::internal_call(ctx, op, cost, self.config.max_internal_call_depth)
            }
            Instruction::InternalReturn => control_flow::internal_return(ctx, cost),
            Instruction::Set(op) => memory_ops::set(ctx, op, cost),
            Instruction::Mov(op) => memory_ops::mov(ctx, op, cost),
            Instruction::CMov(op) => memory_ops::cmov(ctx, op, cost),
            Instruction::SLoad(op) => self.sload(ctx, op, cost),
            Instruction::SStore(op) => self.sstore(ctx, op, cost),
            Instruction::NoteHashExists(op) => self.note_hash_exists(ctx, op, cost),
            Instruction::EmitNoteHash(op) => self.emit_note_hash(ctx, op, cost),
            Instruction::NullifierExists(op) => self.nullifier_exists(ctx, op, cost),
            Instruction::EmitNullifier(op) => self.emit_nullifier(ctx, op, cost),
            Instruction::L1ToL2MsgExists(op) => self.l1_to_l2_msg_exists(ctx, op, cost),
            Instruction::GetContractInstance(op) => self.get_contract_instance(ctx, op, cost),
            Instruction::EmitUnencryptedLog(op) => self.emit_unencrypted_log(ctx, op, cost),
            Instruction::SendL2ToL1Msg(op) => self.send_l2_to_l1_msg(ctx, op, cost),
            Instruction::Call(op) => self.external_call(ctx, op, cost, CallKind::Call),
            Instruction::StaticCall(op) => self.external_call(ctx, op, cost, CallKind::StaticCall),
            Instruction::Return(op) => self.halt_with(ctx, op, cost, HaltKind::Success),
            Instruction::Revert(op) => self.halt_with(ctx, op, cost, HaltKind::Revert),
            Instruction::DebugLog(op) => misc::debug_log(ctx, op, cost),
            Instruction::Sha256Compression(op) => hashing::sha256_compression(ctx, op, cost),
            Instruction::ToRadixBe(op) => hashing::to_radix_be(ctx, op, cost),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
