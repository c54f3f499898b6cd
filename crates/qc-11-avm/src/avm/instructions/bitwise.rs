//! AND, OR, XOR, NOT, SHL, SHR. Integral tags only.

use super::arithmetic::binary_op;
use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::{NotOp, ThreeOperandOp};
use crate::avm::memory_types::TaggedValue;
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

pub(super) fn and(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::and)
}

pub(super) fn or(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::or)
}

pub(super) fn xor(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::xor)
}

pub(super) fn shl(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::shl)
}

pub(super) fn shr(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::shr)
}

pub(super) fn not(ctx: &mut AvmContext, op: &NotOp, cost: Gas) -> Result<(), ExecutionError> {
    let [src, dst] = resolve(ctx, op.indirect, [op.src_offset, op.dst_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tag(op.tag, src)?;

    let result = memory.get(src).not()?;
    memory.set(dst, result);
    Ok(())
}
