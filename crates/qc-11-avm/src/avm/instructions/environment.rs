//! GETENVVAR, CALLDATACOPY, RETURNDATASIZE, RETURNDATACOPY, SUCCESSCOPY.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::{CopyOp, GetEnvVarOp, OffsetOp};
use crate::avm::memory::TaggedMemory;
use crate::avm::memory_types::TaggedValue;
use crate::domain::value_objects::{Fr, Gas};
use crate::errors::ExecutionError;

pub(super) fn get_env_var(ctx: &mut AvmContext, op: &GetEnvVarOp, cost: Gas) -> Result<(), ExecutionError> {
    let [dst] = resolve(ctx, op.indirect, [op.dst_offset], cost)?;
    let value = ctx.env.variable(op.variable, ctx.machine_state.gas_left);
    ctx.machine_state.memory.set(dst, value);
    Ok(())
}

/// `copy_size` fields of `data` starting at `data_start`, zero-padded past
/// the end.
fn window(data: &[Fr], data_start: u32, copy_size: u32) -> Vec<TaggedValue> {
    let start = data_start as usize;
    (start..start.saturating_add(copy_size as usize))
        .map(|i| TaggedValue::Field(data.get(i).copied().unwrap_or_default()))
        .collect()
}

fn copy_into_memory(ctx: &mut AvmContext, op: &CopyOp, cost: Gas, data: &[Fr]) -> Result<(), ExecutionError> {
    let [dst] = resolve(ctx, op.indirect, [op.dst_offset], cost)?;
    TaggedMemory::check_range(dst, u64::from(op.copy_size))?;
    let values = window(data, op.data_start, op.copy_size);
    ctx.machine_state.memory.set_slice(dst, &values)?;
    Ok(())
}

pub(super) fn calldata_copy(ctx: &mut AvmContext, op: &CopyOp, cost: Gas) -> Result<(), ExecutionError> {
    let calldata = std::mem::take(&mut ctx.env.calldata);
    let result = copy_into_memory(ctx, op, cost, &calldata);
    ctx.env.calldata = calldata;
    result
}

pub(super) fn returndata_size(ctx: &mut AvmContext, op: &OffsetOp, cost: Gas) -> Result<(), ExecutionError> {
    let [dst] = resolve(ctx, op.indirect, [op.offset], cost)?;
    let size = u32::try_from(ctx.machine_state.nested_returndata.len()).unwrap_or(u32::MAX);
    ctx.machine_state.memory.set(dst, TaggedValue::u32(size));
    Ok(())
}

pub(super) fn returndata_copy(ctx: &mut AvmContext, op: &CopyOp, cost: Gas) -> Result<(), ExecutionError> {
    let returndata = std::mem::take(&mut ctx.machine_state.nested_returndata);
    let result = copy_into_memory(ctx, op, cost, &returndata);
    ctx.machine_state.nested_returndata = returndata;
    result
}

pub(super) fn success_copy(ctx: &mut AvmContext, op: &OffsetOp, cost: Gas) -> Result<(), ExecutionError> {
    let [dst] = resolve(ctx, op.indirect, [op.offset], cost)?;
    let success = ctx.machine_state.nested_call_success;
    ctx.machine_state.memory.set(dst, TaggedValue::from_bool(success));
    Ok(())
}
