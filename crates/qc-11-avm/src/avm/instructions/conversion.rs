//! CAST.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::CastOp;
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

/// Truncating conversion. Any source tag is accepted.
pub(super) fn cast(ctx: &mut AvmContext, op: &CastOp, cost: Gas) -> Result<(), ExecutionError> {
    let [src, dst] = resolve(ctx, op.indirect, [op.src_offset, op.dst_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    let value = memory.get(src).cast(op.dst_tag);
    memory.set(dst, value);
    Ok(())
}
