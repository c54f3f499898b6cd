//! SET, MOV, CMOV.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::{CMovOp, MovOp, SetOp};
use crate::avm::memory_types::{TaggedValue, TypeTag};
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

/// Writes an immediate, truncated to its tag.
pub(super) fn set(ctx: &mut AvmContext, op: &SetOp, cost: Gas) -> Result<(), ExecutionError> {
    let [dst] = resolve(ctx, op.indirect, [op.dst_offset], cost)?;
    ctx.machine_state
        .memory
        .set(dst, TaggedValue::build(op.tag, op.value));
    Ok(())
}

/// Copies a cell, tag included.
pub(super) fn mov(ctx: &mut AvmContext, op: &MovOp, cost: Gas) -> Result<(), ExecutionError> {
    let [src, dst] = resolve(ctx, op.indirect, [op.src_offset, op.dst_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    let value = memory.get(src);
    memory.set(dst, value);
    Ok(())
}

/// `dst = cond ? a : b` with a U1 condition.
pub(super) fn cmov(ctx: &mut AvmContext, op: &CMovOp, cost: Gas) -> Result<(), ExecutionError> {
    let [a, b, cond, dst] = resolve(
        ctx,
        op.indirect,
        [op.a_offset, op.b_offset, op.cond_offset, op.dst_offset],
        cost,
    )?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tag(TypeTag::U1, cond)?;

    let source = if memory.get(cond).is_zero() { b } else { a };
    let value = memory.get(source);
    memory.set(dst, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::instructions::test_utils::create_test_context;
    use crate::avm::opcodes::Opcode;
    use crate::domain::value_objects::Fr;
    use crate::errors::AvmError;

    #[test]
    fn test_set_truncates_to_tag() {
        let mut ctx = create_test_context();
        let op = SetOp {
            opcode: Opcode::Set16,
            indirect: 0,
            tag: TypeTag::U8,
            value: Fr::from(0x1FFu64),
            dst_offset: 3,
        };
        set(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(3), TaggedValue::from_u128(TypeTag::U8, 0xFF));
    }

    #[test]
    fn test_mov_keeps_tag() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::from_u128(TypeTag::U64, 9));
        let op = MovOp {
            indirect: 0,
            src_offset: 0,
            dst_offset: 1,
        };
        mov(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(1), TaggedValue::from_u128(TypeTag::U64, 9));
    }

    #[test]
    fn test_mov_indirect() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(100));
        ctx.machine_state.memory.set(100, TaggedValue::Field(Fr::from(5u64)));
        let op = MovOp {
            indirect: 0b01,
            src_offset: 0,
            dst_offset: 1,
        };
        mov(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(1), TaggedValue::Field(Fr::from(5u64)));
    }

    #[test]
    fn test_cmov() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(1));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(2u64)));
        ctx.machine_state.memory.set(2, TaggedValue::from_bool(true));
        let op = CMovOp {
            indirect: 0,
            a_offset: 0,
            b_offset: 1,
            cond_offset: 2,
            dst_offset: 3,
        };
        cmov(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(3), TaggedValue::u32(1));

        ctx.machine_state.memory.set(2, TaggedValue::from_bool(false));
        cmov(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(3), TaggedValue::Field(Fr::from(2u64)));
    }

    #[test]
    fn test_cmov_requires_u1_condition() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(2, TaggedValue::from_u128(TypeTag::U8, 1));
        let op = CMovOp {
            indirect: 0,
            a_offset: 0,
            b_offset: 1,
            cond_offset: 2,
            dst_offset: 3,
        };
        assert!(matches!(
            cmov(&mut ctx, &op, Gas::zero()),
            Err(ExecutionError::Halt(AvmError::TagMismatch { offset: 2, .. }))
        ));
    }
}
