//! ADD, SUB, MUL, DIV, FDIV.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::ThreeOperandOp;
use crate::avm::memory_types::TaggedValue;
use crate::domain::value_objects::Gas;
use crate::errors::{AvmError, ExecutionError};

/// `dst = f(a, b)` with both inputs tagged `op.tag`.
pub(super) fn binary_op(
    ctx: &mut AvmContext,
    op: &ThreeOperandOp,
    cost: Gas,
    f: impl FnOnce(&TaggedValue, &TaggedValue) -> Result<TaggedValue, AvmError>,
) -> Result<(), ExecutionError> {
    let [a, b, dst] = resolve(ctx, op.indirect, [op.a_offset, op.b_offset, op.dst_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tags(op.tag, &[a, b])?;

    let lhs = memory.get(a);
    let rhs = memory.get(b);
    let result = f(&lhs, &rhs)?;
    memory.set(dst, result);
    Ok(())
}

pub(super) fn add(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(a.add(b)))
}

pub(super) fn sub(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(a.sub(b)))
}

pub(super) fn mul(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(a.mul(b)))
}

/// Integer division, rounding toward zero.
pub(super) fn div(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::div)
}

/// Field division (multiplication by the inverse).
pub(super) fn fdiv(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, TaggedValue::fdiv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::instructions::test_utils::{create_test_context, create_test_context_with};
    use crate::avm::memory_types::TypeTag;
    use crate::domain::value_objects::{Fr, GasDimension};

    fn three(tag: TypeTag) -> ThreeOperandOp {
        ThreeOperandOp {
            indirect: 0,
            tag,
            a_offset: 0,
            b_offset: 1,
            dst_offset: 2,
        }
    }

    #[test]
    fn test_add_wraps() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::from_u128(TypeTag::U8, 250));
        ctx.machine_state.memory.set(1, TaggedValue::from_u128(TypeTag::U8, 10));
        add(&mut ctx, &three(TypeTag::U8), Gas::l2_only(12)).unwrap();
        assert_eq!(
            ctx.machine_state.memory.peek(2),
            TaggedValue::from_u128(TypeTag::U8, 4)
        );
    }

    #[test]
    fn test_sub_field() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(Fr::from(1u64)));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(2u64)));
        sub(&mut ctx, &three(TypeTag::Field), Gas::zero()).unwrap();
        assert_eq!(
            ctx.machine_state.memory.peek(2),
            TaggedValue::Field(-Fr::from(1u64))
        );
    }

    #[test]
    fn test_tag_mismatch_leaves_memory_untouched() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::from_u128(TypeTag::U8, 1));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(2u64)));
        let writes_before = ctx.machine_state.memory.writes();

        let err = add(&mut ctx, &three(TypeTag::U8), Gas::l2_only(12)).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::Halt(AvmError::TagMismatch {
                offset: 1,
                expected: TypeTag::U8,
                found: TypeTag::Field
            })
        );
        assert_eq!(ctx.machine_state.memory.writes(), writes_before);
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::default());
    }

    #[test]
    fn test_div_by_zero() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(8));
        ctx.machine_state.memory.set(1, TaggedValue::u32(0));
        assert_eq!(
            div(&mut ctx, &three(TypeTag::U32), Gas::zero()),
            Err(ExecutionError::Halt(AvmError::DivisionByZero))
        );
    }

    #[test]
    fn test_div_rejects_field() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(Fr::from(8u64)));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(2u64)));
        assert!(matches!(
            div(&mut ctx, &three(TypeTag::Field), Gas::zero()),
            Err(ExecutionError::Halt(AvmError::InvalidTag { .. }))
        ));
    }

    #[test]
    fn test_fdiv() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(Fr::from(1u64)));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(3u64)));
        fdiv(&mut ctx, &three(TypeTag::Field), Gas::zero()).unwrap();
        let quotient = ctx.machine_state.memory.peek(2).to_field();
        assert_eq!(quotient * Fr::from(3u64), Fr::from(1u64));
    }

    #[test]
    fn test_gas_charged_before_tag_check() {
        let mut ctx = create_test_context_with(vec![], Gas::l2_only(5));
        ctx.machine_state.memory.set(0, TaggedValue::from_u128(TypeTag::U8, 1));
        let err = mul(&mut ctx, &three(TypeTag::U8), Gas::l2_only(15)).unwrap_err();
        assert_eq!(
            err,
            ExecutionError::Halt(AvmError::OutOfGas {
                dimension: GasDimension::L2
            })
        );
        assert_eq!(ctx.machine_state.gas_left, Gas::zero());
    }
}
