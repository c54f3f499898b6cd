//! EQ, LT, LTE. Results are written as U1.

use super::arithmetic::binary_op;
use crate::avm::context::AvmContext;
use crate::avm::instruction::ThreeOperandOp;
use crate::avm::memory_types::TaggedValue;
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

pub(super) fn eq(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(TaggedValue::from_bool(a.equals(b))))
}

pub(super) fn lt(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(TaggedValue::from_bool(a.lt(b))))
}

pub(super) fn lte(ctx: &mut AvmContext, op: &ThreeOperandOp, cost: Gas) -> Result<(), ExecutionError> {
    binary_op(ctx, op, cost, |a, b| Ok(TaggedValue::from_bool(a.lte(b))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::instructions::test_utils::create_test_context;
    use crate::avm::memory_types::TypeTag;
    use crate::domain::value_objects::Fr;

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
    fn test_comparisons_write_u1() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(3));
        ctx.machine_state.memory.set(1, TaggedValue::u32(5));

        lt(&mut ctx, &three(TypeTag::U32), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(true));
        lte(&mut ctx, &three(TypeTag::U32), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(true));
        eq(&mut ctx, &three(TypeTag::U32), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(false));
        assert_eq!(ctx.machine_state.memory.get_tag(2), TypeTag::U1);
    }

    #[test]
    fn test_field_order_uses_canonical_value() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(-Fr::from(1u64)));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(1u64)));
        lt(&mut ctx, &three(TypeTag::Field), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(false));
    }

    #[test]
    fn test_lte_on_equal() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::from_u128(TypeTag::U64, 9));
        ctx.machine_state.memory.set(1, TaggedValue::from_u128(TypeTag::U64, 9));
        lte(&mut ctx, &three(TypeTag::U64), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(true));
        lt(&mut ctx, &three(TypeTag::U64), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::from_bool(false));
    }
}
