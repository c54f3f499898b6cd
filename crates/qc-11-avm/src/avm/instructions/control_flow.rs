//! JUMP, JUMPI, INTERNALCALL, INTERNALRETURN.
//!
//! These handlers set the pc themselves; the interpreter loop does not
//! advance it after them.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::{JumpIOp, JumpOp};
use crate::avm::memory_types::TypeTag;
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

pub(super) fn jump(ctx: &mut AvmContext, op: &JumpOp, cost: Gas) -> Result<(), ExecutionError> {
    ctx.machine_state.consume_gas(cost)?;
    ctx.machine_state.pc = op.loc;
    Ok(())
}

/// Jumps to `loc` if the U1 condition is set.
pub(super) fn jumpi(ctx: &mut AvmContext, op: &JumpIOp, cost: Gas) -> Result<(), ExecutionError> {
    let [cond] = resolve(ctx, op.indirect, [op.cond_offset], cost)?;
    let state = &mut ctx.machine_state;
    state.memory.check_tag(TypeTag::U1, cond)?;

    state.pc = if state.memory.get(cond).is_zero() {
        state.pc.saturating_add(1)
    } else {
        op.loc
    };
    Ok(())
}

pub(super) fn internal_call(
    ctx: &mut AvmContext,
    op: &JumpOp,
    cost: Gas,
    max_depth: usize,
) -> Result<(), ExecutionError> {
    let state = &mut ctx.machine_state;
    state.consume_gas(cost)?;
    state.push_internal_call(state.pc.saturating_add(1), max_depth)?;
    state.pc = op.loc;
    Ok(())
}

pub(super) fn internal_return(ctx: &mut AvmContext, cost: Gas) -> Result<(), ExecutionError> {
    let state = &mut ctx.machine_state;
    state.consume_gas(cost)?;
    state.pc = state.pop_internal_call()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::instructions::test_utils::create_test_context;
    use crate::avm::memory_types::TaggedValue;
    use crate::errors::AvmError;

    #[test]
    fn test_jump() {
        let mut ctx = create_test_context();
        jump(&mut ctx, &JumpOp { loc: 42 }, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.pc, 42);
    }

    #[test]
    fn test_jumpi_taken_and_not_taken() {
        let mut ctx = create_test_context();
        ctx.machine_state.pc = 3;
        ctx.machine_state.memory.set(0, TaggedValue::from_bool(false));
        let op = JumpIOp {
            indirect: 0,
            cond_offset: 0,
            loc: 10,
        };
        jumpi(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.pc, 4);

        ctx.machine_state.memory.set(0, TaggedValue::from_bool(true));
        jumpi(&mut ctx, &op, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.pc, 10);
    }

    #[test]
    fn test_jumpi_requires_u1() {
        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(1));
        let op = JumpIOp {
            indirect: 0,
            cond_offset: 0,
            loc: 10,
        };
        assert!(matches!(
            jumpi(&mut ctx, &op, Gas::zero()),
            Err(ExecutionError::Halt(AvmError::TagMismatch { .. }))
        ));
        assert_eq!(ctx.machine_state.pc, 0);
    }

    #[test]
    fn test_internal_call_and_return() {
        let mut ctx = create_test_context();
        ctx.machine_state.pc = 5;
        internal_call(&mut ctx, &JumpOp { loc: 20 }, Gas::zero(), 8).unwrap();
        assert_eq!(ctx.machine_state.pc, 20);
        assert_eq!(ctx.machine_state.internal_call_stack, vec![6]);

        internal_return(&mut ctx, Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.pc, 6);
        assert!(ctx.machine_state.internal_call_stack.is_empty());
    }

    #[test]
    fn test_internal_call_depth_limit() {
        let mut ctx = create_test_context();
        internal_call(&mut ctx, &JumpOp { loc: 0 }, Gas::zero(), 1).unwrap();
        assert_eq!(
            internal_call(&mut ctx, &JumpOp { loc: 0 }, Gas::zero(), 1),
            Err(ExecutionError::Halt(AvmError::InternalCallStackOverflow { max: 1 }))
        );
    }

    #[test]
    fn test_internal_return_on_empty_stack() {
        let mut ctx = create_test_context();
        assert_eq!(
            internal_return(&mut ctx, Gas::zero()),
            Err(ExecutionError::Halt(AvmError::InternalCallStackUnderflow))
        );
    }
}
