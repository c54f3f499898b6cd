//! DEBUGLOG.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::DebugLogOp;
use crate::avm::memory_types::TaggedValue;
use crate::domain::value_objects::{fr_to_hex, Fr, Gas};
use crate::errors::ExecutionError;
use tracing::debug;

/// Replaces each `{i}` placeholder with the hex of `fields[i]`.
pub(crate) fn format_debug_message(message: &str, fields: &[Fr]) -> String {
    fields
        .iter()
        .enumerate()
        .fold(message.to_string(), |acc, (i, field)| {
            acc.replace(&format!("{{{i}}}"), &fr_to_hex(field))
        })
}

/// Emits a formatted message at debug level. No state is changed.
pub(super) fn debug_log(ctx: &mut AvmContext, op: &DebugLogOp, cost: Gas) -> Result<(), ExecutionError> {
    let [message, fields] = resolve(ctx, op.indirect, [op.message_offset, op.fields_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;

    // Each message cell holds one byte.
    let bytes: Vec<u8> = memory
        .get_slice(message, op.message_size)?
        .iter()
        .map(|cell| cell.to_u128().to_le_bytes()[0])
        .collect();
    let fields: Vec<Fr> = memory
        .get_slice(fields, op.fields_size)?
        .iter()
        .map(TaggedValue::to_field)
        .collect();

    debug!(
        target: "avm::debug_log",
        address = %ctx.env.address,
        "{}",
        format_debug_message(&String::from_utf8_lossy(&bytes), &fields)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::instructions::test_utils::create_test_context;
    use crate::avm::memory_types::TypeTag;

    #[test]
    fn test_format_debug_message() {
        let formatted = format_debug_message("a={0} b={1} a={0}", &[Fr::from(1u64), Fr::from(2u64)]);
        assert_eq!(
            formatted,
            format!(
                "a={} b={} a={}",
                fr_to_hex(&Fr::from(1u64)),
                fr_to_hex(&Fr::from(2u64)),
                fr_to_hex(&Fr::from(1u64))
            )
        );
        assert_eq!(format_debug_message("no fields {0}", &[]), "no fields {0}");
    }

    #[test]
    fn test_debug_log_reads_without_writing() {
        let mut ctx = create_test_context();
        for (i, byte) in (0u32..).zip(b"hi {0}") {
            ctx.machine_state
                .memory
                .set(i, TaggedValue::from_u128(TypeTag::U8, u128::from(*byte)));
        }
        ctx.machine_state.memory.set(10, TaggedValue::Field(Fr::from(5u64)));
        let writes = ctx.machine_state.memory.writes();

        let op = DebugLogOp {
            indirect: 0,
            message_offset: 0,
            fields_offset: 10,
            message_size: 6,
            fields_size: 1,
        };
        debug_log(&mut ctx, &op, Gas::l2_only(10)).unwrap();
        assert_eq!(ctx.machine_state.memory.writes(), writes);
        assert_eq!(ctx.machine_state.memory.reads(), 7);
    }
}
