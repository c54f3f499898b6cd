//! SHA256COMPRESSION and TORADIXBE.

use super::resolve;
use crate::avm::context::AvmContext;
use crate::avm::instruction::{Sha256CompressionOp, ToRadixBeOp};
use crate::avm::memory::TaggedMemory;
use crate::avm::memory_types::{TaggedValue, TypeTag};
use crate::domain::value_objects::{fr_to_be_bytes, Gas};
use crate::errors::{AvmError, ExecutionError};
use primitive_types::U256;
use sha2::digest::generic_array::GenericArray;

const STATE_WORDS: u32 = 8;
const INPUT_WORDS: u32 = 16;

/// One SHA-256 compression round over an 8-word state and a 16-word block.
pub(super) fn sha256_compression(
    ctx: &mut AvmContext,
    op: &Sha256CompressionOp,
    cost: Gas,
) -> Result<(), ExecutionError> {
    let [output, state, inputs] = resolve(
        ctx,
        op.indirect,
        [op.output_offset, op.state_offset, op.inputs_offset],
        cost,
    )?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tag_range(TypeTag::U32, state, STATE_WORDS)?;
    memory.check_tag_range(TypeTag::U32, inputs, INPUT_WORDS)?;
    TaggedMemory::check_range(output, u64::from(STATE_WORDS))?;

    let mut words = [0u32; 8];
    for (word, cell) in words.iter_mut().zip(memory.get_slice(state, STATE_WORDS)?) {
        *word = cell.as_u32();
    }
    let block: Vec<u8> = memory
        .get_slice(inputs, INPUT_WORDS)?
        .iter()
        .flat_map(|cell| cell.as_u32().to_be_bytes())
        .collect();

    sha2::compress256(&mut words, &[GenericArray::clone_from_slice(&block)]);

    let result: Vec<TaggedValue> = words.iter().map(|w| TaggedValue::u32(*w)).collect();
    memory.set_slice(output, &result)?;
    Ok(())
}

/// Big-endian limbs of `value` in `radix`, keeping the low `num_limbs`.
pub(crate) fn radix_limbs(value: U256, radix: u32, num_limbs: u32) -> Vec<u8> {
    let radix = U256::from(radix);
    let mut remaining = value;
    let mut limbs: Vec<u8> = (0..num_limbs)
        .map(|_| {
            let limb = (remaining % radix).low_u32();
            remaining /= radix;
            // radix <= 256
            limb.to_le_bytes()[0]
        })
        .collect();
    limbs.reverse();
    limbs
}

/// Decomposes a field element into limbs, written as U8 (or U1 for bits).
pub(super) fn to_radix_be(ctx: &mut AvmContext, op: &ToRadixBeOp, cost: Gas) -> Result<(), ExecutionError> {
    let [src, dst] = resolve(ctx, op.indirect, [op.src_offset, op.dst_offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tag(TypeTag::Field, src)?;
    if !(2..=256).contains(&op.radix) {
        return Err(AvmError::InvalidRadix { radix: op.radix }.into());
    }
    TaggedMemory::check_range(dst, u64::from(op.num_limbs))?;

    let value = U256::from_big_endian(&fr_to_be_bytes(&memory.get(src).to_field()));
    let tag = if op.output_bits { TypeTag::U1 } else { TypeTag::U8 };
    let limbs: Vec<TaggedValue> = radix_limbs(value, op.radix, op.num_limbs)
        .into_iter()
        .map(|limb| TaggedValue::from_u128(tag, u128::from(limb)))
        .collect();
    memory.set_slice(dst, &limbs)?;
    Ok(())
}
