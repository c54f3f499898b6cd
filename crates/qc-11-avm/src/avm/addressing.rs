//! # Addressing Modes
//!
//! Each memory-offset operand of an instruction is either direct or indirect.
//! Bit `i` of the instruction's indirect byte selects indirect mode for the
//! `i`-th offset operand, in declaration order.

use super::memory::TaggedMemory;
use crate::errors::AvmError;

/// Maximum number of offset operands an indirect byte can describe.
pub const MAX_OFFSET_OPERANDS: usize = 8;

/// How a single operand is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressingMode {
    /// The operand is the offset.
    Direct,
    /// The operand points at a U32 cell holding the offset.
    Indirect,
}

/// Per-operand addressing modes decoded from an indirect byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Addressing<const N: usize> {
    modes: [AddressingMode; N],
}

impl<const N: usize> Addressing<N> {
    /// Decodes the low `N` bits of `indirect`.
    #[must_use]
    pub fn from_wire(indirect: u8) -> Self {
        debug_assert!(N <= MAX_OFFSET_OPERANDS);
        let mut modes = [AddressingMode::Direct; N];
        for (i, mode) in modes.iter_mut().enumerate() {
            if indirect & (1 << i) != 0 {
                *mode = AddressingMode::Indirect;
            }
        }
        Self { modes }
    }

    /// Re-encodes the modes as an indirect byte.
    #[must_use]
    pub fn to_wire(&self) -> u8 {
        self.modes
            .iter()
            .enumerate()
            .filter(|(_, m)| **m == AddressingMode::Indirect)
            .fold(0u8, |acc, (i, _)| acc | (1 << i))
    }

    /// Number of indirect operands (each costs addressing gas).
    #[must_use]
    pub fn indirect_count(&self) -> usize {
        self.modes
            .iter()
            .filter(|m| **m == AddressingMode::Indirect)
            .count()
    }

    /// Resolves operands to final memory offsets.
    ///
    /// # Errors
    ///
    /// Returns `TagMismatch` if a pointer cell is not tagged U32.
    pub fn resolve(&self, offsets: [u32; N], memory: &mut TaggedMemory) -> Result<[u32; N], AvmError> {
        let mut resolved = offsets;
        for (offset, mode) in resolved.iter_mut().zip(self.modes) {
            if mode == AddressingMode::Indirect {
                memory.check_is_valid_mem_offset_tag(*offset)?;
                *offset = memory.get(*offset).as_u32();
            }
        }
        Ok(resolved)
    }
}

/// Counts indirect bits among the first `operands` offset operands.
#[must_use]
pub fn indirect_operand_count(indirect: u8, operands: usize) -> usize {
    (0..operands.min(MAX_OFFSET_OPERANDS))
        .filter(|i| indirect & (1 << i) != 0)
        .count()
}

// =============================================================================
// TESTS
// =============================================================================
