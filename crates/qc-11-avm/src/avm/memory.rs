//! # AVM Memory
//!
//! Tagged, word-addressed memory scoped to a single call.
//! The address space is `2^32` cells; unwritten cells read as `Field(0)`.

use super::memory_types::{TaggedValue, TypeTag};
use crate::errors::AvmError;
use serde::Serialize;
use std::collections::HashMap;

/// Size of the address space in cells.
pub const MEMORY_SIZE: u64 = 1 << 32;

/// Direction of a traced memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AccessKind {
    /// Cell was read.
    Read,
    /// Cell was written.
    Write,
}

/// One traced memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MemoryAccess {
    /// Read or write.
    pub kind: AccessKind,
    /// Cell offset.
    pub offset: u32,
    /// Value read or written.
    pub value: TaggedValue,
}

/// Tagged memory of one call context.
#[derive(Clone, Debug, Default)]
pub struct TaggedMemory {
    cells: HashMap<u32, TaggedValue>,
    reads: u64,
    writes: u64,
    access_log: Option<Vec<MemoryAccess>>,
}

impl TaggedMemory {
    /// Creates an empty memory. `trace_accesses` enables the access log.
    #[must_use]
    pub fn new(trace_accesses: bool) -> Self {
        Self {
            cells: HashMap::new(),
            reads: 0,
            writes: 0,
            access_log: trace_accesses.then(Vec::new),
        }
    }

    /// Validates that `[offset, offset + size)` lies in the address space.
    ///
    /// # Errors
    ///
    /// Returns `MemoryOutOfBounds` when the range overflows `2^32`.
    pub fn check_range(offset: u32, size: u64) -> Result<(), AvmError> {
        if u64::from(offset) + size > MEMORY_SIZE {
            return Err(AvmError::MemoryOutOfBounds {
                offset: u64::from(offset),
                size,
            });
        }
        Ok(())
    }

    /// Reads a cell without recording the access.
    #[must_use]
    pub fn peek(&self, offset: u32) -> TaggedValue {
        self.cells.get(&offset).copied().unwrap_or_default()
    }

    /// Reads one cell.
    pub fn get(&mut self, offset: u32) -> TaggedValue {
        let value = self.peek(offset);
        self.reads += 1;
        if let Some(log) = self.access_log.as_mut() {
            log.push(MemoryAccess {
                kind: AccessKind::Read,
                offset,
                value,
            });
        }
        value
    }

    /// Reads `size` consecutive cells.
    ///
    /// # Errors
    ///
    /// Returns `MemoryOutOfBounds` if the range leaves the address space.
    pub fn get_slice(&mut self, offset: u32, size: u32) -> Result<Vec<TaggedValue>, AvmError> {
        Self::check_range(offset, u64::from(size))?;
        Ok((0..size).map(|i| self.get(offset + i)).collect())
    }

    /// Writes one cell.
    pub fn set(&mut self, offset: u32, value: TaggedValue) {
        self.writes += 1;
        if let Some(log) = self.access_log.as_mut() {
            log.push(MemoryAccess {
                kind: AccessKind::Write,
                offset,
                value,
            });
        }
        self.cells.insert(offset, value);
    }

    /// Writes consecutive cells starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `MemoryOutOfBounds` before writing anything if the range
    /// leaves the address space.
    pub fn set_slice(&mut self, offset: u32, values: &[TaggedValue]) -> Result<(), AvmError> {
        Self::check_range(offset, values.len() as u64)?;
        for (i, value) in (0u32..).zip(values) {
            self.set(offset + i, *value);
        }
        Ok(())
    }

    /// Tag of a cell.
    #[must_use]
    pub fn get_tag(&self, offset: u32) -> TypeTag {
        self.peek(offset).tag()
    }

    /// Requires the cell at `offset` to carry `tag`.
    ///
    /// # Errors
    ///
    /// Returns `TagMismatch` otherwise.
    pub fn check_tag(&self, tag: TypeTag, offset: u32) -> Result<(), AvmError> {
        let found = self.get_tag(offset);
        if found != tag {
            return Err(AvmError::TagMismatch {
                offset,
                expected: tag,
                found,
            });
        }
        Ok(())
    }

    /// Requires every listed cell to carry `tag`.
    ///
    /// # Errors
    ///
    /// Returns `TagMismatch` for the first offending cell.
    pub fn check_tags(&self, tag: TypeTag, offsets: &[u32]) -> Result<(), AvmError> {
        offsets.iter().try_for_each(|offset| self.check_tag(tag, *offset))
    }

    /// Requires every cell in `[offset, offset + size)` to carry `tag`.
    ///
    /// # Errors
    ///
    /// `MemoryOutOfBounds` for an invalid range, `TagMismatch` otherwise.
    pub fn check_tag_range(&self, tag: TypeTag, offset: u32, size: u32) -> Result<(), AvmError> {
        Self::check_range(offset, u64::from(size))?;
        (0..size).try_for_each(|i| self.check_tag(tag, offset + i))
    }

    /// Requires two cells to share a tag.
    ///
    /// # Errors
    ///
    /// Returns `TagMismatch` reporting the second cell.
    pub fn check_tags_are_same(&self, first: u32, second: u32) -> Result<(), AvmError> {
        self.check_tag(self.get_tag(first), second)
    }

    /// Requires the cell to be usable as a memory offset (tagged U32).
    ///
    /// # Errors
    ///
    /// Returns `TagMismatch` otherwise.
    pub fn check_is_valid_mem_offset_tag(&self, offset: u32) -> Result<(), AvmError> {
        self.check_tag(TypeTag::U32, offset)
    }

    /// Number of cell reads so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Number of cell writes so far.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes
    }

    /// Drains the access log accumulated since the last call.
    pub fn take_accesses(&mut self) -> Vec<MemoryAccess> {
        self.access_log.as_mut().map(std::mem::take).unwrap_or_default()
    }
}

// =============================================================================
// TESTS
// =============================================================================
