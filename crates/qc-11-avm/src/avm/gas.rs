//! # AVM Gas Metering
//!
//! Per-opcode costs over three budgets (L2, DA and the legacy L1 budget).
//!
//! ```text
//! l2 = base_l2 * width(tag) + indirect_operands * INDIRECT_OPERAND_L2 + length * l2_per_element
//! da = base_da + length * da_per_element
//! l1 = base_l1
//! ```

use super::instruction::Instruction;
use super::memory_types::TypeTag;
use crate::domain::value_objects::Gas;

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs for AVM operations.
pub mod costs {
    /// Extra L2 gas per indirect operand.
    pub const INDIRECT_OPERAND_L2: u64 = 3;

    // Arithmetic
    /// ADD, SUB.
    pub const ADD_SUB: u64 = 12;
    /// MUL.
    pub const MUL: u64 = 15;
    /// DIV.
    pub const DIV: u64 = 18;
    /// FDIV (field inverse).
    pub const FDIV: u64 = 24;
    /// EQ, LT, LTE.
    pub const COMPARISON: u64 = 12;
    /// AND, OR, XOR, NOT, SHL, SHR.
    pub const BITWISE: u64 = 12;
    /// CAST.
    pub const CAST: u64 = 12;

    // Environment
    /// GETENVVAR, RETURNDATASIZE, SUCCESSCOPY.
    pub const ENVIRONMENT: u64 = 9;
    /// Fixed part of CALLDATACOPY and RETURNDATACOPY.
    pub const COPY_BASE: u64 = 9;
    /// Per copied element.
    pub const COPY_PER_ELEMENT: u64 = 3;

    // Control flow
    /// JUMP, JUMPI, INTERNALCALL, INTERNALRETURN.
    pub const JUMP: u64 = 6;

    // Memory
    /// SET_* and MOV.
    pub const SET_MOV: u64 = 9;
    /// CMOV.
    pub const CMOV: u64 = 12;

    // World state
    /// SLOAD.
    pub const SLOAD: u64 = 120;
    /// SSTORE.
    pub const SSTORE: u64 = 150;
    /// NOTEHASHEXISTS, NULLIFIEREXISTS, L1TOL2MSGEXISTS.
    pub const EXISTS_CHECK: u64 = 90;
    /// EMITNOTEHASH, EMITNULLIFIER.
    pub const EMIT_SIDE_EFFECT: u64 = 120;
    /// GETCONTRACTINSTANCE.
    pub const GET_CONTRACT_INSTANCE: u64 = 60;

    // Data availability
    /// DA gas per published byte.
    pub const DA_GAS_PER_BYTE: u64 = 16;
    /// Bytes per published field element.
    pub const DA_BYTES_PER_FIELD: u64 = 32;
    /// DA gas per published field element.
    pub const DA_GAS_PER_FIELD: u64 = DA_GAS_PER_BYTE * DA_BYTES_PER_FIELD;

    // Accrued substate
    /// EMITUNENCRYPTEDLOG fixed part.
    pub const EMIT_UNENCRYPTED_LOG: u64 = 30;
    /// SENDL2TOL1MSG.
    pub const SEND_L2_TO_L1_MSG: u64 = 60;
    /// Legacy L1 gas charged per L2 to L1 message.
    pub const L2_TO_L1_MSG_L1: u64 = 1000;

    // External calls
    /// CALL, STATICCALL fixed part.
    pub const CALL: u64 = 90;
    /// RETURN, REVERT fixed part.
    pub const RETURN: u64 = 9;

    // Misc and gadgets
    /// DEBUGLOG fixed part.
    pub const DEBUG_LOG: u64 = 9;
    /// SHA256COMPRESSION.
    pub const SHA256_COMPRESSION: u64 = 300;
    /// TORADIXBE fixed part.
    pub const TO_RADIX: u64 = 30;
}

// =============================================================================
// OPCODE GAS COSTS TABLE
// =============================================================================

/// Static gas parameters of one opcode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct OpcodeGas {
    /// Base L2 gas (scaled by the operand width for tagged instructions).
    pub l2: u64,
    /// Base DA gas.
    pub da: u64,
    /// Base legacy L1 gas.
    pub l1: u64,
    /// L2 gas per element of the variable-length operand.
    pub l2_per_element: u64,
    /// DA gas per element of the variable-length operand.
    pub da_per_element: u64,
}

impl OpcodeGas {
    const fn l2(l2: u64) -> Self {
        Self {
            l2,
            da: 0,
            l1: 0,
            l2_per_element: 0,
            da_per_element: 0,
        }
    }

    const fn with_da(mut self, da: u64) -> Self {
        self.da = da;
        self
    }

    const fn with_l1(mut self, l1: u64) -> Self {
        self.l1 = l1;
        self
    }

    const fn per_element(mut self, l2: u64, da: u64) -> Self {
        self.l2_per_element = l2;
        self.da_per_element = da;
        self
    }
}

/// Gas parameters indexed by opcode byte.
#[rustfmt::skip]
pub const OPCODE_GAS: [OpcodeGas; 256] = {
    use costs::*;
    let mut table = [OpcodeGas::l2(0); 256];

    // Arithmetic, comparison, bitwise
    table[0x00] = OpcodeGas::l2(ADD_SUB);       // ADD
    table[0x01] = OpcodeGas::l2(ADD_SUB);       // SUB
    table[0x02] = OpcodeGas::l2(MUL);           // MUL
    table[0x03] = OpcodeGas::l2(DIV);           // DIV
    table[0x04] = OpcodeGas::l2(FDIV);          // FDIV
    table[0x05] = OpcodeGas::l2(COMPARISON);    // EQ
    table[0x06] = OpcodeGas::l2(COMPARISON);    // LT
    table[0x07] = OpcodeGas::l2(COMPARISON);    // LTE
    table[0x08] = OpcodeGas::l2(BITWISE);       // AND
    table[0x09] = OpcodeGas::l2(BITWISE);       // OR
    table[0x0A] = OpcodeGas::l2(BITWISE);       // XOR
    table[0x0B] = OpcodeGas::l2(BITWISE);       // NOT
    table[0x0C] = OpcodeGas::l2(BITWISE);       // SHL
    table[0x0D] = OpcodeGas::l2(BITWISE);       // SHR
    table[0x0E] = OpcodeGas::l2(CAST);          // CAST

    // Execution environment
    table[0x10] = OpcodeGas::l2(ENVIRONMENT);   // GETENVVAR
    table[0x11] = OpcodeGas::l2(COPY_BASE).per_element(COPY_PER_ELEMENT, 0); // CALLDATACOPY
    table[0x12] = OpcodeGas::l2(ENVIRONMENT);   // RETURNDATASIZE
    table[0x13] = OpcodeGas::l2(COPY_BASE).per_element(COPY_PER_ELEMENT, 0); // RETURNDATACOPY
    table[0x14] = OpcodeGas::l2(ENVIRONMENT);   // SUCCESSCOPY

    // Control flow
    table[0x20] = OpcodeGas::l2(JUMP);          // JUMP
    table[0x21] = OpcodeGas::l2(JUMP);          // JUMPI
    table[0x22] = OpcodeGas::l2(JUMP);          // INTERNALCALL
    table[0x23] = OpcodeGas::l2(JUMP);          // INTERNALRETURN

    // Memory
    table[0x30] = OpcodeGas::l2(SET_MOV);       // SET_8
    table[0x31] = OpcodeGas::l2(SET_MOV);       // SET_16
    table[0x32] = OpcodeGas::l2(SET_MOV);       // SET_32
    table[0x33] = OpcodeGas::l2(SET_MOV);       // SET_64
    table[0x34] = OpcodeGas::l2(SET_MOV);       // SET_128
    table[0x35] = OpcodeGas::l2(SET_MOV);       // SET_FF
    table[0x36] = OpcodeGas::l2(SET_MOV);       // MOV
    table[0x37] = OpcodeGas::l2(CMOV);          // CMOV

    // World state
    table[0x40] = OpcodeGas::l2(SLOAD);                                      // SLOAD
    table[0x41] = OpcodeGas::l2(SSTORE).with_da(2 * DA_GAS_PER_FIELD);       // SSTORE
    table[0x42] = OpcodeGas::l2(EXISTS_CHECK);                               // NOTEHASHEXISTS
    table[0x43] = OpcodeGas::l2(EMIT_SIDE_EFFECT).with_da(DA_GAS_PER_FIELD); // EMITNOTEHASH
    table[0x44] = OpcodeGas::l2(EXISTS_CHECK);                               // NULLIFIEREXISTS
    table[0x45] = OpcodeGas::l2(EMIT_SIDE_EFFECT).with_da(DA_GAS_PER_FIELD); // EMITNULLIFIER
    table[0x46] = OpcodeGas::l2(EXISTS_CHECK);                               // L1TOL2MSGEXISTS
    table[0x47] = OpcodeGas::l2(GET_CONTRACT_INSTANCE);                      // GETCONTRACTINSTANCE

    // Accrued substate
    table[0x50] = OpcodeGas::l2(EMIT_UNENCRYPTED_LOG)
        .per_element(COPY_PER_ELEMENT, DA_GAS_PER_FIELD);                    // EMITUNENCRYPTEDLOG
    table[0x51] = OpcodeGas::l2(SEND_L2_TO_L1_MSG)
        .with_da(2 * DA_GAS_PER_FIELD)
        .with_l1(L2_TO_L1_MSG_L1);                                           // SENDL2TOL1MSG

    // External calls
    table[0x60] = OpcodeGas::l2(CALL).per_element(COPY_PER_ELEMENT, 0);      // CALL
    table[0x61] = OpcodeGas::l2(CALL).per_element(COPY_PER_ELEMENT, 0);      // STATICCALL
    table[0x62] = OpcodeGas::l2(RETURN).per_element(COPY_PER_ELEMENT, 0);    // RETURN
    table[0x63] = OpcodeGas::l2(RETURN).per_element(COPY_PER_ELEMENT, 0);    // REVERT

    // Misc
    table[0x70] = OpcodeGas::l2(DEBUG_LOG).per_element(COPY_PER_ELEMENT, 0); // DEBUGLOG

    // Gadgets
    table[0x80] = OpcodeGas::l2(SHA256_COMPRESSION);                         // SHA256COMPRESSION
    table[0x81] = OpcodeGas::l2(TO_RADIX).per_element(COPY_PER_ELEMENT, 0);  // TORADIXBE

    table
};

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

/// Width factor applied to the base L2 cost of tagged instructions.
#[must_use]
pub const fn width_multiplier(tag: TypeTag) -> u64 {
    match tag {
        TypeTag::U1 | TypeTag::U8 | TypeTag::U16 | TypeTag::U32 => 1,
        TypeTag::U64 => 2,
        TypeTag::U128 => 4,
        TypeTag::Field => 8,
    }
}

/// Full cost of one instruction, known before it executes.
#[must_use]
pub fn instruction_gas(instruction: &Instruction) -> Gas {
    let params = OPCODE_GAS[instruction.opcode() as usize];
    let width = instruction.width_tag().map_or(1, width_multiplier);
    let indirect = instruction.indirect_operand_count() as u64;
    let length = u64::from(instruction.dynamic_length());

    Gas::new(
        params
            .l2
            .saturating_mul(width)
            .saturating_add(indirect.saturating_mul(costs::INDIRECT_OPERAND_L2))
            .saturating_add(length.saturating_mul(params.l2_per_element)),
        params
            .da
            .saturating_add(length.saturating_mul(params.da_per_element)),
        params.l1,
    )
}

/// Caps a requested nested-call allocation to what the caller has left.
#[must_use]
pub fn cap_allocation(requested: Gas, available: Gas) -> Gas {
    requested.min(&available)
}

// =============================================================================
// TESTS
// =============================================================================
