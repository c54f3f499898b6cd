//! # AVM Opcodes
//!
//! Opcode numbering and static wire formats. Every instruction is encoded as
//! the opcode byte followed by its operands in the order given by
//! [`Opcode::wire_format`], all big-endian.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of one encoded operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperandType {
    /// 1 byte (indirect flags, tags, selectors).
    U8,
    /// 2 bytes.
    U16,
    /// 4 bytes (offsets, sizes, jump targets).
    U32,
    /// 8 bytes.
    U64,
    /// 16 bytes.
    U128,
    /// 32-byte field element.
    Ff,
}

impl OperandType {
    /// Encoded size in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
            Self::U128 => 16,
            Self::Ff => 32,
        }
    }
}

/// AVM opcode enumeration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // 0x00 - Arithmetic, comparison, bitwise
    Add = 0x00,
    Sub = 0x01,
    Mul = 0x02,
    Div = 0x03,
    FDiv = 0x04,
    Eq = 0x05,
    Lt = 0x06,
    Lte = 0x07,
    And = 0x08,
    Or = 0x09,
    Xor = 0x0A,
    Not = 0x0B,
    Shl = 0x0C,
    Shr = 0x0D,
    Cast = 0x0E,

    // 0x10 - Execution environment
    GetEnvVar = 0x10,
    CalldataCopy = 0x11,
    ReturndataSize = 0x12,
    ReturndataCopy = 0x13,
    SuccessCopy = 0x14,

    // 0x20 - Control flow
    Jump = 0x20,
    JumpI = 0x21,
    InternalCall = 0x22,
    InternalReturn = 0x23,

    // 0x30 - Memory
    Set8 = 0x30,
    Set16 = 0x31,
    Set32 = 0x32,
    Set64 = 0x33,
    Set128 = 0x34,
    SetFf = 0x35,
    Mov = 0x36,
    CMov = 0x37,

    // 0x40 - World state
    SLoad = 0x40,
    SStore = 0x41,
    NoteHashExists = 0x42,
    EmitNoteHash = 0x43,
    NullifierExists = 0x44,
    EmitNullifier = 0x45,
    L1ToL2MsgExists = 0x46,
    GetContractInstance = 0x47,

    // 0x50 - Accrued substate
    EmitUnencryptedLog = 0x50,
    SendL2ToL1Msg = 0x51,

    // 0x60 - External calls
    Call = 0x60,
    StaticCall = 0x61,
    Return = 0x62,
    Revert = 0x63,

    // 0x70 - Misc
    DebugLog = 0x70,

    // 0x80 - Gadgets
    Sha256Compression = 0x80,
    ToRadixBe = 0x81,
}

/// Every opcode, in numbering order.
pub const ALL_OPCODES: [Opcode; 49] = [
    Opcode::Add,
    Opcode::Sub,
    Opcode::Mul,
    Opcode::Div,
    Opcode::FDiv,
    Opcode::Eq,
    Opcode::Lt,
    Opcode::Lte,
    Opcode::And,
    Opcode::Or,
    Opcode::Xor,
    Opcode::Not,
    Opcode::Shl,
    Opcode::Shr,
    Opcode::Cast,
    Opcode::GetEnvVar,
    Opcode::CalldataCopy,
    Opcode::ReturndataSize,
    Opcode::ReturndataCopy,
    Opcode::SuccessCopy,
    Opcode::Jump,
    Opcode::JumpI,
    Opcode::InternalCall,
    Opcode::InternalReturn,
    Opcode::Set8,
    Opcode::Set16,
    Opcode::Set32,
    Opcode::Set64,
    Opcode::Set128,
    Opcode::SetFf,
    Opcode::Mov,
    Opcode::CMov,
    Opcode::SLoad,
    Opcode::SStore,
    Opcode::NoteHashExists,
    Opcode::EmitNoteHash,
    Opcode::NullifierExists,
    Opcode::EmitNullifier,
    Opcode::L1ToL2MsgExists,
    Opcode::GetContractInstance,
    Opcode::EmitUnencryptedLog,
    Opcode::SendL2ToL1Msg,
    Opcode::Call,
    Opcode::StaticCall,
    Opcode::Return,
    Opcode::Revert,
    Opcode::DebugLog,
    Opcode::Sha256Compression,
    Opcode::ToRadixBe,
];

/// Byte → opcode lookup table.
pub const OPCODE_TABLE: [Option<Opcode>; 256] = {
    let mut table = [None; 256];
    let mut i = 0;
    while i < ALL_OPCODES.len() {
        let opcode = ALL_OPCODES[i];
        table[opcode as usize] = Some(opcode);
        i += 1;
    }
    table
};

use self::OperandType::{Ff, U128, U16, U32, U64, U8};

impl Opcode {
    /// Decodes an opcode byte in O(1).
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        OPCODE_TABLE[byte as usize]
    }

    /// Operand layout following the opcode byte.
    #[must_use]
    pub const fn wire_format(self) -> &'static [OperandType] {
        match self {
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::FDiv
            | Self::Eq
            | Self::Lt
            | Self::Lte
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Shl
            | Self::Shr => &[U8, U8, U32, U32, U32],
            Self::Not | Self::Cast => &[U8, U8, U32, U32],
            Self::GetEnvVar => &[U8, U8, U32],
            Self::CalldataCopy | Self::ReturndataCopy => &[U8, U32, U32, U32],
            Self::ReturndataSize | Self::SuccessCopy | Self::EmitNoteHash | Self::EmitNullifier => {
                &[U8, U32]
            }
            Self::Jump | Self::InternalCall => &[U32],
            Self::JumpI => &[U8, U32, U32],
            Self::InternalReturn => &[],
            Self::Set8 => &[U8, U8, U8, U32],
            Self::Set16 => &[U8, U8, U16, U32],
            Self::Set32 => &[U8, U8, U32, U32],
            Self::Set64 => &[U8, U8, U64, U32],
            Self::Set128 => &[U8, U8, U128, U32],
            Self::SetFf => &[U8, U8, Ff, U32],
            Self::Mov | Self::SLoad | Self::SStore | Self::SendL2ToL1Msg => &[U8, U32, U32],
            Self::CMov => &[U8, U32, U32, U32, U32],
            Self::NoteHashExists | Self::NullifierExists | Self::L1ToL2MsgExists => {
                &[U8, U32, U32, U32]
            }
            Self::GetContractInstance => &[U8, U32, U32, U32, U8],
            Self::EmitUnencryptedLog | Self::Return | Self::Revert => &[U8, U32, U32],
            Self::Call | Self::StaticCall => &[U8, U32, U32, U32, U32, U32, U32, U32, U32],
            Self::DebugLog => &[U8, U32, U32, U32, U32],
            Self::Sha256Compression => &[U8, U32, U32, U32],
            Self::ToRadixBe => &[U8, U32, U32, U32, U32, U8],
        }
    }

    /// Total encoded size including the opcode byte.
    #[must_use]
    pub const fn encoded_size(self) -> usize {
        let format = self.wire_format();
        let mut size = 1;
        let mut i = 0;
        while i < format.len() {
            size += format[i].size();
            i += 1;
        }
        size
    }

    /// Mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::FDiv => "FDIV",
            Self::Eq => "EQ",
            Self::Lt => "LT",
            Self::Lte => "LTE",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
            Self::Not => "NOT",
            Self::Shl => "SHL",
            Self::Shr => "SHR",
            Self::Cast => "CAST",
            Self::GetEnvVar => "GETENVVAR",
            Self::CalldataCopy => "CALLDATACOPY",
            Self::ReturndataSize => "RETURNDATASIZE",
            Self::ReturndataCopy => "RETURNDATACOPY",
            Self::SuccessCopy => "SUCCESSCOPY",
            Self::Jump => "JUMP",
            Self::JumpI => "JUMPI",
            Self::InternalCall => "INTERNALCALL",
            Self::InternalReturn => "INTERNALRETURN",
            Self::Set8 => "SET_8",
            Self::Set16 => "SET_16",
            Self::Set32 => "SET_32",
            Self::Set64 => "SET_64",
            Self::Set128 => "SET_128",
            Self::SetFf => "SET_FF",
            Self::Mov => "MOV",
            Self::CMov => "CMOV",
            Self::SLoad => "SLOAD",
            Self::SStore => "SSTORE",
            Self::NoteHashExists => "NOTEHASHEXISTS",
            Self::EmitNoteHash => "EMITNOTEHASH",
            Self::NullifierExists => "NULLIFIEREXISTS",
            Self::EmitNullifier => "EMITNULLIFIER",
            Self::L1ToL2MsgExists => "L1TOL2MSGEXISTS",
            Self::GetContractInstance => "GETCONTRACTINSTANCE",
            Self::EmitUnencryptedLog => "EMITUNENCRYPTEDLOG",
            Self::SendL2ToL1Msg => "SENDL2TOL1MSG",
            Self::Call => "CALL",
            Self::StaticCall => "STATICCALL",
            Self::Return => "RETURN",
            Self::Revert => "REVERT",
            Self::DebugLog => "DEBUGLOG",
            Self::Sha256Compression => "SHA256COMPRESSION",
            Self::ToRadixBe => "TORADIXBE",
        }
    }

    /// Returns true if this opcode halts the current call.
    #[must_use]
    pub fn is_terminating(&self) -> bool {
        matches!(self, Self::Return | Self::Revert)
    }

    /// Returns true if this opcode is forbidden inside a static call.
    #[must_use]
    pub fn is_state_modifying(&self) -> bool {
        matches!(
            self,
            Self::SStore
                | Self::EmitNoteHash
                | Self::EmitNullifier
                | Self::EmitUnencryptedLog
                | Self::SendL2ToL1Msg
        )
    }

    /// Returns true for CALL and STATICCALL.
    #[must_use]
    pub fn is_external_call(&self) -> bool {
        matches!(self, Self::Call | Self::StaticCall)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_byte() {
        assert_eq!(Opcode::from_byte(0x00), Some(Opcode::Add));
        assert_eq!(Opcode::from_byte(0x35), Some(Opcode::SetFf));
        assert_eq!(Opcode::from_byte(0x60), Some(Opcode::Call));
        assert_eq!(Opcode::from_byte(0x81), Some(Opcode::ToRadixBe));
        assert_eq!(Opcode::from_byte(0x0F), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }

    #[test]
    fn test_table_roundtrip() {
        for opcode in ALL_OPCODES {
            assert_eq!(Opcode::from_byte(opcode as u8), Some(opcode));
        }
        let known = OPCODE_TABLE.iter().filter(|o| o.is_some()).count();
        assert_eq!(known, 49);
    }

    #[test]
    fn test_encoded_size() {
        assert_eq!(Opcode::Add.encoded_size(), 1 + 1 + 1 + 4 * 3);
        assert_eq!(Opcode::InternalReturn.encoded_size(), 1);
        assert_eq!(Opcode::SetFf.encoded_size(), 1 + 1 + 1 + 32 + 4);
        assert_eq!(Opcode::Call.encoded_size(), 1 + 1 + 4 * 8);
    }

    #[test]
    fn test_classification() {
        assert!(Opcode::Return.is_terminating());
        assert!(!Opcode::Call.is_terminating());
        assert!(Opcode::SStore.is_state_modifying());
        assert!(!Opcode::SLoad.is_state_modifying());
        assert!(Opcode::StaticCall.is_external_call());
        assert_eq!(Opcode::Set128.to_string(), "SET_128");
    }
}
