//! # Decoded Instructions
//!
//! A closed set of instruction variants. Each variant carries a typed operand
//! payload; offsets listed first in a payload are the memory-offset operands
//! the indirect byte applies to, in bit order.

use super::addressing::indirect_operand_count;
use super::memory_types::TypeTag;
use super::opcodes::Opcode;
use crate::domain::value_objects::Fr;

// =============================================================================
// OPERAND ENUMS
// =============================================================================

/// Variables readable with GETENVVAR.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EnvironmentVariable {
    Address = 0,
    StorageAddress = 1,
    Sender = 2,
    FunctionSelector = 3,
    TransactionFee = 4,
    ChainId = 5,
    Version = 6,
    BlockNumber = 7,
    Timestamp = 8,
    FeePerL2Gas = 9,
    FeePerDaGas = 10,
    IsStaticCall = 11,
    L2GasLeft = 12,
    DaGasLeft = 13,
    CallDepth = 14,
}

impl EnvironmentVariable {
    /// Decodes a wire selector.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Address,
            1 => Self::StorageAddress,
            2 => Self::Sender,
            3 => Self::FunctionSelector,
            4 => Self::TransactionFee,
            5 => Self::ChainId,
            6 => Self::Version,
            7 => Self::BlockNumber,
            8 => Self::Timestamp,
            9 => Self::FeePerL2Gas,
            10 => Self::FeePerDaGas,
            11 => Self::IsStaticCall,
            12 => Self::L2GasLeft,
            13 => Self::DaGasLeft,
            14 => Self::CallDepth,
            _ => return None,
        })
    }

    /// Tag of the value written to memory.
    #[must_use]
    pub const fn tag(self) -> TypeTag {
        match self {
            Self::Address
            | Self::StorageAddress
            | Self::Sender
            | Self::TransactionFee
            | Self::ChainId
            | Self::Version => TypeTag::Field,
            Self::FunctionSelector | Self::BlockNumber | Self::CallDepth => TypeTag::U32,
            Self::Timestamp | Self::L2GasLeft | Self::DaGasLeft => TypeTag::U64,
            Self::FeePerL2Gas | Self::FeePerDaGas => TypeTag::U128,
            Self::IsStaticCall => TypeTag::U1,
        }
    }
}

/// Members readable with GETCONTRACTINSTANCE.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContractInstanceMember {
    Deployer = 0,
    ClassId = 1,
    InitializationHash = 2,
}

impl ContractInstanceMember {
    /// Decodes a wire selector.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Deployer),
            1 => Some(Self::ClassId),
            2 => Some(Self::InitializationHash),
            _ => None,
        }
    }
}

// =============================================================================
// OPERAND PAYLOADS
// =============================================================================

/// `dst = a <op> b` over operands of `tag`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThreeOperandOp {
    pub indirect: u8,
    pub tag: TypeTag,
    pub a_offset: u32,
    pub b_offset: u32,
    pub dst_offset: u32,
}

/// `dst = !a`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotOp {
    pub indirect: u8,
    pub tag: TypeTag,
    pub src_offset: u32,
    pub dst_offset: u32,
}

/// `dst = (dst_tag) src`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastOp {
    pub indirect: u8,
    pub dst_tag: TypeTag,
    pub src_offset: u32,
    pub dst_offset: u32,
}

/// GETENVVAR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GetEnvVarOp {
    pub indirect: u8,
    pub variable: EnvironmentVariable,
    pub dst_offset: u32,
}

/// CALLDATACOPY / RETURNDATACOPY: `dst[..size] = data[start..start+size]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CopyOp {
    pub indirect: u8,
    pub data_start: u32,
    pub copy_size: u32,
    pub dst_offset: u32,
}

/// Instructions with a single memory operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OffsetOp {
    pub indirect: u8,
    pub offset: u32,
}

/// JUMP / INTERNALCALL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JumpOp {
    pub loc: u32,
}

/// JUMPI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JumpIOp {
    pub indirect: u8,
    pub cond_offset: u32,
    pub loc: u32,
}

/// SET_8 .. SET_FF. `opcode` fixes the immediate's wire width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetOp {
    pub opcode: Opcode,
    pub indirect: u8,
    pub tag: TypeTag,
    pub value: Fr,
    pub dst_offset: u32,
}

/// MOV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovOp {
    pub indirect: u8,
    pub src_offset: u32,
    pub dst_offset: u32,
}

/// CMOV: `dst = cond != 0 ? a : b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CMovOp {
    pub indirect: u8,
    pub a_offset: u32,
    pub b_offset: u32,
    pub cond_offset: u32,
    pub dst_offset: u32,
}

/// SLOAD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SLoadOp {
    pub indirect: u8,
    pub slot_offset: u32,
    pub dst_offset: u32,
}

/// SSTORE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SStoreOp {
    pub indirect: u8,
    pub src_offset: u32,
    pub slot_offset: u32,
}

/// NOTEHASHEXISTS (value, leaf index), NULLIFIEREXISTS (value, address),
/// L1TOL2MSGEXISTS (value, leaf index).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExistsOp {
    pub indirect: u8,
    pub value_offset: u32,
    pub key_offset: u32,
    pub exists_offset: u32,
}

/// GETCONTRACTINSTANCE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GetContractInstanceOp {
    pub indirect: u8,
    pub address_offset: u32,
    pub dst_offset: u32,
    pub exists_offset: u32,
    pub member: ContractInstanceMember,
}

/// EMITUNENCRYPTEDLOG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmitUnencryptedLogOp {
    pub indirect: u8,
    pub log_offset: u32,
    pub log_size: u32,
}

/// SENDL2TOL1MSG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SendL2ToL1MsgOp {
    pub indirect: u8,
    pub recipient_offset: u32,
    pub content_offset: u32,
}

/// CALL / STATICCALL.
///
/// `gas_offset` points at three consecutive U32 cells: L2, DA, L1 allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallOp {
    pub indirect: u8,
    pub gas_offset: u32,
    pub address_offset: u32,
    pub args_offset: u32,
    pub ret_offset: u32,
    pub success_offset: u32,
    pub function_selector_offset: u32,
    pub args_size: u32,
    pub ret_size: u32,
}

/// RETURN / REVERT.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReturnOp {
    pub indirect: u8,
    pub ret_offset: u32,
    pub ret_size: u32,
}

/// DEBUGLOG.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugLogOp {
    pub indirect: u8,
    pub message_offset: u32,
    pub fields_offset: u32,
    pub message_size: u32,
    pub fields_size: u32,
}

/// SHA256COMPRESSION.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sha256CompressionOp {
    pub indirect: u8,
    pub output_offset: u32,
    pub state_offset: u32,
    pub inputs_offset: u32,
}

/// TORADIXBE.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ToRadixBeOp {
    pub indirect: u8,
    pub src_offset: u32,
    pub dst_offset: u32,
    pub radix: u32,
    pub num_limbs: u32,
    pub output_bits: bool,
}

// =============================================================================
// INSTRUCTION
// =============================================================================

/// One decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Instruction {
    Add(ThreeOperandOp),
    Sub(ThreeOperandOp),
    Mul(ThreeOperandOp),
    Div(ThreeOperandOp),
    FDiv(ThreeOperandOp),
    Eq(ThreeOperandOp),
    Lt(ThreeOperandOp),
    Lte(ThreeOperandOp),
    And(ThreeOperandOp),
    Or(ThreeOperandOp),
    Xor(ThreeOperandOp),
    Not(NotOp),
    Shl(ThreeOperandOp),
    Shr(ThreeOperandOp),
    Cast(CastOp),
    GetEnvVar(GetEnvVarOp),
    CalldataCopy(CopyOp),
    ReturndataSize(OffsetOp),
    ReturndataCopy(CopyOp),
    SuccessCopy(OffsetOp),
    Jump(JumpOp),
    JumpI(JumpIOp),
    InternalCall(JumpOp),
    InternalReturn,
    Set(SetOp),
    Mov(MovOp),
    CMov(CMovOp),
    SLoad(SLoadOp),
    SStore(SStoreOp),
    NoteHashExists(ExistsOp),
    EmitNoteHash(OffsetOp),
    NullifierExists(ExistsOp),
    EmitNullifier(OffsetOp),
    L1ToL2MsgExists(ExistsOp),
    GetContractInstance(GetContractInstanceOp),
    EmitUnencryptedLog(EmitUnencryptedLogOp),
    SendL2ToL1Msg(SendL2ToL1MsgOp),
    Call(CallOp),
    StaticCall(CallOp),
    Return(ReturnOp),
    Revert(ReturnOp),
    DebugLog(DebugLogOp),
    Sha256Compression(Sha256CompressionOp),
    ToRadixBe(ToRadixBeOp),
}

impl Instruction {
    /// Opcode of this instruction.
    #[must_use]
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Add(_) => Opcode::Add,
            Self::Sub(_) => Opcode::Sub,
            Self::Mul(_) => Opcode::Mul,
            Self::Div(_) => Opcode::Div,
            Self::FDiv(_) => Opcode::FDiv,
            Self::Eq(_) => Opcode::Eq,
            Self::Lt(_) => Opcode::Lt,
            Self::Lte(_) => Opcode::Lte,
            Self::And(_) => Opcode::And,
            Self::Or(_) => Opcode::Or,
            Self::Xor(_) => Opcode::Xor,
            Self::Not(_) => Opcode::Not,
            Self::Shl(_) => Opcode::Shl,
            Self::Shr(_) => Opcode::Shr,
            Self::Cast(_) => Opcode::Cast,
            Self::GetEnvVar(_) => Opcode::GetEnvVar,
            Self::CalldataCopy(_) => Opcode::CalldataCopy,
            Self::ReturndataSize(_) => Opcode::ReturndataSize,
            Self::ReturndataCopy(_) => Opcode::ReturndataCopy,
            Self::SuccessCopy(_) => Opcode::SuccessCopy,
            Self::Jump(_) => Opcode::Jump,
            Self::JumpI(_) => Opcode::JumpI,
            Self::InternalCall(_) => Opcode::InternalCall,
            Self::InternalReturn => Opcode::InternalReturn,
            Self::Set(op) => op.opcode,
            Self::Mov(_) => Opcode::Mov,
            Self::CMov(_) => Opcode::CMov,
            Self::SLoad(_) => Opcode::SLoad,
            Self::SStore(_) => Opcode::SStore,
            Self::NoteHashExists(_) => Opcode::NoteHashExists,
            Self::EmitNoteHash(_) => Opcode::EmitNoteHash,
            Self::NullifierExists(_) => Opcode::NullifierExists,
            Self::EmitNullifier(_) => Opcode::EmitNullifier,
            Self::L1ToL2MsgExists(_) => Opcode::L1ToL2MsgExists,
            Self::GetContractInstance(_) => Opcode::GetContractInstance,
            Self::EmitUnencryptedLog(_) => Opcode::EmitUnencryptedLog,
            Self::SendL2ToL1Msg(_) => Opcode::SendL2ToL1Msg,
            Self::Call(_) => Opcode::Call,
            Self::StaticCall(_) => Opcode::StaticCall,
            Self::Return(_) => Opcode::Return,
            Self::Revert(_) => Opcode::Revert,
            Self::DebugLog(_) => Opcode::DebugLog,
            Self::Sha256Compression(_) => Opcode::Sha256Compression,
            Self::ToRadixBe(_) => Opcode::ToRadixBe,
        }
    }

    /// Tag whose width scales the base gas cost, if any.
    #[must_use]
    pub const fn width_tag(&self) -> Option<TypeTag> {
        match self {
            Self::Add(op)
            | Self::Sub(op)
            | Self::Mul(op)
            | Self::Div(op)
            | Self::FDiv(op)
            | Self::Eq(op)
            | Self::Lt(op)
            | Self::Lte(op)
            | Self::And(op)
            | Self::Or(op)
            | Self::Xor(op)
            | Self::Shl(op)
            | Self::Shr(op) => Some(op.tag),
            Self::Not(op) => Some(op.tag),
            Self::Cast(op) => Some(op.dst_tag),
            Self::Set(op) => Some(op.tag),
            _ => None,
        }
    }

    /// Indirect byte and the number of offset operands it covers.
    #[must_use]
    pub const fn indirect_and_offset_count(&self) -> (u8, usize) {
        match self {
            Self::Add(op)
            | Self::Sub(op)
            | Self::Mul(op)
            | Self::Div(op)
            | Self::FDiv(op)
            | Self::Eq(op)
            | Self::Lt(op)
            | Self::Lte(op)
            | Self::And(op)
            | Self::Or(op)
            | Self::Xor(op)
            | Self::Shl(op)
            | Self::Shr(op) => (op.indirect, 3),
            Self::Not(op) => (op.indirect, 2),
            Self::Cast(op) => (op.indirect, 2),
            Self::GetEnvVar(op) => (op.indirect, 1),
            Self::CalldataCopy(op) | Self::ReturndataCopy(op) => (op.indirect, 1),
            Self::ReturndataSize(op)
            | Self::SuccessCopy(op)
            | Self::EmitNoteHash(op)
            | Self::EmitNullifier(op) => (op.indirect, 1),
            Self::Jump(_) | Self::InternalCall(_) | Self::InternalReturn => (0, 0),
            Self::JumpI(op) => (op.indirect, 1),
            Self::Set(op) => (op.indirect, 1),
            Self::Mov(op) => (op.indirect, 2),
            Self::CMov(op) => (op.indirect, 4),
            Self::SLoad(op) => (op.indirect, 2),
            Self::SStore(op) => (op.indirect, 2),
            Self::NoteHashExists(op) | Self::NullifierExists(op) | Self::L1ToL2MsgExists(op) => {
                (op.indirect, 3)
            }
            Self::GetContractInstance(op) => (op.indirect, 3),
            Self::EmitUnencryptedLog(op) => (op.indirect, 1),
            Self::SendL2ToL1Msg(op) => (op.indirect, 2),
            Self::Call(op) | Self::StaticCall(op) => (op.indirect, 6),
            Self::Return(op) | Self::Revert(op) => (op.indirect, 1),
            Self::DebugLog(op) => (op.indirect, 2),
            Self::Sha256Compression(op) => (op.indirect, 3),
            Self::ToRadixBe(op) => (op.indirect, 2),
        }
    }

    /// Number of operands addressed indirectly.
    #[must_use]
    pub fn indirect_operand_count(&self) -> usize {
        let (indirect, count) = self.indirect_and_offset_count();
        indirect_operand_count(indirect, count)
    }

    /// Length of the variable-size operand, for dynamic gas.
    #[must_use]
    pub const fn dynamic_length(&self) -> u32 {
        match self {
            Self::CalldataCopy(op) | Self::ReturndataCopy(op) => op.copy_size,
            Self::EmitUnencryptedLog(op) => op.log_size,
            Self::Call(op) | Self::StaticCall(op) => op.args_size.saturating_add(op.ret_size),
            Self::Return(op) | Self::Revert(op) => op.ret_size,
            Self::DebugLog(op) => op.message_size.saturating_add(op.fields_size),
            Self::ToRadixBe(op) => op.num_limbs,
            _ => 0,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
