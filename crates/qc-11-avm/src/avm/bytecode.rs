//! # Bytecode Codec
//!
//! Decodes a flat byte buffer into [`Instruction`]s and encodes them back.
//! Decoding happens once per contract class, before execution starts; any
//! malformed byte is a fatal [`DecodeError`].

use super::instruction::{
    CMovOp, CallOp, CastOp, ContractInstanceMember, CopyOp, DebugLogOp, EmitUnencryptedLogOp,
    EnvironmentVariable, ExistsOp, GetContractInstanceOp, GetEnvVarOp, Instruction, JumpIOp,
    JumpOp, MovOp, NotOp, OffsetOp, ReturnOp, SLoadOp, SStoreOp, SendL2ToL1MsgOp, SetOp,
    Sha256CompressionOp, ThreeOperandOp, ToRadixBeOp,
};
use super::memory_types::TypeTag;
use super::opcodes::Opcode;
use crate::domain::value_objects::{fr_from_be_bytes, fr_low_u128, fr_to_be_bytes, Fr};
use crate::errors::DecodeError;

// =============================================================================
// READER
// =============================================================================

struct BytecodeReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    start: usize,
    opcode: Opcode,
}

impl<'a> BytecodeReader<'a> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let end = self.pos + N;
        let slice = self.bytes.get(self.pos..end).ok_or(DecodeError::Truncated {
            opcode: self.opcode,
            position: self.start,
        })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    fn u128(&mut self) -> Result<u128, DecodeError> {
        Ok(u128::from_be_bytes(self.take()?))
    }

    fn ff(&mut self) -> Result<Fr, DecodeError> {
        Ok(fr_from_be_bytes(&self.take::<32>()?))
    }

    fn tag(&mut self) -> Result<TypeTag, DecodeError> {
        let position = self.pos;
        let value = self.u8()?;
        TypeTag::from_u8(value).ok_or(DecodeError::InvalidTag { value, position })
    }

    fn three(&mut self) -> Result<ThreeOperandOp, DecodeError> {
        Ok(ThreeOperandOp {
            indirect: self.u8()?,
            tag: self.tag()?,
            a_offset: self.u32()?,
            b_offset: self.u32()?,
            dst_offset: self.u32()?,
        })
    }

    fn offset(&mut self) -> Result<OffsetOp, DecodeError> {
        Ok(OffsetOp {
            indirect: self.u8()?,
            offset: self.u32()?,
        })
    }

    fn copy(&mut self) -> Result<CopyOp, DecodeError> {
        Ok(CopyOp {
            indirect: self.u8()?,
            data_start: self.u32()?,
            copy_size: self.u32()?,
            dst_offset: self.u32()?,
        })
    }

    fn exists(&mut self) -> Result<ExistsOp, DecodeError> {
        Ok(ExistsOp {
            indirect: self.u8()?,
            value_offset: self.u32()?,
            key_offset: self.u32()?,
            exists_offset: self.u32()?,
        })
    }

    fn ret(&mut self) -> Result<ReturnOp, DecodeError> {
        Ok(ReturnOp {
            indirect: self.u8()?,
            ret_offset: self.u32()?,
            ret_size: self.u32()?,
        })
    }

    fn call(&mut self) -> Result<CallOp, DecodeError> {
        let indirect = self.u8()?;
        let gas_offset = self.u32()?;
        let address_offset = self.u32()?;
        let args_offset = self.u32()?;
        let args_size = self.u32()?;
        let ret_offset = self.u32()?;
        let ret_size = self.u32()?;
        let success_offset = self.u32()?;
        let function_selector_offset = self.u32()?;
        Ok(CallOp {
            indirect,
            gas_offset,
            address_offset,
            args_offset,
            ret_offset,
            success_offset,
            function_selector_offset,
            args_size,
            ret_size,
        })
    }

    fn set(&mut self, opcode: Opcode) -> Result<SetOp, DecodeError> {
        let indirect = self.u8()?;
        let tag = self.tag()?;
        let value = match opcode {
            Opcode::Set8 => Fr::from(u64::from(self.u8()?)),
            Opcode::Set16 => Fr::from(u64::from(self.u16()?)),
            Opcode::Set32 => Fr::from(u64::from(self.u32()?)),
            Opcode::Set64 => Fr::from(self.u64()?),
            Opcode::Set128 => Fr::from(self.u128()?),
            _ => self.ff()?,
        };
        Ok(SetOp {
            opcode,
            indirect,
            tag,
            value,
            dst_offset: self.u32()?,
        })
    }
}

// =============================================================================
// DECODING
// =============================================================================

fn decode_one(reader: &mut BytecodeReader<'_>) -> Result<Instruction, DecodeError> {
    let opcode = reader.opcode;
    Ok(match opcode {
        Opcode::Add => Instruction::Add(reader.three()?),
        Opcode::Sub => Instruction::Sub(reader.three()?),
        Opcode::Mul => Instruction::Mul(reader.three()?),
        Opcode::Div => Instruction::Div(reader.three()?),
        Opcode::FDiv => Instruction::FDiv(reader.three()?),
        Opcode::Eq => Instruction::Eq(reader.three()?),
        Opcode::Lt => Instruction::Lt(reader.three()?),
        Opcode::Lte => Instruction::Lte(reader.three()?),
        Opcode::And => Instruction::And(reader.three()?),
        Opcode::Or => Instruction::Or(reader.three()?),
        Opcode::Xor => Instruction::Xor(reader.three()?),
        Opcode::Shl => Instruction::Shl(reader.three()?),
        Opcode::Shr => Instruction::Shr(reader.three()?),
        Opcode::Not => Instruction::Not(NotOp {
            indirect: reader.u8()?,
            tag: reader.tag()?,
            src_offset: reader.u32()?,
            dst_offset: reader.u32()?,
        }),
        Opcode::Cast => Instruction::Cast(CastOp {
            indirect: reader.u8()?,
            dst_tag: reader.tag()?,
            src_offset: reader.u32()?,
            dst_offset: reader.u32()?,
        }),
        Opcode::GetEnvVar => {
            let indirect = reader.u8()?;
            let position = reader.pos;
            let value = reader.u8()?;
            let variable = EnvironmentVariable::from_u8(value)
                .ok_or(DecodeError::InvalidEnvironmentVariable { value, position })?;
            Instruction::GetEnvVar(GetEnvVarOp {
                indirect,
                variable,
                dst_offset: reader.u32()?,
            })
        }
        Opcode::CalldataCopy => Instruction::CalldataCopy(reader.copy()?),
        Opcode::ReturndataSize => Instruction::ReturndataSize(reader.offset()?),
        Opcode::ReturndataCopy => Instruction::ReturndataCopy(reader.copy()?),
        Opcode::SuccessCopy => Instruction::SuccessCopy(reader.offset()?),
        Opcode::Jump => Instruction::Jump(JumpOp { loc: reader.u32()? }),
        Opcode::JumpI => Instruction::JumpI(JumpIOp {
            indirect: reader.u8()?,
            cond_offset: reader.u32()?,
            loc: reader.u32()?,
        }),
        Opcode::InternalCall => Instruction::InternalCall(JumpOp { loc: reader.u32()? }),
        Opcode::InternalReturn => Instruction::InternalReturn,
        Opcode::Set8
        | Opcode::Set16
        | Opcode::Set32
        | Opcode::Set64
        | Opcode::Set128
        | Opcode::SetFf => Instruction::Set(reader.set(opcode)?),
        Opcode::Mov => Instruction::Mov(MovOp {
            indirect: reader.u8()?,
            src_offset: reader.u32()?,
            dst_offset: reader.u32()?,
        }),
        Opcode::CMov => Instruction::CMov(CMovOp {
            indirect: reader.u8()?,
            a_offset: reader.u32()?,
            b_offset: reader.u32()?,
            cond_offset: reader.u32()?,
            dst_offset: reader.u32()?,
        }),
        Opcode::SLoad => Instruction::SLoad(SLoadOp {
            indirect: reader.u8()?,
            slot_offset: reader.u32()?,
            dst_offset: reader.u32()?,
        }),
        Opcode::SStore => Instruction::SStore(SStoreOp {
            indirect: reader.u8()?,
            src_offset: reader.u32()?,
            slot_offset: reader.u32()?,
        }),
        Opcode::NoteHashExists => Instruction::NoteHashExists(reader.exists()?),
        Opcode::EmitNoteHash => Instruction::EmitNoteHash(reader.offset()?),
        Opcode::NullifierExists => Instruction::NullifierExists(reader.exists()?),
        Opcode::EmitNullifier => Instruction::EmitNullifier(reader.offset()?),
        Opcode::L1ToL2MsgExists => Instruction::L1ToL2MsgExists(reader.exists()?),
        Opcode::GetContractInstance => {
            let indirect = reader.u8()?;
            let address_offset = reader.u32()?;
            let dst_offset = reader.u32()?;
            let exists_offset = reader.u32()?;
            let position = reader.pos;
            let value = reader.u8()?;
            let member = ContractInstanceMember::from_u8(value)
                .ok_or(DecodeError::InvalidContractMember { value, position })?;
            Instruction::GetContractInstance(GetContractInstanceOp {
                indirect,
                address_offset,
                dst_offset,
                exists_offset,
                member,
            })
        }
        Opcode::EmitUnencryptedLog => Instruction::EmitUnencryptedLog(EmitUnencryptedLogOp {
            indirect: reader.u8()?,
            log_offset: reader.u32()?,
            log_size: reader.u32()?,
        }),
        Opcode::SendL2ToL1Msg => Instruction::SendL2ToL1Msg(SendL2ToL1MsgOp {
            indirect: reader.u8()?,
            recipient_offset: reader.u32()?,
            content_offset: reader.u32()?,
        }),
        Opcode::Call => Instruction::Call(reader.call()?),
        Opcode::StaticCall => Instruction::StaticCall(reader.call()?),
        Opcode::Return => Instruction::Return(reader.ret()?),
        Opcode::Revert => Instruction::Revert(reader.ret()?),
        Opcode::DebugLog => {
            let indirect = reader.u8()?;
            let message_offset = reader.u32()?;
            let message_size = reader.u32()?;
            let fields_offset = reader.u32()?;
            let fields_size = reader.u32()?;
            Instruction::DebugLog(DebugLogOp {
                indirect,
                message_offset,
                fields_offset,
                message_size,
                fields_size,
            })
        }
        Opcode::Sha256Compression => Instruction::Sha256Compression(Sha256CompressionOp {
            indirect: reader.u8()?,
            output_offset: reader.u32()?,
            state_offset: reader.u32()?,
            inputs_offset: reader.u32()?,
        }),
        Opcode::ToRadixBe => Instruction::ToRadixBe(ToRadixBeOp {
            indirect: reader.u8()?,
            src_offset: reader.u32()?,
            dst_offset: reader.u32()?,
            radix: reader.u32()?,
            num_limbs: reader.u32()?,
            output_bits: reader.u8()? != 0,
        }),
    })
}

/// Decodes a whole bytecode buffer.
///
/// # Errors
///
/// Returns the first [`DecodeError`] encountered.
pub fn decode_bytecode(bytes: &[u8]) -> Result<Vec<Instruction>, DecodeError> {
    let mut instructions = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let byte = bytes[pos];
        let opcode = Opcode::from_byte(byte).ok_or(DecodeError::InvalidOpcode {
            byte,
            position: pos,
        })?;
        let mut reader = BytecodeReader {
            bytes,
            pos: pos + 1,
            start: pos,
            opcode,
        };
        instructions.push(decode_one(&mut reader)?);
        debug_assert_eq!(reader.pos - pos, opcode.encoded_size());
        pos = reader.pos;
    }
    Ok(instructions)
}

// =============================================================================
// ENCODING
// =============================================================================

#[derive(Default)]
struct BytecodeWriter {
    out: Vec<u8>,
}

impl BytecodeWriter {
    fn u8(&mut self, v: u8) -> &mut Self {
        self.out.push(v);
        self
    }

    fn u32(&mut self, v: u32) -> &mut Self {
        self.out.extend_from_slice(&v.to_be_bytes());
        self
    }

    fn tag(&mut self, tag: TypeTag) -> &mut Self {
        self.u8(tag as u8)
    }

    fn three(&mut self, op: &ThreeOperandOp) {
        self.u8(op.indirect)
            .tag(op.tag)
            .u32(op.a_offset)
            .u32(op.b_offset)
            .u32(op.dst_offset);
    }

    fn offset(&mut self, op: &OffsetOp) {
        self.u8(op.indirect).u32(op.offset);
    }

    fn copy(&mut self, op: &CopyOp) {
        self.u8(op.indirect)
            .u32(op.data_start)
            .u32(op.copy_size)
            .u32(op.dst_offset);
    }

    fn exists(&mut self, op: &ExistsOp) {
        self.u8(op.indirect)
            .u32(op.value_offset)
            .u32(op.key_offset)
            .u32(op.exists_offset);
    }

    fn ret(&mut self, op: &ReturnOp) {
        self.u8(op.indirect).u32(op.ret_offset).u32(op.ret_size);
    }

    fn call(&mut self, op: &CallOp) {
        self.u8(op.indirect)
            .u32(op.gas_offset)
            .u32(op.address_offset)
            .u32(op.args_offset)
            .u32(op.args_size)
            .u32(op.ret_offset)
            .u32(op.ret_size)
            .u32(op.success_offset)
            .u32(op.function_selector_offset);
    }

    #[allow(clippy::cast_possible_truncation)]
    fn set(&mut self, op: &SetOp) {
        self.u8(op.indirect).tag(op.tag);
        let low = fr_low_u128(&op.value);
        match op.opcode {
            Opcode::Set8 => self.out.push(low as u8),
            Opcode::Set16 => self.out.extend_from_slice(&(low as u16).to_be_bytes()),
            Opcode::Set32 => self.out.extend_from_slice(&(low as u32).to_be_bytes()),
            Opcode::Set64 => self.out.extend_from_slice(&(low as u64).to_be_bytes()),
            Opcode::Set128 => self.out.extend_from_slice(&low.to_be_bytes()),
            _ => self.out.extend_from_slice(&fr_to_be_bytes(&op.value)),
        }
        self.u32(op.dst_offset);
    }
}

/// Appends the encoding of one instruction.
pub fn encode_instruction(instruction: &Instruction, out: &mut Vec<u8>) {
    let mut w = BytecodeWriter::default();
    w.u8(instruction.opcode() as u8);
    match instruction {
        Instruction::Add(op)
        | Instruction::Sub(op)
        | Instruction::Mul(op)
        | Instruction::Div(op)
        | Instruction::FDiv(op)
        | Instruction::Eq(op)
        | Instruction::Lt(op)
        | Instruction::Lte(op)
        | Instruction::And(op)
        | Instruction::Or(op)
        | Instruction::Xor(op)
        | Instruction::Shl(op)
        | Instruction::Shr(op) => w.three(op),
        Instruction::Not(op) => {
            w.u8(op.indirect)
                .tag(op.tag)
                .u32(op.src_offset)
                .u32(op.dst_offset);
        }
        Instruction::Cast(op) => {
            w.u8(op.indirect)
                .tag(op.dst_tag)
                .u32(op.src_offset)
                .u32(op.dst_offset);
        }
        Instruction::GetEnvVar(op) => {
            w.u8(op.indirect).u8(op.variable as u8).u32(op.dst_offset);
        }
        Instruction::CalldataCopy(op) | Instruction::ReturndataCopy(op) => w.copy(op),
        Instruction::ReturndataSize(op)
        | Instruction::SuccessCopy(op)
        | Instruction::EmitNoteHash(op)
        | Instruction::EmitNullifier(op) => w.offset(op),
        Instruction::Jump(op) | Instruction::InternalCall(op) => {
            w.u32(op.loc);
        }
        Instruction::JumpI(op) => {
            w.u8(op.indirect).u32(op.cond_offset).u32(op.loc);
        }
        Instruction::InternalReturn => {}
        Instruction::Set(op) => w.set(op),
        Instruction::Mov(op) => {
            w.u8(op.indirect).u32(op.src_offset).u32(op.dst_offset);
        }
        Instruction::CMov(op) => {
            w.u8(op.indirect)
                .u32(op.a_offset)
                .u32(op.b_offset)
                .u32(op.cond_offset)
                .u32(op.dst_offset);
        }
        Instruction::SLoad(op) => {
            w.u8(op.indirect).u32(op.slot_offset).u32(op.dst_offset);
        }
        Instruction::SStore(op) => {
            w.u8(op.indirect).u32(op.src_offset).u32(op.slot_offset);
        }
        Instruction::NoteHashExists(op)
        | Instruction::NullifierExists(op)
        | Instruction::L1ToL2MsgExists(op) => w.exists(op),
        Instruction::GetContractInstance(op) => {
            w.u8(op.indirect)
                .u32(op.address_offset)
                .u32(op.dst_offset)
                .u32(op.exists_offset)
                .u8(op.member as u8);
        }
        Instruction::EmitUnencryptedLog(op) => {
            w.u8(op.indirect).u32(op.log_offset).u32(op.log_size);
        }
        Instruction::SendL2ToL1Msg(op) => {
            w.u8(op.indirect)
                .u32(op.recipient_offset)
                .u32(op.content_offset);
        }
        Instruction::Call(op) | Instruction::StaticCall(op) => w.call(op),
        Instruction::Return(op) | Instruction::Revert(op) => w.ret(op),
        Instruction::DebugLog(op) => {
            w.u8(op.indirect)
                .u32(op.message_offset)
                .u32(op.message_size)
                .u32(op.fields_offset)
                .u32(op.fields_size);
        }
        Instruction::Sha256Compression(op) => {
            w.u8(op.indirect)
                .u32(op.output_offset)
                .u32(op.state_offset)
                .u32(op.inputs_offset);
        }
        Instruction::ToRadixBe(op) => {
            w.u8(op.indirect)
                .u32(op.src_offset)
                .u32(op.dst_offset)
                .u32(op.radix)
                .u32(op.num_limbs)
                .u8(u8::from(op.output_bits));
        }
    }
    out.extend_from_slice(&w.out);
}

/// Encodes a program.
#[must_use]
pub fn encode_bytecode(instructions: &[Instruction]) -> Vec<u8> {
    let mut out = Vec::new();
    for instruction in instructions {
        encode_instruction(instruction, &mut out);
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
