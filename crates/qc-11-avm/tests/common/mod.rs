//! Shared builders for the integration tests.

#![allow(dead_code)]

use qc_11_avm::avm::instruction::{
    CallOp, Instruction, ReturnOp, SLoadOp, SStoreOp, SetOp, ThreeOperandOp,
};
use qc_11_avm::prelude::*;

pub const CALLER: u64 = 1;
pub const CALLEE: u64 = 2;

pub fn set(dst: u32, tag: TypeTag, value: u64) -> Instruction {
    Instruction::Set(SetOp {
        opcode: Opcode::Set64,
        indirect: 0,
        tag,
        value: Fr::from(value),
        dst_offset: dst,
    })
}

pub fn add(tag: TypeTag, a: u32, b: u32, dst: u32) -> Instruction {
    Instruction::Add(ThreeOperandOp {
        indirect: 0,
        tag,
        a_offset: a,
        b_offset: b,
        dst_offset: dst,
    })
}

pub fn sstore(src: u32, slot: u32) -> Instruction {
    Instruction::SStore(SStoreOp {
        indirect: 0,
        src_offset: src,
        slot_offset: slot,
    })
}

pub fn sload(slot: u32, dst: u32) -> Instruction {
    Instruction::SLoad(SLoadOp {
        indirect: 0,
        slot_offset: slot,
        dst_offset: dst,
    })
}

pub fn ret(offset: u32, size: u32) -> Instruction {
    Instruction::Return(ReturnOp {
        indirect: 0,
        ret_offset: offset,
        ret_size: size,
    })
}

pub fn revert(offset: u32, size: u32) -> Instruction {
    Instruction::Revert(ReturnOp {
        indirect: 0,
        ret_offset: offset,
        ret_size: size,
    })
}

/// CALL to [`CALLEE`] with 10_000 of every gas budget.
///
/// Uses cells 100..105 for the operands; return data lands at `ret_offset`
/// and the success flag right after it.
pub fn call_callee(ret_offset: u32, ret_size: u32) -> Vec<Instruction> {
    vec![
        set(100, TypeTag::U32, 10_000),
        set(101, TypeTag::U32, 10_000),
        set(102, TypeTag::U32, 10_000),
        set(103, TypeTag::Field, CALLEE),
        set(104, TypeTag::Field, 0),
        Instruction::Call(CallOp {
            indirect: 0,
            gas_offset: 100,
            address_offset: 103,
            args_offset: 110,
            ret_offset,
            success_offset: ret_offset + ret_size,
            function_selector_offset: 104,
            args_size: 0,
            ret_size,
        }),
    ]
}

/// Total static cost of a straight-line program.
pub fn static_cost(program: &[Instruction]) -> Gas {
    program
        .iter()
        .map(qc_11_avm::avm::gas::instruction_gas)
        .fold(Gas::zero(), |acc, g| acc.saturating_add(&g))
}

/// Deploys `caller` at [`CALLER`] and `callee` at [`CALLEE`].
pub fn deploy(caller: &[Instruction], callee: &[Instruction]) -> InMemoryContractsDb {
    let contracts = InMemoryContractsDb::new();
    contracts.deploy(Address::from_u64(CALLER), encode_bytecode(caller));
    contracts.deploy(Address::from_u64(CALLEE), encode_bytecode(callee));
    contracts
}

pub fn enqueued(gas: Gas) -> EnqueuedCall {
    EnqueuedCall::new(Address::from_u64(CALLER), Address::from_u64(99), vec![], gas)
}

/// Simulates an enqueued call to [`CALLER`].
pub fn simulate(
    world: &InMemoryWorldState,
    contracts: &InMemoryContractsDb,
    config: AvmConfig,
    gas: Gas,
) -> Result<TxExecutionResult, FatalError> {
    AvmSimulator::new(world, contracts, config).simulate(enqueued(gas))
}
