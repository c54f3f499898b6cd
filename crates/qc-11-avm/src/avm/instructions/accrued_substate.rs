//! Membership checks and side-effect emission: note hashes, nullifiers,
//! L1 to L2 messages, contract instances, logs and L2 to L1 messages.

use super::{check_not_static, resolve};
use crate::avm::context::AvmContext;
use crate::avm::instruction::{
    ContractInstanceMember, EmitUnencryptedLogOp, ExistsOp, GetContractInstanceOp, OffsetOp,
    SendL2ToL1MsgOp,
};
use crate::avm::memory_types::{TaggedValue, TypeTag};
use crate::avm::simulator::AvmSimulator;
use crate::domain::value_objects::{Address, Fr, Gas};
use crate::errors::ExecutionError;

/// Resolves an exists-style instruction and returns `(value, key, exists_offset)`.
fn exists_operands(ctx: &mut AvmContext, op: &ExistsOp, cost: Gas) -> Result<(Fr, Fr, u32), ExecutionError> {
    let [value, key, exists] = resolve(
        ctx,
        op.indirect,
        [op.value_offset, op.key_offset, op.exists_offset],
        cost,
    )?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tags(TypeTag::Field, &[value, key])?;
    Ok((memory.get(value).to_field(), memory.get(key).to_field(), exists))
}

/// Resolves an emit-style instruction and returns the Field value.
fn emit_operand(ctx: &mut AvmContext, op: &OffsetOp, cost: Gas) -> Result<Fr, ExecutionError> {
    check_not_static(ctx)?;
    let [offset] = resolve(ctx, op.indirect, [op.offset], cost)?;
    let memory = &mut ctx.machine_state.memory;
    memory.check_tag(TypeTag::Field, offset)?;
    Ok(memory.get(offset).to_field())
}

impl AvmSimulator<'_> {
    /// Checks the note hash tree at a leaf index.
    pub(super) fn note_hash_exists(&mut self, ctx: &mut AvmContext, op: &ExistsOp, cost: Gas) -> Result<(), ExecutionError> {
        let (note_hash, leaf_index, dst) = exists_operands(ctx, op, cost)?;
        let exists = self.journal.check_note_hash_exists(note_hash, leaf_index)?;
        ctx.machine_state.memory.set(dst, TaggedValue::from_bool(exists));
        Ok(())
    }

    pub(super) fn emit_note_hash(&mut self, ctx: &mut AvmContext, op: &OffsetOp, cost: Gas) -> Result<(), ExecutionError> {
        let note_hash = emit_operand(ctx, op, cost)?;
        self.journal
            .write_note_hash(ctx.journal_node, ctx.env.address, note_hash)
    }

    /// Checks pending and committed nullifiers of a contract.
    pub(super) fn nullifier_exists(&mut self, ctx: &mut AvmContext, op: &ExistsOp, cost: Gas) -> Result<(), ExecutionError> {
        let (nullifier, address, dst) = exists_operands(ctx, op, cost)?;
        let exists = self
            .journal
            .check_nullifier_exists(ctx.journal_node, Address::from(address), nullifier)?;
        ctx.machine_state.memory.set(dst, TaggedValue::from_bool(exists));
        Ok(())
    }

    pub(super) fn emit_nullifier(&mut self, ctx: &mut AvmContext, op: &OffsetOp, cost: Gas) -> Result<(), ExecutionError> {
        let nullifier = emit_operand(ctx, op, cost)?;
        self.journal
            .write_nullifier(ctx.journal_node, ctx.env.address, nullifier)
    }

    pub(super) fn l1_to_l2_msg_exists(&mut self, ctx: &mut AvmContext, op: &ExistsOp, cost: Gas) -> Result<(), ExecutionError> {
        let (message_hash, leaf_index, dst) = exists_operands(ctx, op, cost)?;
        let exists = self
            .journal
            .check_l1_to_l2_message_exists(message_hash, leaf_index)?;
        ctx.machine_state.memory.set(dst, TaggedValue::from_bool(exists));
        Ok(())
    }

    /// Reads one member of a deployed instance. A missing instance writes
    /// zero and `exists = false`.
    pub(super) fn get_contract_instance(
        &mut self,
        ctx: &mut AvmContext,
        op: &GetContractInstanceOp,
        cost: Gas,
    ) -> Result<(), ExecutionError> {
        let [address, dst, exists] = resolve(
            ctx,
            op.indirect,
            [op.address_offset, op.dst_offset, op.exists_offset],
            cost,
        )?;
        ctx.machine_state.memory.check_tag(TypeTag::Field, address)?;

        let address = Address::from(ctx.machine_state.memory.get(address).to_field());
        let instance = self.contracts.get_contract_instance(address)?;
        let member = instance.as_ref().map_or_else(Fr::default, |instance| match op.member {
            ContractInstanceMember::Deployer => instance.deployer.to_field(),
            ContractInstanceMember::ClassId => instance.class_id,
            ContractInstanceMember::InitializationHash => instance.initialization_hash,
        });

        let memory = &mut ctx.machine_state.memory;
        memory.set(exists, TaggedValue::from_bool(instance.is_some()));
        memory.set(dst, TaggedValue::Field(member));
        Ok(())
    }

    pub(super) fn emit_unencrypted_log(
        &mut self,
        ctx: &mut AvmContext,
        op: &EmitUnencryptedLogOp,
        cost: Gas,
    ) -> Result<(), ExecutionError> {
        check_not_static(ctx)?;
        let [log] = resolve(ctx, op.indirect, [op.log_offset], cost)?;
        let memory = &mut ctx.machine_state.memory;
        memory.check_tag_range(TypeTag::Field, log, op.log_size)?;

        let fields = memory
            .get_slice(log, op.log_size)?
            .iter()
            .map(TaggedValue::to_field)
            .collect();
        self.journal
            .write_unencrypted_log(ctx.journal_node, ctx.env.address, fields)
    }

    pub(super) fn send_l2_to_l1_msg(
        &mut self,
        ctx: &mut AvmContext,
        op: &SendL2ToL1MsgOp,
        cost: Gas,
    ) -> Result<(), ExecutionError> {
        check_not_static(ctx)?;
        let [recipient, content] = resolve(
            ctx,
            op.indirect,
            [op.recipient_offset, op.content_offset],
            cost,
        )?;
        let memory = &mut ctx.machine_state.memory;
        memory.check_tags(TypeTag::Field, &[recipient, content])?;

        let recipient = memory.get(recipient).to_field();
        let content = memory.get(content).to_field();
        self.journal
            .write_l2_to_l1_message(ctx.journal_node, ctx.env.address, recipient, content)
    }
}
