//! SLOAD, SSTORE.

use super::{check_not_static, resolve};
use crate::avm::context::AvmContext;
use crate::avm::instruction::{SLoadOp, SStoreOp};
use crate::avm::memory_types::{TaggedValue, TypeTag};
use crate::avm::simulator::AvmSimulator;
use crate::domain::value_objects::Gas;
use crate::errors::ExecutionError;

impl AvmSimulator<'_> {
    /// Reads a slot of the current storage address through the journal.
    pub(super) fn sload(&mut self, ctx: &mut AvmContext, op: &SLoadOp, cost: Gas) -> Result<(), ExecutionError> {
        let [slot, dst] = resolve(ctx, op.indirect, [op.slot_offset, op.dst_offset], cost)?;
        ctx.machine_state.memory.check_tag(TypeTag::Field, slot)?;

        let slot = ctx.machine_state.memory.get(slot).to_field();
        let value = self
            .journal
            .read_storage(ctx.journal_node, ctx.env.storage_address, slot)?;
        ctx.machine_state.memory.set(dst, TaggedValue::Field(value));
        Ok(())
    }

    /// Records a pending write in the call's journal node.
    pub(super) fn sstore(&mut self, ctx: &mut AvmContext, op: &SStoreOp, cost: Gas) -> Result<(), ExecutionError> {
        check_not_static(ctx)?;
        let [src, slot] = resolve(ctx, op.indirect, [op.src_offset, op.slot_offset], cost)?;
        let memory = &mut ctx.machine_state.memory;
        memory.check_tags(TypeTag::Field, &[src, slot])?;

        let value = memory.get(src).to_field();
        let slot = memory.get(slot).to_field();
        self.journal
            .write_storage(ctx.journal_node, ctx.env.storage_address, slot, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryContractsDb, InMemoryWorldState};
    use crate::avm::instructions::test_utils::create_test_context;
    use crate::domain::entities::{AvmConfig, SideEffectLimits};
    use crate::domain::value_objects::{Address, Fr};
    use crate::errors::{AvmError, SideEffectKind};
    use crate::ports::outbound::WorldStateReader;

    fn store(src: u32, slot: u32) -> SStoreOp {
        SStoreOp {
            indirect: 0,
            src_offset: src,
            slot_offset: slot,
        }
    }

    fn load(slot: u32, dst: u32) -> SLoadOp {
        SLoadOp {
            indirect: 0,
            slot_offset: slot,
            dst_offset: dst,
        }
    }

    #[test]
    fn test_sload_reads_committed_state() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        world.set_storage(Address::from_u64(1), Fr::from(5u64), Fr::from(55u64));
        let mut sim = AvmSimulator::new(&world, &contracts, AvmConfig::default());

        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(Fr::from(5u64)));
        sim.sload(&mut ctx, &load(0, 1), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(1), TaggedValue::Field(Fr::from(55u64)));
    }

    #[test]
    fn test_sstore_then_sload() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let mut sim = AvmSimulator::new(&world, &contracts, AvmConfig::default());

        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::Field(Fr::from(9u64)));
        ctx.machine_state.memory.set(1, TaggedValue::Field(Fr::from(3u64)));
        sim.sstore(&mut ctx, &store(0, 1), Gas::zero()).unwrap();
        sim.sload(&mut ctx, &load(1, 2), Gas::zero()).unwrap();
        assert_eq!(ctx.machine_state.memory.peek(2), TaggedValue::Field(Fr::from(9u64)));

        let effects = sim.journal.side_effects(ctx.journal_node).unwrap();
        assert_eq!(effects.public_data_writes.len(), 1);
        assert_eq!(effects.public_data_writes[0].contract_address, Address::from_u64(1));
        // committed state is untouched
        assert_eq!(
            world.storage_read(Address::from_u64(1), Fr::from(3u64)).unwrap(),
            Fr::from(0u64)
        );
    }

    #[test]
    fn test_sstore_in_static_call() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let mut sim = AvmSimulator::new(&world, &contracts, AvmConfig::default());

        let mut ctx = create_test_context();
        ctx.env.is_static_call = true;
        assert_eq!(
            sim.sstore(&mut ctx, &store(0, 1), Gas::zero()),
            Err(ExecutionError::Halt(AvmError::StaticCallAlteration))
        );
    }

    #[test]
    fn test_slot_must_be_field() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let mut sim = AvmSimulator::new(&world, &contracts, AvmConfig::default());

        let mut ctx = create_test_context();
        ctx.machine_state.memory.set(0, TaggedValue::u32(5));
        assert!(matches!(
            sim.sload(&mut ctx, &load(0, 1), Gas::zero()),
            Err(ExecutionError::Halt(AvmError::TagMismatch { offset: 0, .. }))
        ));
    }

    #[test]
    fn test_write_limit() {
        let world = InMemoryWorldState::new();
        let contracts = InMemoryContractsDb::new();
        let config = AvmConfig {
            side_effect_limits: SideEffectLimits {
                max_public_data_writes: 1,
                ..SideEffectLimits::default()
            },
            ..AvmConfig::default()
        };
        let mut sim = AvmSimulator::new(&world, &contracts, config);

        let mut ctx = create_test_context();
        sim.sstore(&mut ctx, &store(0, 1), Gas::zero()).unwrap();
        assert_eq!(
            sim.sstore(&mut ctx, &store(0, 1), Gas::zero()),
            Err(ExecutionError::Halt(AvmError::SideEffectLimitReached {
                kind: SideEffectKind::PublicDataWrites,
                limit: 1
            }))
        );
    }
}
