//! # Execution Environment
//!
//! Immutable per-call data read by GETENVVAR and CALLDATACOPY.

use super::instruction::EnvironmentVariable;
use super::memory_types::{TaggedValue, TypeTag};
use crate::domain::entities::{EnqueuedCall, GlobalVariables};
use crate::domain::value_objects::{Address, Fr, FunctionSelector, Gas};

/// How a nested call was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// CALL: may modify state unless the caller is static.
    Call,
    /// STATICCALL: read-only.
    StaticCall,
}

/// Call environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionEnvironment {
    /// Contract whose code runs.
    pub address: Address,
    /// Contract whose storage is accessed.
    pub storage_address: Address,
    /// Immediate caller.
    pub sender: Address,
    /// Selector of the called function.
    pub function_selector: FunctionSelector,
    /// Call arguments.
    pub calldata: Vec<Fr>,
    /// Read-only flag, inherited by nested calls.
    pub is_static_call: bool,
    /// Nesting depth; the enqueued call is depth 0.
    pub call_depth: u32,
    /// Fee paid by the transaction.
    pub transaction_fee: Fr,
    /// Block data.
    pub globals: GlobalVariables,
}

impl ExecutionEnvironment {
    /// Environment of the enqueued (top-level) call.
    #[must_use]
    pub fn from_enqueued(call: &EnqueuedCall) -> Self {
        Self {
            address: call.address,
            storage_address: call.address,
            sender: call.sender,
            function_selector: call.function_selector,
            calldata: call.calldata.clone(),
            is_static_call: call.is_static_call,
            call_depth: 0,
            transaction_fee: call.transaction_fee,
            globals: call.globals.clone(),
        }
    }

    /// Environment of a call made from this one.
    #[must_use]
    pub fn derive_nested(
        &self,
        target: Address,
        calldata: Vec<Fr>,
        function_selector: FunctionSelector,
        kind: CallKind,
    ) -> Self {
        Self {
            address: target,
            storage_address: target,
            sender: self.address,
            function_selector,
            calldata,
            is_static_call: self.is_static_call || kind == CallKind::StaticCall,
            call_depth: self.call_depth.saturating_add(1),
            transaction_fee: self.transaction_fee,
            globals: self.globals.clone(),
        }
    }

    /// Value of an environment variable, tagged as GETENVVAR writes it.
    #[must_use]
    pub fn variable(&self, variable: EnvironmentVariable, gas_left: Gas) -> TaggedValue {
        let tag = variable.tag();
        match variable {
            EnvironmentVariable::Address => TaggedValue::Field(self.address.to_field()),
            EnvironmentVariable::StorageAddress => {
                TaggedValue::Field(self.storage_address.to_field())
            }
            EnvironmentVariable::Sender => TaggedValue::Field(self.sender.to_field()),
            EnvironmentVariable::FunctionSelector => {
                TaggedValue::from_u128(tag, u128::from(self.function_selector.0))
            }
            EnvironmentVariable::TransactionFee => TaggedValue::Field(self.transaction_fee),
            EnvironmentVariable::ChainId => TaggedValue::Field(self.globals.chain_id),
            EnvironmentVariable::Version => TaggedValue::Field(self.globals.version),
            EnvironmentVariable::BlockNumber => {
                TaggedValue::from_u128(tag, u128::from(self.globals.block_number))
            }
            EnvironmentVariable::Timestamp => {
                TaggedValue::from_u128(tag, u128::from(self.globals.timestamp))
            }
            EnvironmentVariable::FeePerL2Gas => {
                TaggedValue::from_u128(tag, self.globals.fee_per_l2_gas)
            }
            EnvironmentVariable::FeePerDaGas => {
                TaggedValue::from_u128(tag, self.globals.fee_per_da_gas)
            }
            EnvironmentVariable::IsStaticCall => TaggedValue::from_bool(self.is_static_call),
            EnvironmentVariable::L2GasLeft => TaggedValue::from_u128(tag, u128::from(gas_left.l2)),
            EnvironmentVariable::DaGasLeft => TaggedValue::from_u128(tag, u128::from(gas_left.da)),
            EnvironmentVariable::CallDepth => {
                TaggedValue::from_u128(TypeTag::U32, u128::from(self.call_depth))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
