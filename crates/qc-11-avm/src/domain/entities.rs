//! # Core Domain Entities
//!
//! Requests, results, contract metadata, side effects and configuration for
//! public execution.

use crate::avm::revert_reason::RevertReason;
use crate::avm::trace::ExecutionTrace;
use crate::domain::value_objects::{serde_fr, serde_fr_vec, Address, Fr, FunctionSelector, Gas};
use crate::errors::SideEffectKind;
use serde::{Deserialize, Serialize};
use std::env;

// =============================================================================
// GLOBAL VARIABLES
// =============================================================================

/// Block-level data visible to every call of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GlobalVariables {
    /// Chain identifier.
    #[serde(with = "serde_fr")]
    pub chain_id: Fr,
    /// Protocol version.
    #[serde(with = "serde_fr")]
    pub version: Fr,
    /// Block number.
    pub block_number: u32,
    /// Block timestamp (seconds).
    pub timestamp: u64,
    /// Fee per unit of DA gas.
    pub fee_per_da_gas: u128,
    /// Fee per unit of L2 gas.
    pub fee_per_l2_gas: u128,
}

// =============================================================================
// CONTRACTS
// =============================================================================

/// A deployed contract instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInstance {
    /// Instance address.
    pub address: Address,
    /// Class the instance runs.
    #[serde(with = "serde_fr")]
    pub class_id: Fr,
    /// Deployer address.
    pub deployer: Address,
    /// Hash of the initializer call.
    #[serde(with = "serde_fr")]
    pub initialization_hash: Fr,
}

/// Contract class: the bytecode shared by its instances.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractClass {
    /// Class identifier.
    #[serde(with = "serde_fr")]
    pub id: Fr,
    /// Public bytecode.
    #[serde(with = "hex_bytes")]
    pub bytecode: Vec<u8>,
}

mod hex_bytes {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(D::Error::custom)
    }
}

// =============================================================================
// SIDE EFFECTS
// =============================================================================

/// A storage write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicDataWrite {
    /// Contract whose storage is written.
    pub contract_address: Address,
    /// Storage slot.
    #[serde(with = "serde_fr")]
    pub slot: Fr,
    /// New value.
    #[serde(with = "serde_fr")]
    pub value: Fr,
    /// Transaction-wide ordering counter.
    pub counter: u32,
}

/// An emitted note hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteHash {
    /// Emitting contract.
    pub contract_address: Address,
    /// Note hash value.
    #[serde(with = "serde_fr")]
    pub value: Fr,
    /// Transaction-wide ordering counter.
    pub counter: u32,
}

/// An emitted nullifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nullifier {
    /// Emitting contract.
    pub contract_address: Address,
    /// Nullifier value.
    #[serde(with = "serde_fr")]
    pub value: Fr,
    /// Transaction-wide ordering counter.
    pub counter: u32,
}

/// An unencrypted log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnencryptedLog {
    /// Emitting contract.
    pub contract_address: Address,
    /// Log payload.
    #[serde(with = "serde_fr_vec")]
    pub fields: Vec<Fr>,
    /// Transaction-wide ordering counter.
    pub counter: u32,
}

/// A message to an L1 recipient.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2ToL1Message {
    /// Emitting contract.
    pub contract_address: Address,
    /// L1 recipient.
    #[serde(with = "serde_fr")]
    pub recipient: Fr,
    /// Message content.
    #[serde(with = "serde_fr")]
    pub content: Fr,
    /// Transaction-wide ordering counter.
    pub counter: u32,
}

/// Accepted side effects of a transaction, in emission order.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideEffects {
    /// Storage writes (every write, not only the last per slot).
    pub public_data_writes: Vec<PublicDataWrite>,
    /// Note hashes.
    pub note_hashes: Vec<NoteHash>,
    /// Nullifiers.
    pub nullifiers: Vec<Nullifier>,
    /// Unencrypted logs.
    pub unencrypted_logs: Vec<UnencryptedLog>,
    /// L2 to L1 messages.
    pub l2_to_l1_messages: Vec<L2ToL1Message>,
}

impl SideEffects {
    /// True if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.public_data_writes.is_empty()
            && self.note_hashes.is_empty()
            && self.nullifiers.is_empty()
            && self.unencrypted_logs.is_empty()
            && self.l2_to_l1_messages.is_empty()
    }

    /// Number of entries of one kind.
    #[must_use]
    pub fn count(&self, kind: SideEffectKind) -> usize {
        match kind {
            SideEffectKind::PublicDataWrites => self.public_data_writes.len(),
            SideEffectKind::NoteHashes => self.note_hashes.len(),
            SideEffectKind::Nullifiers => self.nullifiers.len(),
            SideEffectKind::UnencryptedLogs => self.unencrypted_logs.len(),
            SideEffectKind::L2ToL1Messages => self.l2_to_l1_messages.len(),
        }
    }
}

// =============================================================================
// REQUEST / RESULT
// =============================================================================

/// A public call enqueued by the private part of a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueuedCall {
    /// Contract to execute.
    pub address: Address,
    /// Caller of the top-level function.
    pub sender: Address,
    /// Function selector, used for diagnostics.
    pub function_selector: FunctionSelector,
    /// Call arguments.
    #[serde(with = "serde_fr_vec")]
    pub calldata: Vec<Fr>,
    /// Whether the whole call is read-only.
    pub is_static_call: bool,
    /// Gas allocated to the top-level call.
    pub gas_limit: Gas,
    /// Fee paid by the transaction.
    #[serde(with = "serde_fr")]
    pub transaction_fee: Fr,
    /// Block data.
    pub globals: GlobalVariables,
}

impl EnqueuedCall {
    /// Creates a non-static call with default globals.
    #[must_use]
    pub fn new(address: Address, sender: Address, calldata: Vec<Fr>, gas_limit: Gas) -> Self {
        Self {
            address,
            sender,
            function_selector: FunctionSelector::default(),
            calldata,
            is_static_call: false,
            gas_limit,
            transaction_fee: Fr::from(0u64),
            globals: GlobalVariables::default(),
        }
    }
}

/// Outcome of a single (possibly nested) contract call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContractCallResult {
    /// Whether the call halted successfully.
    pub success: bool,
    /// RETURN or REVERT payload.
    #[serde(with = "serde_fr_vec")]
    pub output: Vec<Fr>,
    /// Gas left when the call halted.
    pub gas_left: Gas,
    /// Present when the call failed.
    pub revert_reason: Option<RevertReason>,
}

/// Outcome of a whole enqueued call.
///
/// A reverted transaction is still includable: gas is charged and the
/// revert reason recorded, but `side_effects` is empty.
#[derive(Clone, Debug, Serialize)]
pub struct TxExecutionResult {
    /// True if the top-level call failed.
    pub reverted: bool,
    /// Top-level return (or revert) data.
    #[serde(with = "serde_fr_vec")]
    pub return_data: Vec<Fr>,
    /// Why the top-level call failed.
    pub revert_reason: Option<RevertReason>,
    /// Gas allocated to the call.
    pub gas_limit: Gas,
    /// Gas consumed by the call.
    pub gas_used: Gas,
    /// Side effects accepted by the transaction.
    pub side_effects: SideEffects,
    /// Number of instructions executed across all calls.
    pub instructions_executed: u64,
    /// Per-instruction trace when enabled.
    pub trace: Option<ExecutionTrace>,
}

impl TxExecutionResult {
    /// Gas left after execution.
    #[must_use]
    pub fn gas_left(&self) -> Gas {
        self.gas_limit.saturating_sub(&self.gas_used)
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Per-transaction caps on emitted side effects.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideEffectLimits {
    /// Storage writes.
    pub max_public_data_writes: usize,
    /// Note hashes.
    pub max_note_hashes: usize,
    /// Nullifiers.
    pub max_nullifiers: usize,
    /// Unencrypted logs.
    pub max_unencrypted_logs: usize,
    /// L2 to L1 messages.
    pub max_l2_to_l1_messages: usize,
}

impl Default for SideEffectLimits {
    fn default() -> Self {
        Self {
            max_public_data_writes: 64,
            max_note_hashes: 64,
            max_nullifiers: 64,
            max_unencrypted_logs: 8,
            max_l2_to_l1_messages: 8,
        }
    }
}

impl SideEffectLimits {
    /// Limit for one kind.
    #[must_use]
    pub fn limit(&self, kind: SideEffectKind) -> usize {
        match kind {
            SideEffectKind::PublicDataWrites => self.max_public_data_writes,
            SideEffectKind::NoteHashes => self.max_note_hashes,
            SideEffectKind::Nullifiers => self.max_nullifiers,
            SideEffectKind::UnencryptedLogs => self.max_unencrypted_logs,
            SideEffectKind::L2ToL1Messages => self.max_l2_to_l1_messages,
        }
    }
}

/// AVM limits and switches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvmConfig {
    /// Maximum nested call depth (top-level call is depth 0).
    pub max_call_depth: u32,
    /// Maximum distinct contract classes per transaction.
    pub max_unique_contract_classes: usize,
    /// Maximum INTERNALCALL nesting within one call.
    pub max_internal_call_depth: usize,
    /// Side-effect caps.
    pub side_effect_limits: SideEffectLimits,
    /// Record the per-instruction execution trace.
    pub collect_trace: bool,
}

impl Default for AvmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 16,
            max_unique_contract_classes: 21,
            max_internal_call_depth: 1024,
            side_effect_limits: SideEffectLimits::default(),
            collect_trace: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AvmConfig {
    /// Reads overrides from the environment.
    ///
    /// - `QC_AVM_MAX_CALL_DEPTH`
    /// - `QC_AVM_MAX_UNIQUE_CLASSES`
    /// - `QC_AVM_MAX_INTERNAL_CALL_DEPTH`
    /// - `QC_AVM_MAX_PUBLIC_DATA_WRITES`, `QC_AVM_MAX_NOTE_HASHES`,
    ///   `QC_AVM_MAX_NULLIFIERS`, `QC_AVM_MAX_LOGS`, `QC_AVM_MAX_L2_TO_L1_MSGS`
    /// - `QC_AVM_COLLECT_TRACE` (`true`/`1`)
    #[must_use]
    pub fn from_env() -> Self {
        let d = Self::default();
        let limits = d.side_effect_limits;
        Self {
            max_call_depth: env_parse("QC_AVM_MAX_CALL_DEPTH", d.max_call_depth),
            max_unique_contract_classes: env_parse(
                "QC_AVM_MAX_UNIQUE_CLASSES",
                d.max_unique_contract_classes,
            ),
            max_internal_call_depth: env_parse(
                "QC_AVM_MAX_INTERNAL_CALL_DEPTH",
                d.max_internal_call_depth,
            ),
            side_effect_limits: SideEffectLimits {
                max_public_data_writes: env_parse(
                    "QC_AVM_MAX_PUBLIC_DATA_WRITES",
                    limits.max_public_data_writes,
                ),
                max_note_hashes: env_parse("QC_AVM_MAX_NOTE_HASHES", limits.max_note_hashes),
                max_nullifiers: env_parse("QC_AVM_MAX_NULLIFIERS", limits.max_nullifiers),
                max_unencrypted_logs: env_parse("QC_AVM_MAX_LOGS", limits.max_unencrypted_logs),
                max_l2_to_l1_messages: env_parse(
                    "QC_AVM_MAX_L2_TO_L1_MSGS",
                    limits.max_l2_to_l1_messages,
                ),
            },
            collect_trace: env::var("QC_AVM_COLLECT_TRACE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(d.collect_trace),
        }
    }

    /// Enables trace collection.
    #[must_use]
    pub fn with_trace(mut self) -> Self {
        self.collect_trace = true;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effect_limits_lookup() {
        let limits = SideEffectLimits::default();
        assert_eq!(limits.limit(SideEffectKind::NoteHashes), 64);
        assert_eq!(limits.limit(SideEffectKind::UnencryptedLogs), 8);
    }

    #[test]
    fn test_side_effects_count() {
        let mut effects = SideEffects::default();
        assert!(effects.is_empty());
        effects.nullifiers.push(Nullifier {
            contract_address: Address::from_u64(1),
            value: Fr::from(9u64),
            counter: 0,
        });
        assert!(!effects.is_empty());
        assert_eq!(effects.count(SideEffectKind::Nullifiers), 1);
        assert_eq!(effects.count(SideEffectKind::NoteHashes), 0);
    }

    #[test]
    fn test_config_from_env_defaults() {
        // no QC_AVM_* variables are set by the test harness
        let config = AvmConfig::from_env();
        assert_eq!(config.max_unique_contract_classes, 21);
        assert!(AvmConfig::default().with_trace().collect_trace);
    }

    #[test]
    fn test_enqueued_call_serde() {
        let call = EnqueuedCall::new(
            Address::from_u64(5),
            Address::from_u64(6),
            vec![Fr::from(1u64), Fr::from(2u64)],
            Gas::new(1000, 100, 0),
        );
        let json = serde_json::to_string(&call).unwrap();
        let back: EnqueuedCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back, call);
    }

    #[test]
    fn test_contract_class_bytecode_hex() {
        let class = ContractClass {
            id: Fr::from(3u64),
            bytecode: vec![0x23, 0x00],
        };
        let json = serde_json::to_value(&class).unwrap();
        assert_eq!(json["bytecode"], "2300");
    }
}
