//! # Domain Invariants
//!
//! Properties every [`TxExecutionResult`] must satisfy. The service checks
//! them after each simulation and logs violations; tests assert them.
//!
//! - Gas limit: consumption never exceeds the allocation in any budget
//! - Outcome consistency: a reason is present exactly when the call reverted
//! - Revert isolation: a reverted transaction carries no side effects
//! - Static purity: a static enqueued call emits nothing
//! - Side-effect limits: per-kind counts stay within the configured caps
//! - Emission order: counters are unique and increase within each kind
//! - Call depth: no traced instruction ran deeper than the configured maximum

use crate::domain::entities::{AvmConfig, EnqueuedCall, SideEffects, TxExecutionResult};
use crate::domain::value_objects::Gas;
use crate::errors::SideEffectKind;
use std::collections::HashSet;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas used fits within the gas limit in every budget.
#[must_use]
pub fn check_gas_limit_invariant(result: &TxExecutionResult) -> bool {
    result.gas_limit.covers(&result.gas_used)
}

/// Success has no revert reason; a revert always has one.
#[must_use]
pub fn check_outcome_consistency_invariant(result: &TxExecutionResult) -> bool {
    result.reverted == result.revert_reason.is_some()
}

/// A reverted transaction exposes no side effects.
#[must_use]
pub fn check_revert_isolation_invariant(result: &TxExecutionResult) -> bool {
    !result.reverted || result.side_effects.is_empty()
}

/// A static enqueued call emits nothing.
#[must_use]
pub fn check_static_purity_invariant(call: &EnqueuedCall, result: &TxExecutionResult) -> bool {
    !call.is_static_call || result.side_effects.is_empty()
}

/// Every kind of side effect stays within its cap.
#[must_use]
pub fn check_side_effect_limits_invariant(result: &TxExecutionResult, config: &AvmConfig) -> bool {
    SideEffectKind::ALL
        .iter()
        .all(|kind| result.side_effects.count(*kind) <= config.side_effect_limits.limit(*kind))
}

/// Counters are unique across kinds and strictly increasing within each.
#[must_use]
pub fn check_emission_order_invariant(effects: &SideEffects) -> bool {
    let per_kind: [Vec<u32>; 5] = [
        effects.public_data_writes.iter().map(|e| e.counter).collect(),
        effects.note_hashes.iter().map(|e| e.counter).collect(),
        effects.nullifiers.iter().map(|e| e.counter).collect(),
        effects.unencrypted_logs.iter().map(|e| e.counter).collect(),
        effects.l2_to_l1_messages.iter().map(|e| e.counter).collect(),
    ];
    let increasing = per_kind
        .iter()
        .all(|counters| counters.windows(2).all(|w| w[0] < w[1]));

    let total: usize = per_kind.iter().map(Vec::len).sum();
    let unique: HashSet<u32> = per_kind.iter().flatten().copied().collect();
    increasing && unique.len() == total
}

/// No traced instruction ran deeper than `max_call_depth`.
///
/// Results without a trace pass trivially.
#[must_use]
pub fn check_call_depth_invariant(result: &TxExecutionResult, config: &AvmConfig) -> bool {
    result.trace.as_ref().map_or(true, |trace| {
        trace
            .rows
            .iter()
            .all(|row| row.call_depth <= config.max_call_depth)
    })
}

/// Checks all invariants at once.
#[must_use]
pub fn check_all_invariants(
    call: &EnqueuedCall,
    result: &TxExecutionResult,
    config: &AvmConfig,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_limit_invariant(result) {
        violations.push(InvariantViolation::GasLimitExceeded {
            used: result.gas_used,
            limit: result.gas_limit,
        });
    }

    if !check_outcome_consistency_invariant(result) {
        violations.push(InvariantViolation::InconsistentOutcome {
            reverted: result.reverted,
        });
    }

    if !check_revert_isolation_invariant(result) {
        violations.push(InvariantViolation::SideEffectsAfterRevert);
    }

    if !check_static_purity_invariant(call, result) {
        violations.push(InvariantViolation::StaticCallViolation);
    }

    for kind in SideEffectKind::ALL {
        let count = result.side_effects.count(kind);
        let limit = config.side_effect_limits.limit(kind);
        if count > limit {
            violations.push(InvariantViolation::SideEffectLimitExceeded { kind, count, limit });
        }
    }

    if !check_emission_order_invariant(&result.side_effects) {
        violations.push(InvariantViolation::EmissionOrderBroken);
    }

    if !check_call_depth_invariant(result, config) {
        violations.push(InvariantViolation::CallDepthExceeded {
            max: config.max_call_depth,
        });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// More gas used than allocated.
    GasLimitExceeded { used: Gas, limit: Gas },
    /// Revert flag and revert reason disagree.
    InconsistentOutcome { reverted: bool },
    /// Reverted transaction still carries side effects.
    SideEffectsAfterRevert,
    /// Static call emitted side effects.
    StaticCallViolation,
    /// A per-kind cap was exceeded.
    SideEffectLimitExceeded {
        kind: SideEffectKind,
        count: usize,
        limit: usize,
    },
    /// Side-effect counters are duplicated or out of order.
    EmissionOrderBroken,
    /// An instruction ran past the maximum call depth.
    CallDepthExceeded { max: u32 },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GasLimitExceeded { used, limit } => {
                write!(f, "gas limit exceeded: used {used} > limit {limit}")
            }
            Self::InconsistentOutcome { reverted } => {
                write!(f, "revert reason does not match outcome (reverted: {reverted})")
            }
            Self::SideEffectsAfterRevert => write!(f, "side effects kept after revert"),
            Self::StaticCallViolation => write!(f, "static call emitted side effects"),
            Self::SideEffectLimitExceeded { kind, count, limit } => {
                write!(f, "{count} {kind} exceeds limit {limit}")
            }
            Self::EmissionOrderBroken => write!(f, "side-effect counters out of order"),
            Self::CallDepthExceeded { max } => write!(f, "call depth exceeded max {max}"),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avm::revert_reason::{FailingFunction, RevertReason};
    use crate::domain::entities::{NoteHash, PublicDataWrite};
    use crate::domain::value_objects::{Address, Fr, FunctionSelector};

    fn create_test_result() -> TxExecutionResult {
        TxExecutionResult {
            reverted: false,
            return_data: vec![],
            revert_reason: None,
            gas_limit: Gas::new(1000, 1000, 0),
            gas_used: Gas::new(500, 0, 0),
            side_effects: SideEffects::default(),
            instructions_executed: 3,
            trace: None,
        }
    }

    fn create_test_call() -> EnqueuedCall {
        EnqueuedCall::new(Address::from_u64(1), Address::zero(), vec![], Gas::new(1000, 1000, 0))
    }

    fn write(counter: u32) -> PublicDataWrite {
        PublicDataWrite {
            contract_address: Address::from_u64(1),
            slot: Fr::from(1u64),
            value: Fr::from(2u64),
            counter,
        }
    }

    fn reason() -> RevertReason {
        RevertReason::plain(
            "boom".to_string(),
            FailingFunction {
                address: Address::from_u64(1),
                selector: FunctionSelector(0),
                debug_name: None,
            },
            vec![0],
        )
    }

    #[test]
    fn test_gas_limit_invariant() {
        let mut result = create_test_result();
        assert!(check_gas_limit_invariant(&result));
        result.gas_used = Gas::new(500, 1001, 0);
        assert!(!check_gas_limit_invariant(&result));
    }

    #[test]
    fn test_revert_isolation_invariant() {
        let mut result = create_test_result();
        result.side_effects.public_data_writes.push(write(0));
        assert!(check_revert_isolation_invariant(&result));

        result.reverted = true;
        result.revert_reason = Some(reason());
        assert!(!check_revert_isolation_invariant(&result));
    }

    #[test]
    fn test_outcome_consistency_invariant() {
        let mut result = create_test_result();
        result.reverted = true;
        assert!(!check_outcome_consistency_invariant(&result));
        result.revert_reason = Some(reason());
        assert!(check_outcome_consistency_invariant(&result));
    }

    #[test]
    fn test_static_purity_invariant() {
        let mut call = create_test_call();
        call.is_static_call = true;
        let mut result = create_test_result();
        assert!(check_static_purity_invariant(&call, &result));
        result.side_effects.public_data_writes.push(write(0));
        assert!(!check_static_purity_invariant(&call, &result));
    }

    #[test]
    fn test_emission_order_invariant() {
        let mut effects = SideEffects::default();
        effects.public_data_writes = vec![write(0), write(2)];
        effects.note_hashes.push(NoteHash {
            contract_address: Address::from_u64(1),
            value: Fr::from(9u64),
            counter: 1,
        });
        assert!(check_emission_order_invariant(&effects));

        effects.note_hashes[0].counter = 2;
        assert!(!check_emission_order_invariant(&effects));

        effects.note_hashes.clear();
        effects.public_data_writes = vec![write(3), write(1)];
        assert!(!check_emission_order_invariant(&effects));
    }

    #[test]
    fn test_side_effect_limits_invariant() {
        let config = AvmConfig::default();
        let mut result = create_test_result();
        let limit = config.side_effect_limits.max_public_data_writes;
        result.side_effects.public_data_writes = (0..).take(limit).map(write).collect();
        assert!(check_side_effect_limits_invariant(&result, &config));
        result.side_effects.public_data_writes.push(write(10_000));
        assert!(!check_side_effect_limits_invariant(&result, &config));
    }

    #[test]
    fn test_check_all_invariants_multiple_violations() {
        let mut call = create_test_call();
        call.is_static_call = true;
        let mut result = create_test_result();
        result.reverted = true;
        result.gas_used = Gas::new(2000, 0, 0);
        result.side_effects.public_data_writes.push(write(0));

        match check_all_invariants(&call, &result, &AvmConfig::default()) {
            InvariantCheckResult::Invalid(violations) => {
                assert!(violations.contains(&InvariantViolation::SideEffectsAfterRevert));
                assert!(violations.contains(&InvariantViolation::StaticCallViolation));
                assert!(violations.len() >= 4);
            }
            InvariantCheckResult::Valid => panic!("Expected violations"),
        }
        assert!(check_all_invariants(&create_test_call(), &create_test_result(), &AvmConfig::default()).is_valid());
    }
}
