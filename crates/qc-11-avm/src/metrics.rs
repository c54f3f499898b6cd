//! # Public Execution Metrics
//!
//! Prometheus metrics for the AVM.
//!
//! ## Usage
//!
//! Enable with the `metrics` feature:
//! ```toml
//! qc-11-avm = { path = "...", features = ["metrics"] }
//! ```
//!
//! ## Metrics Exported
//!
//! - `avm_simulations_total` - Counter of finished simulations (by outcome)
//! - `avm_rejections_total` - Counter of rejected transactions (by reason)
//! - `avm_timeouts_total` - Counter of simulations abandoned after the timeout
//! - `avm_gas_used_total` - Counter of gas consumed (by dimension)
//! - `avm_instructions_executed_total` - Counter of instructions executed

use crate::domain::value_objects::{Gas, GasDimension};
use crate::errors::{FatalError, SimulationError};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Finished simulations, labeled by outcome
    pub static ref SIMULATIONS: IntCounterVec = register_int_counter_vec!(
        "avm_simulations_total",
        "Total number of finished simulations",
        &["outcome"]
    )
    .expect("Failed to create SIMULATIONS metric");

    /// Rejected transactions, labeled by reason
    pub static ref REJECTIONS: IntCounterVec = register_int_counter_vec!(
        "avm_rejections_total",
        "Total number of transactions rejected by public execution",
        &["reason"]
    )
    .expect("Failed to create REJECTIONS metric");

    /// Simulations abandoned after the timeout
    pub static ref TIMEOUTS: IntCounter = register_int_counter!(
        "avm_timeouts_total",
        "Total number of simulations abandoned after the timeout"
    )
    .expect("Failed to create TIMEOUTS metric");

    /// Gas consumed, labeled by dimension
    pub static ref GAS_USED: IntCounterVec = register_int_counter_vec!(
        "avm_gas_used_total",
        "Total gas consumed by finished simulations",
        &["dimension"]
    )
    .expect("Failed to create GAS_USED metric");

    /// Instructions executed
    pub static ref INSTRUCTIONS_EXECUTED: IntCounter = register_int_counter!(
        "avm_instructions_executed_total",
        "Total number of AVM instructions executed"
    )
    .expect("Failed to create INSTRUCTIONS_EXECUTED metric");
}

// =============================================================================
// METRIC RECORDING FUNCTIONS
// =============================================================================

/// Record a finished simulation
pub fn record_simulation(success: bool, gas_used: &Gas, instructions: u64) {
    let outcome = if success { "success" } else { "reverted" };
    SIMULATIONS.with_label_values(&[outcome]).inc();
    for dimension in [GasDimension::L2, GasDimension::Da, GasDimension::L1] {
        GAS_USED
            .with_label_values(&[dimension.label()])
            .inc_by(gas_used.get(dimension));
    }
    INSTRUCTIONS_EXECUTED.inc_by(instructions);
}

/// Record a rejected transaction
pub fn record_rejection(err: &FatalError) {
    let reason = match err {
        FatalError::Decode { .. } => "decode",
        FatalError::ProtocolLimitExceeded { .. } => "class_limit",
        FatalError::State(_) => "state",
        FatalError::ForkTree(_) => "journal",
    };
    REJECTIONS.with_label_values(&[reason]).inc();
}

/// Record a simulation timeout
pub fn record_timeout() {
    TIMEOUTS.inc();
}

/// Record a failed simulation
pub fn record_simulation_error(err: &SimulationError) {
    match err {
        SimulationError::Rejected(fatal) => record_rejection(fatal),
        SimulationError::Timeout { .. } => record_timeout(),
        SimulationError::Worker(_) => REJECTIONS.with_label_values(&["worker"]).inc(),
    }
}

// =============================================================================
// TESTS
// =============================================================================
