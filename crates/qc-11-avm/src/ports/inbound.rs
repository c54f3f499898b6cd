//! # Driving Ports (API - Inbound)
//!
//! The public API of the public execution subsystem. The transaction
//! orchestrator submits enqueued calls through it.

use crate::domain::entities::{EnqueuedCall, TxExecutionResult};
use crate::errors::SimulationError;
use async_trait::async_trait;
use serde::Serialize;

/// Counters kept by the service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ServiceStats {
    /// Simulations started.
    pub simulations: u64,
    /// Top-level call returned successfully.
    pub succeeded: u64,
    /// Top-level call reverted (still includable).
    pub reverted: u64,
    /// Transaction rejected outright.
    pub rejected: u64,
    /// Simulation abandoned after the timeout.
    pub timed_out: u64,
    /// Total L2 gas consumed by completed simulations.
    pub total_l2_gas_used: u64,
    /// Total DA gas consumed by completed simulations.
    pub total_da_gas_used: u64,
}

/// Public execution API.
#[async_trait]
pub trait PublicExecutionApi: Send + Sync {
    /// Simulates one enqueued call against committed state.
    ///
    /// # Returns
    ///
    /// * `Ok(result)` - The transaction is includable (`result.reverted` may be true)
    /// * `Err(SimulationError::Rejected)` - The transaction must be excluded
    async fn simulate(&self, call: EnqueuedCall) -> Result<TxExecutionResult, SimulationError>;

    /// Current service statistics.
    async fn stats(&self) -> ServiceStats;
}
