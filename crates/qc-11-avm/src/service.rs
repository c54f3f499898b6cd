//! # Public Execution Service
//!
//! Async front of the AVM. The interpreter itself is synchronous and
//! deterministic; the service moves each simulation onto a blocking worker,
//! bounds it with a timeout and keeps statistics.
//!
//! ## Cancellation
//!
//! The timeout is the only cancellation point. A timed-out simulation is
//! abandoned, not interrupted: its worker runs to completion (it is bounded
//! by gas) and the result is dropped.

use crate::adapters::{InMemoryContractsDb, InMemoryWorldState};
use crate::avm::AvmSimulator;
use crate::domain::entities::{AvmConfig, EnqueuedCall, TxExecutionResult};
use crate::domain::invariants::{check_all_invariants, InvariantCheckResult};
use crate::errors::SimulationError;
use crate::ports::inbound::{PublicExecutionApi, ServiceStats};
use crate::ports::outbound::{ContractsDb, WorldStateReader};

use async_trait::async_trait;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Public execution service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// AVM configuration.
    pub avm: AvmConfig,
    /// Simulation timeout in milliseconds.
    pub simulation_timeout_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            avm: AvmConfig::default(),
            simulation_timeout_ms: 5000,
        }
    }
}

impl ServiceConfig {
    /// Reads `QC_AVM_*` variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            avm: AvmConfig::from_env(),
            simulation_timeout_ms: env::var("QC_AVM_SIMULATION_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.simulation_timeout_ms),
        }
    }
}

/// The public execution service.
///
/// This service:
/// 1. Receives enqueued calls from the transaction orchestrator
/// 2. Simulates them against committed state on a blocking worker
/// 3. Checks the domain invariants on every result
/// 4. Maintains simulation statistics
pub struct PublicExecutionService<W, C> {
    /// Service configuration.
    config: ServiceConfig,
    /// Committed world state.
    world_state: Arc<W>,
    /// Contract instances and classes.
    contracts: Arc<C>,
    /// Service statistics.
    stats: Arc<RwLock<ServiceStats>>,
}

impl<W, C> PublicExecutionService<W, C>
where
    W: WorldStateReader + 'static,
    C: ContractsDb + 'static,
{
    /// Create a new service.
    pub fn new(world_state: W, contracts: C, config: ServiceConfig) -> Self {
        Self {
            config,
            world_state: Arc::new(world_state),
            contracts: Arc::new(contracts),
            stats: Arc::new(RwLock::new(ServiceStats::default())),
        }
    }

    /// Service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Committed world state the service reads from.
    #[must_use]
    pub fn world_state(&self) -> &W {
        &self.world_state
    }

    /// Contracts database the service reads from.
    #[must_use]
    pub fn contracts(&self) -> &C {
        &self.contracts
    }

    /// Simulates `call` under an explicit request id.
    ///
    /// # Errors
    ///
    /// * `SimulationError::Rejected` - the transaction must be excluded
    /// * `SimulationError::Timeout` - the simulation was abandoned
    /// * `SimulationError::Worker` - the blocking worker panicked
    #[instrument(skip(self, call), fields(request_id = %request_id, address = %call.address))]
    pub async fn simulate_with_id(
        &self,
        request_id: Uuid,
        call: EnqueuedCall,
    ) -> Result<TxExecutionResult, SimulationError> {
        self.stats.write().await.simulations += 1;

        let result = self.run_blocking(call.clone()).await;

        {
            let mut stats = self.stats.write().await;
            match &result {
                Ok(res) => {
                    if res.reverted {
                        stats.reverted += 1;
                    } else {
                        stats.succeeded += 1;
                    }
                    stats.total_l2_gas_used = stats.total_l2_gas_used.saturating_add(res.gas_used.l2);
                    stats.total_da_gas_used = stats.total_da_gas_used.saturating_add(res.gas_used.da);
                }
                Err(SimulationError::Rejected(_)) => stats.rejected += 1,
                Err(SimulationError::Timeout { .. }) => stats.timed_out += 1,
                Err(SimulationError::Worker(_)) => {}
            }
        }

        match &result {
            Ok(res) => {
                if let InvariantCheckResult::Invalid(violations) =
                    check_all_invariants(&call, res, &self.config.avm)
                {
                    for violation in &violations {
                        warn!(%violation, "invariant violated by simulation result");
                    }
                }
                info!(
                    reverted = res.reverted,
                    l2_gas_used = res.gas_used.l2,
                    da_gas_used = res.gas_used.da,
                    "simulation completed"
                );
            }
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "simulation failed");
                #[cfg(feature = "metrics")]
                crate::metrics::record_simulation_error(e);
            }
        }

        result
    }

    /// Runs the synchronous simulator on a blocking worker, with timeout.
    async fn run_blocking(&self, call: EnqueuedCall) -> Result<TxExecutionResult, SimulationError> {
        let world_state = Arc::clone(&self.world_state);
        let contracts = Arc::clone(&self.contracts);
        let avm_config = self.config.avm.clone();

        let worker = tokio::task::spawn_blocking(move || {
            AvmSimulator::new(&*world_state, &*contracts, avm_config).simulate(call)
        });

        let timeout = Duration::from_millis(self.config.simulation_timeout_ms);
        let joined = tokio::time::timeout(timeout, worker)
            .await
            .map_err(|_| SimulationError::Timeout {
                timeout_ms: self.config.simulation_timeout_ms,
            })?;

        let outcome = joined.map_err(|e| SimulationError::Worker(e.to_string()))?;
        debug!(rejected = outcome.is_err(), "simulation worker finished");
        Ok(outcome?)
    }
}

/// Create a default service with in-memory adapters (for testing).
#[must_use]
pub fn create_test_service() -> PublicExecutionService<InMemoryWorldState, InMemoryContractsDb> {
    PublicExecutionService::new(
        InMemoryWorldState::new(),
        InMemoryContractsDb::new(),
        ServiceConfig::default(),
    )
}

// =============================================================================
// PublicExecutionApi Implementation
// =============================================================================

#[async_trait]
impl<W, C> PublicExecutionApi for PublicExecutionService<W, C>
where
    W: WorldStateReader + 'static,
    C: ContractsDb + 'static,
{
    async fn simulate(&self, call: EnqueuedCall) -> Result<TxExecutionResult, SimulationError> {
        self.simulate_with_id(Uuid::new_v4(), call).await
    }

    async fn stats(&self) -> ServiceStats {
        self.stats.read().await.clone()
    }
}

// =============================================================================
// TESTS
// =============================================================================
