//! Connection acquisition with bounded, fixed-delay retry.
//!
//! # Responsibilities
//! - Refuse immediately when required connection parameters are missing
//! - Open a fresh transport per call, bounding each attempt by the connect timeout
//! - Retry failed attempts after a fixed delay until the budget is spent
//! - Log and count every attempt
//!
//! # State Transitions
//! ```text
//! NotAcquired → attempt 1..=max_attempts → Open | Exhausted
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;

use crate::config::{AppConfig, ConnectionConfig};
use crate::observability::metrics;
use crate::resilience::{within, NextStep, RetryPolicy};
use crate::store::connector::{ConnectParams, Connector, PgConnector, Row};
use crate::store::error::{AcquireError, ConnectError, StoreError};
use crate::store::handle::ConnectionHandle;

/// Produces connection handles on demand.
///
/// Holds no connections itself; concurrent `acquire()` calls are independent.
#[derive(Clone)]
pub struct ConnectionAcquirer {
    config: Arc<ConnectionConfig>,
    policy: RetryPolicy,
    connector: Arc<dyn Connector>,
}

impl ConnectionAcquirer {
    /// Acquirer backed by PostgreSQL.
    pub fn new(config: ConnectionConfig, policy: RetryPolicy) -> Self {
        Self::with_connector(config, policy, Arc::new(PgConnector))
    }

    pub fn with_connector(config: ConnectionConfig, policy: RetryPolicy, connector: Arc<dyn Connector>) -> Self {
        Self {
            config: Arc::new(config),
            policy,
            connector,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.database.clone(), RetryPolicy::from(&config.retries))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Obtain an open handle, retrying transient connect failures.
    pub async fn acquire(&self) -> Result<ConnectionHandle, AcquireError> {
        let params = ConnectParams::resolve(&self.config).map_err(|e| {
            tracing::error!(error = %e, "Refusing to connect with incomplete configuration");
            metrics::record_configuration_error();
            e
        })?;

        let started = Instant::now();
        let mut retry = self.policy.start();

        loop {
            let attempt = retry.attempt();
            let result = match within(params.connect_timeout, self.connector.connect(&params)).await {
                Ok(result) => result,
                Err(timed_out) => Err(ConnectError::from(timed_out)),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(transport) => {
                    metrics::record_connect_attempt("success");
                    metrics::record_acquire("success", started.elapsed());
                    let handle = ConnectionHandle::open(transport, attempt, params.connect_timeout);
                    tracing::debug!(
                        connection_id = %handle.id(),
                        attempt,
                        max_attempts = retry.max_attempts(),
                        elapsed_ms,
                        host = %params.host,
                        database = %params.database,
                        "Connection acquired"
                    );
                    return Ok(handle);
                }
                Err(error) => {
                    metrics::record_connect_attempt("failure");
                    tracing::warn!(
                        attempt,
                        max_attempts = retry.max_attempts(),
                        elapsed_ms,
                        host = %params.host,
                        error = %error,
                        "Connect attempt failed"
                    );

                    match retry.on_failure() {
                        NextStep::RetryAfter(delay) => tokio::time::sleep(delay).await,
                        NextStep::Exhausted => {
                            metrics::record_acquire_exhausted();
                            metrics::record_acquire("exhausted", started.elapsed());
                            tracing::error!(
                                attempts = attempt,
                                elapsed_ms,
                                host = %params.host,
                                error = %error,
                                "Maximum retry attempts reached"
                            );
                            return Err(AcquireError::Exhausted {
                                attempts: attempt,
                                last_error: error,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Acquire, run exactly one statement, and release on every exit path.
    pub async fn run_once(&self, statement: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        let mut handle = self.acquire().await?;
        let result = handle.run_query(statement, params).await;
        handle.release().await;
        Ok(result?)
    }
}

impl std::fmt::Debug for ConnectionAcquirer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAcquirer")
            .field("config", &self.config)
            .field("policy", &self.policy)
            .finish()
    }
}
