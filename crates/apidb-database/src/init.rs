//! Application startup entry points.

use crate::error::ProbeError;
use crate::pool::ApiPool;
use crate::probe::{spawn_connectivity_probe, ProbeOutcome};
use apidb_common_config::{ConnectionConfig, Environment};
use tokio::task::JoinHandle;
use tracing::warn;

/// A freshly built pool and its in-flight liveness probe.
#[derive(Debug)]
pub struct Initialized {
    /// Usable at once, even before the probe finishes.
    pub pool: ApiPool,
    /// The running liveness probe.
    pub probe: JoinHandle<ProbeOutcome>,
}

impl Initialized {
    /// Wait for the probe and report its outcome alongside the pool.
    pub async fn wait(self) -> (ApiPool, ProbeOutcome) {
        let outcome = match self.probe.await {
            Ok(outcome) => outcome,
            Err(e) => ProbeOutcome::Failed(ProbeError::Aborted(e.to_string())),
        };
        (self.pool, outcome)
    }

    /// Wait for the probe and fail if the database was unreachable.
    pub async fn strict(self) -> Result<ApiPool, ProbeError> {
        let (pool, outcome) = self.wait().await;
        outcome.into_result()?;
        Ok(pool)
    }
}

/// Build the pool from `config` and start the liveness probe.
///
/// Returns immediately; the probe logs its result when it finishes.
pub fn init(config: &ConnectionConfig) -> Initialized {
    let pool = ApiPool::initialize(config);
    let probe = spawn_connectivity_probe(&pool);
    Initialized { pool, probe }
}

/// Load `.env` files, read the connection config and call [`init`].
pub fn init_from_env() -> Initialized {
    if let Err(e) = Environment::init() {
        warn!(error = %e, "continuing without .env files");
    }
    init(&ConnectionConfig::from_env())
}
