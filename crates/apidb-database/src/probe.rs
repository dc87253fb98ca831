//! Startup liveness probe.

use crate::error::ProbeError;
use crate::pool::ApiPool;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// Result of the one-shot connectivity check.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// A connection was acquired and released.
    Connected,
    /// The check failed; already logged.
    Failed(ProbeError),
}

impl ProbeOutcome {
    /// Whether the database answered.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Turn a failed probe into an error, for callers that refuse to start
    /// without a database.
    pub fn into_result(self) -> Result<(), ProbeError> {
        match self {
            Self::Connected => Ok(()),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Check out one connection and hand it straight back.
///
/// Failures are logged and returned, never raised.
#[instrument(skip(pool))]
pub async fn verify_connectivity(pool: &ApiPool) -> ProbeOutcome {
    if !pool.missing_vars().is_empty() {
        let e = ProbeError::MissingVariables(pool.missing_vars().to_vec());
        error!(error = %e, "Error connecting to MySQL");
        return ProbeOutcome::Failed(e);
    }

    match pool.acquire().await {
        Ok(conn) => {
            info!("API MySQL connected successfully!");
            pool.release(conn).await;
            ProbeOutcome::Connected
        }
        Err(e) => {
            error!(error = %e, "Error connecting to MySQL");
            ProbeOutcome::Failed(ProbeError::Connect(e))
        }
    }
}

/// Run [`verify_connectivity`] in the background.
pub fn spawn_connectivity_probe(pool: &ApiPool) -> JoinHandle<ProbeOutcome> {
    let pool = pool.clone();
    tokio::spawn(async move { verify_connectivity(&pool).await })
}
