//! # apidb-database
//!
//! Connection pool for the API's MySQL database.
//!
//! The pool is built lazily from environment-driven configuration and checked
//! once at startup. A failed check is logged and reported, never raised, so
//! the process keeps running with a pool whose later queries fail on their
//! own.
//!
//! ```rust,no_run
//! use apidb_database::init_from_env;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let startup = init_from_env();
//! let pool = startup.pool.clone();
//!
//! let rows = pool.query("SELECT 1").await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod dates;
pub mod error;
pub mod init;
pub mod pool;
pub mod probe;

pub use dates::Temporal;
pub use error::{PoolError, ProbeError};
pub use init::{init, init_from_env, Initialized};
pub use pool::{ApiConnection, ApiPool, PoolStats};
pub use probe::{spawn_connectivity_probe, verify_connectivity, ProbeOutcome};

pub use apidb_common_config::{ConnectionConfig, PoolSettings};
