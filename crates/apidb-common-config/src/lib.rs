//! Configuration types for apidb.
//!
//! This crate reads the MySQL connection parameters from the process
//! environment (seeded from `.env` files) into an immutable
//! [`ConnectionConfig`].

pub mod connection;
pub mod env;

pub use connection::*;
pub use env::*;

/// Serializes tests that mutate process-wide environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
