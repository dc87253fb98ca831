//! MySQL connection parameters.

use crate::env::{vars, EnvError, Environment};
use apidb_common_secret::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pool behavior passed through to the pooling layer.
///
/// None of these come from the environment except the connection limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    /// Queue acquire requests when no connection is available instead of
    /// failing immediately.
    pub wait_for_connections: bool,
    /// Maximum number of pending acquire requests. `0` means unbounded.
    pub queue_limit: usize,
    /// Maximum number of open connections. `None` (or `Some(0)`) keeps the
    /// driver default.
    pub connection_limit: Option<u32>,
    /// Hand temporal columns to callers as raw strings.
    pub date_strings: bool,
    /// How long an acquire may wait. `None` keeps the driver default.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            wait_for_connections: true,
            queue_limit: 0,
            connection_limit: None,
            date_strings: true,
            acquire_timeout: None,
        }
    }
}

/// Connection parameters for the API database.
///
/// Built once at startup and read-only afterward. Every field sourced from
/// the environment is optional so that an incomplete environment still
/// yields a config; see [`ConnectionConfig::missing_vars`].
///
/// The password is never serialized, so a serialized config deserializes
/// without one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    host: Option<String>,
    user: Option<String>,
    #[serde(skip_serializing)]
    password: Option<SecretString>,
    database: Option<String>,
    port: Option<u16>,
    pool: PoolSettings,
}

impl ConnectionConfig {
    /// Start building a config by hand.
    pub fn builder() -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::default()
    }

    /// Read the config from the process environment.
    ///
    /// Never fails: absent variables are left unset and unparseable integers
    /// are logged and treated as absent.
    pub fn from_env() -> Self {
        let port = Self::int_var(vars::API_DB_PORT);
        let connection_limit = Self::int_var(vars::DB_POOL_MAX).filter(|&n: &u32| {
            if n == 0 {
                tracing::info!("DB_POOL_MAX=0, using the driver's default connection limit");
            }
            n > 0
        });

        Self {
            host: Environment::get(vars::API_DB_HOST),
            user: Environment::get(vars::API_DB_USER),
            password: Environment::get(vars::API_DB_PASSWORD).map(SecretString::from),
            database: Environment::get(vars::API_DB_DATABASE),
            port,
            pool: PoolSettings {
                connection_limit,
                ..PoolSettings::default()
            },
        }
    }

    fn int_var<T: std::str::FromStr>(var: &str) -> Option<T> {
        match Environment::get_int(var) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring environment variable");
                None
            }
        }
    }

    /// Required variables that were not provided, in declaration order.
    pub fn missing_vars(&self) -> Vec<&'static str> {
        let present = [
            self.host.is_some(),
            self.user.is_some(),
            self.password.is_some(),
            self.database.is_some(),
            self.port.is_some(),
        ];

        vars::REQUIRED
            .iter()
            .zip(present)
            .filter(|(_, set)| !set)
            .map(|(var, _)| *var)
            .collect()
    }

    /// Fail with the first missing required variable.
    pub fn require_complete(&self) -> Result<(), EnvError> {
        match self.missing_vars().first() {
            Some(var) => Err(EnvError::NotSet { var: var.to_string() }),
            None => Ok(()),
        }
    }

    /// `API_DB_HOST`.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// `API_DB_USER`.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// `API_DB_PASSWORD`.
    pub fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// `API_DB_DATABASE`.
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// `API_DB_PORT`.
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Pool behavior settings.
    pub fn pool(&self) -> &PoolSettings {
        &self.pool
    }
}

/// Builder for [`ConnectionConfig`], used by tests and callers that do not
/// read the environment.
#[derive(Default)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Database host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    /// Database user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = Some(user.into());
        self
    }

    /// Database password.
    pub fn password(mut self, password: impl Into<SecretString>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    /// Schema name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    /// TCP port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    /// See [`PoolSettings::wait_for_connections`].
    pub fn wait_for_connections(mut self, wait: bool) -> Self {
        self.config.pool.wait_for_connections = wait;
        self
    }

    /// See [`PoolSettings::queue_limit`].
    pub fn queue_limit(mut self, limit: usize) -> Self {
        self.config.pool.queue_limit = limit;
        self
    }

    /// See [`PoolSettings::connection_limit`]. `0` keeps the driver default.
    pub fn connection_limit(mut self, limit: u32) -> Self {
        self.config.pool.connection_limit = Some(limit);
        self
    }

    /// See [`PoolSettings::date_strings`].
    pub fn date_strings(mut self, enabled: bool) -> Self {
        self.config.pool.date_strings = enabled;
        self
    }

    /// See [`PoolSettings::acquire_timeout`].
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool.acquire_timeout = Some(timeout);
        self
    }

    /// Finish building. No validation; see [`ConnectionConfig::missing_vars`].
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}
