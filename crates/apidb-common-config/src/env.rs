//! Environment variable handling.

use std::env;
use thiserror::Error;

/// Environment variable errors.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A required variable is absent.
    #[error("required environment variable not set: {var}")]
    NotSet {
        /// Variable name.
        var: String,
    },

    /// A variable is present but malformed.
    #[error("invalid value for {var}: {message}")]
    InvalidValue {
        /// Variable name.
        var: String,
        /// What was wrong with it.
        message: String,
    },

    /// A `.env` file exists but could not be read or parsed.
    #[error("failed to load .env file: {0}")]
    DotenvError(#[from] dotenvy::Error),
}

/// Environment variable names.
pub mod vars {
    /// Database host.
    pub const API_DB_HOST: &str = "API_DB_HOST";
    /// Database user.
    pub const API_DB_USER: &str = "API_DB_USER";
    /// Database password.
    pub const API_DB_PASSWORD: &str = "API_DB_PASSWORD";
    /// Schema name.
    pub const API_DB_DATABASE: &str = "API_DB_DATABASE";
    /// TCP port.
    pub const API_DB_PORT: &str = "API_DB_PORT";

    /// Connection limit; unset or 0 keeps the driver default.
    pub const DB_POOL_MAX: &str = "DB_POOL_MAX";

    /// Selects the `.env.<NODE_ENV>` overlay.
    pub const NODE_ENV: &str = "NODE_ENV";

    /// Variables the connection cannot be established without.
    pub const REQUIRED: [&str; 5] = [
        API_DB_HOST,
        API_DB_USER,
        API_DB_PASSWORD,
        API_DB_DATABASE,
        API_DB_PORT,
    ];
}

/// Access to the process environment.
#[derive(Debug)]
pub struct Environment {
    _guard: (),
}

impl Environment {
    /// Seed the process environment from `.env` files.
    ///
    /// Precedence, highest first: the process environment, `.env.<NODE_ENV>`,
    /// `.env.local`, `.env`. Missing files are skipped.
    pub fn init() -> Result<Self, EnvError> {
        // dotenvy never overwrites a set variable, so the first file wins
        let mut files = Vec::with_capacity(3);
        if let Ok(mode) = env::var(vars::NODE_ENV) {
            files.push(format!(".env.{}", mode));
        }
        files.push(".env.local".to_string());
        files.push(".env".to_string());

        for file in &files {
            match dotenvy::from_filename(file) {
                Ok(path) => tracing::debug!(path = %path.display(), "loaded env file"),
                Err(e) if e.not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Self { _guard: () })
    }

    /// Get an optional string variable.
    pub fn get(var: &str) -> Option<String> {
        env::var(var).ok()
    }

    /// Get an integer variable.
    pub fn get_int<T: std::str::FromStr>(var: &str) -> Result<Option<T>, EnvError> {
        match env::var(var) {
            Ok(v) => v.trim().parse().map(Some).map_err(|_| EnvError::InvalidValue {
                var: var.to_string(),
                message: format!("expected integer, got {:?}", v),
            }),
            Err(_) => Ok(None),
        }
    }
}
