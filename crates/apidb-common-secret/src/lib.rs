//! Redacted credential handling.
//!
//! Database passwords travel through configuration structs that get logged
//! with `?config`. Wrapping them in [`Secret`] keeps the value out of
//! `Debug`, `Display` and serialized output, and wipes it from memory once
//! the owning config is dropped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "[REDACTED]";

/// A credential that is redacted in logs and serialized output.
///
/// # Example
///
/// ```rust
/// use apidb_common_secret::SecretString;
///
/// let password = SecretString::from("hunter2");
/// assert_eq!(format!("{}", password), "[REDACTED]");
/// assert_eq!(format!("{:?}", password), "Secret([REDACTED])");
///
/// // Explicit access required
/// assert_eq!(password.expose(), "hunter2");
/// ```
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the wrapped value.
    ///
    /// Only call this at the point the credential is handed to the driver.
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", REDACTED)
    }
}

// Deserialize the real value, always serialize the placeholder.
// Serialization is therefore lossy: a serialized secret reads back as
// "[REDACTED]". Containers that round-trip should skip the field instead.
impl<'de, T: Zeroize + Deserialize<'de>> Deserialize<'de> for Secret<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Secret::new)
    }
}

impl<T: Zeroize> Serialize for Secret<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

/// A secret string, used for database passwords.
pub type SecretString = Secret<String>;
