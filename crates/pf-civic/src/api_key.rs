use std::fmt;

use thiserror::Error;

use crate::constants::API_KEY_ENV_VAR;

/// Civic Information API key. Always supplied by the caller, never compiled in.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    key: String,
}

impl ApiKey {
    /// From a raw API key string.
    pub fn from_raw(key: &str) -> Result<Self, ApiKeyError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(ApiKeyError::Empty);
        }
        Ok(Self {
            key: key.to_owned(),
        })
    }

    /// Read the API key from the `CIVIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, ApiKeyError> {
        let raw =
            std::env::var(API_KEY_ENV_VAR).map_err(|_| ApiKeyError::Missing(API_KEY_ENV_VAR))?;
        Self::from_raw(&raw)
    }

    pub fn get(&self) -> &str {
        &self.key
    }
}

// Keeps the key out of logs and panic messages.
impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey").field("key", &"<redacted>").finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiKeyError {
    #[error("the API key is empty")]
    Empty,
    #[error("the API key was not found in the environment variable `{0}`")]
    Missing(&'static str),
}
