use crate::error::ConfigError;
use std::env;

pub const API_KEY_VAR: &str = "API_KEY";
pub const API_SECRET_VAR: &str = "API_SECRET";
pub const API_BASE_URL_VAR: &str = "API_BASE_URL";

/// Provider credentials and the base URL every call path is appended to.
/// Built once at startup and never mutated afterwards.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
    base_url: String,
}

impl Credentials {
    pub fn new(api_key: String, api_secret: String, base_url: String) -> Self {
        Self {
            api_key,
            api_secret,
            base_url,
        }
    }

    /// Reads `API_KEY`, `API_SECRET` and `API_BASE_URL` from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials = Self::new(
            read_var(API_KEY_VAR)?,
            read_var(API_SECRET_VAR)?,
            read_var(API_BASE_URL_VAR)?,
        );
        credentials.validate_signing()?;
        credentials.validate_base_url()?;
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn validate_signing(&self) -> Result<(), ConfigError> {
        if self.api_key.is_empty() {
            return Err(ConfigError::Empty(API_KEY_VAR));
        }
        if self.api_secret.is_empty() {
            return Err(ConfigError::Empty(API_SECRET_VAR));
        }
        Ok(())
    }

    pub(crate) fn validate_base_url(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Empty(API_BASE_URL_VAR));
        }
        Ok(())
    }
}

// The secret stays out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn read_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVariable(name))
}
