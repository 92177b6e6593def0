use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(&'static str),

    #[error("Configuration value must not be empty: {0}")]
    Empty(&'static str),

    #[error("Signing secret cannot be used as an HMAC key")]
    InvalidSecret,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Unexpected response status {status}: {body}")]
    UnexpectedStatus { status: StatusCode, body: String },

    #[error("Failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DateParseError {
    #[error("Invalid date-time: {0:?}")]
    InvalidDateTime(String),

    #[error("Unknown timezone: {0:?}")]
    UnknownTimezone(String),

    #[error("Local time {0:?} does not exist in the given timezone")]
    NonexistentLocalTime(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Field '{0}' is not a valid date-time")]
    InvalidDateTime(&'static str),
}
