use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] ohs_core::Error),
    #[error(transparent)]
    Api(#[from] ohs_core::ApiError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid --data JSON: {0}")]
    InvalidJson(String),
    #[error("Invalid form field '{0}': expected KEY=VALUE")]
    InvalidField(String),
    #[error("Record not found: {0}")]
    RecordNotFound(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
}
