//! Error types for the vehicle app

use std::path::PathBuf;

use sdv_core::MiddlewareError;
use thiserror::Error;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An explicitly configured address has no network location
    #[error("Invalid address '{address}' for service {service}")]
    InvalidAddress { service: String, address: String },

    #[error(transparent)]
    Middleware(#[from] MiddlewareError),
}
