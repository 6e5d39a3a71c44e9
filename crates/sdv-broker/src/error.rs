//! Error types for signal broker clients

use sdv_core::{RpcStatus, TransportError};
use thiserror::Error;

/// Result type alias for broker client operations
pub type BrokerResult<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur during broker client operations
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// Operation invoked before `connect()` succeeded or after `disconnect()`
    #[error("Not connected to {0}. Call connect first.")]
    NotConnected(&'static str),

    /// Opening the channel failed
    #[error("Failed to connect to {service} at {address}: {source}")]
    Connection {
        service: &'static str,
        address: String,
        #[source]
        source: TransportError,
    },

    /// The remote side reported a failure
    #[error("Remote call {method} failed: {status}")]
    Remote {
        method: &'static str,
        #[source]
        status: RpcStatus,
    },

    /// Request could not be encoded
    #[error("Invalid request for {method}: {reason}")]
    InvalidRequest { method: &'static str, reason: String },

    /// Response did not have the expected shape
    #[error("Invalid response from {method}: {reason}")]
    InvalidResponse { method: &'static str, reason: String },
}

impl BrokerError {
    pub fn remote(method: &'static str, status: RpcStatus) -> Self {
        Self::Remote { method, status }
    }

    pub fn invalid_response(method: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method,
            reason: reason.into(),
        }
    }

    /// Whether this is a local precondition failure
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected(_))
    }
}
