//! Channel and channel factory traits

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{RpcStatus, TransportError};

/// Server-streaming response: decoded messages until the stream ends or fails
pub type RpcStream = Pin<Box<dyn Stream<Item = Result<Value, RpcStatus>> + Send>>;

/// TLS material handed through to the transport untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsCredentials {
    /// Root certificate used to verify the server
    #[serde(default)]
    pub ca_certificate: Option<PathBuf>,
    /// Client certificate for mutual TLS
    #[serde(default)]
    pub client_certificate: Option<PathBuf>,
    #[serde(default)]
    pub client_key: Option<PathBuf>,
    /// Overrides the authority (server name) checked against the certificate
    #[serde(default)]
    pub authority: Option<String>,
}

/// Credentials used when opening a channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChannelCredentials {
    #[default]
    Insecure,
    Tls(TlsCredentials),
}

/// A bidirectional RPC channel carrying decoded messages.
///
/// Methods are addressed by their fully qualified name, e.g.
/// `"kuksa.val.v1.VAL/Get"`.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Issue a unary call
    async fn unary(&self, method: &str, request: Value) -> Result<Value, RpcStatus>;

    /// Open a server-streaming call.
    ///
    /// The returned stream yields responses in the order the server sent
    /// them. It ends with `None` on a clean close, or with a single
    /// `Err` item when the server aborts it.
    async fn server_streaming(&self, method: &str, request: Value) -> Result<RpcStream, RpcStatus>;

    /// Release the channel. Open streams end and further calls fail.
    fn shutdown(&self);

    fn is_shutdown(&self) -> bool;
}

/// Opens channels to a `host:port`.
///
/// Supplied externally; the signal clients only pass the credentials
/// through.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    async fn open_channel(
        &self,
        host: &str,
        port: u16,
        credentials: &ChannelCredentials,
    ) -> Result<Arc<dyn RpcChannel>, TransportError>;
}
