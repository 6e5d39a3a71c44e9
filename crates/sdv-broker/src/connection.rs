//! Connection handle ownership
//!
//! Every client owns exactly one [`ConnectionSlot`]. The slot is empty until
//! `connect()` installs a channel and is emptied again by `disconnect()`;
//! operations on an empty slot fail with [`BrokerError::NotConnected`]
//! before touching the network.

use std::sync::Arc;

use parking_lot::RwLock;
use sdv_core::{ChannelCredentials, ChannelFactory, RpcChannel, ServiceAddress};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{BrokerError, BrokerResult};

/// Where and how to reach a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub address: ServiceAddress,
    pub credentials: ChannelCredentials,
}

impl Endpoint {
    /// Endpoint using insecure credentials
    pub fn new(address: ServiceAddress) -> Self {
        Self {
            address,
            credentials: ChannelCredentials::Insecure,
        }
    }

    pub fn with_credentials(mut self, credentials: ChannelCredentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// An open channel plus the token scoping work tied to it
pub(crate) struct Connection {
    channel: Arc<dyn RpcChannel>,
    cancel: CancellationToken,
}

impl Connection {
    pub(crate) fn channel(&self) -> &dyn RpcChannel {
        self.channel.as_ref()
    }

    /// Token cancelled when this connection is released
    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub(crate) fn close(&self) {
        self.cancel.cancel();
        self.channel.shutdown();
    }
}

// A connect abandoned between open and install must not leave the channel up
impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

pub(crate) struct ConnectionSlot {
    service: &'static str,
    inner: RwLock<Option<Arc<Connection>>>,
}

impl ConnectionSlot {
    pub(crate) fn new(service: &'static str) -> Self {
        Self {
            service,
            inner: RwLock::new(None),
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.inner.read().is_some()
    }

    /// The live connection, or `NotConnected`
    pub(crate) fn get(&self) -> BrokerResult<Arc<Connection>> {
        self.inner
            .read()
            .clone()
            .ok_or(BrokerError::NotConnected(self.service))
    }

    /// Open a channel to `endpoint` without installing it yet
    pub(crate) async fn open(
        &self,
        endpoint: &Endpoint,
        factory: &dyn ChannelFactory,
    ) -> BrokerResult<Arc<Connection>> {
        let connection_error = |source| BrokerError::Connection {
            service: self.service,
            address: endpoint.address.to_string(),
            source,
        };

        let (host, port) = endpoint.address.host_port().map_err(connection_error)?;
        debug!(service = self.service, host, port, "Opening channel");

        let channel = factory
            .open_channel(host, port, &endpoint.credentials)
            .await
            .map_err(connection_error)?;

        Ok(Arc::new(Connection {
            channel,
            cancel: CancellationToken::new(),
        }))
    }

    /// Make `connection` the live connection.
    ///
    /// If another connect won the race the new connection is closed again.
    pub(crate) fn install(&self, connection: Arc<Connection>) {
        let mut guard = self.inner.write();
        if guard.is_some() {
            debug!(service = self.service, "Already connected, dropping new channel");
            connection.close();
        } else {
            *guard = Some(connection);
            info!(service = self.service, "Connected");
        }
    }

    /// Release the live connection
    pub(crate) fn release(&self) -> BrokerResult<()> {
        let connection = self
            .inner
            .write()
            .take()
            .ok_or(BrokerError::NotConnected(self.service))?;
        connection.close();
        info!(service = self.service, "Disconnected");
        Ok(())
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        if let Some(connection) = self.inner.get_mut().take() {
            connection.close();
        }
    }
}
