//! Client contracts
//!
//! [`SignalBrokerClient`] is the protocol-independent capability set shared
//! by all databroker clients, so callers can swap protocol generations
//! without touching their own code. [`ServiceConnection`] is the lifecycle
//! part every client (including the door client) implements.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sdv_core::ChannelFactory;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::connection::Endpoint;
use crate::error::BrokerResult;
use crate::model::DataBrokerModelClient;
use crate::subscription::SpeedListener;
use crate::v1::DataBrokerV1Client;
use crate::v2::DataBrokerV2Client;

/// VSS path of the vehicle speed signal
pub const VEHICLE_SPEED: &str = "Vehicle.Speed";

/// Connection lifecycle of a service client.
///
/// `Unconnected --connect--> Connected --disconnect--> Unconnected`. A failed
/// `connect` leaves the client unconnected.
#[async_trait]
pub trait ServiceConnection: Send + Sync {
    /// Client name, used as logging tag
    fn name(&self) -> &'static str;

    fn endpoint(&self) -> &Endpoint;

    fn is_connected(&self) -> bool;

    /// Open the channel. Calling it again while connected does nothing.
    async fn connect(&self) -> BrokerResult<()>;

    /// Release the channel. Fails with `NotConnected` if there is none.
    fn disconnect(&self) -> BrokerResult<()>;
}

/// Access to the `Vehicle.Speed` signal of a databroker
#[async_trait]
pub trait SignalBrokerClient: ServiceConnection {
    /// Fetch the current speed.
    ///
    /// Fails with `NotConnected` before `connect()`, and with `Remote` if
    /// the broker reports an error.
    async fn fetch_speed(&self) -> BrokerResult<f32>;

    /// Set the speed.
    ///
    /// Returns `Ok(false)` when the broker rejects the update; only local
    /// precondition failures are returned as errors.
    async fn update_speed(&self, speed: f32) -> BrokerResult<bool>;

    /// Subscribe to speed changes.
    ///
    /// Depending on the protocol this either returns once the subscription
    /// is registered (v1, model) or keeps consuming the stream until it
    /// ends, fails or `cancel` fires (v2). Cancelling never calls
    /// `on_error`.
    async fn subscribe_speed(
        &self,
        listener: Arc<dyn SpeedListener>,
        cancel: CancellationToken,
    ) -> BrokerResult<()>;
}

/// Databroker protocol generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerProtocol {
    /// kuksa.val.v1
    #[default]
    V1,
    /// kuksa.val.v2
    V2,
    /// Typed VSS models over kuksa.val.v1
    Model,
}

impl BrokerProtocol {
    pub const ALL: [BrokerProtocol; 3] = [BrokerProtocol::V1, BrokerProtocol::V2, BrokerProtocol::Model];

    /// Construct the client speaking this protocol
    pub fn client(
        self,
        endpoint: Endpoint,
        factory: Arc<dyn ChannelFactory>,
    ) -> Arc<dyn SignalBrokerClient> {
        match self {
            BrokerProtocol::V1 => Arc::new(DataBrokerV1Client::new(endpoint, factory)),
            BrokerProtocol::V2 => Arc::new(DataBrokerV2Client::new(endpoint, factory)),
            BrokerProtocol::Model => Arc::new(DataBrokerModelClient::new(endpoint, factory)),
        }
    }
}

impl fmt::Display for BrokerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerProtocol::V1 => f.write_str("v1"),
            BrokerProtocol::V2 => f.write_str("v2"),
            BrokerProtocol::Model => f.write_str("model"),
        }
    }
}

impl FromStr for BrokerProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "v1" => Ok(BrokerProtocol::V1),
            "v2" => Ok(BrokerProtocol::V2),
            "model" => Ok(BrokerProtocol::Model),
            other => Err(format!(
                "Unknown broker protocol '{}' (expected v1, v2 or model)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_parse() {
        assert_eq!("V2".parse::<BrokerProtocol>().unwrap(), BrokerProtocol::V2);
        assert_eq!(" model ".parse::<BrokerProtocol>().unwrap(), BrokerProtocol::Model);
        assert!("v3".parse::<BrokerProtocol>().is_err());
    }

    #[test]
    fn test_protocol_display_roundtrip() {
        for protocol in BrokerProtocol::ALL {
            assert_eq!(protocol.to_string().parse::<BrokerProtocol>().unwrap(), protocol);
        }
    }
}
