//! Databroker client speaking kuksa.val.v2

use std::sync::Arc;

use async_trait::async_trait;
use sdv_core::ChannelFactory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::connection::{ConnectionSlot, Endpoint};
use crate::error::{BrokerError, BrokerResult};
use crate::proto::v2::{self, method};
use crate::proto::Datapoint;
use crate::rpc;
use crate::service::{ServiceConnection, SignalBrokerClient, VEHICLE_SPEED};
use crate::subscription::{self, SpeedListener};

const NAME: &str = "DataBrokerV2";

/// Client for the signal based kuksa.val.v2 protocol.
///
/// `connect` verifies the channel with a `GetServerInfo` round trip.
/// `subscribe_speed` consumes the stream on the calling task and only
/// returns once it ends, fails or is cancelled.
pub struct DataBrokerV2Client {
    endpoint: Endpoint,
    factory: Arc<dyn ChannelFactory>,
    connection: ConnectionSlot,
}

impl DataBrokerV2Client {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            endpoint,
            factory,
            connection: ConnectionSlot::new(NAME),
        }
    }
}

#[async_trait]
impl ServiceConnection for DataBrokerV2Client {
    fn name(&self) -> &'static str {
        NAME
    }

    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    #[instrument(skip(self), fields(client = NAME, address = %self.endpoint.address))]
    async fn connect(&self) -> BrokerResult<()> {
        if self.connection.is_connected() {
            debug!("Already connected");
            return Ok(());
        }

        let connection = self
            .connection
            .open(&self.endpoint, self.factory.as_ref())
            .await?;

        let info: v2::GetServerInfoResponse = match rpc::unary(
            connection.channel(),
            method::GET_SERVER_INFO,
            &v2::GetServerInfoRequest::default(),
        )
        .await
        {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "Server info unavailable, closing channel");
                connection.close();
                return Err(e);
            }
        };
        debug!(server = %info.name, version = %info.version, "Databroker identified");

        self.connection.install(connection);
        Ok(())
    }

    fn disconnect(&self) -> BrokerResult<()> {
        self.connection.release()
    }
}

#[async_trait]
impl SignalBrokerClient for DataBrokerV2Client {
    #[instrument(skip(self), fields(client = NAME))]
    async fn fetch_speed(&self) -> BrokerResult<f32> {
        let connection = self.connection.get()?;

        let request = v2::GetValueRequest {
            signal_id: v2::SignalId::path(VEHICLE_SPEED),
        };
        let response: v2::GetValueResponse =
            rpc::unary(connection.channel(), method::GET_VALUE, &request).await?;

        response
            .data_point
            .as_ref()
            .and_then(Datapoint::as_float)
            .ok_or_else(|| {
                BrokerError::invalid_response(method::GET_VALUE, "Vehicle.Speed has no float value")
            })
    }

    #[instrument(skip(self), fields(client = NAME))]
    async fn update_speed(&self, speed: f32) -> BrokerResult<bool> {
        let connection = self.connection.get()?;

        let request = v2::PublishValueRequest {
            signal_id: v2::SignalId::path(VEHICLE_SPEED),
            data_point: Datapoint::float(speed),
        };
        let result = rpc::unary::<_, v2::PublishValueResponse>(
            connection.channel(),
            method::PUBLISH_VALUE,
            &request,
        )
        .await
        .map(|_| ());

        Ok(rpc::accepted(NAME, result))
    }

    #[instrument(skip(self, listener, cancel), fields(client = NAME))]
    async fn subscribe_speed(
        &self,
        listener: Arc<dyn SpeedListener>,
        cancel: CancellationToken,
    ) -> BrokerResult<()> {
        let connection = self.connection.get()?;

        let request = v2::SubscribeRequest::paths(vec![VEHICLE_SPEED.to_string()]);
        let stream = match rpc::server_streaming::<_, v2::SubscribeResponse>(
            connection.channel(),
            method::SUBSCRIBE,
            &request,
        )
        .await
        {
            Ok(stream) => stream,
            Err(e) => {
                listener.on_error(e);
                return Ok(());
            }
        };

        let end = subscription::drive(
            stream,
            |response: v2::SubscribeResponse| {
                response
                    .entries
                    .get(VEHICLE_SPEED)
                    .and_then(Datapoint::as_float)
            },
            listener.as_ref(),
            &cancel,
            &connection.cancellation(),
        )
        .await;
        debug!(?end, "Speed subscription ended");

        Ok(())
    }
}
