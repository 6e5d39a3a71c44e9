//! Databroker client speaking kuksa.val.v1

use std::sync::Arc;

use async_trait::async_trait;
use sdv_core::ChannelFactory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::connection::{ConnectionSlot, Endpoint};
use crate::error::{BrokerError, BrokerResult};
use crate::proto::v1::{self, method};
use crate::proto::Datapoint;
use crate::rpc;
use crate::service::{ServiceConnection, SignalBrokerClient, VEHICLE_SPEED};
use crate::subscription::{self, SpeedListener};

const NAME: &str = "DataBrokerV1";

/// Client for the legacy entry based kuksa.val.v1 protocol.
///
/// Subscriptions are fire-and-forget: `subscribe_speed` returns as soon as
/// the stream is open and a background task delivers the updates.
pub struct DataBrokerV1Client {
    endpoint: Endpoint,
    factory: Arc<dyn ChannelFactory>,
    connection: ConnectionSlot,
}

impl DataBrokerV1Client {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            endpoint,
            factory,
            connection: ConnectionSlot::new(NAME),
        }
    }
}

#[async_trait]
impl ServiceConnection for DataBrokerV1Client {
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
        self.connection.install(connection);
        Ok(())
    }

    fn disconnect(&self) -> BrokerResult<()> {
        self.connection.release()
    }
}

#[async_trait]
impl SignalBrokerClient for DataBrokerV1Client {
    #[instrument(skip(self), fields(client = NAME))]
    async fn fetch_speed(&self) -> BrokerResult<f32> {
        let connection = self.connection.get()?;

        let request = v1::GetRequest::current_value(VEHICLE_SPEED);
        let response: v1::GetResponse =
            rpc::unary(connection.channel(), method::GET, &request).await?;

        let entries = response
            .into_entries()
            .map_err(|status| BrokerError::remote(method::GET, status))?;
        let entry = entries
            .into_iter()
            .find(|entry| entry.path == VEHICLE_SPEED)
            .ok_or_else(|| BrokerError::invalid_response(method::GET, "no entry for Vehicle.Speed"))?;

        entry
            .value
            .as_ref()
            .and_then(Datapoint::as_float)
            .ok_or_else(|| BrokerError::invalid_response(method::GET, "Vehicle.Speed has no float value"))
    }

    #[instrument(skip(self), fields(client = NAME))]
    async fn update_speed(&self, speed: f32) -> BrokerResult<bool> {
        let connection = self.connection.get()?;

        let request = v1::SetRequest::value(VEHICLE_SPEED, Datapoint::float(speed));
        let result = rpc::unary::<_, v1::SetResponse>(connection.channel(), method::SET, &request)
            .await
            .and_then(|response| {
                response
                    .into_result()
                    .map_err(|status| BrokerError::remote(method::SET, status))
            });

        Ok(rpc::accepted(NAME, result))
    }

    #[instrument(skip(self, listener, cancel), fields(client = NAME))]
    async fn subscribe_speed(
        &self,
        listener: Arc<dyn SpeedListener>,
        cancel: CancellationToken,
    ) -> BrokerResult<()> {
        let connection = self.connection.get()?;

        let request = v1::SubscribeRequest::value(VEHICLE_SPEED);
        let stream = rpc::server_streaming::<_, v1::SubscribeResponse>(
            connection.channel(),
            method::SUBSCRIBE,
            &request,
        )
        .await?;

        let connection_cancel = connection.cancellation();
        tokio::spawn(async move {
            let end = subscription::drive(
                stream,
                |response: v1::SubscribeResponse| {
                    response
                        .datapoints(VEHICLE_SPEED)
                        .filter_map(Datapoint::as_float)
                        .collect::<Vec<_>>()
                },
                listener.as_ref(),
                &cancel,
                &connection_cancel,
            )
            .await;
            debug!(client = NAME, ?end, "Speed subscription ended");
        });

        Ok(())
    }
}
