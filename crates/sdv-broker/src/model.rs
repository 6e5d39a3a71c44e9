//! Databroker client working on typed VSS models

use std::sync::Arc;

use async_trait::async_trait;
use sdv_core::ChannelFactory;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::connection::{ConnectionSlot, Endpoint};
use crate::error::{BrokerError, BrokerResult};
use crate::proto::v1::{self, method};
use crate::proto::vss::{VssSignal, VssSpeed};
use crate::rpc;
use crate::service::{ServiceConnection, SignalBrokerClient};
use crate::subscription::{self, SpeedListener};

const NAME: &str = "DataBrokerModel";

/// Client addressing signals through [`VssSignal`] models.
///
/// Uses kuksa.val.v1 on the wire. Any model can be read and written with
/// [`fetch_node`](Self::fetch_node) and [`update_node`](Self::update_node);
/// the speed contract is implemented on top of [`VssSpeed`].
pub struct DataBrokerModelClient {
    endpoint: Endpoint,
    factory: Arc<dyn ChannelFactory>,
    connection: ConnectionSlot,
}

impl DataBrokerModelClient {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            endpoint,
            factory,
            connection: ConnectionSlot::new(NAME),
        }
    }

    /// Read the current value of model `T`
    pub async fn fetch_node<T: VssSignal>(&self) -> BrokerResult<T> {
        let connection = self.connection.get()?;

        let request = v1::GetRequest::current_value(T::PATH);
        let response: v1::GetResponse =
            rpc::unary(connection.channel(), method::GET, &request).await?;

        response
            .into_entries()
            .map_err(|status| BrokerError::remote(method::GET, status))?
            .into_iter()
            .filter(|entry| entry.path == T::PATH)
            .find_map(|entry| entry.value.as_ref().and_then(T::from_datapoint))
            .ok_or_else(|| {
                BrokerError::invalid_response(method::GET, format!("no usable value for {}", T::PATH))
            })
    }

    /// Write `node`; `Ok(false)` if the broker rejected it
    pub async fn update_node<T: VssSignal + Sync>(&self, node: &T) -> BrokerResult<bool> {
        let connection = self.connection.get()?;

        let request = v1::SetRequest::value(T::PATH, node.to_datapoint());
        let result = rpc::unary::<_, v1::SetResponse>(connection.channel(), method::SET, &request)
            .await
            .and_then(|response| {
                response
                    .into_result()
                    .map_err(|status| BrokerError::remote(method::SET, status))
            });

        Ok(rpc::accepted(NAME, result))
    }
}

#[async_trait]
impl ServiceConnection for DataBrokerModelClient {
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
impl SignalBrokerClient for DataBrokerModelClient {
    #[instrument(skip(self), fields(client = NAME))]
    async fn fetch_speed(&self) -> BrokerResult<f32> {
        self.fetch_node::<VssSpeed>().await.map(|speed| speed.value)
    }

    #[instrument(skip(self), fields(client = NAME))]
    async fn update_speed(&self, speed: f32) -> BrokerResult<bool> {
        self.update_node(&VssSpeed::new(speed)).await
    }

    #[instrument(skip(self, listener, cancel), fields(client = NAME))]
    async fn subscribe_speed(
        &self,
        listener: Arc<dyn SpeedListener>,
        cancel: CancellationToken,
    ) -> BrokerResult<()> {
        let connection = self.connection.get()?;

        let request = v1::SubscribeRequest::value(VssSpeed::PATH);
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
                        .datapoints(VssSpeed::PATH)
                        .filter_map(VssSpeed::from_datapoint)
                        .map(|speed| speed.value)
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
