//! Door actuation client

use std::sync::Arc;

use async_trait::async_trait;
use sdv_core::ChannelFactory;
use tracing::{debug, instrument, warn};

use crate::connection::{ConnectionSlot, Endpoint};
use crate::error::BrokerResult;
use crate::proto::door::{self, method};
use crate::rpc;
use crate::service::ServiceConnection;

const NAME: &str = "VehicleService";

/// Door lock status as reported by the vehicle service
pub const LOCK_STATUS_UNLOCKED: i32 = 0;
pub const LOCK_STATUS_LOCKED: i32 = 1;

/// Client for the door service.
///
/// Lock and unlock report remote failures as `Ok(false)`; reads propagate
/// them as errors.
pub struct VehicleServiceClient {
    endpoint: Endpoint,
    factory: Arc<dyn ChannelFactory>,
    connection: ConnectionSlot,
}

impl VehicleServiceClient {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn ChannelFactory>) -> Self {
        Self {
            endpoint,
            factory,
            connection: ConnectionSlot::new(NAME),
        }
    }

    #[instrument(skip(self), fields(client = NAME))]
    pub async fn lock_door(&self) -> BrokerResult<bool> {
        let connection = self.connection.get()?;

        let result = rpc::unary::<_, door::LockDoorResponse>(
            connection.channel(),
            method::LOCK_DOOR,
            &door::LockDoorRequest::default(),
        )
        .await;

        Ok(actuated(method::LOCK_DOOR, result.map(|response| response.success)))
    }

    #[instrument(skip(self), fields(client = NAME))]
    pub async fn unlock_door(&self) -> BrokerResult<bool> {
        let connection = self.connection.get()?;

        let result = rpc::unary::<_, door::UnlockDoorResponse>(
            connection.channel(),
            method::UNLOCK_DOOR,
            &door::UnlockDoorRequest::default(),
        )
        .await;

        Ok(actuated(method::UNLOCK_DOOR, result.map(|response| response.success)))
    }

    /// Open the door, returning how long opening takes
    #[instrument(skip(self), fields(client = NAME))]
    pub async fn open_door(&self) -> BrokerResult<i64> {
        let connection = self.connection.get()?;

        let response: door::OpenDoorResponse = rpc::unary(
            connection.channel(),
            method::OPEN_DOOR,
            &door::OpenDoorRequest::default(),
        )
        .await?;
        Ok(response.duration)
    }

    /// Current lock status, see [`LOCK_STATUS_LOCKED`]
    #[instrument(skip(self), fields(client = NAME))]
    pub async fn fetch_lock_status(&self) -> BrokerResult<i32> {
        let connection = self.connection.get()?;

        let response: door::GetLockStatusResponse = rpc::unary(
            connection.channel(),
            method::GET_LOCK_STATUS,
            &door::GetLockStatusRequest::default(),
        )
        .await?;
        Ok(response.status)
    }
}

fn actuated(method: &'static str, result: BrokerResult<bool>) -> bool {
    match result {
        Ok(success) => {
            if !success {
                debug!(method, "Actuation refused");
            }
            success
        }
        Err(e) => {
            warn!(method, error = %e, "Actuation failed");
            false
        }
    }
}

#[async_trait]
impl ServiceConnection for VehicleServiceClient {
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
