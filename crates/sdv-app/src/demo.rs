//! Demo sequences run by the `sdv-app` binary
//!
//! Both return the first hard error instead of aborting, so the caller can
//! still shut the app down in order.

use std::sync::Arc;

use sdv_broker::{BrokerResult, SignalBrokerClient, SpeedCallbacks, VehicleServiceClient};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Fetch, update, then follow `Vehicle.Speed` until `cancel` fires
pub async fn exercise_broker(
    client: &dyn SignalBrokerClient,
    speed: f32,
    cancel: CancellationToken,
) -> BrokerResult<()> {
    match client.fetch_speed().await {
        Ok(speed) => info!(speed, "Current speed"),
        Err(e) => error!(error = %e, "Fetching speed failed"),
    }
    if client.update_speed(speed).await? {
        info!(speed, "Speed updated");
    } else {
        warn!(speed, "Speed update rejected");
    }

    let listener = Arc::new(SpeedCallbacks::new(
        |speed| info!(speed, "Speed changed"),
        |error| error!(%error, "Speed subscription failed"),
    ));
    client.subscribe_speed(listener, cancel).await
}

/// Unlock, open and lock the door; returns the final lock status if locked
pub async fn exercise_door(door: &VehicleServiceClient) -> BrokerResult<Option<i32>> {
    if door.unlock_door().await? {
        match door.open_door().await {
            Ok(duration) => info!(duration, "Door opening"),
            Err(e) => warn!(error = %e, "Door did not open"),
        }
    }
    if door.lock_door().await? {
        let status = door.fetch_lock_status().await?;
        info!(status, "Door locked");
        return Ok(Some(status));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use sdv_broker::{
        BrokerProtocol, Endpoint, MockDataBroker, ServiceConnection, LOCK_STATUS_LOCKED,
    };
    use sdv_core::ServiceAddress;

    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new(ServiceAddress::parse("localhost:55555").unwrap())
    }

    #[tokio::test]
    async fn test_door_sequence() {
        let broker = MockDataBroker::new();
        let door = VehicleServiceClient::new(endpoint(), Arc::new(broker.clone()));
        door.connect().await.unwrap();

        assert_eq!(exercise_door(&door).await.unwrap(), Some(LOCK_STATUS_LOCKED));
        assert_eq!(broker.lock_status(), LOCK_STATUS_LOCKED);
    }

    #[tokio::test]
    async fn test_door_sequence_unconnected_returns_error() {
        let door = VehicleServiceClient::new(endpoint(), Arc::new(MockDataBroker::new()));

        let err = exercise_door(&door).await.unwrap_err();

        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn test_broker_sequence_unconnected_returns_error() {
        let client = BrokerProtocol::V1.client(endpoint(), Arc::new(MockDataBroker::new()));

        let err = exercise_broker(client.as_ref(), 50.0, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_not_connected());
    }

    #[tokio::test]
    async fn test_broker_sequence_runs_until_cancelled() {
        let broker = MockDataBroker::new().with_speed(0.0);
        let client = BrokerProtocol::V2.client(endpoint(), Arc::new(broker.clone()));
        client.connect().await.unwrap();
        let cancel = CancellationToken::new();

        let task = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { exercise_broker(client.as_ref(), 42.0, cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        task.await.unwrap().unwrap();
        assert_eq!(broker.speed(), Some(42.0));
    }
}
