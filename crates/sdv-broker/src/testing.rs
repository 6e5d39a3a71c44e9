//! In-memory databroker for tests and demos
//!
//! [`MockDataBroker`] is a [`ChannelFactory`] whose channels answer the
//! kuksa.val v1/v2 and door service methods from shared in-process state.
//! Failure modes (rejected updates, failing reads, unreachable broker,
//! aborted streams) can be switched on at runtime.
//!
//! ```ignore
//! use sdv_broker::{BrokerProtocol, Endpoint, MockDataBroker};
//!
//! let broker = MockDataBroker::new().with_speed(42.0);
//! let client = BrokerProtocol::V2.client(endpoint, Arc::new(broker.clone()));
//! client.connect().await?;
//! assert_eq!(client.fetch_speed().await?, 42.0);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use sdv_core::{
    ChannelCredentials, ChannelFactory, RpcChannel, RpcStatus, RpcStream, StatusCode,
    TransportError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::proto::{door, v1, v2, Datapoint, Value};
use crate::service::VEHICLE_SPEED;
use crate::vehicle_service::{LOCK_STATUS_LOCKED, LOCK_STATUS_UNLOCKED};

/// Reported by `OpenDoor` while the door is unlocked
pub const DOOR_OPEN_DURATION: i64 = 3;

const SERVER_NAME: &str = "mock-databroker";

#[derive(Debug, Clone)]
enum BrokerEvent {
    Update { path: String, value: Value },
    Abort(RpcStatus),
}

/// A channel opened through the mock factory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedChannel {
    pub host: String,
    pub port: u16,
    pub credentials: ChannelCredentials,
}

struct BrokerState {
    /// Known signals; `None` until a value was set
    signals: RwLock<HashMap<String, Option<Value>>>,
    events: broadcast::Sender<BrokerEvent>,
    lock_status: AtomicI32,
    reject_updates: AtomicBool,
    fail_reads: AtomicBool,
    reject_door: AtomicBool,
    unreachable: AtomicBool,
    server_info_unavailable: AtomicBool,
    connect_delay: RwLock<Option<Duration>>,
    opened: RwLock<Vec<OpenedChannel>>,
    channels: RwLock<Vec<Arc<MockChannel>>>,
}

/// Shared in-memory broker; clones observe the same state
#[derive(Clone)]
pub struct MockDataBroker {
    state: Arc<BrokerState>,
}

impl Default for MockDataBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDataBroker {
    /// Broker knowing `Vehicle.Speed` without a value
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        let mut signals = HashMap::new();
        signals.insert(VEHICLE_SPEED.to_string(), None);

        Self {
            state: Arc::new(BrokerState {
                signals: RwLock::new(signals),
                events,
                lock_status: AtomicI32::new(LOCK_STATUS_LOCKED),
                reject_updates: AtomicBool::new(false),
                fail_reads: AtomicBool::new(false),
                reject_door: AtomicBool::new(false),
                unreachable: AtomicBool::new(false),
                server_info_unavailable: AtomicBool::new(false),
                connect_delay: RwLock::new(None),
                opened: RwLock::new(Vec::new()),
                channels: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn with_speed(self, speed: f32) -> Self {
        self.set_signal(VEHICLE_SPEED, Value::Float(speed));
        self
    }

    /// Set a signal and notify subscribers, as a provider would
    pub fn set_signal(&self, path: impl Into<String>, value: Value) {
        let path = path.into();
        self.state
            .signals
            .write()
            .insert(path.clone(), Some(value.clone()));
        let _ = self.state.events.send(BrokerEvent::Update { path, value });
    }

    pub fn publish_speed(&self, speed: f32) {
        self.set_signal(VEHICLE_SPEED, Value::Float(speed));
    }

    pub fn signal(&self, path: &str) -> Option<Value> {
        self.state.signals.read().get(path).cloned().flatten()
    }

    pub fn speed(&self) -> Option<f32> {
        self.signal(VEHICLE_SPEED).as_ref().and_then(Value::as_float)
    }

    /// Fail every open subscription stream with `status`
    pub fn abort_subscriptions(&self, status: RpcStatus) {
        let _ = self.state.events.send(BrokerEvent::Abort(status));
    }

    pub fn set_reject_updates(&self, reject: bool) {
        self.state.reject_updates.store(reject, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_reject_door(&self, reject: bool) {
        self.state.reject_door.store(reject, Ordering::SeqCst);
    }

    /// Make `open_channel` fail
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_server_info_unavailable(&self, unavailable: bool) {
        self.state
            .server_info_unavailable
            .store(unavailable, Ordering::SeqCst);
    }

    /// Delay every `open_channel` call
    pub fn set_connect_delay(&self, delay: Option<Duration>) {
        *self.state.connect_delay.write() = delay;
    }

    pub fn set_lock_status(&self, status: i32) {
        self.state.lock_status.store(status, Ordering::SeqCst);
    }

    pub fn lock_status(&self) -> i32 {
        self.state.lock_status.load(Ordering::SeqCst)
    }

    pub fn opened_channels(&self) -> Vec<OpenedChannel> {
        self.state.opened.read().clone()
    }

    /// Channels not shut down yet
    pub fn active_channels(&self) -> usize {
        self.state
            .channels
            .read()
            .iter()
            .filter(|channel| !channel.is_shutdown())
            .count()
    }

    /// Number of open subscription streams
    pub fn subscriber_count(&self) -> usize {
        self.state.events.receiver_count()
    }
}

#[async_trait]
impl ChannelFactory for MockDataBroker {
    async fn open_channel(
        &self,
        host: &str,
        port: u16,
        credentials: &ChannelCredentials,
    ) -> Result<Arc<dyn RpcChannel>, TransportError> {
        let delay = *self.state.connect_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.state.unreachable.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(format!(
                "{}:{} is unreachable",
                host, port
            )));
        }

        debug!(host, port, "Mock channel opened");
        self.state.opened.write().push(OpenedChannel {
            host: host.to_string(),
            port,
            credentials: credentials.clone(),
        });

        let channel = Arc::new(MockChannel {
            state: self.state.clone(),
            shutdown: CancellationToken::new(),
        });
        self.state.channels.write().push(channel.clone());
        Ok(channel)
    }
}

struct MockChannel {
    state: Arc<BrokerState>,
    shutdown: CancellationToken,
}

fn decode<T: DeserializeOwned>(request: serde_json::Value) -> Result<T, RpcStatus> {
    serde_json::from_value(request).map_err(|e| RpcStatus::invalid_argument(e.to_string()))
}

fn encode<T: Serialize>(response: &T) -> Result<serde_json::Value, RpcStatus> {
    serde_json::to_value(response).map_err(|e| RpcStatus::internal(e.to_string()))
}

fn v1_error(code: u32, reason: &str, message: impl Into<String>) -> v1::Error {
    v1::Error {
        code,
        reason: reason.to_string(),
        message: message.into(),
    }
}

fn v1_not_found(path: &str) -> v1::DataEntryError {
    v1::DataEntryError {
        path: path.to_string(),
        error: v1_error(404, "not_found", format!("{} not found", path)),
    }
}

fn v1_update(path: &str, value: Option<Value>) -> v1::SubscribeResponse {
    v1::SubscribeResponse {
        updates: vec![v1::EntryUpdate {
            entry: v1::DataEntry {
                path: path.to_string(),
                value: value.map(Datapoint::new),
                actuator_target: None,
            },
            fields: vec![v1::Field::Value],
        }],
    }
}

fn v2_update(path: &str, value: Option<Value>) -> v2::SubscribeResponse {
    let mut entries = HashMap::new();
    entries.insert(
        path.to_string(),
        Datapoint {
            timestamp_ms: None,
            value,
        },
    );
    v2::SubscribeResponse { entries }
}

impl MockChannel {
    fn signal_path(signal_id: v2::SignalId) -> Result<String, RpcStatus> {
        match signal_id {
            v2::SignalId::Path(path) => Ok(path),
            v2::SignalId::Id(id) => Err(RpcStatus::not_found(format!("unknown signal id {}", id))),
        }
    }

    fn known(&self, path: &str) -> bool {
        self.state.signals.read().contains_key(path)
    }

    fn write(&self, path: &str, value: Value) {
        self.state
            .signals
            .write()
            .insert(path.to_string(), Some(value.clone()));
        let _ = self.state.events.send(BrokerEvent::Update {
            path: path.to_string(),
            value,
        });
    }

    fn v1_get(&self, request: v1::GetRequest) -> v1::GetResponse {
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return v1::GetResponse {
                error: Some(v1_error(503, "unavailable", "reads are failing")),
                ..Default::default()
            };
        }

        let signals = self.state.signals.read();
        let mut response = v1::GetResponse::default();
        for entry in request.entries {
            match signals.get(&entry.path) {
                Some(value) => response.entries.push(v1::DataEntry {
                    value: value.clone().map(Datapoint::new),
                    path: entry.path,
                    actuator_target: None,
                }),
                None => response.errors.push(v1_not_found(&entry.path)),
            }
        }
        response
    }

    fn v1_set(&self, request: v1::SetRequest) -> v1::SetResponse {
        if self.state.reject_updates.load(Ordering::SeqCst) {
            return v1::SetResponse {
                error: Some(v1_error(403, "forbidden", "updates are rejected")),
                ..Default::default()
            };
        }

        let mut response = v1::SetResponse::default();
        for update in request.updates {
            let path = update.entry.path;
            match update.entry.value.and_then(|datapoint| datapoint.value) {
                Some(value) if self.known(&path) => self.write(&path, value),
                Some(_) => response.errors.push(v1_not_found(&path)),
                None => response.errors.push(v1::DataEntryError {
                    error: v1_error(400, "invalid_argument", "no value given"),
                    path,
                }),
            }
        }
        response
    }

    fn v2_get(&self, request: v2::GetValueRequest) -> Result<v2::GetValueResponse, RpcStatus> {
        if self.state.fail_reads.load(Ordering::SeqCst) {
            return Err(RpcStatus::unavailable("reads are failing"));
        }

        let path = Self::signal_path(request.signal_id)?;
        let value = self
            .state
            .signals
            .read()
            .get(&path)
            .cloned()
            .ok_or_else(|| RpcStatus::not_found(format!("{} not found", path)))?;

        Ok(v2::GetValueResponse {
            data_point: Some(Datapoint {
                timestamp_ms: None,
                value,
            }),
        })
    }

    fn v2_publish(&self, request: v2::PublishValueRequest) -> Result<v2::PublishValueResponse, RpcStatus> {
        if self.state.reject_updates.load(Ordering::SeqCst) {
            return Err(RpcStatus::permission_denied("updates are rejected"));
        }

        let path = Self::signal_path(request.signal_id)?;
        if !self.known(&path) {
            return Err(RpcStatus::not_found(format!("{} not found", path)));
        }
        let value = request
            .data_point
            .value
            .ok_or_else(|| RpcStatus::invalid_argument("no value given"))?;
        self.write(&path, value);
        Ok(v2::PublishValueResponse {})
    }

    fn door_actuation(&self, status: i32) -> Result<bool, RpcStatus> {
        if self.state.reject_door.load(Ordering::SeqCst) {
            return Err(RpcStatus::unavailable("door actuator not responding"));
        }
        self.state.lock_status.store(status, Ordering::SeqCst);
        Ok(true)
    }

    fn open_door(&self) -> Result<door::OpenDoorResponse, RpcStatus> {
        if self.state.lock_status.load(Ordering::SeqCst) == LOCK_STATUS_LOCKED {
            return Err(RpcStatus::new(
                StatusCode::FailedPrecondition,
                "door is locked",
            ));
        }
        Ok(door::OpenDoorResponse {
            duration: DOOR_OPEN_DURATION,
        })
    }

    fn subscribe(
        &self,
        paths: Vec<String>,
        render: fn(&str, Option<Value>) -> Result<serde_json::Value, RpcStatus>,
    ) -> Result<RpcStream, RpcStatus> {
        // Subscribe before the snapshot so no update falls in between
        let mut events = self.state.events.subscribe();

        let initial = {
            let signals = self.state.signals.read();
            paths
                .iter()
                .map(|path| {
                    signals
                        .get(path)
                        .map(|value| (path.clone(), value.clone()))
                        .ok_or_else(|| RpcStatus::not_found(format!("{} not found", path)))
                })
                .collect::<Result<Vec<_>, _>>()?
        };

        let shutdown = self.shutdown.clone();
        let stream = async_stream::stream! {
            for (path, value) in initial {
                yield render(&path, value);
            }

            loop {
                let event = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = events.recv() => event,
                };

                match event {
                    Ok(BrokerEvent::Update { path, value }) => {
                        if paths.contains(&path) {
                            yield render(&path, Some(value));
                        }
                    }
                    Ok(BrokerEvent::Abort(status)) => {
                        yield Err(status);
                        break;
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[async_trait]
impl RpcChannel for MockChannel {
    async fn unary(&self, method: &str, request: serde_json::Value) -> Result<serde_json::Value, RpcStatus> {
        if self.is_shutdown() {
            return Err(RpcStatus::unavailable("channel is shut down"));
        }

        match method {
            v1::method::GET => encode(&self.v1_get(decode(request)?)),
            v1::method::SET => encode(&self.v1_set(decode(request)?)),
            v2::method::GET_VALUE => encode(&self.v2_get(decode(request)?)?),
            v2::method::PUBLISH_VALUE => encode(&self.v2_publish(decode(request)?)?),
            v2::method::GET_SERVER_INFO => {
                if self.state.server_info_unavailable.load(Ordering::SeqCst) {
                    return Err(RpcStatus::unavailable("server info unavailable"));
                }
                encode(&v2::GetServerInfoResponse {
                    name: SERVER_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    commit_hash: String::new(),
                })
            }
            door::method::LOCK_DOOR => encode(&door::LockDoorResponse {
                success: self.door_actuation(LOCK_STATUS_LOCKED)?,
            }),
            door::method::UNLOCK_DOOR => encode(&door::UnlockDoorResponse {
                success: self.door_actuation(LOCK_STATUS_UNLOCKED)?,
            }),
            door::method::OPEN_DOOR => encode(&self.open_door()?),
            door::method::GET_LOCK_STATUS => encode(&door::GetLockStatusResponse {
                status: self.state.lock_status.load(Ordering::SeqCst),
            }),
            other => Err(RpcStatus::unimplemented(format!("unknown method {}", other))),
        }
    }

    async fn server_streaming(
        &self,
        method: &str,
        request: serde_json::Value,
    ) -> Result<RpcStream, RpcStatus> {
        if self.is_shutdown() {
            return Err(RpcStatus::unavailable("channel is shut down"));
        }

        match method {
            v1::method::SUBSCRIBE => {
                let request: v1::SubscribeRequest = decode(request)?;
                let paths = request.entries.into_iter().map(|entry| entry.path).collect();
                self.subscribe(paths, |path, value| encode(&v1_update(path, value)))
            }
            v2::method::SUBSCRIBE => {
                let request: v2::SubscribeRequest = decode(request)?;
                self.subscribe(request.signal_paths, |path, value| {
                    encode(&v2_update(path, value))
                })
            }
            other => Err(RpcStatus::unimplemented(format!("unknown stream {}", other))),
        }
    }

    fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;
    use serde_json::json;

    use super::*;

    async fn channel(broker: &MockDataBroker) -> Arc<dyn RpcChannel> {
        broker
            .open_channel("localhost", 55555, &ChannelCredentials::Insecure)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_method_is_unimplemented() {
        let broker = MockDataBroker::new();
        let channel = channel(&broker).await;

        let err = channel.unary("foo.Bar/Baz", json!({})).await.unwrap_err();
        assert_eq!(err.code, StatusCode::Unimplemented);
    }

    #[tokio::test]
    async fn test_shutdown_channel_rejects_calls() {
        let broker = MockDataBroker::new();
        let channel = channel(&broker).await;
        assert_eq!(broker.active_channels(), 1);

        channel.shutdown();

        assert_eq!(broker.active_channels(), 0);
        let err = channel
            .unary(door::method::GET_LOCK_STATUS, json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, StatusCode::Unavailable);
    }

    #[tokio::test]
    async fn test_subscribe_unknown_path_is_not_found() {
        let broker = MockDataBroker::new();
        let channel = channel(&broker).await;

        let request = serde_json::to_value(v2::SubscribeRequest::paths(vec!["Vehicle.Nope".into()])).unwrap();
        let err = match channel.server_streaming(v2::method::SUBSCRIBE, request).await {
            Ok(_) => panic!("subscription to unknown path succeeded"),
            Err(e) => e,
        };
        assert_eq!(err.code, StatusCode::NotFound);
    }

    #[tokio::test]
    async fn test_stream_ends_on_shutdown() {
        let broker = MockDataBroker::new().with_speed(1.0);
        let channel = channel(&broker).await;

        let request = serde_json::to_value(v2::SubscribeRequest::paths(vec![VEHICLE_SPEED.into()])).unwrap();
        let mut stream = channel
            .server_streaming(v2::method::SUBSCRIBE, request)
            .await
            .unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        channel.shutdown();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_waits_for_updates() {
        let broker = MockDataBroker::new().with_speed(1.0);
        let channel = channel(&broker).await;

        let request = serde_json::to_value(v1::SubscribeRequest::value(VEHICLE_SPEED)).unwrap();
        let mut stream = channel
            .server_streaming(v1::method::SUBSCRIBE, request)
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().is_ok());

        let mut next = tokio_test::task::spawn(stream.next());
        tokio_test::assert_pending!(next.poll());

        broker.publish_speed(2.0);
        assert!(next.is_woken());
        let update: v1::SubscribeResponse = match next.poll() {
            std::task::Poll::Ready(Some(Ok(value))) => serde_json::from_value(value).unwrap(),
            _ => panic!("expected an update"),
        };
        let speeds: Vec<_> = update.datapoints(VEHICLE_SPEED).filter_map(Datapoint::as_float).collect();
        assert_eq!(speeds, vec![2.0]);
    }
}
