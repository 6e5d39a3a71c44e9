//! sdv-broker - Vehicle signal broker clients
//!
//! Three interchangeable clients give access to the `Vehicle.Speed` signal
//! of a databroker, each speaking a different protocol generation:
//!
//! - [`DataBrokerV1Client`] - kuksa.val.v1, fire-and-forget subscriptions
//! - [`DataBrokerV2Client`] - kuksa.val.v2, stream-consuming subscriptions
//! - [`DataBrokerModelClient`] - typed VSS models over kuksa.val.v1
//!
//! All of them implement [`SignalBrokerClient`], so callers pick a
//! [`BrokerProtocol`] once and never depend on a concrete client.
//! [`VehicleServiceClient`] drives the door actuators.
//!
//! # Error policy
//!
//! - Using a client before `connect()` or after `disconnect()` fails with
//!   [`BrokerError::NotConnected`] without any network traffic.
//! - Remote failures on reads and subscriptions are returned as
//!   [`BrokerError::Remote`].
//! - Remote failures on updates and door actuation are logged and reported
//!   as `Ok(false)`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use sdv_broker::{BrokerProtocol, Endpoint, SpeedCallbacks};
//!
//! let client = BrokerProtocol::V2.client(Endpoint::new(address), factory);
//! client.connect().await?;
//!
//! client.update_speed(50.0).await?;
//! let speed = client.fetch_speed().await?;
//!
//! let listener = Arc::new(SpeedCallbacks::new(
//!     |speed| println!("speed: {speed}"),
//!     |error| eprintln!("subscription failed: {error}"),
//! ));
//! client.subscribe_speed(listener, CancellationToken::new()).await?;
//! ```

mod connection;
pub mod error;
mod model;
pub mod proto;
mod rpc;
mod service;
mod subscription;
pub mod testing;
mod v1;
mod v2;
mod vehicle_service;

pub use connection::Endpoint;
pub use error::{BrokerError, BrokerResult};
pub use model::DataBrokerModelClient;
pub use service::{BrokerProtocol, ServiceConnection, SignalBrokerClient, VEHICLE_SPEED};
pub use subscription::{SpeedCallbacks, SpeedListener, SubscriptionEnd};
pub use testing::MockDataBroker;
pub use v1::DataBrokerV1Client;
pub use v2::DataBrokerV2Client;
pub use vehicle_service::{VehicleServiceClient, LOCK_STATUS_LOCKED, LOCK_STATUS_UNLOCKED};
