//! Decoded request/response messages of the supported services
//!
//! These mirror the protobuf messages of the kuksa.val databroker APIs and
//! the door service. They travel over an [`RpcChannel`](sdv_core::RpcChannel)
//! as `serde_json::Value`; wire encoding is the transport's business.

pub mod door;
mod types;
pub mod v1;
pub mod v2;
pub mod vss;

pub use types::{Datapoint, Value};
