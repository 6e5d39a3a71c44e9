//! kuksa.val.v2 messages
//!
//! Signals are addressed by a [`SignalId`] (numeric id or path). Failures
//! are reported as RPC status codes:
//!
//! - `NOT_FOUND` if the signal does not exist
//! - `PERMISSION_DENIED` if access is denied, or the signal is already
//!   provided by another provider (publish)
//! - `INVALID_ARGUMENT` if the value type does not match the signal

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::Datapoint;

pub mod method {
    pub const GET_VALUE: &str = "kuksa.val.v2.VAL/GetValue";
    pub const PUBLISH_VALUE: &str = "kuksa.val.v2.VAL/PublishValue";
    pub const SUBSCRIBE: &str = "kuksa.val.v2.VAL/Subscribe";
    pub const GET_SERVER_INFO: &str = "kuksa.val.v2.VAL/GetServerInfo";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalId {
    Id(i32),
    Path(String),
}

impl SignalId {
    pub fn path(path: impl Into<String>) -> Self {
        Self::Path(path.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetValueRequest {
    pub signal_id: SignalId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetValueResponse {
    #[serde(default)]
    pub data_point: Option<Datapoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishValueRequest {
    pub signal_id: SignalId,
    pub data_point: Datapoint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishValueResponse {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub signal_paths: Vec<String>,
    /// Server-side buffer; 0 selects the broker default
    #[serde(default)]
    pub buffer_size: u32,
}

impl SubscribeRequest {
    pub fn paths(signal_paths: Vec<String>) -> Self {
        Self {
            signal_paths,
            buffer_size: 0,
        }
    }
}

/// Latest datapoints keyed by signal path.
///
/// The first message of a stream carries the current value of every
/// subscribed signal (without `value` if it was never set).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    #[serde(default)]
    pub entries: HashMap<String, Datapoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServerInfoRequest {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetServerInfoResponse {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub commit_hash: String,
}
