//! kuksa.val.v1 messages
//!
//! The legacy, entry/attribute based protocol: every request names a signal
//! path together with the view and fields (attributes) it targets, and
//! business errors come back inside the response body rather than as an RPC
//! status.

use sdv_core::{RpcStatus, StatusCode};
use serde::{Deserialize, Serialize};

use super::Datapoint;

pub mod method {
    pub const GET: &str = "kuksa.val.v1.VAL/Get";
    pub const SET: &str = "kuksa.val.v1.VAL/Set";
    pub const SUBSCRIBE: &str = "kuksa.val.v1.VAL/Subscribe";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum View {
    Unspecified,
    CurrentValue,
    TargetValue,
    Metadata,
    Fields,
    All,
}

/// Attribute of a data entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Field {
    Unspecified,
    Path,
    Value,
    ActuatorTarget,
    Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Datapoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actuator_target: Option<Datapoint>,
}

impl DataEntry {
    pub fn with_value(path: impl Into<String>, value: Datapoint) -> Self {
        Self {
            path: path.into(),
            value: Some(value),
            actuator_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    /// HTTP-like status code (404, 403, ...)
    pub code: u32,
    pub reason: String,
    pub message: String,
}

impl From<&Error> for RpcStatus {
    fn from(err: &Error) -> Self {
        let code = match err.code {
            400 => StatusCode::InvalidArgument,
            401 => StatusCode::Unauthenticated,
            403 => StatusCode::PermissionDenied,
            404 => StatusCode::NotFound,
            409 => StatusCode::AlreadyExists,
            503 => StatusCode::Unavailable,
            _ => StatusCode::Unknown,
        };
        RpcStatus::new(code, format!("{} ({})", err.message, err.reason))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEntryError {
    pub path: String,
    pub error: Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub path: String,
    pub view: View,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetRequest {
    pub entries: Vec<EntryRequest>,
}

impl GetRequest {
    /// Request the current value of `path`
    pub fn current_value(path: impl Into<String>) -> Self {
        Self {
            entries: vec![EntryRequest {
                path: path.into(),
                view: View::CurrentValue,
                fields: vec![Field::Value],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(default)]
    pub entries: Vec<DataEntry>,
    #[serde(default)]
    pub errors: Vec<DataEntryError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
}

impl GetResponse {
    /// The entries, or the first error reported in the body
    pub fn into_entries(self) -> Result<Vec<DataEntry>, RpcStatus> {
        first_error(self.error.as_ref(), &self.errors).map_or(Ok(self.entries), Err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub entry: DataEntry,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRequest {
    pub updates: Vec<EntryUpdate>,
}

impl SetRequest {
    /// Set the current value of `path`
    pub fn value(path: impl Into<String>, datapoint: Datapoint) -> Self {
        Self {
            updates: vec![EntryUpdate {
                entry: DataEntry::with_value(path, datapoint),
                fields: vec![Field::Value],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Error>,
    #[serde(default)]
    pub errors: Vec<DataEntryError>,
}

impl SetResponse {
    pub fn into_result(self) -> Result<(), RpcStatus> {
        first_error(self.error.as_ref(), &self.errors).map_or(Ok(()), Err)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeEntry {
    pub path: String,
    pub view: View,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub entries: Vec<SubscribeEntry>,
}

impl SubscribeRequest {
    /// Subscribe to the current value of `path`
    pub fn value(path: impl Into<String>) -> Self {
        Self {
            entries: vec![SubscribeEntry {
                path: path.into(),
                view: View::CurrentValue,
                fields: vec![Field::Value],
            }],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResponse {
    #[serde(default)]
    pub updates: Vec<EntryUpdate>,
}

impl SubscribeResponse {
    /// Datapoints carried for `path`, in the order they appear
    pub fn datapoints<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Datapoint> + 'a {
        self.updates
            .iter()
            .filter(move |update| update.entry.path == path)
            .filter_map(|update| update.entry.value.as_ref())
    }
}

fn first_error(error: Option<&Error>, errors: &[DataEntryError]) -> Option<RpcStatus> {
    error
        .or_else(|| errors.first().map(|e| &e.error))
        .map(RpcStatus::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Value;

    #[test]
    fn test_set_response_error_maps_to_status() {
        let response = SetResponse {
            error: None,
            errors: vec![DataEntryError {
                path: "Vehicle.Speed".to_string(),
                error: Error {
                    code: 403,
                    reason: "forbidden".to_string(),
                    message: "read only".to_string(),
                },
            }],
        };

        let status = response.into_result().unwrap_err();
        assert_eq!(status.code, StatusCode::PermissionDenied);
    }

    #[test]
    fn test_subscribe_response_filters_by_path() {
        let response = SubscribeResponse {
            updates: vec![
                EntryUpdate {
                    entry: DataEntry::with_value("Vehicle.Speed", Datapoint::float(10.0)),
                    fields: vec![Field::Value],
                },
                EntryUpdate {
                    entry: DataEntry::with_value("Vehicle.Width", Datapoint::new(Value::Uint32(2))),
                    fields: vec![Field::Value],
                },
            ],
        };

        let speeds: Vec<f32> = response
            .datapoints("Vehicle.Speed")
            .filter_map(Datapoint::as_float)
            .collect();
        assert_eq!(speeds, vec![10.0]);
    }

    #[test]
    fn test_request_shape() {
        let request = serde_json::to_value(GetRequest::current_value("Vehicle.Speed")).unwrap();
        assert_eq!(
            request,
            serde_json::json!({
                "entries": [{"path": "Vehicle.Speed", "view": "CURRENT_VALUE", "fields": ["VALUE"]}]
            })
        );
    }
}
