//! Typed call helpers on top of [`RpcChannel`]

use futures::stream::{BoxStream, StreamExt};
use sdv_core::RpcChannel;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{trace, warn};

use crate::error::{BrokerError, BrokerResult};

fn encode<Req: Serialize>(method: &'static str, request: &Req) -> BrokerResult<serde_json::Value> {
    serde_json::to_value(request).map_err(|e| BrokerError::InvalidRequest {
        method,
        reason: e.to_string(),
    })
}

fn decode<Resp: DeserializeOwned>(
    method: &'static str,
    response: serde_json::Value,
) -> BrokerResult<Resp> {
    serde_json::from_value(response).map_err(|e| BrokerError::invalid_response(method, e.to_string()))
}

/// Issue a unary call and decode the response
pub(crate) async fn unary<Req, Resp>(
    channel: &dyn RpcChannel,
    method: &'static str,
    request: &Req,
) -> BrokerResult<Resp>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    trace!(method, "Unary call");
    let response = channel
        .unary(method, encode(method, request)?)
        .await
        .map_err(|status| BrokerError::remote(method, status))?;
    decode(method, response)
}

/// Open a server-streaming call with decoded items
pub(crate) async fn server_streaming<Req, Resp>(
    channel: &dyn RpcChannel,
    method: &'static str,
    request: &Req,
) -> BrokerResult<BoxStream<'static, BrokerResult<Resp>>>
where
    Req: Serialize,
    Resp: DeserializeOwned + Send + 'static,
{
    trace!(method, "Opening stream");
    let stream = channel
        .server_streaming(method, encode(method, request)?)
        .await
        .map_err(|status| BrokerError::remote(method, status))?;

    Ok(stream
        .map(move |item| match item {
            Ok(value) => decode(method, value),
            Err(status) => Err(BrokerError::remote(method, status)),
        })
        .boxed())
}

/// Collapse the outcome of an update/actuation into `true`/`false`.
///
/// Remote-reported failures are an expected outcome here, so they are
/// logged and reported as `false` instead of an error.
pub(crate) fn accepted(service: &'static str, result: BrokerResult<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(service, error = %e, "Update rejected");
            false
        }
    }
}
