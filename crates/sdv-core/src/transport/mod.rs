//! RPC channel boundary
//!
//! Signal clients never encode wire messages themselves. They hand
//! already-decoded request values to an [`RpcChannel`] and receive decoded
//! responses back. Concrete transports (gRPC, in-memory brokers for tests,
//! ...) are supplied by the caller through a [`ChannelFactory`].
//!
//! # Example
//!
//! ```ignore
//! use sdv_core::transport::{ChannelCredentials, ChannelFactory};
//!
//! let channel = factory
//!     .open_channel("localhost", 55555, &ChannelCredentials::Insecure)
//!     .await?;
//! let response = channel.unary("kuksa.val.v2.VAL/GetServerInfo", serde_json::json!({})).await?;
//! ```

mod channel;
mod error;
mod status;

pub use channel::{ChannelCredentials, ChannelFactory, RpcChannel, RpcStream, TlsCredentials};
pub use error::TransportError;
pub use status::{RpcStatus, StatusCode};
