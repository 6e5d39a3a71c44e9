//! sdv-core - Core types for vehicle signal access
//!
//! This crate provides the pieces every signal client needs before it can
//! talk to a broker: a small location parser, service discovery through a
//! middleware (environment variables with static fallbacks), and the RPC
//! channel boundary that concrete transports plug into.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                     Middleware                        │
//! │  find_service_location("vehicledatabroker")          │
//! │        │                                              │
//! │        ├── SDV_VEHICLEDATABROKER_ADDRESS (env)        │
//! │        └── DEFAULT_LOCATIONS (static fallback)        │
//! │                     │                                 │
//! │              LocationResult::parse                    │
//! └─────────────────────┬────────────────────────────────┘
//!                       │ ServiceAddress
//!              ┌────────┴────────┐
//!              │ ChannelFactory  │──► RpcChannel
//!              └─────────────────┘
//! ```

pub mod address;
pub mod error;
pub mod location;
pub mod middleware;
pub mod transport;

pub use address::ServiceAddress;
pub use error::{MiddlewareError, MiddlewareResult};
pub use location::LocationResult;
pub use middleware::{
    create_middleware, resolve_service_location, Environment, Middleware, NativeMiddleware,
    ProcessEnvironment, DEFAULT_LOCATIONS,
};
pub use transport::{
    ChannelCredentials, ChannelFactory, RpcChannel, RpcStatus, RpcStream, StatusCode,
    TlsCredentials, TransportError,
};
