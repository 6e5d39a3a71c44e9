//! sdv-app - Vehicle app built on the signal access layer
//!
//! - [`config`] - TOML configuration and endpoint resolution
//! - [`supervisor`] - concurrent connect / orderly disconnect of all clients
//! - [`app`] - the [`VehicleApp`] composition root
//! - [`logging`] - tracing subscriber setup for the binary
//! - [`demo`] - broker and door sequences driven by the binary

pub mod app;
pub mod config;
pub mod demo;
pub mod error;
pub mod logging;
pub mod supervisor;

pub use app::VehicleApp;
pub use config::{AppConfig, DataBrokerConfig, VehicleServiceConfig};
pub use error::{AppError, AppResult};
pub use supervisor::{ConnectOutcome, ConnectReport, ConnectionSupervisor};
