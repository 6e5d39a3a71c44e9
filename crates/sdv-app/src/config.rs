//! TOML configuration for the vehicle app
//!
//! Every section and field is optional. Service addresses given here win
//! over the middleware; without one the middleware resolves the service by
//! name (`SDV_<SERVICE>_ADDRESS` or the built-in defaults).
//!
//! ```toml
//! [databroker]
//! service = "vehicledatabroker"
//! address = "grpc://localhost:55555"
//! protocol = "v2"
//!
//! [supervisor]
//! connect_timeout_ms = 5000
//!
//! [logging]
//! filter = "sdv_broker=debug"
//! json = false
//! ```

use std::path::Path;
use std::time::Duration;

use sdv_broker::{BrokerProtocol, Endpoint};
use sdv_core::{ChannelCredentials, Middleware, ServiceAddress, TlsCredentials};
use serde::Deserialize;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// `[databroker]`: where the broker lives and which protocol the app speaks
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataBrokerConfig {
    /// Logical service name used for discovery
    pub service: String,
    /// Explicit location, e.g. `"grpc://10.0.0.2:55555"`
    pub address: Option<String>,
    /// Protocol the app uses for signal access
    pub protocol: BrokerProtocol,
    /// TLS material; insecure when absent
    pub tls: Option<TlsCredentials>,
}

impl Default for DataBrokerConfig {
    fn default() -> Self {
        Self {
            service: "vehicledatabroker".to_string(),
            address: None,
            protocol: BrokerProtocol::default(),
            tls: None,
        }
    }
}

impl DataBrokerConfig {
    pub fn credentials(&self) -> ChannelCredentials {
        credentials(&self.tls)
    }

    /// Resolve into a connectable endpoint
    pub fn resolve(&self, middleware: &dyn Middleware) -> AppResult<Endpoint> {
        resolve_endpoint(&self.service, self.address.as_deref(), &self.tls, middleware)
    }
}

/// `[vehicle_service]`: where the door service lives
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VehicleServiceConfig {
    pub service: String,
    pub address: Option<String>,
    pub tls: Option<TlsCredentials>,
}

impl Default for VehicleServiceConfig {
    fn default() -> Self {
        Self {
            service: "vehicleservice".to_string(),
            address: None,
            tls: None,
        }
    }
}

impl VehicleServiceConfig {
    pub fn credentials(&self) -> ChannelCredentials {
        credentials(&self.tls)
    }

    pub fn resolve(&self, middleware: &dyn Middleware) -> AppResult<Endpoint> {
        resolve_endpoint(&self.service, self.address.as_deref(), &self.tls, middleware)
    }
}

fn credentials(tls: &Option<TlsCredentials>) -> ChannelCredentials {
    match tls {
        Some(tls) => ChannelCredentials::Tls(tls.clone()),
        None => ChannelCredentials::Insecure,
    }
}

/// An explicit address wins; otherwise the middleware locates `service`
fn resolve_endpoint(
    service: &str,
    address: Option<&str>,
    tls: &Option<TlsCredentials>,
    middleware: &dyn Middleware,
) -> AppResult<Endpoint> {
    let address = match address {
        Some(address) => {
            debug!(service, address, "Using configured address");
            ServiceAddress::parse(address).ok_or_else(|| AppError::InvalidAddress {
                service: service.to_string(),
                address: address.to_string(),
            })?
        }
        None => middleware.find_service_location(service)?,
    };

    Ok(Endpoint::new(address).with_credentials(credentials(tls)))
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Give up on a connect after this long; 0 waits forever
    pub connect_timeout_ms: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
        }
    }
}

impl SupervisorConfig {
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence
    pub filter: Option<String>,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

/// Top-level app configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub databroker: DataBrokerConfig,
    pub vehicle_service: VehicleServiceConfig,
    pub supervisor: SupervisorConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use sdv_core::{MiddlewareError, NativeMiddleware};

    use super::*;

    fn middleware(pairs: &[(&str, &str)]) -> NativeMiddleware<HashMap<String, String>> {
        NativeMiddleware::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();

        assert_eq!(config, AppConfig::default());
        assert_eq!(config.databroker.service, "vehicledatabroker");
        assert_eq!(config.databroker.protocol, BrokerProtocol::V1);
        assert_eq!(config.supervisor.connect_timeout(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_parse_full_config() {
        let config = AppConfig::from_toml(
            r#"
            [databroker]
            address = "grpcs://broker.local:55556"
            protocol = "model"

            [databroker.tls]
            ca_certificate = "/etc/sdv/ca.pem"

            [vehicle_service]
            service = "doorservice"

            [supervisor]
            connect_timeout_ms = 0

            [logging]
            filter = "sdv_broker=trace"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.databroker.service, "vehicledatabroker");
        assert_eq!(config.databroker.protocol, BrokerProtocol::Model);
        assert!(matches!(config.databroker.credentials(), ChannelCredentials::Tls(_)));
        assert_eq!(config.vehicle_service.service, "doorservice");
        assert_eq!(config.supervisor.connect_timeout(), None);
        assert!(config.logging.json);
    }

    #[test]
    fn test_partial_section_keeps_service_names() {
        let config = AppConfig::from_toml("[databroker]\nprotocol = \"v2\"").unwrap();

        assert_eq!(config.databroker.service, "vehicledatabroker");
        assert_eq!(config.databroker.protocol, BrokerProtocol::V2);
        assert_eq!(config.vehicle_service.service, "vehicleservice");

        let config = AppConfig::from_toml("[vehicle_service]\naddress = \"door:50051\"").unwrap();
        assert_eq!(config.vehicle_service.service, "vehicleservice");
        assert_eq!(config.databroker, DataBrokerConfig::default());
    }

    #[test]
    fn test_partial_section_resolves_through_middleware() {
        let config = AppConfig::from_toml("[databroker]\nprotocol = \"model\"").unwrap();

        let endpoint = config.databroker.resolve(&middleware(&[])).unwrap();

        assert_eq!(endpoint.address.as_str(), "localhost:55555");
    }

    #[test]
    fn test_protocol_only_valid_for_databroker() {
        let err = AppConfig::from_toml("[vehicle_service]\nprotocol = \"v2\"").unwrap_err();
        assert!(err.to_string().contains("protocol"), "got {err}");
    }

    #[test]
    fn test_unknown_protocol_is_rejected() {
        assert!(AppConfig::from_toml("[databroker]\nprotocol = \"v9\"").is_err());
    }

    #[test]
    fn test_explicit_address_wins() {
        let config = AppConfig::from_toml("[databroker]\naddress = \"grpc://10.0.0.2:4242/x\"").unwrap();
        let mw = middleware(&[("SDV_VEHICLEDATABROKER_ADDRESS", "elsewhere:1")]);

        let endpoint = config.databroker.resolve(&mw).unwrap();

        assert_eq!(endpoint.address.as_str(), "10.0.0.2:4242");
        assert_eq!(endpoint.credentials, ChannelCredentials::Insecure);
    }

    #[test]
    fn test_missing_address_uses_middleware() {
        let config = AppConfig::default();
        let mw = middleware(&[("SDV_VEHICLESERVICE_ADDRESS", "door-host:50051")]);

        assert_eq!(
            config.databroker.resolve(&mw).unwrap().address.as_str(),
            "localhost:55555"
        );
        assert_eq!(
            config.vehicle_service.resolve(&mw).unwrap().address.as_str(),
            "door-host:50051"
        );
    }

    #[test]
    fn test_unresolvable_service() {
        let config = AppConfig::default();

        let err = config.vehicle_service.resolve(&middleware(&[])).unwrap_err();

        assert!(matches!(
            err,
            AppError::Middleware(MiddlewareError::ServiceNotConfigured { .. })
        ));
    }

    #[test]
    fn test_empty_address_is_invalid() {
        let config = AppConfig::from_toml("[databroker]\naddress = \"grpc://\"").unwrap();

        let err = config.databroker.resolve(&middleware(&[])).unwrap_err();

        assert!(matches!(err, AppError::InvalidAddress { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[supervisor]\nconnect_timeout_ms = 250").unwrap();

        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.supervisor.connect_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/vehicle-app.toml").unwrap_err();
        assert!(matches!(err, AppError::ConfigRead { .. }));
    }
}
