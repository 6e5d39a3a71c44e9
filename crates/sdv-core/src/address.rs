//! Resolved service addresses

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::location::LocationResult;
use crate::transport::TransportError;

/// A resolved `host:port` network location. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceAddress(String);

impl ServiceAddress {
    /// Build an address from the network location of a parsed location.
    ///
    /// Returns `None` when the network location is empty.
    pub fn from_location(location: &LocationResult) -> Option<Self> {
        let network_location = location.network_location();
        if network_location.is_empty() {
            None
        } else {
            Some(Self(network_location.to_string()))
        }
    }

    /// Parse a location string (`"grpc://host:1234/x"`, `"host:1234"`, ...)
    /// and keep its network location.
    pub fn parse(input: &str) -> Option<Self> {
        Self::from_location(&LocationResult::parse(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into host and port, as needed to open a channel.
    ///
    /// User info (`user:pw@`) is dropped and IPv6 brackets are removed.
    pub fn host_port(&self) -> Result<(&str, u16), TransportError> {
        let host_port = self.0.rsplit('@').next().unwrap_or(&self.0);
        let (host, port) = host_port
            .rsplit_once(':')
            .ok_or_else(|| TransportError::InvalidAddress(format!("missing port in '{}'", self)))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(TransportError::InvalidAddress(format!(
                "missing host in '{}'",
                self
            )));
        }

        let port = port.parse::<u16>().map_err(|e| {
            TransportError::InvalidAddress(format!("invalid port in '{}': {}", self, e))
        })?;

        Ok((host, port))
    }
}

impl fmt::Display for ServiceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ServiceAddress {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("'{}' has no network location", value))
    }
}

impl From<ServiceAddress> for String {
    fn from(address: ServiceAddress) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_network_location() {
        let address = ServiceAddress::parse("grpc://broker:55555/kuksa").unwrap();
        assert_eq!(address.as_str(), "broker:55555");
        assert!(ServiceAddress::parse("").is_none());
        assert!(ServiceAddress::parse("http:///path").is_none());
    }

    #[test]
    fn test_host_port() {
        let address = ServiceAddress::parse("localhost:55555").unwrap();
        assert_eq!(address.host_port().unwrap(), ("localhost", 55555));

        let address = ServiceAddress::parse("mqtt://user:pw@broker:1883").unwrap();
        assert_eq!(address.host_port().unwrap(), ("broker", 1883));

        let address = ServiceAddress::parse("[::1]:8443").unwrap();
        assert_eq!(address.host_port().unwrap(), ("::1", 8443));
    }

    #[test]
    fn test_host_port_rejects_bad_addresses() {
        for input in ["localhost", ":1234", "host:http", "host:70000"] {
            let address = ServiceAddress::parse(input).unwrap();
            assert!(
                matches!(address.host_port(), Err(TransportError::InvalidAddress(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_deserialize_normalizes() {
        let address: ServiceAddress = serde_json::from_str("\"http://host:1/p\"").unwrap();
        assert_eq!(address.as_str(), "host:1");
        assert!(serde_json::from_str::<ServiceAddress>("\"\"").is_err());
    }
}
