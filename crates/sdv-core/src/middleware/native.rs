//! Native middleware: environment variables with static defaults

use tracing::{debug, error, warn};

use super::environment::{Environment, ProcessEnvironment};
use super::Middleware;
use crate::address::ServiceAddress;
use crate::error::{MiddlewareError, MiddlewareResult};

/// Type identifier of [`NativeMiddleware`]
pub const NATIVE_TYPE_ID: &str = "native";

/// Fallback locations for well-known services, keyed by lower-case name
pub const DEFAULT_LOCATIONS: &[(&str, &str)] = &[
    ("mqtt", "localhost:1883"),
    ("vehicledatabroker", "localhost:55555"),
];

/// Name of the environment variable configuring `service_name`
pub fn service_env_var_name(service_name: &str) -> String {
    format!("SDV_{}_ADDRESS", service_name.to_uppercase())
}

/// Look up the default location of `service_name` (case-insensitive)
pub fn default_location(service_name: &str, defaults: &[(&str, &str)]) -> Option<ServiceAddress> {
    let key = service_name.to_lowercase();
    defaults
        .iter()
        .find(|(name, _)| *name == key)
        .and_then(|(_, location)| ServiceAddress::parse(location))
}

/// Resolve the network location of `service_name`.
///
/// The environment variable from [`service_env_var_name`] wins if it parses
/// to a non-empty network location. Otherwise the defaults table is
/// consulted (with a warning). If both come up empty the service is not
/// configured.
pub fn resolve_service_location<E>(
    service_name: &str,
    env: &E,
    defaults: &[(&str, &str)],
) -> MiddlewareResult<ServiceAddress>
where
    E: Environment + ?Sized,
{
    let env_var = service_env_var_name(service_name);

    if let Some(address) = env
        .var(&env_var)
        .and_then(|value| ServiceAddress::parse(&value))
    {
        debug!(service = %service_name, %address, "Service location taken from {}", env_var);
        return Ok(address);
    }

    if let Some(address) = default_location(service_name, defaults) {
        warn!(
            service = %service_name,
            %address,
            "Env variable '{}' defining location of service '{}' not properly set. Taking default: '{}'",
            env_var,
            service_name,
            address
        );
        return Ok(address);
    }

    let err = MiddlewareError::ServiceNotConfigured {
        service: service_name.to_string(),
        env_var,
    };
    error!(service = %service_name, "{}", err);
    Err(err)
}

/// Middleware resolving services from the environment
#[derive(Debug, Clone)]
pub struct NativeMiddleware<E = ProcessEnvironment> {
    env: E,
    defaults: &'static [(&'static str, &'static str)],
}

impl NativeMiddleware<ProcessEnvironment> {
    /// Native middleware backed by the process environment
    pub fn from_process_env() -> Self {
        Self::new(ProcessEnvironment)
    }
}

impl<E: Environment> NativeMiddleware<E> {
    pub fn new(env: E) -> Self {
        Self {
            env,
            defaults: DEFAULT_LOCATIONS,
        }
    }

    /// Replace the defaults table
    pub fn with_defaults(mut self, defaults: &'static [(&'static str, &'static str)]) -> Self {
        self.defaults = defaults;
        self
    }
}

impl<E> Middleware for NativeMiddleware<E>
where
    E: Environment + Send + Sync,
{
    fn type_id(&self) -> &str {
        NATIVE_TYPE_ID
    }

    fn find_service_location(&self, service_name: &str) -> MiddlewareResult<ServiceAddress> {
        resolve_service_location(service_name, &self.env, self.defaults)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a scoped subscriber; returns its result and the log lines
    fn with_captured_log<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);

        let output = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        (result, output.lines().map(str::to_string).collect())
    }

    fn count(lines: &[String], level: &str) -> usize {
        lines.iter().filter(|line| line.contains(level)).count()
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(service_env_var_name("vehicledatabroker"), "SDV_VEHICLEDATABROKER_ADDRESS");
        assert_eq!(service_env_var_name("Mqtt"), "SDV_MQTT_ADDRESS");
    }

    #[test]
    fn test_env_override_wins() {
        let env = env(&[("SDV_SOMESERVICE_ADDRESS", "some-host:1")]);
        let address = resolve_service_location("someservice", &env, DEFAULT_LOCATIONS).unwrap();
        assert_eq!(address.as_str(), "some-host:1");
    }

    #[test]
    fn test_env_override_is_parsed() {
        let env = env(&[("SDV_MQTT_ADDRESS", "mqtt://broker.local:8883/topic")]);
        let address = resolve_service_location("mqtt", &env, DEFAULT_LOCATIONS).unwrap();
        assert_eq!(address.as_str(), "broker.local:8883");
    }

    #[test]
    fn test_defaults_are_case_insensitive() {
        let env = env(&[]);
        let upper = resolve_service_location("MQTT", &env, DEFAULT_LOCATIONS).unwrap();
        let lower = resolve_service_location("mqtt", &env, DEFAULT_LOCATIONS).unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "localhost:1883");

        let broker = resolve_service_location("VehicleDataBroker", &env, DEFAULT_LOCATIONS).unwrap();
        assert_eq!(broker.as_str(), "localhost:55555");
    }

    #[test]
    fn test_empty_env_var_falls_back_to_default() {
        let env = env(&[("SDV_VEHICLEDATABROKER_ADDRESS", "")]);
        let address = resolve_service_location("vehicledatabroker", &env, DEFAULT_LOCATIONS).unwrap();
        assert_eq!(address.as_str(), "localhost:55555");
    }

    #[test]
    fn test_unknown_service_is_not_configured() {
        let env = env(&[]);
        let err = resolve_service_location("someservice", &env, DEFAULT_LOCATIONS).unwrap_err();
        assert_eq!(
            err,
            MiddlewareError::ServiceNotConfigured {
                service: "someservice".to_string(),
                env_var: "SDV_SOMESERVICE_ADDRESS".to_string(),
            }
        );
    }

    #[test]
    fn test_default_fallback_logs_warning() {
        let env = env(&[]);

        let (result, lines) =
            with_captured_log(|| resolve_service_location("mqtt", &env, DEFAULT_LOCATIONS));

        assert_eq!(result.unwrap().as_str(), "localhost:1883");
        assert_eq!(count(&lines, "WARN"), 1, "{lines:?}");
        assert_eq!(count(&lines, "ERROR"), 0, "{lines:?}");
        assert!(lines.iter().any(|line| line.contains("SDV_MQTT_ADDRESS")));
    }

    #[test]
    fn test_unconfigured_service_logs_error() {
        let env = env(&[]);

        let (result, lines) =
            with_captured_log(|| resolve_service_location("someservice", &env, DEFAULT_LOCATIONS));

        assert!(result.is_err());
        assert_eq!(count(&lines, "ERROR"), 1, "{lines:?}");
        assert_eq!(count(&lines, "WARN"), 0, "{lines:?}");
    }

    #[test]
    fn test_env_override_logs_no_warning() {
        let env = env(&[("SDV_MQTT_ADDRESS", "broker:1883")]);

        let (result, lines) =
            with_captured_log(|| resolve_service_location("mqtt", &env, DEFAULT_LOCATIONS));

        assert!(result.is_ok());
        assert_eq!(count(&lines, "WARN"), 0, "{lines:?}");
        assert_eq!(count(&lines, "ERROR"), 0, "{lines:?}");
    }

    #[test]
    fn test_custom_defaults_table() {
        static DEFAULTS: &[(&str, &str)] = &[("vehicleservice", "grpc://10.0.2.2:12345")];
        let middleware = NativeMiddleware::new(env(&[])).with_defaults(DEFAULTS);
        let address = middleware.find_service_location("VEHICLESERVICE").unwrap();
        assert_eq!(address.as_str(), "10.0.2.2:12345");
        assert!(middleware.find_service_location("mqtt").is_err());
    }

    #[test]
    #[serial]
    fn test_process_environment_override() {
        std::env::set_var("SDV_SOMESERVICE_ADDRESS", "some-host:1");
        let middleware = NativeMiddleware::from_process_env();
        let result = middleware.find_service_location("someservice");
        std::env::remove_var("SDV_SOMESERVICE_ADDRESS");

        assert_eq!(result.unwrap().as_str(), "some-host:1");
    }

    #[test]
    #[serial]
    fn test_process_environment_unset() {
        std::env::remove_var("SDV_SOMESERVICE_ADDRESS");
        let middleware = NativeMiddleware::from_process_env();
        assert!(matches!(
            middleware.find_service_location("someservice"),
            Err(MiddlewareError::ServiceNotConfigured { .. })
        ));
    }
}
