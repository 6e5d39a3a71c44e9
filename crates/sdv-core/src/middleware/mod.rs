//! Middleware abstraction for service discovery
//!
//! A middleware knows how to find the network location of a named service.
//! The only implementation shipped today is [`NativeMiddleware`], which reads
//! `SDV_<SERVICE>_ADDRESS` environment variables and falls back to a static
//! table of well-known defaults.

mod environment;
mod native;

pub use environment::{Environment, ProcessEnvironment};
pub use native::{
    default_location, resolve_service_location, service_env_var_name, NativeMiddleware,
    DEFAULT_LOCATIONS, NATIVE_TYPE_ID,
};

use crate::address::ServiceAddress;
use crate::error::{MiddlewareError, MiddlewareResult};

/// Environment variable selecting the middleware implementation
pub const MIDDLEWARE_TYPE_ENV_VAR: &str = "SDV_MIDDLEWARE_TYPE";

/// Service discovery and lifecycle hooks of the hosting middleware
pub trait Middleware: Send + Sync {
    /// Type identifier of the concrete middleware (e.g. `"native"`)
    fn type_id(&self) -> &str;

    /// Triggers the start of the middleware.
    fn start(&self) {}

    /// Blocks until the middleware is started and ready to use.
    fn wait_until_ready(&self) {}

    /// Stops the middleware.
    fn stop(&self) {}

    /// Get the network location of `service_name`.
    ///
    /// Fails with [`MiddlewareError::ServiceNotConfigured`] if the location
    /// cannot be determined.
    fn find_service_location(&self, service_name: &str) -> MiddlewareResult<ServiceAddress>;
}

/// Create the middleware selected by `SDV_MIDDLEWARE_TYPE`.
///
/// An unset or empty variable selects the native middleware.
pub fn create_middleware<E>(env: E) -> MiddlewareResult<Box<dyn Middleware>>
where
    E: Environment + Send + Sync + 'static,
{
    let middleware_type = env
        .var(MIDDLEWARE_TYPE_ENV_VAR)
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match middleware_type.as_str() {
        "" | NATIVE_TYPE_ID => Ok(Box::new(NativeMiddleware::new(env))),
        other => Err(MiddlewareError::UnknownMiddleware(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_middleware_is_native() {
        let middleware = create_middleware(env(&[])).unwrap();
        assert_eq!(middleware.type_id(), "native");
    }

    #[test]
    fn test_middleware_type_is_trimmed_and_case_insensitive() {
        let middleware = create_middleware(env(&[(MIDDLEWARE_TYPE_ENV_VAR, "  NATIVE ")])).unwrap();
        assert_eq!(middleware.type_id(), "native");
    }

    #[test]
    fn test_unknown_middleware_type() {
        let result = create_middleware(env(&[(MIDDLEWARE_TYPE_ENV_VAR, "dapr")]));
        match result {
            Err(MiddlewareError::UnknownMiddleware(kind)) => assert_eq!(kind, "dapr"),
            Err(other) => panic!("Expected UnknownMiddleware, got {:?}", other),
            Ok(_) => panic!("Expected UnknownMiddleware, got a middleware"),
        }
    }
}
