//! Service discovery errors

use thiserror::Error;

/// Result type for middleware operations
pub type MiddlewareResult<T> = Result<T, MiddlewareError>;

/// Errors raised while locating services
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MiddlewareError {
    /// Neither the environment nor the defaults table knows the service
    #[error("Env variable '{env_var}' defining location of service '{service}' not set. Please define!")]
    ServiceNotConfigured {
        /// Requested service name, as given by the caller
        service: String,
        /// Environment variable that would have configured it
        env_var: String,
    },

    /// `SDV_MIDDLEWARE_TYPE` names a middleware this build does not provide
    #[error("Unknown middleware type '{0}'")]
    UnknownMiddleware(String),
}
