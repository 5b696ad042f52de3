use serde::{Deserialize, Serialize};

/// User agent attached to every registry request.
pub const DEFAULT_USER_AGENT: &str = "obom";

/// Registry transport configuration, handed to the publisher at construction.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Value of the `User-Agent` header on outbound requests
    pub user_agent: &'static str,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT,
        }
    }
}

impl RegistryConfig {
    /// Whether `registry` should be reached over plain HTTP.
    ///
    /// Only `localhost` and `localhost:<port>` qualify; every other host uses TLS.
    pub fn is_plain_http(&self, registry: &str) -> bool {
        registry == "localhost" || registry.starts_with("localhost:")
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Warn
    }
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_user_agent() {
        assert_eq!(RegistryConfig::default().user_agent, "obom");
    }

    #[test]
    fn test_plain_http_localhost() {
        let config = RegistryConfig::default();
        assert!(config.is_plain_http("localhost"));
        assert!(config.is_plain_http("localhost:5000"));
    }

    #[test]
    fn test_tls_for_other_hosts() {
        let config = RegistryConfig::default();
        assert!(!config.is_plain_http("ghcr.io"));
        assert!(!config.is_plain_http("localhost.example.com"));
        assert!(!config.is_plain_http("127.0.0.1:5000"));
    }

    #[test]
    fn test_log_level_into_tracing() {
        assert_eq!(tracing::Level::from(LogLevel::Debug), tracing::Level::DEBUG);
        assert_eq!(LogLevel::default().as_filter(), "warn");
    }
}
