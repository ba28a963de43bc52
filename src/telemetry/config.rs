use std::env;

use tracing::Level;

/// Console output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// `timestamp - logger - LEVEL - message` lines
    #[default]
    Text,
    /// One JSON object per record
    Json,
}

/// Main telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub service_version: String,
    pub environment: Option<String>,
    /// Explicit connection string; the environment variable still wins.
    pub connection_string: Option<String>,
    /// OTLP/gRPC collector; when set, exports go here instead of the
    /// Application Insights track API.
    pub otlp_endpoint: Option<String>,
    /// Severity floor of the console handler
    pub log_level: Level,
    /// Severity floor of the backend export handler
    pub export_level: Level,
    pub log_format: LogFormat,
}

impl TelemetryConfig {
    /// Create config from environment variables.
    /// The connection string itself is resolved later, at facade construction.
    pub fn from_env() -> Self {
        let log_format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("text") => LogFormat::Text,
            _ => LogFormat::Text,
        };

        Self {
            service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| env!("CARGO_PKG_NAME").to_string()),
            service_version: env::var("OTEL_SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            environment: env::var("DEPLOYMENT_ENVIRONMENT").ok(),
            connection_string: None,
            otlp_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            log_level: env::var("RUST_LOG")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(Level::INFO),
            export_level: Level::INFO,
            log_format,
        }
    }

    /// Create a new config with explicit values
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            environment: None,
            connection_string: None,
            otlp_endpoint: None,
            log_level: Level::INFO,
            export_level: Level::INFO,
            log_format: LogFormat::Text,
        }
    }

    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_export_level(mut self, level: Level) -> Self {
        self.export_level = level;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }
}
