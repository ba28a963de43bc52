use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Configuration error: missing credential (set APPLICATION_INSIGHTS_CONNECTION_STRING or pass a connection string)")]
    MissingCredential,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Exporter error: {0}")]
    Exporter(String),
    #[error("Initialization error: {0}")]
    Init(String),
    #[error("Shutdown error: {0}")]
    Shutdown(String),
}

impl TelemetryError {
    /// True for errors raised while resolving configuration, before any
    /// pipeline or handler was created.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::Config(_))
    }
}

impl From<opentelemetry_otlp::ExporterBuildError> for TelemetryError {
    fn from(err: opentelemetry_otlp::ExporterBuildError) -> Self {
        Self::Exporter(err.to_string())
    }
}
