use opentelemetry_otlp::{LogExporter, MetricExporter, SpanExporter, WithExportConfig, WithTonicConfig};
use tonic::metadata::MetadataMap;
use tonic::transport::ClientTlsConfig;
use tracing::debug;

use crate::telemetry::azure::metadata::ExportMetadata;
use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;

/// Where and how the OTLP exporters ship data: an OTLP collector (for
/// example an Azure Monitor OpenTelemetry collector) tagged with the
/// instrumentation key.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub endpoint: String,
    pub metadata: MetadataMap,
}

impl ExportTarget {
    pub fn new(endpoint: &str, connection: &ConnectionString) -> Result<Self, TelemetryError> {
        Ok(Self {
            endpoint: endpoint.to_string(),
            metadata: ExportMetadata::from_connection(connection)?.metadata,
        })
    }

    /// tonic connects lazily but still needs a reactor to register the
    /// channel with.
    pub fn ensure_runtime() -> Result<(), TelemetryError> {
        tokio::runtime::Handle::try_current().map(|_| ()).map_err(|_| {
            TelemetryError::Init(
                "OTLP export requires a Tokio runtime; build the facade inside one".to_string(),
            )
        })
    }

    fn tls_config(&self) -> Option<ClientTlsConfig> {
        self.endpoint
            .starts_with("https://")
            .then(|| ClientTlsConfig::new().with_native_roots())
    }
}

pub fn build_log_exporter(target: &ExportTarget) -> Result<LogExporter, TelemetryError> {
    let mut builder = LogExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.clone())
        .with_metadata(target.metadata.clone());

    if let Some(tls) = target.tls_config() {
        builder = builder.with_tls_config(tls);
    }

    let exporter = builder.build()?;
    debug!(endpoint = %target.endpoint, "log exporter built");
    Ok(exporter)
}

pub fn build_span_exporter(target: &ExportTarget) -> Result<SpanExporter, TelemetryError> {
    let mut builder = SpanExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.clone())
        .with_metadata(target.metadata.clone());

    if let Some(tls) = target.tls_config() {
        builder = builder.with_tls_config(tls);
    }

    let exporter = builder.build()?;
    debug!(endpoint = %target.endpoint, "span exporter built");
    Ok(exporter)
}

pub fn build_metric_exporter(target: &ExportTarget) -> Result<MetricExporter, TelemetryError> {
    let mut builder = MetricExporter::builder()
        .with_tonic()
        .with_endpoint(target.endpoint.clone())
        .with_metadata(target.metadata.clone());

    if let Some(tls) = target.tls_config() {
        builder = builder.with_tls_config(tls);
    }

    let exporter = builder.build()?;
    debug!(endpoint = %target.endpoint, "metric exporter built");
    Ok(exporter)
}
