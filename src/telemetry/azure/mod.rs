//! Azure Monitor (Application Insights) telemetry provider.
//!
//! By default logs, traces and metrics are posted to the Application
//! Insights ingestion endpoint the connection string names, through its
//! HTTPS `track` API. Setting an OTLP endpoint switches all three signals to
//! OTLP/gRPC against that collector instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use app_insights_telemetry::telemetry::{AppInsights, TelemetryConfig};
//! use app_insights_telemetry::telemetry::azure::AzureMonitorProvider;
//!
//! let config = TelemetryConfig::from_env()
//!     .with_connection_string("InstrumentationKey=...;IngestionEndpoint=https://...");
//! let insights = AppInsights::builder(config).build(&AzureMonitorProvider)?;
//! ```
//!
//! # Environment Variables
//!
//! - `APPLICATION_INSIGHTS_CONNECTION_STRING`: connection string (wins over the argument)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: opt in to OTLP/gRPC export to this collector

mod metadata;
pub mod exporter;
pub mod track;

use opentelemetry::KeyValue;
use opentelemetry_sdk::logs::{LogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{SdkTracerProvider, SpanExporter};
use opentelemetry_sdk::Resource;

use crate::telemetry::api::{Pipelines, TelemetryProvider};
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::resource::build_resource;

pub use exporter::{build_log_exporter, build_metric_exporter, build_span_exporter, ExportTarget};
pub use metadata::INSTRUMENTATION_KEY_HEADER;
pub use track::{build_track_exporter, TrackExporter};

/// Cloud provider value (semconv)
pub const CLOUD_PROVIDER_AZURE: &str = "azure";

/// Azure Monitor telemetry provider.
///
/// Every pipeline uses the SDK's batching processor; buffering, retry and
/// flush timing stay inside the SDK.
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureMonitorProvider;

impl TelemetryProvider for AzureMonitorProvider {
    fn build_pipelines(
        &self,
        config: &TelemetryConfig,
        connection: &ConnectionString,
    ) -> Result<Pipelines, TelemetryError> {
        let resource = build_resource(
            config,
            vec![KeyValue::new(
                opentelemetry_semantic_conventions::resource::CLOUD_PROVIDER,
                CLOUD_PROVIDER_AZURE,
            )],
        );

        match config.otlp_endpoint.as_deref() {
            Some(endpoint) => {
                ExportTarget::ensure_runtime()?;
                let target = ExportTarget::new(endpoint, connection)?;
                Ok(assemble(
                    build_log_exporter(&target)?,
                    build_span_exporter(&target)?,
                    build_metric_exporter(&target)?,
                    resource,
                ))
            }
            None => {
                let exporter = build_track_exporter(connection)?;
                Ok(assemble(exporter.clone(), exporter.clone(), exporter, resource))
            }
        }
    }
}

fn assemble<L, S, M>(logs: L, spans: S, metrics: M, resource: Resource) -> Pipelines
where
    L: LogExporter + 'static,
    S: SpanExporter + 'static,
    M: PushMetricExporter,
{
    let logger_provider = SdkLoggerProvider::builder()
        .with_batch_exporter(logs)
        .with_resource(resource.clone())
        .build();

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(spans)
        .with_resource(resource.clone())
        .build();

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metrics)
        .with_resource(resource)
        .build();

    Pipelines {
        logger_provider,
        tracer_provider,
        meter_provider,
    }
}
