use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;

/// The three SDK providers a facade owns.
///
/// Built per facade rather than taken from the OpenTelemetry globals, so
/// several facades can live in one process without sharing state.
#[derive(Debug, Clone)]
pub struct Pipelines {
    pub logger_provider: SdkLoggerProvider,
    pub tracer_provider: SdkTracerProvider,
    pub meter_provider: SdkMeterProvider,
}

impl Pipelines {
    /// Export everything buffered so far.
    pub fn force_flush(&self) -> Result<(), TelemetryError> {
        let results = [
            self.logger_provider.force_flush(),
            self.tracer_provider.force_flush(),
            self.meter_provider.force_flush(),
        ];
        first_error(results, TelemetryError::Exporter)
    }

    /// Flush and stop all three providers. Every provider is shut down even
    /// when an earlier one fails; the first failure is returned.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        let results = [
            self.logger_provider.shutdown(),
            self.tracer_provider.shutdown(),
            self.meter_provider.shutdown(),
        ];
        first_error(results, TelemetryError::Shutdown)
    }
}

fn first_error<E: std::fmt::Display>(
    results: [Result<(), E>; 3],
    wrap: fn(String) -> TelemetryError,
) -> Result<(), TelemetryError> {
    results
        .into_iter()
        .find_map(Result::err)
        .map_or(Ok(()), |e| Err(wrap(e.to_string())))
}

/// Trait for telemetry backends (Azure Monitor, in-memory, etc.)
pub trait TelemetryProvider: Send + Sync {
    /// Build the log, trace and metric pipelines bound to `connection`.
    fn build_pipelines(
        &self,
        config: &TelemetryConfig,
        connection: &ConnectionString,
    ) -> Result<Pipelines, TelemetryError>;
}
