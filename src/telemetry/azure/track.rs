use opentelemetry_application_insights::Exporter;
use reqwest::blocking::Client;
use tracing::debug;

use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;

/// Application Insights exporter posting to the `v2.1/track` ingestion API.
pub type TrackExporter = Exporter<Client>;

/// Connection string in the `key=value` form the exporter parses; bare
/// instrumentation keys are expanded with the resolved ingestion endpoint.
pub fn normalized_connection_string(connection: &ConnectionString) -> String {
    format!(
        "InstrumentationKey={};IngestionEndpoint={}",
        connection.instrumentation_key(),
        connection.ingestion_endpoint()
    )
}

/// Build the exporter shared by the log, span and metric pipelines.
pub fn build_track_exporter(connection: &ConnectionString) -> Result<TrackExporter, TelemetryError> {
    let client = build_http_client()?;
    let exporter =
        Exporter::new_from_connection_string(normalized_connection_string(connection), client)
            .map_err(|e| TelemetryError::Config(format!("Invalid connection string: {}", e)))?;

    debug!(endpoint = %connection.ingestion_endpoint(), "track exporter built");
    Ok(exporter)
}

// The blocking client panics when created on a thread that is inside an
// async runtime, so it is always created on a fresh thread.
fn build_http_client() -> Result<Client, TelemetryError> {
    std::thread::spawn(|| Client::builder().build())
        .join()
        .map_err(|_| TelemetryError::Init("HTTP client setup panicked".to_string()))?
        .map_err(|e| TelemetryError::Exporter(format!("HTTP client: {}", e)))
}
