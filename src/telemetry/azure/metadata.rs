use tonic::metadata::{MetadataMap, MetadataValue};

use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;

/// gRPC metadata key carrying the instrumentation key to the collector.
pub const INSTRUMENTATION_KEY_HEADER: &str = "instrumentation-key";

/// Per-request metadata binding every export to one Application Insights
/// resource.
pub struct ExportMetadata {
    pub metadata: MetadataMap,
}

impl ExportMetadata {
    pub fn from_connection(connection: &ConnectionString) -> Result<Self, TelemetryError> {
        let mut metadata = MetadataMap::new();

        metadata.insert(
            INSTRUMENTATION_KEY_HEADER,
            MetadataValue::try_from(connection.instrumentation_key()).map_err(|e| {
                TelemetryError::Config(format!("Invalid instrumentation key: {}", e))
            })?,
        );

        Ok(Self { metadata })
    }
}
