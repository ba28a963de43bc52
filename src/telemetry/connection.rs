use std::env;
use std::fmt;

use crate::telemetry::error::TelemetryError;

/// Environment variable holding the Application Insights connection string.
pub const CONNECTION_STRING_ENV: &str = "APPLICATION_INSIGHTS_CONNECTION_STRING";

/// Ingestion endpoint used when the connection string names none.
pub const DEFAULT_INGESTION_ENDPOINT: &str = "https://dc.services.visualstudio.com";

/// Parsed Application Insights connection string.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    instrumentation_key: String,
    ingestion_endpoint: String,
}

impl ConnectionString {
    /// Parse a `Key=Value;Key=Value` connection string.
    ///
    /// Keys are case-insensitive and empty segments are skipped. A value
    /// without any `=` is accepted as a bare instrumentation key.
    pub fn parse(raw: &str) -> Result<Self, TelemetryError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TelemetryError::MissingCredential);
        }

        if !raw.contains('=') {
            return Ok(Self {
                instrumentation_key: raw.to_string(),
                ingestion_endpoint: DEFAULT_INGESTION_ENDPOINT.to_string(),
            });
        }

        let mut instrumentation_key = None;
        let mut ingestion_endpoint = None;
        let mut endpoint_suffix = None;
        let mut location = None;

        for segment in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                TelemetryError::Config(format!("malformed connection string segment `{}`", segment))
            })?;
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.trim().to_ascii_lowercase().as_str() {
                "instrumentationkey" => instrumentation_key = Some(value.to_string()),
                "ingestionendpoint" => ingestion_endpoint = Some(trim_endpoint(value)),
                "endpointsuffix" => endpoint_suffix = Some(value.trim_matches('.').to_string()),
                "location" => location = Some(value.trim_matches('.').to_string()),
                _ => {}
            }
        }

        let instrumentation_key = instrumentation_key.ok_or_else(|| {
            TelemetryError::Config("connection string has no InstrumentationKey".to_string())
        })?;

        let ingestion_endpoint = ingestion_endpoint.unwrap_or_else(|| {
            suffixed_endpoint("dc", location.as_deref(), endpoint_suffix.as_deref())
                .unwrap_or_else(|| DEFAULT_INGESTION_ENDPOINT.to_string())
        });

        Ok(Self {
            instrumentation_key,
            ingestion_endpoint,
        })
    }

    /// Resolve the credential: environment first, then the explicit value.
    ///
    /// Empty values count as absent.
    pub fn resolve(explicit: Option<&str>) -> Result<Self, TelemetryError> {
        Self::resolve_from(env::var(CONNECTION_STRING_ENV).ok().as_deref(), explicit)
    }

    pub(crate) fn resolve_from(
        from_env: Option<&str>,
        explicit: Option<&str>,
    ) -> Result<Self, TelemetryError> {
        let raw = from_env
            .filter(|v| !v.trim().is_empty())
            .or(explicit.filter(|v| !v.trim().is_empty()))
            .ok_or(TelemetryError::MissingCredential)?;
        Self::parse(raw)
    }

    pub fn instrumentation_key(&self) -> &str {
        &self.instrumentation_key
    }

    pub fn ingestion_endpoint(&self) -> &str {
        &self.ingestion_endpoint
    }
}

// Keeps the instrumentation key out of logs.
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("instrumentation_key", &"<redacted>")
            .field("ingestion_endpoint", &self.ingestion_endpoint)
            .finish()
    }
}

fn trim_endpoint(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

fn suffixed_endpoint(prefix: &str, location: Option<&str>, suffix: Option<&str>) -> Option<String> {
    let suffix = suffix?;
    Some(match location {
        Some(location) => format!("https://{}.{}.{}", location, prefix, suffix),
        None => format!("https://{}.{}", prefix, suffix),
    })
}
