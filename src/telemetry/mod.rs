//! Application Insights telemetry facade.
//!
//! Wires logging, tracing and metrics export to Azure Application Insights
//! on top of OpenTelemetry, behind one small facade.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use app_insights_telemetry::telemetry::{AppInsights, Labels, Properties};
//!
//! // Connection string from APPLICATION_INSIGHTS_CONNECTION_STRING, else the argument
//! let insights = AppInsights::new(None)?;
//!
//! insights.log_info("Application started", Some(&Properties::new().with("version", "1.0.0")));
//!
//! {
//!     let span = insights.create_span("user_authentication");
//!     span.set_attribute("user.id", "user123");
//!     insights.increment_counter(Some(&Labels::from([("operation", "authentication")])));
//! } // span ends here
//!
//! insights.shutdown()?;
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `APPLICATION_INSIGHTS_CONNECTION_STRING` | Connection string | required (or argument) |
//! | `OTEL_SERVICE_NAME` | Service name | `CARGO_PKG_NAME` |
//! | `OTEL_SERVICE_VERSION` | Service version | `CARGO_PKG_VERSION` |
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | Opt-in OTLP/gRPC collector | unset (Application Insights track API) |
//! | `RUST_LOG` | Console severity floor (single level) | `info` |
//! | `LOG_FORMAT` | `text` or `json` | `text` |
//! | `DEPLOYMENT_ENVIRONMENT` | `deployment.environment.name` resource attribute | - |
//!
//! # Module Structure
//!
//! - [`facade`]: [`AppInsights`] and its builder
//! - [`api`]: [`TelemetryProvider`] trait and [`Pipelines`]
//! - [`azure`]: Azure Monitor provider (track API, or OTLP/gRPC when opted in)
//! - [`memory`]: in-memory provider for tests (`testing` feature)
//! - [`logging`]: console and export handlers
//! - [`trace`]: scoped spans

pub mod api;
pub mod azure;
pub mod config;
pub mod connection;
pub mod error;
pub mod facade;
pub mod logging;
pub mod properties;
pub mod resource;
pub mod trace;

#[cfg(any(test, feature = "testing"))]
pub mod memory;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports
pub use api::{Pipelines, TelemetryProvider};
pub use azure::AzureMonitorProvider;
pub use config::{LogFormat, TelemetryConfig};
pub use connection::{ConnectionString, CONNECTION_STRING_ENV};
pub use error::TelemetryError;
pub use facade::{AppInsights, AppInsightsBuilder, LogLevel, PROCESSING_TIME_HISTOGRAM, REQUEST_COUNTER};
pub use logging::{Handler, HandlerKind};
pub use properties::{Labels, Properties, PropertyValue};
pub use trace::ScopedSpan;

#[cfg(any(test, feature = "testing"))]
pub use memory::InMemoryProvider;
