pub mod telemetry;

pub use telemetry::{AppInsights, Labels, LogLevel, Properties, TelemetryConfig, TelemetryError};
