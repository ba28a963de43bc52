use std::borrow::Cow;
use std::fmt;

use opentelemetry::metrics::{Counter, Histogram, MeterProvider};
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::trace::SdkTracer;
use tracing::{Dispatch, Level};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::telemetry::api::{Pipelines, TelemetryProvider};
use crate::telemetry::azure::AzureMonitorProvider;
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::logging::{build_sink, Handler, LOGGER_NAME};
use crate::telemetry::properties::{Labels, Properties};
use crate::telemetry::trace::{ScopedSpan, INSTRUMENTATION_NAME};

/// Name of the request counter.
pub const REQUEST_COUNTER: &str = "custom_requests_total";

/// Name of the processing time histogram.
pub const PROCESSING_TIME_HISTOGRAM: &str = "processing_time_seconds";

/// Severity accepted by [`AppInsights::log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Logging, tracing and metrics facade over one Application Insights
/// resource.
///
/// Construction resolves the connection string and registers every
/// pipeline, or fails without registering anything.
pub struct AppInsights {
    connection: ConnectionString,
    pipelines: Pipelines,
    dispatch: Dispatch,
    handlers: Vec<Handler>,
    tracer: SdkTracer,
    request_counter: Counter<u64>,
    processing_time: Histogram<f64>,
}

impl AppInsights {
    /// Build from the environment with the Azure Monitor backend.
    ///
    /// `APPLICATION_INSIGHTS_CONNECTION_STRING` takes precedence over
    /// `connection_string`.
    pub fn new(connection_string: Option<&str>) -> Result<Self, TelemetryError> {
        let mut config = TelemetryConfig::from_env();
        if let Some(connection_string) = connection_string {
            config = config.with_connection_string(connection_string);
        }
        Self::builder(config).build(&AzureMonitorProvider)
    }

    pub fn builder(config: TelemetryConfig) -> AppInsightsBuilder {
        AppInsightsBuilder {
            config,
            console_writer: None,
        }
    }

    /// Emit `message` at `level`, with `properties` as structured context.
    pub fn log(&self, level: LogLevel, message: &str, properties: Option<&Properties>) {
        let properties = properties.filter(|p| !p.is_empty()).map(Properties::to_json);
        let properties = properties.as_deref();

        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Debug => {
                tracing::debug!(target: LOGGER_NAME, properties, "{}", message)
            }
            LogLevel::Info => {
                tracing::info!(target: LOGGER_NAME, properties, "{}", message)
            }
            LogLevel::Warning => {
                tracing::warn!(target: LOGGER_NAME, properties, "{}", message)
            }
            LogLevel::Error => {
                tracing::error!(target: LOGGER_NAME, properties, "{}", message)
            }
        });
    }

    pub fn log_info(&self, message: &str, properties: Option<&Properties>) {
        self.log(LogLevel::Info, message, properties);
    }

    pub fn log_warning(&self, message: &str, properties: Option<&Properties>) {
        self.log(LogLevel::Warning, message, properties);
    }

    pub fn log_error(&self, message: &str, properties: Option<&Properties>) {
        self.log(LogLevel::Error, message, properties);
    }

    /// Start a span that stays active until the returned guard drops.
    pub fn create_span(&self, name: impl Into<Cow<'static, str>>) -> ScopedSpan {
        ScopedSpan::start(&self.tracer, name)
    }

    /// Run `f` inside a span named `name`.
    pub fn in_span<T>(&self, name: impl Into<Cow<'static, str>>, f: impl FnOnce(&ScopedSpan) -> T) -> T {
        let span = self.create_span(name);
        f(&span)
    }

    pub fn increment_counter(&self, labels: Option<&Labels>) {
        let attributes = labels.map(Labels::to_key_values).unwrap_or_default();
        self.request_counter.add(1, &attributes);
    }

    /// Record one processing time observation. The value is passed through
    /// as is.
    pub fn record_processing_time(&self, duration_seconds: f64, labels: Option<&Labels>) {
        let attributes = labels.map(Labels::to_key_values).unwrap_or_default();
        self.processing_time.record(duration_seconds, &attributes);
    }

    /// Run `f` with this facade's log sink as the thread's default, so plain
    /// `tracing` macros reach both handlers.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Make this facade's sink the process-wide `tracing` dispatcher and its
    /// providers the OpenTelemetry globals. Fails if a global dispatcher is
    /// already set.
    pub fn install_global(&self) -> Result<(), TelemetryError> {
        tracing::dispatcher::set_global_default(self.dispatch.clone())
            .map_err(|e| TelemetryError::Init(e.to_string()))?;
        opentelemetry::global::set_tracer_provider(self.pipelines.tracer_provider.clone());
        opentelemetry::global::set_meter_provider(self.pipelines.meter_provider.clone());
        Ok(())
    }

    pub fn handlers(&self) -> &[Handler] {
        &self.handlers
    }

    pub fn connection(&self) -> &ConnectionString {
        &self.connection
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Export everything buffered so far.
    pub fn flush(&self) -> Result<(), TelemetryError> {
        self.pipelines.force_flush()
    }

    /// Flush and stop every pipeline. Records emitted afterwards are dropped.
    pub fn shutdown(&self) -> Result<(), TelemetryError> {
        self.pipelines.shutdown()
    }
}

impl fmt::Debug for AppInsights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppInsights")
            .field("connection", &self.connection)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

pub struct AppInsightsBuilder {
    config: TelemetryConfig,
    console_writer: Option<BoxMakeWriter>,
}

impl AppInsightsBuilder {
    /// Replace stdout as the console handler's destination.
    pub fn console_writer(mut self, writer: BoxMakeWriter) -> Self {
        self.console_writer = Some(writer);
        self
    }

    pub fn build<P: TelemetryProvider>(self, provider: &P) -> Result<AppInsights, TelemetryError> {
        let connection = ConnectionString::resolve(self.config.connection_string.as_deref())?;
        let pipelines = provider.build_pipelines(&self.config, &connection)?;

        let sink = build_sink(
            &self.config,
            &pipelines,
            self.console_writer
                .unwrap_or_else(|| BoxMakeWriter::new(std::io::stdout)),
        );

        let tracer = pipelines.tracer_provider.tracer(INSTRUMENTATION_NAME);

        let meter = pipelines.meter_provider.meter(INSTRUMENTATION_NAME);
        let request_counter = meter
            .u64_counter(REQUEST_COUNTER)
            .with_description("Total number of custom requests")
            .build();
        let processing_time = meter
            .f64_histogram(PROCESSING_TIME_HISTOGRAM)
            .with_description("Time spent processing requests")
            .with_unit("s")
            .build();

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::debug!(
                target: LOGGER_NAME,
                connection = ?connection,
                "telemetry pipelines registered"
            );
        });

        Ok(AppInsights {
            connection,
            pipelines,
            dispatch: sink.dispatch,
            handlers: sink.handlers,
            tracer,
            request_counter,
            processing_time,
        })
    }
}
