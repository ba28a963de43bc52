use std::fmt;

use opentelemetry::logs::{AnyValue, LogRecord as _, Logger as _, LoggerProvider as _, Severity};
use opentelemetry_sdk::logs::{SdkLogger, SdkLoggerProvider};
use serde_json::{Map, Value};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::telemetry::api::Pipelines;
use crate::telemetry::config::{LogFormat, TelemetryConfig};
use crate::telemetry::trace::build_otel_layer;

/// Target of records emitted through the facade.
pub const LOGGER_NAME: &str = "app_insights";

/// Event field whose JSON object value is flattened into individual fields.
pub const PROPERTIES_FIELD: &str = "properties";

// SDK and transport internals log through `tracing` too; exporting them
// would feed the exporter its own diagnostics.
const INTERNAL_TARGETS: &[&str] = &["opentelemetry", "tonic", "h2", "hyper", "tower"];

/// Kind of handler attached to a facade's log sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Human-readable local output
    Console,
    /// Backend log-record export
    Export,
}

/// A handler registered on the sink, with its severity floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    pub kind: HandlerKind,
    pub level: Level,
}

/// The facade-owned log sink.
pub struct LogSink {
    pub dispatch: Dispatch,
    pub handlers: Vec<Handler>,
}

/// Assemble the sink: export handler first, then console, plus the bridge
/// that turns `tracing` spans into OpenTelemetry spans.
pub fn build_sink(
    config: &TelemetryConfig,
    pipelines: &Pipelines,
    console_writer: BoxMakeWriter,
) -> LogSink {
    let export_layer = LogExportLayer::new(&pipelines.logger_provider)
        .with_filter(LevelFilter::from_level(config.export_level));
    let console_layer = build_console_layer(config.log_format, console_writer)
        .with_filter(LevelFilter::from_level(config.log_level));
    let otel_layer = build_otel_layer(&pipelines.tracer_provider);

    let subscriber = tracing_subscriber::registry()
        .with(otel_layer)
        .with(export_layer)
        .with(console_layer);

    LogSink {
        dispatch: Dispatch::new(subscriber),
        handlers: vec![
            Handler {
                kind: HandlerKind::Export,
                level: config.export_level,
            },
            Handler {
                kind: HandlerKind::Console,
                level: config.log_level,
            },
        ],
    }
}

/// Build the console fmt layer for the configured format
pub fn build_console_layer<S>(
    format: LogFormat,
    writer: BoxMakeWriter,
) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'span> LookupSpan<'span> + Send + Sync + 'static,
{
    match format {
        LogFormat::Text => Box::new(
            tracing_subscriber::fmt::layer()
                .event_format(TextFormat)
                .with_ansi(false)
                .with_writer(writer),
        ),
        LogFormat::Json => Box::new(
            tracing_subscriber::fmt::layer()
                .event_format(JsonFormat)
                .with_ansi(false)
                .with_writer(writer),
        ),
    }
}

fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "ERROR",
        Level::WARN => "WARNING",
        Level::INFO => "INFO",
        Level::DEBUG => "DEBUG",
        Level::TRACE => "TRACE",
    }
}

fn severity(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warn,
        Level::INFO => Severity::Info,
        Level::DEBUG => Severity::Debug,
        Level::TRACE => Severity::Trace,
    }
}

/// Event fields, with the message split off. Flattened properties never
/// replace the message or a field the event recorded itself.
fn collect_fields(event: &Event<'_>) -> (Option<String>, Map<String, Value>) {
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);
    let FieldVisitor {
        mut fields,
        properties,
    } = visitor;

    let message = match fields.remove("message") {
        Some(Value::String(message)) => Some(message),
        Some(other) => Some(other.to_string()),
        None => None,
    };
    for (key, value) in properties {
        fields.entry(key).or_insert(value);
    }
    (message, fields)
}

/// `timestamp - logger - LEVEL - message key=value ...`
struct TextFormat;

impl<S, N> FormatEvent<S, N> for TextFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let (message, fields) = collect_fields(event);

        write!(
            writer,
            "{} - {} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            metadata.target(),
            level_name(metadata.level()),
            message.unwrap_or_default()
        )?;

        for (key, value) in &fields {
            match value {
                Value::String(s) => write!(writer, " {}={}", key, s)?,
                other => write!(writer, " {}={}", key, other)?,
            }
        }

        writeln!(writer)
    }
}

/// One JSON object per record, properties flattened to the root.
struct JsonFormat;

impl<S, N> FormatEvent<S, N> for JsonFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let (message, fields) = collect_fields(event);

        let mut record = Map::new();
        record.insert(
            "timestamp".into(),
            Value::String(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            ),
        );
        record.insert("logger".into(), Value::String(metadata.target().to_string()));
        record.insert(
            "level".into(),
            Value::String(level_name(metadata.level()).to_string()),
        );
        record.insert(
            "message".into(),
            Value::String(message.unwrap_or_default()),
        );

        if let Some(span) = ctx.lookup_current() {
            record.insert("span".into(), Value::String(span.name().to_string()));
        }

        for (key, value) in fields {
            record.entry(key).or_insert(value);
        }

        let line = serde_json::to_string(&record).map_err(|_| fmt::Error)?;
        writeln!(writer, "{}", line)
    }
}

/// Visitor collecting event fields into a JSON map. The properties object
/// is kept apart until the message has been split off.
#[derive(Default)]
struct FieldVisitor {
    fields: Map<String, Value>,
    properties: Map<String, Value>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == PROPERTIES_FIELD {
            if let Ok(Value::Object(properties)) = serde_json::from_str::<Value>(value) {
                self.properties.extend(properties);
                return;
            }
        }
        self.fields
            .insert(field.name().to_string(), Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .insert(field.name().to_string(), Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        let value = serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string()));
        self.fields.insert(field.name().to_string(), value);
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::Bool(value));
    }
}

fn to_any_value(value: Value) -> AnyValue {
    match value {
        Value::String(s) => AnyValue::from(s),
        Value::Bool(b) => AnyValue::from(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AnyValue::from(i),
            None => AnyValue::from(n.as_f64().unwrap_or(f64::NAN)),
        },
        other => AnyValue::from(other.to_string()),
    }
}

/// Layer forwarding `tracing` events to the backend as OpenTelemetry log
/// records. Each event field becomes a typed attribute. Trace context is
/// taken from the active OpenTelemetry span by the SDK.
pub struct LogExportLayer {
    logger: SdkLogger,
}

impl LogExportLayer {
    pub fn new(provider: &SdkLoggerProvider) -> Self {
        Self {
            logger: provider.logger(LOGGER_NAME),
        }
    }
}

impl<S> Layer<S> for LogExportLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if INTERNAL_TARGETS.iter().any(|prefix| target.starts_with(prefix)) {
            return;
        }

        let (message, fields) = collect_fields(event);

        let mut record = self.logger.create_log_record();
        record.set_severity_number(severity(metadata.level()));
        record.set_severity_text(level_name(metadata.level()));
        record.set_target(target.to_string());
        if let Some(message) = message {
            record.set_body(AnyValue::from(message));
        }
        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            record.add_attribute(key, to_any_value(value));
        }

        self.logger.emit(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::api::TelemetryProvider;
    use crate::telemetry::connection::ConnectionString;
    use crate::telemetry::memory::InMemoryProvider;
    use crate::telemetry::test_support::{CapturedOutput, TEST_CONNECTION_STRING};

    fn sink(config: &TelemetryConfig) -> (LogSink, InMemoryProvider, CapturedOutput) {
        let provider = InMemoryProvider::new();
        let connection = ConnectionString::parse(TEST_CONNECTION_STRING).unwrap();
        let pipelines = provider.build_pipelines(config, &connection).unwrap();
        let output = CapturedOutput::default();
        let sink = build_sink(config, &pipelines, BoxMakeWriter::new(output.clone()));
        (sink, provider, output)
    }

    #[test]
    fn sink_registers_export_and_console_handlers_at_info() {
        let (sink, _, _) = sink(&TelemetryConfig::new("svc", "1.0"));

        assert_eq!(
            sink.handlers,
            vec![
                Handler { kind: HandlerKind::Export, level: Level::INFO },
                Handler { kind: HandlerKind::Console, level: Level::INFO },
            ]
        );
    }

    #[test]
    fn text_format_writes_logger_level_and_message() {
        let (sink, _, output) = sink(&TelemetryConfig::new("svc", "1.0"));

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::warn!(target: LOGGER_NAME, batch_id = "batch_001", "minor issues");
        });

        let contents = output.contents();
        assert!(contents.contains(" - app_insights - WARNING - minor issues"));
        assert!(contents.contains("batch_id=batch_001"));
    }

    #[test]
    fn json_format_flattens_properties() {
        let config = TelemetryConfig::new("svc", "1.0").with_log_format(LogFormat::Json);
        let (sink, _, output) = sink(&config);

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::info!(target: LOGGER_NAME, properties = r#"{"version":"1.0.0","count":5}"#, "started");
        });

        let line: Value = serde_json::from_str(output.contents().trim()).unwrap();
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["logger"], "app_insights");
        assert_eq!(line["message"], "started");
        assert_eq!(line["version"], "1.0.0");
        assert_eq!(line["count"], 5);
    }

    #[test]
    fn export_layer_maps_fields_to_typed_attributes() {
        let (sink, provider, _) = sink(&TelemetryConfig::new("svc", "1.0"));

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::error!(target: LOGGER_NAME, retries = 3, ratio = 0.5, fatal = true, "failed");
        });

        let logs = provider.logs();
        assert_eq!(logs.len(), 1);
        let log = &logs[0];
        assert_eq!(log.severity, Some(Severity::Error));
        assert_eq!(log.body.as_deref(), Some("failed"));
        assert_eq!(log.attributes.get("retries"), Some(&AnyValue::from(3_i64)));
        assert_eq!(log.attributes.get("ratio"), Some(&AnyValue::from(0.5)));
        assert_eq!(log.attributes.get("fatal"), Some(&AnyValue::from(true)));
    }

    #[test]
    fn properties_cannot_replace_message_or_event_fields() {
        let config = TelemetryConfig::new("svc", "1.0").with_log_format(LogFormat::Json);
        let (sink, provider, output) = sink(&config);

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::info!(
                target: LOGGER_NAME,
                batch_id = "batch_001",
                properties = r#"{"message":"prop value","batch_id":"other","level":"x"}"#,
                "real message"
            );
        });

        let line: Value = serde_json::from_str(output.contents().trim()).unwrap();
        assert_eq!(line["message"], "real message");
        assert_eq!(line["level"], "INFO");
        assert_eq!(line["batch_id"], "batch_001");

        let logs = provider.logs();
        assert_eq!(logs[0].body.as_deref(), Some("real message"));
        assert_eq!(
            logs[0].attributes.get("batch_id"),
            Some(&AnyValue::from("batch_001".to_string()))
        );
    }

    #[test]
    fn critical_is_error_with_severity_field() {
        let (sink, provider, output) = sink(&TelemetryConfig::new("svc", "1.0"));

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::error!(severity = "critical", "CRITICAL: This is a critical message");
        });

        assert!(output
            .contents()
            .contains(" - ERROR - CRITICAL: This is a critical message severity=critical"));
        let logs = provider.logs();
        assert_eq!(logs[0].severity, Some(Severity::Error));
        assert_eq!(
            logs[0].attributes.get("severity"),
            Some(&AnyValue::from("critical".to_string()))
        );
    }

    #[test]
    fn export_layer_skips_sdk_internal_events() {
        let (sink, provider, _) = sink(&TelemetryConfig::new("svc", "1.0"));

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::info!(target: "opentelemetry_sdk", "exporting batch");
        });

        assert!(provider.logs().is_empty());
    }

    #[test]
    fn console_floor_is_independent_of_export_floor() {
        let config = TelemetryConfig::new("svc", "1.0").with_export_level(Level::ERROR);
        let (sink, provider, output) = sink(&config);

        tracing::dispatcher::with_default(&sink.dispatch, || {
            tracing::info!(target: LOGGER_NAME, "local only");
        });

        assert!(output.contents().contains("local only"));
        assert!(provider.logs().is_empty());
    }
}
