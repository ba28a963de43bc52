//! In-memory telemetry provider.
//!
//! Captures everything the facade exports so tests can assert on it. Logs
//! and spans use simple (unbatched) processors, so they are visible as soon
//! as they are emitted; metrics are visible after [`Pipelines::force_flush`].
//!
//! Requires the `testing` feature outside this crate's own tests.

use std::collections::BTreeMap;

use opentelemetry::logs::{AnyValue, Severity};
use opentelemetry::trace::TraceId;
use opentelemetry::KeyValue;
use opentelemetry_sdk::logs::{InMemoryLogExporter, SdkLoggerProvider};
use opentelemetry_sdk::metrics::data::{AggregatedMetrics, MetricData, ResourceMetrics};
use opentelemetry_sdk::metrics::{InMemoryMetricExporter, PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

use crate::telemetry::api::{Pipelines, TelemetryProvider};
use crate::telemetry::config::TelemetryConfig;
use crate::telemetry::connection::ConnectionString;
use crate::telemetry::error::TelemetryError;
use crate::telemetry::resource::build_base_resource;

/// A log record as the backend received it.
#[derive(Debug, Clone)]
pub struct ExportedLog {
    pub severity: Option<Severity>,
    pub body: Option<String>,
    pub attributes: BTreeMap<String, AnyValue>,
    pub trace_id: Option<TraceId>,
}

/// Cumulative state of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    pub count: u64,
    pub sum: f64,
    pub attributes: BTreeMap<String, String>,
}

/// Provider whose exporters keep everything in memory.
///
/// Clones share the same buffers.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    logs: InMemoryLogExporter,
    spans: InMemorySpanExporter,
    metrics: InMemoryMetricExporter,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<ExportedLog> {
        self.logs
            .get_emitted_logs()
            .unwrap_or_default()
            .into_iter()
            .map(|log| {
                let record = &log.record;
                ExportedLog {
                    severity: record.severity_number(),
                    body: record.body().map(any_value_to_string),
                    attributes: record
                        .attributes_iter()
                        .map(|(key, value)| (key.to_string(), value.clone()))
                        .collect(),
                    trace_id: record.trace_context().map(|cx| cx.trace_id),
                }
            })
            .collect()
    }

    pub fn spans(&self) -> Vec<SpanData> {
        self.spans.get_finished_spans().unwrap_or_default()
    }

    pub fn span(&self, name: &str) -> Option<SpanData> {
        self.spans().into_iter().find(|span| span.name == name)
    }

    pub fn metrics(&self) -> Vec<ResourceMetrics> {
        self.metrics.get_finished_metrics().unwrap_or_default()
    }

    /// Current value of a `u64` counter series whose attributes equal `labels`.
    pub fn counter_value(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        let batches = self.metrics();
        let AggregatedMetrics::U64(MetricData::Sum(sum)) = latest(&batches, name)? else {
            return None;
        };

        let wanted = label_map(labels);
        let value = sum
            .data_points()
            .find(|dp| attribute_map(dp.attributes()) == wanted)
            .map(|dp| dp.value());
        value
    }

    /// All series of an `f64` histogram.
    pub fn histogram(&self, name: &str) -> Vec<HistogramSeries> {
        let batches = self.metrics();
        let Some(AggregatedMetrics::F64(MetricData::Histogram(histogram))) = latest(&batches, name)
        else {
            return Vec::new();
        };

        let series = histogram
            .data_points()
            .map(|dp| HistogramSeries {
                count: dp.count(),
                sum: dp.sum(),
                attributes: attribute_map(dp.attributes()),
            })
            .collect();
        series
    }
}

impl TelemetryProvider for InMemoryProvider {
    fn build_pipelines(
        &self,
        config: &TelemetryConfig,
        _connection: &ConnectionString,
    ) -> Result<Pipelines, TelemetryError> {
        let resource = build_base_resource(config);

        let logger_provider = SdkLoggerProvider::builder()
            .with_simple_exporter(self.logs.clone())
            .with_resource(resource.clone())
            .build();

        let tracer_provider = SdkTracerProvider::builder()
            .with_simple_exporter(self.spans.clone())
            .with_resource(resource.clone())
            .build();

        let meter_provider = SdkMeterProvider::builder()
            .with_reader(PeriodicReader::builder(self.metrics.clone()).build())
            .with_resource(resource)
            .build();

        Ok(Pipelines {
            logger_provider,
            tracer_provider,
            meter_provider,
        })
    }
}

// Cumulative temporality: the newest export holds the running totals.
fn latest<'a>(batches: &'a [ResourceMetrics], name: &str) -> Option<&'a AggregatedMetrics> {
    batches
        .iter()
        .rev()
        .flat_map(|rm| rm.scope_metrics())
        .flat_map(|sm| sm.metrics())
        .find(|metric| metric.name() == name)
        .map(|metric| metric.data())
}

fn label_map(labels: &[(&str, &str)]) -> BTreeMap<String, String> {
    labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn attribute_map<'a>(attributes: impl IntoIterator<Item = &'a KeyValue>) -> BTreeMap<String, String> {
    attributes
        .into_iter()
        .map(|kv| (kv.key.to_string(), kv.value.to_string()))
        .collect()
}

fn any_value_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => s.to_string(),
        other => format!("{:?}", other),
    }
}
