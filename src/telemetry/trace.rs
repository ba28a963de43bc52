use std::borrow::Cow;
use std::error::Error;

use opentelemetry::trace::{SpanContext, Status, TraceContextExt, Tracer, TracerProvider};
use opentelemetry::{Context, ContextGuard, Key, KeyValue, Value};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing::Subscriber;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::registry::LookupSpan;

/// Instrumentation scope name for the tracer and meter.
pub const INSTRUMENTATION_NAME: &str = env!("CARGO_PKG_NAME");

/// Build the OpenTelemetry tracing layer
pub fn build_otel_layer<S>(provider: &SdkTracerProvider) -> OpenTelemetryLayer<S, SdkTracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    tracing_opentelemetry::layer().with_tracer(provider.tracer(INSTRUMENTATION_NAME))
}

/// A span that is active for as long as the guard lives.
///
/// Creating it starts the span under the currently active context and makes
/// it the active span, so spans created while it lives become its children.
/// Dropping it ends the span and restores the previous context. Drop also
/// runs while unwinding, so a panicking block still ends its span.
///
/// Bound to the thread it was created on.
#[must_use = "the span ends as soon as the guard is dropped"]
pub struct ScopedSpan {
    cx: Context,
    _attached: ContextGuard,
}

impl ScopedSpan {
    pub(crate) fn start(tracer: &SdkTracer, name: impl Into<Cow<'static, str>>) -> Self {
        let parent = Context::current();
        let span = tracer.start_with_context(name, &parent);
        let cx = parent.with_span(span);
        let attached = cx.clone().attach();
        Self {
            cx,
            _attached: attached,
        }
    }

    pub fn set_attribute(&self, key: impl Into<Key>, value: impl Into<Value>) {
        self.cx.span().set_attribute(KeyValue::new(key, value));
    }

    pub fn add_event(&self, name: impl Into<Cow<'static, str>>, attributes: Vec<KeyValue>) {
        self.cx.span().add_event(name, attributes);
    }

    /// Record `err` as an exception event and mark the span failed.
    pub fn record_error(&self, err: &dyn Error) {
        let span = self.cx.span();
        span.record_error(err);
        span.set_status(Status::error(err.to_string()));
    }

    pub fn span_context(&self) -> SpanContext {
        self.cx.span().span_context().clone()
    }

    pub fn context(&self) -> &Context {
        &self.cx
    }
}

impl Drop for ScopedSpan {
    fn drop(&mut self) {
        // Ends before `_attached` detaches the context.
        self.cx.span().end();
    }
}
