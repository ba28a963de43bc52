use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{
    DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_NAME, SERVICE_VERSION,
};

use crate::telemetry::config::TelemetryConfig;

/// Get base attributes for any resource
pub fn base_attributes(config: &TelemetryConfig) -> Vec<KeyValue> {
    let mut attrs = vec![
        KeyValue::new(SERVICE_NAME, config.service_name.clone()),
        KeyValue::new(SERVICE_VERSION, config.service_version.clone()),
    ];

    if let Some(environment) = &config.environment {
        attrs.push(KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, environment.clone()));
    }

    attrs
}

/// Build base resource with common attributes
pub fn build_base_resource(config: &TelemetryConfig) -> Resource {
    build_resource(config, Vec::new())
}

/// Build resource with base + additional attributes
pub fn build_resource(config: &TelemetryConfig, additional: Vec<KeyValue>) -> Resource {
    let mut attrs = base_attributes(config);
    attrs.extend(additional);
    Resource::builder().with_attributes(attrs).build()
}
