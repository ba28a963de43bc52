use std::time::{Duration, Instant};

use app_insights_telemetry::{AppInsights, Labels, Properties, TelemetryError};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<(), TelemetryError> {
    println!("Initializing Application Insights...");

    // Missing connection string is fatal
    let insights = AppInsights::new(None)?;
    insights.install_global()?;

    debug!("DEBUG: This is a debug message");
    info!("INFO: This is an info message");
    warn!("WARNING: This is a warning message");
    error!("ERROR: This is an error message");
    error!(severity = "critical", "CRITICAL: This is a critical message");

    insights.log_info(
        "Application started successfully",
        Some(
            &Properties::new()
                .with("version", env!("CARGO_PKG_VERSION"))
                .with("environment", "production")
                .with("startup_time", chrono::Local::now().to_rfc3339()),
        ),
    );

    tokio::time::sleep(Duration::from_secs(2)).await;

    authenticate(&insights).await;
    process_batch(&insights);

    match 10_i32.checked_div(0) {
        Some(result) => insights.log_info(&format!("Calculation result: {}", result), None),
        None => insights.log_error(
            "Division error occurred: attempt to divide by zero",
            Some(
                &Properties::new()
                    .with("error_type", "DivideByZero")
                    .with("function", "main")
                    .with("operation", "calculation"),
            ),
        ),
    }

    insights.log_info(
        "Application workflow completed",
        Some(
            &Properties::new()
                .with("total_operations", 3)
                .with("success_rate", "66.7%"),
        ),
    );

    // Give the batch processors their final export
    insights.shutdown()?;
    println!("Logs and traces sent to Application Insights");

    Ok(())
}

async fn authenticate(insights: &AppInsights) {
    let span = insights.create_span("user_authentication");
    span.set_attribute("user.id", "user123");
    span.set_attribute("auth.method", "oauth2");

    insights.log_info(
        "User authentication process started",
        Some(
            &Properties::new()
                .with("user_id", "user123")
                .with("auth_method", "oauth2"),
        ),
    );

    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let elapsed = started.elapsed().as_secs_f64();

    let labels = Labels::from([("operation", "authentication")]);
    insights.increment_counter(Some(&labels));
    insights.record_processing_time(elapsed, Some(&labels));

    span.set_attribute("processing.duration", elapsed);
    insights.log_info("User authentication completed", None);
}

fn process_batch(insights: &AppInsights) {
    let parent = insights.create_span("data_processing");
    parent.set_attribute("batch.id", "batch_001");
    parent.set_attribute("records.count", 500_i64);

    insights.in_span("data_validation", |span| {
        span.set_attribute("validation.rules", "required_fields");
        insights.log_info(
            "Data validation started",
            Some(
                &Properties::new()
                    .with("batch_id", "batch_001")
                    .with("validation_type", "required_fields"),
            ),
        );
    });

    insights.in_span("data_transformation", |span| {
        span.set_attribute("transformation.type", "normalize");
        insights.log_warning(
            "Data transformation encountered minor issues",
            Some(
                &Properties::new()
                    .with("batch_id", "batch_001")
                    .with("issues_count", 5),
            ),
        );
    });
}
