//! Telemetry setup for OpenTelemetry integration

use anyhow::Result;

#[cfg(feature = "telemetry")]
pub type TelemetryLayer = tracing_opentelemetry::OpenTelemetryLayer<
    tracing_subscriber::Registry,
    opentelemetry_sdk::trace::Tracer,
>;

#[cfg(not(feature = "telemetry"))]
pub type TelemetryLayer = tracing_subscriber::layer::Identity;

/// Build the OpenTelemetry layer if an OTLP endpoint is configured
///
/// Runs before the subscriber is installed, so the outcome is returned as a
/// message for the caller to log.
///
/// # Environment Variables
///
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (e.g., http://localhost:4317)
/// - `OTEL_SERVICE_NAME`: Service name (default: lexcompare-daemon)
pub fn layer() -> Result<(Option<TelemetryLayer>, Option<String>)> {
    let Ok(endpoint) = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT") else {
        return Ok((None, None));
    };

    #[cfg(feature = "telemetry")]
    {
        let service_name = std::env::var("OTEL_SERVICE_NAME")
            .unwrap_or_else(|_| "lexcompare-daemon".to_string());
        let layer = build_layer(&endpoint, &service_name)?;
        Ok((
            Some(layer),
            Some(format!(
                "OpenTelemetry exporting to {} as {}",
                endpoint, service_name
            )),
        ))
    }

    #[cfg(not(feature = "telemetry"))]
    {
        Ok((
            None,
            Some(format!(
                "OTEL_EXPORTER_OTLP_ENDPOINT={} ignored: rebuild with --features telemetry",
                endpoint
            )),
        ))
    }
}

#[cfg(feature = "telemetry")]
fn build_layer(endpoint: &str, service_name: &str) -> Result<TelemetryLayer> {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime, trace::TracerProvider, Resource};

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![KeyValue::new(
            "service.name",
            service_name.to_string(),
        )]))
        .build();

    let tracer = provider.tracer(service_name.to_string());
    opentelemetry::global::set_tracer_provider(provider);

    Ok(tracing_opentelemetry::layer().with_tracer(tracer))
}

/// Flush pending spans
pub fn shutdown() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
