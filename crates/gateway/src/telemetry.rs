//! Tracing/OpenTelemetry wiring for the `serve` command.

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use sb_domain::config::ObservabilityConfig;

/// Install the global subscriber: JSON lines on stdout, `RUST_LOG`
/// filtering with a `sb_gateway=debug` default, and an optional OTLP
/// span pipeline when `[observability] otlp_endpoint` is set.
///
/// The returned provider handle (if any) must be passed to [`shutdown`]
/// on exit so buffered spans reach the collector.
pub fn init(obs: &ObservabilityConfig) -> Option<SdkTracerProvider> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sb_gateway=debug"));

    let provider = obs
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_otlp_provider(endpoint, obs));

    let base = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json());

    match &provider {
        Some(p) => {
            let otel = tracing_opentelemetry::layer().with_tracer(p.tracer("switchboard"));
            base.with(otel).init();
        }
        None => base.init(),
    }

    provider
}

fn build_otlp_provider(endpoint: &str, obs: &ObservabilityConfig) -> Option<SdkTracerProvider> {
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            // Stderr on purpose: the subscriber is not installed yet.
            eprintln!("WARNING: OTLP exporter for {endpoint} unavailable ({e}), spans stay local");
            return None;
        }
    };

    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
                obs.sample_rate,
            ))
            .with_resource(
                opentelemetry_sdk::Resource::builder()
                    .with_service_name(obs.service_name.clone())
                    .build(),
            )
            .build(),
    )
}

/// Flush pending spans on the way out.
pub fn shutdown(provider: Option<SdkTracerProvider>) {
    if let Some(provider) = provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "tracer provider shutdown failed");
        }
    }
}
