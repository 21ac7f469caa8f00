//! HTTP server assembly: middleware stack, bind, graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use axum::http::header;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

use sb_domain::config::{Config, CorsConfig};

use crate::{api, bootstrap};

/// Run the gateway until SIGINT/SIGTERM (or an internal shutdown
/// request), then flush every store before returning.
pub async fn run(
    config: Arc<Config>,
    config_path: String,
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
) -> anyhow::Result<()> {
    tracing::info!(config_path = %config_path, "Switchboard starting");

    let shutdown_tx = Arc::new(tokio::sync::Notify::new());
    let state = bootstrap::build_app_state(config.clone(), shutdown_tx.clone()).await?;
    bootstrap::spawn_background_tasks(&state);

    // Inbound messages can arrive in bursts from the channel side, so
    // the stack carries a hard concurrency cap besides the optional
    // per-IP governor.
    let max_concurrent = std::env::var("SB_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);

    // Optional per-IP token bucket. The layer type is generic over the
    // governor clock, so it is built inline and left to inference.
    let governor_layer = config.server.rate_limit.as_ref().map(|limits| {
        use tower_governor::governor::GovernorConfigBuilder;
        use tower_governor::GovernorLayer;

        tracing::info!(
            requests_per_second = limits.requests_per_second,
            burst_size = limits.burst_size,
            "per-IP rate limiting on"
        );
        let governor = GovernorConfigBuilder::default()
            .per_second(limits.requests_per_second)
            .burst_size(limits.burst_size)
            .finish()
            .expect("rate_limit values must be non-zero");
        GovernorLayer {
            config: std::sync::Arc::new(governor),
        }
    });
    if governor_layer.is_none() {
        tracing::info!("per-IP rate limiting off ([server.rate_limit] not set)");
    }

    let router = api::router(state.clone())
        .layer(cors_from_config(&config.server.cors))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent));

    let app = match governor_layer {
        Some(governor) => router.layer(governor).with_state(state.clone()),
        None => router.with_state(state.clone()),
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    tracing::info!(addr = %addr, max_concurrent, "Switchboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown(shutdown_tx))
        .await
        .context("axum server error")?;

    crate::telemetry::shutdown(tracer_provider);

    for (name, result) in [
        ("contexts", state.contexts.flush()),
        ("conversations", state.conversations.flush()),
        ("custom_logic", state.custom_logic.flush()),
    ] {
        if let Err(e) = result {
            tracing::warn!(store = name, error = %e, "final flush failed");
        }
    }
    tracing::info!("shutdown complete");

    Ok(())
}

async fn wait_for_shutdown(notify: Arc<tokio::sync::Notify>) {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("SIGTERM handler registration failed");
    #[cfg(unix)]
    let sigterm = sigterm.recv();
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<Option<()>>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("SIGINT, shutting down"),
        _ = sigterm => tracing::info!("SIGTERM, shutting down"),
        _ = notify.notified() => tracing::info!("internal shutdown request"),
    }
}

/// CORS policy for the agent console.
///
/// An entry ending in `:*` matches any port on that host, which keeps
/// local dev setups (vite picking a free port) out of the config file.
/// A single `"*"` entry disables origin checking entirely.
fn cors_from_config(cors: &CorsConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION];

    if cors.allowed_origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS allows every origin; do not run production like this");
        return CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(headers);
    }

    let mut exact: Vec<HeaderValue> = Vec::new();
    let mut port_wildcards: Vec<String> = Vec::new();
    for origin in &cors.allowed_origins {
        if let Some(prefix) = origin.strip_suffix('*') {
            port_wildcards.push(prefix.to_owned());
        } else if let Ok(value) = origin.parse::<HeaderValue>() {
            exact.push(value);
        } else {
            tracing::warn!(origin = %origin, "invalid CORS origin, skipping");
        }
    }

    let allow_origin = if port_wildcards.is_empty() {
        AllowOrigin::list(exact)
    } else {
        AllowOrigin::predicate(move |origin, _| {
            if exact.iter().any(|e| e.as_bytes() == origin.as_bytes()) {
                return true;
            }
            let Ok(origin) = origin.to_str() else {
                return false;
            };
            port_wildcards.iter().any(|prefix| {
                origin
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|port| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()))
            })
        })
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(true)
}
