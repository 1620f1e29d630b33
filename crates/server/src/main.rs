use axum::http::Method;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use server::config::ServerConfig;
use server::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    server::telemetry::init_subscriber();

    server::config::load_feature_flags();
    let flags = server::config::feature_flags();

    if flags.telemetry {
        if let Err(e) = server::telemetry::init_telemetry() {
            tracing::error!(error = %e, "Telemetry disabled, exporter setup failed");
        }
    }
    server::health::record_start_time();

    let config = ServerConfig::from_env();
    tracing::info!(?config, "Configuration loaded");
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config);

    let mut app = server::openapi::app_router(state);

    if flags.telemetry {
        app = app.layer(server::telemetry::OtelTraceLayer);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = app
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %bind_addr, error = %e, "Failed to bind");
            std::process::exit(1);
        }
    };
    tracing::info!(addr = %bind_addr, docs = flags.docs, "Listening");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
