use std::net::SocketAddr;
use std::sync::Arc;
use altis_api::{app, AppState};
use altis_core::{AgePolicy, ReservationStore};
use altis_reservation::ReservationEngine;
use altis_store::{app_config::Config, JsonDocumentStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "altis_api=debug,altis_reservation=debug,altis_store=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Altis seat reservation API on port {}", config.server.port);

    let store: Arc<dyn ReservationStore> =
        Arc::new(JsonDocumentStore::from_config(&config.store).expect("Failed to open reservation store"));

    // Seat change broadcast for SSE subscribers
    let (seat_events, _) = tokio::sync::broadcast::channel(config.business_rules.event_buffer);

    let engine = ReservationEngine::new(store.clone())
        .with_policy(AgePolicy::new(config.business_rules.minimum_emergency_seat_age))
        .with_events(seat_events.clone());

    let app = app(AppState::new(store.clone(), engine, seat_events));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    if let Err(e) = store.flush() {
        tracing::error!("Failed to flush reservation store on shutdown: {}", e);
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
