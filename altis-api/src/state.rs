use std::sync::Arc;
use altis_core::ReservationStore;
use altis_reservation::ReservationEngine;
use altis_shared::SeatEvent;
use tokio::sync::broadcast;

use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ReservationStore>,
    pub engine: Arc<ReservationEngine>,
    pub seat_events: broadcast::Sender<SeatEvent>,
}

impl AppState {
    pub fn new(store: Arc<dyn ReservationStore>, engine: ReservationEngine, seat_events: broadcast::Sender<SeatEvent>) -> Self {
        Self {
            store,
            engine: Arc::new(engine),
            seat_events,
        }
    }
}

/// Runs synchronous store/engine work off the async executor.
pub async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
