use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use altis_core::{AircraftConfig, Flight, SeatState};
use altis_reservation::{FlightSummary, NotFoundReason, ReservationError, SeatMapView};
use chrono::NaiveDateTime;
use futures_util::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::error::AppError;
use crate::state::{blocking, AppState};
use crate::validation::{normalize_cpf, normalize_flight_number, require_non_empty};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlightRequest {
    pub number: String,
    pub origin: String,
    pub destination: String,
    pub datetime: NaiveDateTime,
    pub aircraft_config: AircraftConfig,
}

#[derive(Debug, Deserialize)]
pub struct SeatMapQuery {
    pub viewer: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatResponse {
    pub code: String,
    pub state: SeatState,
    pub symbol: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatRowResponse {
    pub row: u32,
    pub seats: Vec<SeatResponse>,
    /// Text rendering, e.g. ` 1 [ ] [X] [*] [E]`.
    pub line: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatMapResponse {
    pub flight_number: String,
    pub legend: String,
    pub rows: Vec<SeatRowResponse>,
}

const LEGEND: &str = "[ ] Available  [X] Occupied  [*] Your reservation  [E] Emergency exit";

impl From<SeatMapView> for SeatMapResponse {
    fn from(view: SeatMapView) -> Self {
        let rows = view
            .rows
            .into_iter()
            .map(|row| {
                let symbols: Vec<&str> = row.seats.iter().map(|s| s.state.symbol()).collect();
                SeatRowResponse {
                    line: format!("{:2} {}", row.row, symbols.join(" ")),
                    row: row.row,
                    seats: row
                        .seats
                        .iter()
                        .map(|s| SeatResponse {
                            code: s.code.to_string(),
                            state: s.state,
                            symbol: s.state.symbol().to_string(),
                        })
                        .collect(),
                }
            })
            .collect();

        Self {
            flight_number: view.flight_number,
            legend: LEGEND.to_string(),
            rows,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights", get(list_flights))
        .route("/v1/flights/{number}/seats", get(get_seat_map))
        .route("/v1/flights/{number}/stream", get(seat_stream))
        .route("/v1/admin/flights", post(create_flight))
}

/// GET /v1/flights
async fn list_flights(State(state): State<AppState>) -> Result<Json<Vec<FlightSummary>>, AppError> {
    let flights = blocking(move || Ok(state.engine.list_flights()?)).await?;
    Ok(Json(flights))
}

/// GET /v1/flights/{number}/seats?viewer={cpf}
async fn get_seat_map(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Query(query): Query<SeatMapQuery>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let number = normalize_flight_number(&number);
    let viewer = query.viewer.as_deref().map(normalize_cpf).transpose()?;
    let view = blocking(move || Ok(state.engine.render_seat_map(&number, viewer.as_deref())?)).await?;
    Ok(Json(view.into()))
}

/// POST /v1/admin/flights
async fn create_flight(
    State(state): State<AppState>,
    Json(req): Json<CreateFlightRequest>,
) -> Result<(StatusCode, Json<FlightSummary>), AppError> {
    require_non_empty("origin", &req.origin)?;
    require_non_empty("destination", &req.destination)?;

    let flight = Flight::new(
        normalize_flight_number(&req.number),
        req.origin.trim(),
        req.destination.trim(),
        req.datetime,
        req.aircraft_config,
    )
    .map_err(|e| AppError::ValidationError(e.to_string()))?;

    let summary = FlightSummary::from(&flight);
    blocking(move || Ok(state.store.create_flight(flight)?)).await?;

    info!("Flight registered: {} ({} seats)", summary.number, summary.capacity);
    Ok((StatusCode::CREATED, Json(summary)))
}

/// GET /v1/flights/{number}/stream
/// Server-sent seat changes for one flight.
async fn seat_stream(
    State(state): State<AppState>,
    Path(number): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let number = normalize_flight_number(&number);
    let rx = state.seat_events.subscribe();

    let store = state.store.clone();
    let lookup = number.clone();
    let exists = blocking(move || Ok(store.get_flight(&lookup)?.is_some())).await?;
    if !exists {
        return Err(ReservationError::NotFound(NotFoundReason::Flight(number)).into());
    }

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let number = number.clone();
        async move {
            match result {
                Ok(event) if event.flight_number == number => {
                    Event::default().event("seat").json_data(&event).ok().map(Ok)
                }
                // Lagged receivers skip what they missed; clients re-read the seat map.
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
