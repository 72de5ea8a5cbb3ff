use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use altis_core::{Passenger, Reservation, ReservationStore};
use altis_reservation::{NotFoundReason, ReservationError};
use altis_shared::{mask_document, Masked};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::state::{blocking, AppState};
use crate::validation::{normalize_cpf, parse_birth_date, require_non_empty, validate_email};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPassengerRequest {
    pub cpf: String,
    pub name: String,
    pub birth_date: String,
    pub email: Masked<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerResponse {
    pub cpf: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub email: Masked<String>,
}

impl From<Passenger> for PassengerResponse {
    fn from(p: Passenger) -> Self {
        Self {
            cpf: p.cpf,
            name: p.name,
            birth_date: p.birth_date,
            email: p.email,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
    pub flight_number: String,
    pub seat_code: String,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            flight_number: r.flight_number,
            seat_code: r.seat_code.to_string(),
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/passengers", post(register_passenger))
        .route("/v1/passengers/{cpf}", get(get_passenger))
        .route("/v1/passengers/{cpf}/reservations", get(list_passenger_reservations))
}

/// Looks up a registered passenger or fails with NotFound.
pub fn resolve_passenger(store: &dyn ReservationStore, cpf: &str) -> Result<Passenger, AppError> {
    store
        .get_passenger(cpf)?
        .ok_or_else(|| ReservationError::NotFound(NotFoundReason::Passenger(cpf.to_string())).into())
}

/// POST /v1/passengers
async fn register_passenger(
    State(state): State<AppState>,
    Json(req): Json<RegisterPassengerRequest>,
) -> Result<(StatusCode, Json<PassengerResponse>), AppError> {
    let cpf = normalize_cpf(&req.cpf)?;
    require_non_empty("name", &req.name)?;
    validate_email(req.email.expose())?;
    let birth_date = parse_birth_date(&req.birth_date, Utc::now().date_naive())?;

    let passenger = Passenger {
        cpf,
        name: req.name.trim().to_string(),
        birth_date,
        email: req.email,
    };

    let store = state.store.clone();
    let created = passenger.clone();
    blocking(move || Ok(store.create_passenger(created)?)).await?;

    info!("New passenger registered: {}", mask_document(&passenger.cpf));
    Ok((StatusCode::CREATED, Json(passenger.into())))
}

/// GET /v1/passengers/{cpf}
async fn get_passenger(
    State(state): State<AppState>,
    Path(cpf): Path<String>,
) -> Result<Json<PassengerResponse>, AppError> {
    let cpf = normalize_cpf(&cpf)?;
    let passenger = blocking(move || resolve_passenger(state.store.as_ref(), &cpf)).await?;
    Ok(Json(passenger.into()))
}

/// GET /v1/passengers/{cpf}/reservations
async fn list_passenger_reservations(
    State(state): State<AppState>,
    Path(cpf): Path<String>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let cpf = normalize_cpf(&cpf)?;
    let reservations = blocking(move || {
        resolve_passenger(state.store.as_ref(), &cpf)?;
        Ok(state.store.list_reservations(&cpf)?)
    })
    .await?;

    Ok(Json(reservations.into_iter().map(ReservationResponse::from).collect()))
}
