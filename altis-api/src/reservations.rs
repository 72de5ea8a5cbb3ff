use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Json, Router,
};
use altis_reservation::{CancellationConfirmation, ModificationConfirmation, ReservationConfirmation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::passengers::resolve_passenger;
use crate::state::{blocking, AppState};
use crate::validation::{normalize_cpf, normalize_flight_number, normalize_seat_code, require_non_empty};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub cpf: String,
    pub seat_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModifyReservationRequest {
    pub seat_code: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/flights/{number}/reservations", post(create_reservation))
        .route(
            "/v1/flights/{number}/reservations/{cpf}",
            delete(cancel_reservation).put(modify_reservation),
        )
}

/// POST /v1/flights/{number}/reservations
async fn create_reservation(
    State(state): State<AppState>,
    Path(number): Path<String>,
    Json(req): Json<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ReservationConfirmation>), AppError> {
    let number = normalize_flight_number(&number);
    let cpf = normalize_cpf(&req.cpf)?;
    require_non_empty("seatCode", &req.seat_code)?;
    let seat_code = normalize_seat_code(&req.seat_code);

    let confirmation = blocking(move || {
        let passenger = resolve_passenger(state.store.as_ref(), &cpf)?;
        Ok(state
            .engine
            .create_reservation(&passenger.cpf, &number, &seat_code, passenger.birth_date)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// DELETE /v1/flights/{number}/reservations/{cpf}
async fn cancel_reservation(
    State(state): State<AppState>,
    Path((number, cpf)): Path<(String, String)>,
) -> Result<Json<CancellationConfirmation>, AppError> {
    let number = normalize_flight_number(&number);
    let cpf = normalize_cpf(&cpf)?;
    let confirmation = blocking(move || Ok(state.engine.cancel_reservation(&cpf, &number)?)).await?;
    Ok(Json(confirmation))
}

/// PUT /v1/flights/{number}/reservations/{cpf}
async fn modify_reservation(
    State(state): State<AppState>,
    Path((number, cpf)): Path<(String, String)>,
    Json(req): Json<ModifyReservationRequest>,
) -> Result<Json<ModificationConfirmation>, AppError> {
    let number = normalize_flight_number(&number);
    let cpf = normalize_cpf(&cpf)?;
    require_non_empty("seatCode", &req.seat_code)?;
    let seat_code = normalize_seat_code(&req.seat_code);

    let confirmation = blocking(move || {
        let passenger = resolve_passenger(state.store.as_ref(), &cpf)?;
        Ok(state
            .engine
            .modify_reservation(&passenger.cpf, &number, &seat_code, passenger.birth_date)?)
    })
    .await?;

    Ok(Json(confirmation))
}
