use altis_shared::Masked;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::seat_map::{SeatCode, SeatMap};

/// A registered passenger, keyed by national ID (`cpf`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    pub cpf: String,
    pub name: String,
    pub birth_date: NaiveDate,
    pub email: Masked<String>,
}

/// Largest cabin accepted, in rows.
pub const MAX_ROWS: u32 = 99;

/// Cabin layout: `rows` rows of `seat_letters` seats each.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AircraftConfig {
    pub model: String,
    pub rows: u32,
    pub seat_letters: String,
    #[serde(default)]
    pub emergency_rows: BTreeSet<u32>,
}

impl AircraftConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.rows == 0 {
            return Err(ModelError::InvalidAircraftConfig("aircraft must have at least one row".to_string()));
        }

        if self.rows > MAX_ROWS {
            return Err(ModelError::InvalidAircraftConfig(format!(
                "aircraft has {} rows, at most {} are supported",
                self.rows, MAX_ROWS
            )));
        }

        if self.seat_letters.is_empty() || !self.seat_letters.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ModelError::InvalidAircraftConfig(format!(
                "seat letters must be uppercase A-Z, got {:?}",
                self.seat_letters
            )));
        }

        let unique: BTreeSet<char> = self.seat_letters.chars().collect();
        if unique.len() != self.seat_letters.len() {
            return Err(ModelError::InvalidAircraftConfig(format!(
                "duplicate seat letter in {:?}",
                self.seat_letters
            )));
        }

        if let Some(row) = self.emergency_rows.iter().find(|r| **r == 0 || **r > self.rows) {
            return Err(ModelError::InvalidAircraftConfig(format!(
                "emergency row {} outside 1..={}",
                row, self.rows
            )));
        }

        Ok(())
    }
}

/// A scheduled flight and its seat map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub number: String,
    pub origin: String,
    pub destination: String,
    pub datetime: NaiveDateTime,
    pub aircraft_config: AircraftConfig,
    pub seats: SeatMap,
}

impl Flight {
    /// New flight with every seat available.
    pub fn new(
        number: impl Into<String>,
        origin: impl Into<String>,
        destination: impl Into<String>,
        datetime: NaiveDateTime,
        aircraft_config: AircraftConfig,
    ) -> Result<Self, ModelError> {
        let number = number.into();
        if number.trim().is_empty() {
            return Err(ModelError::InvalidFlight("flight number is empty".to_string()));
        }

        aircraft_config.validate()?;
        let seats = SeatMap::from_config(&aircraft_config);

        Ok(Self {
            number,
            origin: origin.into(),
            destination: destination.into(),
            datetime,
            aircraft_config,
            seats,
        })
    }

    /// Structural checks run when a flight is read back from storage.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.aircraft_config.validate()?;
        self.seats
            .validate(&self.aircraft_config)
            .map_err(|reason| ModelError::InvalidFlight(format!("flight {}: {}", self.number, reason)))
    }
}

/// The fact that `cpf` holds `seat_code` on `flight_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub cpf: String,
    pub flight_number: String,
    pub seat_code: SeatCode,
}

impl Reservation {
    pub fn new(cpf: impl Into<String>, flight_number: impl Into<String>, seat_code: SeatCode) -> Self {
        Self {
            cpf: cpf.into(),
            flight_number: flight_number.into(),
            seat_code,
        }
    }

    pub fn key(&self) -> String {
        reservation_key(&self.cpf, &self.flight_number)
    }
}

/// Composite key of the reservations collection: `<cpf>_<flightNumber>`.
pub fn reservation_key(passenger_id: &str, flight_number: &str) -> String {
    format!("{}_{}", passenger_id, flight_number)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid aircraft configuration: {0}")]
    InvalidAircraftConfig(String),

    #[error("Invalid flight: {0}")]
    InvalidFlight(String),
}
