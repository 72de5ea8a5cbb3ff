use altis_core::{SeatCode, StoreError};
use altis_shared::mask_document;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReservationError {
    #[error("Not found: {0}")]
    NotFound(NotFoundReason),

    #[error("Conflict: {0}")]
    Conflict(ConflictReason),

    #[error("Policy violation: {0}")]
    PolicyViolation(PolicyReason),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFoundReason {
    #[error("flight {0}")]
    Flight(String),

    #[error("passenger {}", mask_document(.0))]
    Passenger(String),

    #[error("seat {seat} on flight {flight}")]
    InvalidSeat { flight: String, seat: String },

    #[error("no reservation for passenger {} on flight {}", mask_document(.passenger), .flight)]
    ReservationNotFound { passenger: String, flight: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("seat {seat} on flight {flight} is already occupied")]
    SeatOccupied { flight: String, seat: String },

    #[error("passenger {} already holds seat {} on flight {}", mask_document(.passenger), .seat, .flight)]
    DuplicateReservation { passenger: String, flight: String, seat: SeatCode },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyReason {
    #[error("seat {seat} is an emergency-exit seat; passenger aged {age} is under {minimum}")]
    MinorInEmergencySeat { seat: String, age: u32, minimum: u32 },
}

pub type ReservationResult<T> = Result<T, ReservationError>;
