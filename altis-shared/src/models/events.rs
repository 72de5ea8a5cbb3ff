use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a seat. Published after the change is durably committed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatEventKind {
    Reserved,
    Released,
}

/// Seat occupancy change on a flight. Carries no passenger identity so it can be
/// fanned out to any seat-map viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SeatEvent {
    pub event_id: Uuid,
    pub flight_number: String,
    pub seat_code: String,
    pub kind: SeatEventKind,
    pub occurred_at: i64,
}

impl SeatEvent {
    pub fn new(flight_number: &str, seat_code: &str, kind: SeatEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            flight_number: flight_number.to_string(),
            seat_code: seat_code.to_string(),
            kind,
            occurred_at: chrono::Utc::now().timestamp(),
        }
    }
}
