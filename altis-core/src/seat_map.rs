use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::models::AircraftConfig;

/// Seat identifier: row number followed by a seat letter, e.g. `12F`.
///
/// Ordering is row-major (row first, then letter), so a `BTreeMap` keyed by
/// `SeatCode` iterates the cabin front to back, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeatCode {
    pub row: u32,
    pub letter: char,
}

impl SeatCode {
    pub fn new(row: u32, letter: char) -> Self {
        Self { row, letter }
    }
}

impl fmt::Display for SeatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.letter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Malformed seat code: {0:?}")]
pub struct ParseSeatCodeError(pub String);

impl FromStr for SeatCode {
    type Err = ParseSeatCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let letter = chars
            .next_back()
            .filter(|c| c.is_ascii_uppercase())
            .ok_or_else(|| ParseSeatCodeError(s.to_string()))?;

        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0') {
            return Err(ParseSeatCodeError(s.to_string()));
        }

        let row = digits.parse::<u32>().map_err(|_| ParseSeatCodeError(s.to_string()))?;
        Ok(SeatCode { row, letter })
    }
}

impl Serialize for SeatCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SeatCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A single seat. `occupant_id` is set exactly when `available` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seat {
    available: bool,
    occupant_id: Option<String>,
    emergency: bool,
}

impl Seat {
    pub fn new(emergency: bool) -> Self {
        Self {
            available: true,
            occupant_id: None,
            emergency,
        }
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn occupant_id(&self) -> Option<&str> {
        self.occupant_id.as_deref()
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    fn is_consistent(&self) -> bool {
        self.available == self.occupant_id.is_none()
    }
}

/// Symbolic state of a seat as seen by one viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    /// Occupied by the viewer.
    #[serde(rename = "self")]
    Own,
    Occupied,
    /// Available and in an emergency-exit row.
    Emergency,
    Available,
}

impl SeatState {
    /// Legend symbol used by the text seat map.
    pub fn symbol(&self) -> &'static str {
        match self {
            SeatState::Own => "[*]",
            SeatState::Occupied => "[X]",
            SeatState::Emergency => "[E]",
            SeatState::Available => "[ ]",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedSeat {
    pub code: SeatCode,
    pub state: SeatState,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatMapError {
    #[error("Seat not found: {0}")]
    NotFound(String),

    #[error("Seat already occupied: {0}")]
    Conflict(String),
}

/// Per-flight seat occupancy.
///
/// Serialized as a plain `{ "<code>": seat }` map so the persisted flight
/// document keeps its `seats` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatMap {
    seats: BTreeMap<SeatCode, Seat>,
}

impl SeatMap {
    /// One seat per `(row, letter)`; emergency iff the row is an emergency row.
    pub fn from_config(config: &AircraftConfig) -> Self {
        let seats = (1..=config.rows)
            .flat_map(|row| {
                let emergency = config.emergency_rows.contains(&row);
                config
                    .seat_letters
                    .chars()
                    .map(move |letter| (SeatCode::new(row, letter), Seat::new(emergency)))
            })
            .collect();

        Self { seats }
    }

    pub fn get(&self, code: &str) -> Option<&Seat> {
        let code = code.parse::<SeatCode>().ok()?;
        self.seats.get(&code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// Available → Reserved(passenger_id).
    pub fn reserve(&mut self, code: &str, passenger_id: &str) -> Result<(), SeatMapError> {
        let seat = self.get_mut(code)?;

        if !seat.available {
            return Err(SeatMapError::Conflict(code.to_string()));
        }

        seat.available = false;
        seat.occupant_id = Some(passenger_id.to_string());
        Ok(())
    }

    /// Reserved → Available. Releasing a free seat is a no-op.
    /// Returns the previous occupant, if any.
    pub fn release(&mut self, code: &str) -> Result<Option<String>, SeatMapError> {
        let seat = self.get_mut(code)?;

        seat.available = true;
        Ok(seat.occupant_id.take())
    }

    /// Seat currently held by `passenger_id`, if any.
    pub fn seat_of(&self, passenger_id: &str) -> Option<SeatCode> {
        self.seats
            .iter()
            .find(|(_, seat)| seat.occupant_id.as_deref() == Some(passenger_id))
            .map(|(code, _)| *code)
    }

    /// Lazy row-major view of the cabin for `viewer`.
    pub fn render<'a>(&'a self, viewer: Option<&'a str>) -> impl Iterator<Item = RenderedSeat> + 'a {
        self.seats.iter().map(move |(code, seat)| {
            let state = match seat.occupant_id.as_deref() {
                Some(occupant) if Some(occupant) == viewer => SeatState::Own,
                Some(_) => SeatState::Occupied,
                None if seat.emergency => SeatState::Emergency,
                None => SeatState::Available,
            };
            RenderedSeat { code: *code, state }
        })
    }

    /// `render` grouped by row.
    pub fn render_rows(&self, viewer: Option<&str>) -> Vec<(u32, Vec<RenderedSeat>)> {
        let mut rows: Vec<(u32, Vec<RenderedSeat>)> = Vec::new();
        for seat in self.render(viewer) {
            if let Some((row, seats)) = rows.last_mut() {
                if *row == seat.code.row {
                    seats.push(seat);
                    continue;
                }
            }
            rows.push((seat.code.row, vec![seat]));
        }
        rows
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn available_count(&self) -> usize {
        self.seats.values().filter(|s| s.available).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SeatCode, &Seat)> {
        self.seats.iter()
    }

    /// Checks the seat invariants and that the grid matches `config`.
    pub fn validate(&self, config: &AircraftConfig) -> Result<(), String> {
        if let Some((code, _)) = self.seats.iter().find(|(_, s)| !s.is_consistent()) {
            return Err(format!("seat {} has inconsistent availability and occupant", code));
        }

        let expected = SeatMap::from_config(config);
        if expected.seats.len() != self.seats.len() {
            return Err(format!(
                "expected {} seats from aircraft config, found {}",
                expected.seats.len(),
                self.seats.len()
            ));
        }

        for (code, seat) in &expected.seats {
            match self.seats.get(code) {
                None => return Err(format!("seat {} missing from seat map", code)),
                Some(actual) if actual.emergency != seat.emergency => {
                    return Err(format!("seat {} has wrong emergency flag", code))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    fn get_mut(&mut self, code: &str) -> Result<&mut Seat, SeatMapError> {
        let parsed = code
            .parse::<SeatCode>()
            .map_err(|_| SeatMapError::NotFound(code.to_string()))?;
        self.seats
            .get_mut(&parsed)
            .ok_or_else(|| SeatMapError::NotFound(code.to_string()))
    }
}
