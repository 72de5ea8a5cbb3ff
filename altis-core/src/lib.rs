pub mod models;
pub mod seat_map;
pub mod policy;
pub mod repository;

pub use models::{reservation_key, AircraftConfig, Flight, ModelError, Passenger, Reservation, MAX_ROWS};
pub use seat_map::{RenderedSeat, Seat, SeatCode, SeatMap, SeatMapError, SeatState};
pub use policy::{age_on, AgePolicy, Clock, FixedClock, MinorInEmergencySeat, SystemClock};
pub use repository::{ReservationStore, StoreError, StoreMutation, StoreResult};
