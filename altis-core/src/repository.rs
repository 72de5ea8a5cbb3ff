use crate::models::{Flight, Passenger, Reservation};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O failed: {0}")]
    Io(String),

    #[error("Stored document is corrupt: {0}")]
    Corrupt(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("Stored document violates an invariant: {0}")]
    Invariant(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One write against the document. A batch passed to
/// [`ReservationStore::apply`] is flushed as a single unit.
#[derive(Debug, Clone)]
pub enum StoreMutation {
    /// Fails with `AlreadyExists` if the CPF is taken.
    CreatePassenger(Passenger),
    /// Fails with `AlreadyExists` if the flight number is taken.
    CreateFlight(Flight),
    /// Whole-record replace.
    PutFlight(Flight),
    PutReservation(Reservation),
    RemoveReservation {
        passenger_id: String,
        flight_number: String,
    },
}

/// Persistence contract consumed by the reservation engine.
///
/// Reads return owned snapshots. Every mutating call is durable when it
/// returns `Ok`; when it returns `Err` none of its mutations are visible.
pub trait ReservationStore: Send + Sync {
    fn get_passenger(&self, cpf: &str) -> StoreResult<Option<Passenger>>;

    fn get_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>>;

    fn list_flights(&self) -> StoreResult<Vec<Flight>>;

    fn get_reservation(&self, passenger_id: &str, flight_number: &str) -> StoreResult<Option<Reservation>>;

    fn list_reservations(&self, passenger_id: &str) -> StoreResult<Vec<Reservation>>;

    /// Applies all mutations atomically, in order.
    fn apply(&self, mutations: Vec<StoreMutation>) -> StoreResult<()>;

    /// Forces the current state to durable storage.
    fn flush(&self) -> StoreResult<()>;

    fn create_passenger(&self, passenger: Passenger) -> StoreResult<()> {
        self.apply(vec![StoreMutation::CreatePassenger(passenger)])
    }

    fn create_flight(&self, flight: Flight) -> StoreResult<()> {
        self.apply(vec![StoreMutation::CreateFlight(flight)])
    }

    fn put_flight(&self, flight: Flight) -> StoreResult<()> {
        self.apply(vec![StoreMutation::PutFlight(flight)])
    }

    fn put_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        self.apply(vec![StoreMutation::PutReservation(reservation)])
    }

    fn remove_reservation(&self, passenger_id: &str, flight_number: &str) -> StoreResult<()> {
        self.apply(vec![StoreMutation::RemoveReservation {
            passenger_id: passenger_id.to_string(),
            flight_number: flight_number.to_string(),
        }])
    }
}
