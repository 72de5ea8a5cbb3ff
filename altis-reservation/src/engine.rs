use altis_core::{
    AgePolicy, Clock, Flight, RenderedSeat, Reservation, ReservationStore, SeatCode, SeatMapError,
    StoreMutation, SystemClock,
};
use altis_shared::{mask_document, SeatEvent, SeatEventKind};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::error::{ConflictReason, NotFoundReason, PolicyReason, ReservationError, ReservationResult};
use crate::locks::FlightLockRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationConfirmation {
    pub flight_number: String,
    pub seat_code: SeatCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationConfirmation {
    pub flight_number: String,
    pub released_seat: SeatCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationConfirmation {
    pub flight_number: String,
    pub old_seat: SeatCode,
    pub new_seat: SeatCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightSummary {
    pub number: String,
    pub origin: String,
    pub destination: String,
    pub datetime: NaiveDateTime,
    pub capacity: usize,
    pub available: usize,
}

impl From<&Flight> for FlightSummary {
    fn from(flight: &Flight) -> Self {
        Self {
            number: flight.number.clone(),
            origin: flight.origin.clone(),
            destination: flight.destination.clone(),
            datetime: flight.datetime,
            capacity: flight.seats.capacity(),
            available: flight.seats.available_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatRow {
    pub row: u32,
    pub seats: Vec<RenderedSeat>,
}

/// A flight's cabin as seen by one viewer, row by row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatMapView {
    pub flight_number: String,
    pub rows: Vec<SeatRow>,
}

/// Creates, cancels and modifies seat reservations.
///
/// Every mutating operation runs under the target flight's lock: it reads the
/// flight, stages the seat change on its own copy and commits the flight and
/// reservation records to the store in one batch before the lock is released.
/// Nothing is visible to other callers until that batch is durable.
pub struct ReservationEngine {
    store: Arc<dyn ReservationStore>,
    locks: FlightLockRegistry,
    policy: AgePolicy,
    clock: Arc<dyn Clock>,
    events: Option<broadcast::Sender<SeatEvent>>,
}

impl ReservationEngine {
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            store,
            locks: FlightLockRegistry::new(),
            policy: AgePolicy::default(),
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn with_policy(mut self, policy: AgePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish committed seat changes on `events`.
    pub fn with_events(mut self, events: broadcast::Sender<SeatEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn store(&self) -> &Arc<dyn ReservationStore> {
        &self.store
    }

    pub fn create_reservation(
        &self,
        passenger_id: &str,
        flight_number: &str,
        seat_code: &str,
        birth_date: NaiveDate,
    ) -> ReservationResult<ReservationConfirmation> {
        let result = self.with_known_flight(flight_number, || -> ReservationResult<_> {
            let mut flight = self.load_flight(flight_number)?;

            if let Some(existing) = self.store.get_reservation(passenger_id, flight_number)? {
                return Err(ReservationError::Conflict(ConflictReason::DuplicateReservation {
                    passenger: passenger_id.to_string(),
                    flight: flight_number.to_string(),
                    seat: existing.seat_code,
                }));
            }

            let seat = self.claim_seat(&mut flight, passenger_id, seat_code, birth_date)?;

            self.commit(vec![
                StoreMutation::PutFlight(flight),
                StoreMutation::PutReservation(Reservation::new(passenger_id, flight_number, seat)),
            ])?;
            self.publish(flight_number, seat, SeatEventKind::Reserved);

            Ok(ReservationConfirmation {
                flight_number: flight_number.to_string(),
                seat_code: seat,
            })
        });

        match &result {
            Ok(confirmation) => {
                info!(
                    "Reservation created - Flight: {}, Seat: {}, Passenger: {}",
                    flight_number,
                    confirmation.seat_code,
                    mask_document(passenger_id)
                );
            }
            Err(e) => warn!("Reservation rejected on flight {}: {}", flight_number, e),
        }
        result
    }

    pub fn cancel_reservation(
        &self,
        passenger_id: &str,
        flight_number: &str,
    ) -> ReservationResult<CancellationConfirmation> {
        let result = self.with_known_flight(flight_number, || -> ReservationResult<_> {
            let reservation = self
                .store
                .get_reservation(passenger_id, flight_number)?
                .ok_or_else(|| reservation_not_found(passenger_id, flight_number))?;
            let mut flight = self.load_flight(flight_number)?;

            let released = self.release_own_seat(&mut flight, passenger_id, &reservation.seat_code.to_string())?;

            self.commit(vec![
                StoreMutation::PutFlight(flight),
                StoreMutation::RemoveReservation {
                    passenger_id: passenger_id.to_string(),
                    flight_number: flight_number.to_string(),
                },
            ])?;
            if released {
                self.publish(flight_number, reservation.seat_code, SeatEventKind::Released);
            }

            Ok(CancellationConfirmation {
                flight_number: flight_number.to_string(),
                released_seat: reservation.seat_code,
            })
        });

        match &result {
            Ok(confirmation) => {
                info!(
                    "Reservation cancelled - Flight: {}, Seat: {}, Passenger: {}",
                    flight_number,
                    confirmation.released_seat,
                    mask_document(passenger_id)
                );
            }
            Err(e) => warn!("Cancellation rejected on flight {}: {}", flight_number, e),
        }
        result
    }

    /// Moves an existing reservation to `new_seat_code`.
    ///
    /// The old seat is released first so the passenger may re-select it. If the
    /// new seat cannot be claimed the old seat is restored to the passenger and
    /// the error is returned; nothing is committed.
    pub fn modify_reservation(
        &self,
        passenger_id: &str,
        flight_number: &str,
        new_seat_code: &str,
        birth_date: NaiveDate,
    ) -> ReservationResult<ModificationConfirmation> {
        let result = self.with_known_flight(flight_number, || -> ReservationResult<_> {
            let reservation = self
                .store
                .get_reservation(passenger_id, flight_number)?
                .ok_or_else(|| reservation_not_found(passenger_id, flight_number))?;
            let mut flight = self.load_flight(flight_number)?;

            let old_seat = reservation.seat_code;
            let old_code = old_seat.to_string();
            let released = self.release_own_seat(&mut flight, passenger_id, &old_code)?;

            let new_seat = match self.claim_seat(&mut flight, passenger_id, new_seat_code, birth_date) {
                Ok(seat) => seat,
                Err(e) => {
                    if released {
                        if let Err(restore) = flight.seats.reserve(&old_code, passenger_id) {
                            error!("Failed to restore seat {} on {}: {}", old_code, flight_number, restore);
                        }
                    }
                    return Err(e);
                }
            };

            self.commit(vec![
                StoreMutation::PutFlight(flight),
                StoreMutation::PutReservation(Reservation::new(passenger_id, flight_number, new_seat)),
            ])?;
            if old_seat != new_seat {
                if released {
                    self.publish(flight_number, old_seat, SeatEventKind::Released);
                }
                self.publish(flight_number, new_seat, SeatEventKind::Reserved);
            }

            Ok(ModificationConfirmation {
                flight_number: flight_number.to_string(),
                old_seat,
                new_seat,
            })
        });

        match &result {
            Ok(confirmation) => {
                info!(
                    "Reservation modified - Flight: {}, From: {} To: {}, Passenger: {}",
                    flight_number,
                    confirmation.old_seat,
                    confirmation.new_seat,
                    mask_document(passenger_id)
                );
            }
            Err(e) => warn!("Modification rejected on flight {}: {}", flight_number, e),
        }
        result
    }

    /// Lock-free read of every flight.
    pub fn list_flights(&self) -> ReservationResult<Vec<FlightSummary>> {
        Ok(self.store.list_flights()?.iter().map(FlightSummary::from).collect())
    }

    /// Lock-free read of a flight's cabin from `viewer`'s point of view.
    pub fn render_seat_map(&self, flight_number: &str, viewer: Option<&str>) -> ReservationResult<SeatMapView> {
        let flight = self.load_flight(flight_number)?;
        let rows = flight
            .seats
            .render_rows(viewer)
            .into_iter()
            .map(|(row, seats)| SeatRow { row, seats })
            .collect();

        Ok(SeatMapView {
            flight_number: flight.number,
            rows,
        })
    }

    /// Validates and reserves `seat_code` on the staged `flight`.
    fn claim_seat(
        &self,
        flight: &mut Flight,
        passenger_id: &str,
        seat_code: &str,
        birth_date: NaiveDate,
    ) -> ReservationResult<SeatCode> {
        let invalid_seat = || {
            ReservationError::NotFound(NotFoundReason::InvalidSeat {
                flight: flight.number.clone(),
                seat: seat_code.to_string(),
            })
        };

        let code: SeatCode = seat_code.parse().map_err(|_| invalid_seat())?;
        let emergency = flight
            .seats
            .get(seat_code)
            .map(|seat| seat.is_emergency())
            .ok_or_else(invalid_seat)?;

        self.policy
            .check(emergency, birth_date, self.clock.today())
            .map_err(|rejection| {
                ReservationError::PolicyViolation(PolicyReason::MinorInEmergencySeat {
                    seat: seat_code.to_string(),
                    age: rejection.age,
                    minimum: rejection.minimum,
                })
            })?;

        flight
            .seats
            .reserve(seat_code, passenger_id)
            .map_err(|e| seat_error(&flight.number, e))?;

        Ok(code)
    }

    /// Runs `op` under the flight's lock. Unknown flight numbers are rejected
    /// before a lock is registered for them.
    fn with_known_flight<T>(
        &self,
        flight_number: &str,
        op: impl FnOnce() -> ReservationResult<T>,
    ) -> ReservationResult<T> {
        if self.store.get_flight(flight_number)?.is_none() {
            return Err(ReservationError::NotFound(NotFoundReason::Flight(flight_number.to_string())));
        }
        self.locks.with_flight(flight_number, op)
    }

    /// Frees `seat` if `passenger_id` holds it. A seat held by anyone else is
    /// left as is and `false` is returned.
    fn release_own_seat(&self, flight: &mut Flight, passenger_id: &str, seat: &str) -> ReservationResult<bool> {
        let occupant = flight
            .seats
            .get(seat)
            .and_then(|s| s.occupant_id())
            .map(str::to_string);

        if occupant.as_deref() != Some(passenger_id) {
            warn!(
                "Reservation for seat {} on {} did not match occupant {:?}; leaving seat as is",
                seat,
                flight.number,
                occupant.as_deref().map(mask_document)
            );
            return Ok(false);
        }

        flight
            .seats
            .release(seat)
            .map_err(|e| seat_error(&flight.number, e))?;
        Ok(true)
    }

    fn load_flight(&self, flight_number: &str) -> ReservationResult<Flight> {
        self.store
            .get_flight(flight_number)?
            .ok_or_else(|| ReservationError::NotFound(NotFoundReason::Flight(flight_number.to_string())))
    }

    fn commit(&self, mutations: Vec<StoreMutation>) -> ReservationResult<()> {
        self.store.apply(mutations).map_err(|e| {
            error!("Failed to persist reservation change: {}", e);
            ReservationError::PersistenceFailure(e)
        })
    }

    fn publish(&self, flight_number: &str, seat: SeatCode, kind: SeatEventKind) {
        if let Some(events) = &self.events {
            // No subscribers is not an error.
            let _ = events.send(SeatEvent::new(flight_number, &seat.to_string(), kind));
        }
    }
}

fn reservation_not_found(passenger_id: &str, flight_number: &str) -> ReservationError {
    ReservationError::NotFound(NotFoundReason::ReservationNotFound {
        passenger: passenger_id.to_string(),
        flight: flight_number.to_string(),
    })
}

fn seat_error(flight_number: &str, err: SeatMapError) -> ReservationError {
    match err {
        SeatMapError::NotFound(seat) => ReservationError::NotFound(NotFoundReason::InvalidSeat {
            flight: flight_number.to_string(),
            seat,
        }),
        SeatMapError::Conflict(seat) => ReservationError::Conflict(ConflictReason::SeatOccupied {
            flight: flight_number.to_string(),
            seat,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altis_core::{AircraftConfig, FixedClock, SeatState, StoreError, StoreResult};
    use altis_store::JsonDocumentStore;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Delegates to a real store but can be told to fail every write, or to
    /// hand out one reservation that disagrees with the seat map.
    struct FlakyStore {
        inner: JsonDocumentStore,
        fail_writes: AtomicBool,
        stale_reservation: Mutex<Option<Reservation>>,
    }

    impl ReservationStore for FlakyStore {
        fn get_passenger(&self, cpf: &str) -> StoreResult<Option<altis_core::Passenger>> {
            self.inner.get_passenger(cpf)
        }

        fn get_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
            self.inner.get_flight(flight_number)
        }

        fn list_flights(&self) -> StoreResult<Vec<Flight>> {
            self.inner.list_flights()
        }

        fn get_reservation(&self, passenger_id: &str, flight_number: &str) -> StoreResult<Option<Reservation>> {
            let mut stale = self.stale_reservation.lock().unwrap();
            if stale
                .as_ref()
                .is_some_and(|r| r.cpf == passenger_id && r.flight_number == flight_number)
            {
                return Ok(stale.take());
            }
            self.inner.get_reservation(passenger_id, flight_number)
        }

        fn list_reservations(&self, passenger_id: &str) -> StoreResult<Vec<Reservation>> {
            self.inner.list_reservations(passenger_id)
        }

        fn apply(&self, mutations: Vec<StoreMutation>) -> StoreResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StoreError::Io("disk full".to_string()));
            }
            self.inner.apply(mutations)
        }

        fn flush(&self) -> StoreResult<()> {
            self.inner.flush()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn born_years_ago(years: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026 - years, 10, 16).unwrap()
    }

    fn setup() -> (TempDir, Arc<FlakyStore>, ReservationEngine) {
        let dir = tempfile::tempdir().unwrap();
        let inner = JsonDocumentStore::open(dir.path().join("store.json"), false).unwrap();
        let departure = today().succ_opt().unwrap().and_hms_opt(10, 0, 0).unwrap();
        inner
            .create_flight(
                Flight::new(
                    "AA100",
                    "GRU",
                    "GIG",
                    departure,
                    AircraftConfig {
                        model: "A320".to_string(),
                        rows: 2,
                        seat_letters: "ABCDEF".to_string(),
                        emergency_rows: BTreeSet::from([1]),
                    },
                )
                .unwrap(),
            )
            .unwrap();

        let store = Arc::new(FlakyStore {
            inner,
            fail_writes: AtomicBool::new(false),
            stale_reservation: Mutex::new(None),
        });
        let engine = ReservationEngine::new(store.clone()).with_clock(Arc::new(FixedClock(today())));
        (dir, store, engine)
    }

    #[test]
    fn test_create_persists_seat_and_reservation() {
        let (_dir, store, engine) = setup();

        let confirmation = engine.create_reservation("p1", "AA100", "2C", born_years_ago(30)).unwrap();
        assert_eq!(confirmation.seat_code, SeatCode::new(2, 'C'));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2C").unwrap().occupant_id(), Some("p1"));
        let reservation = store.get_reservation("p1", "AA100").unwrap().unwrap();
        assert_eq!(reservation.seat_code, SeatCode::new(2, 'C'));
    }

    #[test]
    fn test_create_unknown_flight_and_seat() {
        let (_dir, _store, engine) = setup();

        assert_eq!(
            engine.create_reservation("p1", "ZZ999", "1A", born_years_ago(30)),
            Err(ReservationError::NotFound(NotFoundReason::Flight("ZZ999".to_string())))
        );
        assert_eq!(
            engine.create_reservation("p1", "AA100", "9A", born_years_ago(30)),
            Err(ReservationError::NotFound(NotFoundReason::InvalidSeat {
                flight: "AA100".to_string(),
                seat: "9A".to_string(),
            }))
        );
        assert!(matches!(
            engine.create_reservation("p1", "AA100", "not-a-seat", born_years_ago(30)),
            Err(ReservationError::NotFound(NotFoundReason::InvalidSeat { .. }))
        ));
    }

    #[test]
    fn test_duplicate_reservation_rejected() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();

        let err = engine.create_reservation("p1", "AA100", "2B", born_years_ago(30)).unwrap_err();
        assert!(matches!(err, ReservationError::Conflict(ConflictReason::DuplicateReservation { .. })));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert!(flight.seats.get("2B").unwrap().is_available());
    }

    #[test]
    fn test_age_gate_on_emergency_row() {
        let (_dir, _store, engine) = setup();

        let err = engine.create_reservation("minor", "AA100", "1A", born_years_ago(17)).unwrap_err();
        assert_eq!(
            err,
            ReservationError::PolicyViolation(PolicyReason::MinorInEmergencySeat {
                seat: "1A".to_string(),
                age: 17,
                minimum: 18,
            })
        );

        engine.create_reservation("adult", "AA100", "1A", born_years_ago(18)).unwrap();
    }

    #[test]
    fn test_age_gate_applies_even_to_occupied_seat() {
        let (_dir, _store, engine) = setup();
        engine.create_reservation("adult", "AA100", "1B", born_years_ago(40)).unwrap();

        let err = engine.create_reservation("minor", "AA100", "1B", born_years_ago(17)).unwrap_err();
        assert!(matches!(err, ReservationError::PolicyViolation(_)));
    }

    #[test]
    fn test_minor_may_sit_outside_emergency_rows() {
        let (_dir, _store, engine) = setup();
        engine.create_reservation("minor", "AA100", "2F", born_years_ago(5)).unwrap();
    }

    #[test]
    fn test_configured_minimum_age() {
        let (_dir, store, _engine) = setup();
        let engine = ReservationEngine::new(store)
            .with_clock(Arc::new(FixedClock(today())))
            .with_policy(AgePolicy::new(21));

        assert!(matches!(
            engine.create_reservation("p1", "AA100", "1C", born_years_ago(19)),
            Err(ReservationError::PolicyViolation(_))
        ));
    }

    #[test]
    fn test_cancel_releases_seat() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2D", born_years_ago(30)).unwrap();

        let confirmation = engine.cancel_reservation("p1", "AA100").unwrap();
        assert_eq!(confirmation.released_seat, SeatCode::new(2, 'D'));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert!(flight.seats.get("2D").unwrap().is_available());
        assert_eq!(flight.seats.get("2D").unwrap().occupant_id(), None);
        assert!(store.get_reservation("p1", "AA100").unwrap().is_none());
    }

    #[test]
    fn test_unknown_flights_register_no_locks() {
        let (_dir, _store, engine) = setup();

        for i in 0..100 {
            let flight = format!("NOPE{}", i);
            let not_found = Err(ReservationError::NotFound(NotFoundReason::Flight(flight.clone())));
            assert_eq!(engine.cancel_reservation("p1", &flight).map(|_| ()), not_found);
            assert_eq!(
                engine.create_reservation("p1", &flight, "1A", born_years_ago(30)).map(|_| ()),
                not_found
            );
            assert_eq!(
                engine.modify_reservation("p1", &flight, "1A", born_years_ago(30)).map(|_| ()),
                not_found
            );
        }
        assert_eq!(engine.locks.len(), 0);

        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        assert_eq!(engine.locks.len(), 1);
    }

    #[test]
    fn test_diverged_reservation_never_evicts_occupant() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p2", "AA100", "2B", born_years_ago(30)).unwrap();
        let diverged = Reservation::new("p1", "AA100", SeatCode::new(2, 'B'));

        *store.stale_reservation.lock().unwrap() = Some(diverged.clone());
        let invalid = engine.modify_reservation("p1", "AA100", "9Z", born_years_ago(30)).unwrap_err();
        assert!(matches!(invalid, ReservationError::NotFound(NotFoundReason::InvalidSeat { .. })));
        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2B").unwrap().occupant_id(), Some("p2"));

        *store.stale_reservation.lock().unwrap() = Some(diverged.clone());
        let moved = engine.modify_reservation("p1", "AA100", "2C", born_years_ago(30)).unwrap();
        assert_eq!(moved.new_seat, SeatCode::new(2, 'C'));
        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2B").unwrap().occupant_id(), Some("p2"));
        assert_eq!(flight.seats.get("2C").unwrap().occupant_id(), Some("p1"));
        assert_eq!(store.get_reservation("p2", "AA100").unwrap().unwrap().seat_code, SeatCode::new(2, 'B'));

        engine.cancel_reservation("p1", "AA100").unwrap();
        *store.stale_reservation.lock().unwrap() = Some(diverged);
        engine.cancel_reservation("p1", "AA100").unwrap();
        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2B").unwrap().occupant_id(), Some("p2"));
        assert!(flight.seats.get("2C").unwrap().is_available());
    }

    #[test]
    fn test_cancel_without_reservation() {
        let (_dir, _store, engine) = setup();
        assert!(matches!(
            engine.cancel_reservation("p1", "AA100"),
            Err(ReservationError::NotFound(NotFoundReason::ReservationNotFound { .. }))
        ));
    }

    #[test]
    fn test_modify_moves_reservation() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();

        let confirmation = engine.modify_reservation("p1", "AA100", "1F", born_years_ago(30)).unwrap();
        assert_eq!(confirmation.old_seat, SeatCode::new(2, 'A'));
        assert_eq!(confirmation.new_seat, SeatCode::new(1, 'F'));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert!(flight.seats.get("2A").unwrap().is_available());
        assert_eq!(flight.seats.get("1F").unwrap().occupant_id(), Some("p1"));
        assert_eq!(store.get_reservation("p1", "AA100").unwrap().unwrap().seat_code, SeatCode::new(1, 'F'));
    }

    #[test]
    fn test_modify_to_same_seat() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();

        let confirmation = engine.modify_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        assert_eq!(confirmation.old_seat, confirmation.new_seat);
        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2A").unwrap().occupant_id(), Some("p1"));
    }

    #[test]
    fn test_failed_modify_keeps_original_seat() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        engine.create_reservation("p2", "AA100", "2B", born_years_ago(30)).unwrap();

        let conflict = engine.modify_reservation("p1", "AA100", "2B", born_years_ago(30)).unwrap_err();
        assert!(matches!(conflict, ReservationError::Conflict(ConflictReason::SeatOccupied { .. })));

        let invalid = engine.modify_reservation("p1", "AA100", "7Q", born_years_ago(30)).unwrap_err();
        assert!(matches!(invalid, ReservationError::NotFound(NotFoundReason::InvalidSeat { .. })));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert_eq!(flight.seats.get("2A").unwrap().occupant_id(), Some("p1"));
        assert_eq!(flight.seats.get("2B").unwrap().occupant_id(), Some("p2"));
        assert_eq!(store.get_reservation("p1", "AA100").unwrap().unwrap().seat_code, SeatCode::new(2, 'A'));
    }

    #[test]
    fn test_persistence_failure_rolls_back() {
        let (_dir, store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);

        assert!(matches!(
            engine.create_reservation("p2", "AA100", "2B", born_years_ago(30)),
            Err(ReservationError::PersistenceFailure(_))
        ));
        assert!(matches!(
            engine.modify_reservation("p1", "AA100", "2C", born_years_ago(30)),
            Err(ReservationError::PersistenceFailure(_))
        ));
        assert!(matches!(
            engine.cancel_reservation("p1", "AA100"),
            Err(ReservationError::PersistenceFailure(_))
        ));

        let flight = store.get_flight("AA100").unwrap().unwrap();
        assert!(flight.seats.get("2B").unwrap().is_available());
        assert!(flight.seats.get("2C").unwrap().is_available());
        assert_eq!(flight.seats.get("2A").unwrap().occupant_id(), Some("p1"));
        assert!(store.get_reservation("p2", "AA100").unwrap().is_none());
        assert_eq!(store.get_reservation("p1", "AA100").unwrap().unwrap().seat_code, SeatCode::new(2, 'A'));

        store.fail_writes.store(false, Ordering::SeqCst);
        engine.create_reservation("p2", "AA100", "2B", born_years_ago(30)).unwrap();
    }

    #[test]
    fn test_render_seat_map_for_viewer() {
        let (_dir, _store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        engine.create_reservation("p2", "AA100", "2B", born_years_ago(30)).unwrap();

        let view = engine.render_seat_map("AA100", Some("p1")).unwrap();
        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].seats[0].state, SeatState::Emergency);
        assert_eq!(view.rows[1].seats[0].state, SeatState::Own);
        assert_eq!(view.rows[1].seats[1].state, SeatState::Occupied);
        assert_eq!(view.rows[1].seats[2].state, SeatState::Available);

        assert!(matches!(
            engine.render_seat_map("ZZ999", None),
            Err(ReservationError::NotFound(NotFoundReason::Flight(_)))
        ));
    }

    #[test]
    fn test_list_flights_reports_availability() {
        let (_dir, _store, engine) = setup();
        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();

        let flights = engine.list_flights().unwrap();
        assert_eq!(flights.len(), 1);
        assert_eq!(flights[0].capacity, 12);
        assert_eq!(flights[0].available, 11);
    }

    #[test]
    fn test_events_published_after_commit() {
        let (_dir, store, _engine) = setup();
        let (tx, mut rx) = broadcast::channel(16);
        let engine = ReservationEngine::new(store)
            .with_clock(Arc::new(FixedClock(today())))
            .with_events(tx);

        engine.create_reservation("p1", "AA100", "2A", born_years_ago(30)).unwrap();
        engine.modify_reservation("p1", "AA100", "2B", born_years_ago(30)).unwrap();
        engine.cancel_reservation("p1", "AA100").unwrap();
        let _ = engine.create_reservation("p2", "AA100", "1A", born_years_ago(10));

        let events: Vec<(String, SeatEventKind)> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| (e.seat_code, e.kind))
            .collect();
        assert_eq!(
            events,
            vec![
                ("2A".to_string(), SeatEventKind::Reserved),
                ("2A".to_string(), SeatEventKind::Released),
                ("2B".to_string(), SeatEventKind::Reserved),
                ("2B".to_string(), SeatEventKind::Released),
            ]
        );
    }
}
