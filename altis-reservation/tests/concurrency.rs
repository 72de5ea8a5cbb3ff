use altis_core::{AircraftConfig, FixedClock, Flight, ReservationStore};
use altis_reservation::{ConflictReason, ReservationEngine, ReservationError};
use altis_store::JsonDocumentStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

fn adult() -> NaiveDate {
    NaiveDate::from_ymd_opt(1985, 6, 1).unwrap()
}

fn flight(number: &str) -> Flight {
    let departure = NaiveDate::from_ymd_opt(2026, 12, 1).unwrap().and_hms_opt(7, 45, 0).unwrap();
    Flight::new(
        number,
        "GRU",
        "GIG",
        departure,
        AircraftConfig {
            model: "A320".to_string(),
            rows: 4,
            seat_letters: "ABCD".to_string(),
            emergency_rows: BTreeSet::from([2]),
        },
    )
    .unwrap()
}

fn setup(flights: &[&str]) -> (TempDir, Arc<JsonDocumentStore>, Arc<ReservationEngine>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonDocumentStore::open(dir.path().join("seats.json"), false).unwrap());
    for number in flights {
        store.create_flight(flight(number)).unwrap();
    }
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
    let engine = Arc::new(ReservationEngine::new(store.clone()).with_clock(Arc::new(FixedClock(today))));
    (dir, store, engine)
}

#[test]
fn test_concurrent_requests_for_one_seat_book_it_once() {
    let (_dir, store, engine) = setup(&["AA100"]);
    let contenders = 16;
    let barrier = Arc::new(Barrier::new(contenders));

    let handles: Vec<_> = (0..contenders)
        .map(|i| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.create_reservation(&format!("p{}", i), "AA100", "3C", adult())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(
            result,
            Err(ReservationError::Conflict(ConflictReason::SeatOccupied { .. }))
        ));
    }

    let flight = store.get_flight("AA100").unwrap().unwrap();
    let occupant = flight.seats.get("3C").unwrap().occupant_id().unwrap().to_string();
    assert_eq!(store.get_reservation(&occupant, "AA100").unwrap().unwrap().seat_code.to_string(), "3C");
    assert_eq!(flight.seats.available_count(), 15);
}

#[test]
fn test_concurrent_flights_all_succeed() {
    let (_dir, store, engine) = setup(&["AA100", "AA200", "AA300"]);
    let barrier = Arc::new(Barrier::new(3));

    let handles: Vec<_> = ["AA100", "AA200", "AA300"]
        .into_iter()
        .map(|number| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.create_reservation("p1", number, "1A", adult())
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap().unwrap();
    }
    assert_eq!(store.list_reservations("p1").unwrap().len(), 3);
}

#[test]
fn test_mixed_operations_keep_store_consistent() {
    let (dir, store, engine) = setup(&["AA100"]);
    let seats = ["1A", "1B", "3A", "3B", "4D"];

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            thread::spawn(move || {
                let passenger = format!("p{}", i);
                for round in 0..10 {
                    let seat = seats[(i + round) % seats.len()];
                    let _ = engine.create_reservation(&passenger, "AA100", seat, adult());
                    let next = seats[(i + round + 1) % seats.len()];
                    let _ = engine.modify_reservation(&passenger, "AA100", next, adult());
                    if round % 3 == 0 {
                        let _ = engine.cancel_reservation(&passenger, "AA100");
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every occupied seat has a matching reservation and vice versa.
    let snapshot = store.snapshot();
    assert!(snapshot.validate().is_ok());

    let flight = store.get_flight("AA100").unwrap().unwrap();
    let occupied = flight.seats.capacity() - flight.seats.available_count();
    assert_eq!(occupied, snapshot.reservations.len());

    // What is on disk agrees with memory.
    drop(engine);
    let reopened = JsonDocumentStore::open(dir.path().join("seats.json"), false).unwrap();
    assert_eq!(reopened.snapshot(), snapshot);
}
