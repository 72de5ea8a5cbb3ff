use altis_core::{
    reservation_key, Flight, Passenger, Reservation, ReservationStore, StoreError, StoreMutation,
    StoreResult,
};
use altis_shared::mask_document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, error, info};

use crate::app_config::StoreConfig;

/// The whole persisted state: three collections in one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub passengers: BTreeMap<String, Passenger>,
    #[serde(default)]
    pub flights: BTreeMap<String, Flight>,
    #[serde(default)]
    pub reservations: BTreeMap<String, Reservation>,
}

impl Document {
    /// Cross-collection checks. Seat occupancy and reservations must agree
    /// in both directions.
    pub fn validate(&self) -> StoreResult<()> {
        for (cpf, passenger) in &self.passengers {
            if *cpf != passenger.cpf {
                return Err(StoreError::Invariant(format!("passenger stored under key {} has cpf {}", cpf, passenger.cpf)));
            }
        }

        for (number, flight) in &self.flights {
            if *number != flight.number {
                return Err(StoreError::Invariant(format!("flight stored under key {} has number {}", number, flight.number)));
            }
            flight.validate().map_err(|e| StoreError::Invariant(e.to_string()))?;

            for (code, seat) in flight.seats.iter() {
                if let Some(occupant) = seat.occupant_id() {
                    let held = self
                        .reservations
                        .get(&reservation_key(occupant, number))
                        .is_some_and(|r| r.seat_code == *code);
                    if !held {
                        return Err(StoreError::Invariant(format!(
                            "seat {} on {} is occupied without a matching reservation",
                            code, number
                        )));
                    }
                }
            }
        }

        for (key, reservation) in &self.reservations {
            if *key != reservation.key() {
                return Err(StoreError::Invariant(format!("reservation stored under key {} belongs to {}", key, reservation.key())));
            }

            let occupant = self
                .flights
                .get(&reservation.flight_number)
                .and_then(|f| f.seats.get(&reservation.seat_code.to_string()))
                .and_then(|s| s.occupant_id());
            if occupant != Some(reservation.cpf.as_str()) {
                return Err(StoreError::Invariant(format!(
                    "reservation {} points at seat {} which it does not occupy",
                    key, reservation.seat_code
                )));
            }
        }

        Ok(())
    }

    fn apply(&mut self, mutation: StoreMutation) -> StoreResult<()> {
        match mutation {
            StoreMutation::CreatePassenger(passenger) => {
                if self.passengers.contains_key(&passenger.cpf) {
                    return Err(StoreError::AlreadyExists(format!("passenger {}", mask_document(&passenger.cpf))));
                }
                self.passengers.insert(passenger.cpf.clone(), passenger);
            }
            StoreMutation::CreateFlight(flight) => {
                if self.flights.contains_key(&flight.number) {
                    return Err(StoreError::AlreadyExists(format!("flight {}", flight.number)));
                }
                flight.validate().map_err(|e| StoreError::Invariant(e.to_string()))?;
                self.flights.insert(flight.number.clone(), flight);
            }
            StoreMutation::PutFlight(flight) => {
                flight.validate().map_err(|e| StoreError::Invariant(e.to_string()))?;
                self.flights.insert(flight.number.clone(), flight);
            }
            StoreMutation::PutReservation(reservation) => {
                self.reservations.insert(reservation.key(), reservation);
            }
            StoreMutation::RemoveReservation { passenger_id, flight_number } => {
                self.reservations.remove(&reservation_key(&passenger_id, &flight_number));
            }
        }
        Ok(())
    }
}

/// JSON-file backed store.
///
/// The document is held in memory behind a lock. A batch of mutations is
/// applied to a copy, written to `<path>.tmp`, synced and renamed over the
/// data file; only then does the copy replace the in-memory document. A failed
/// write leaves both the file and memory untouched.
///
/// Writers take `writer` for the whole batch so batches land in order and no
/// two flushes share the temp file. The document lock is only held to copy
/// the current state and to swap in the new one, so readers keep seeing the
/// last durable state while a flush is in progress.
pub struct JsonDocumentStore {
    path: PathBuf,
    pretty: bool,
    document: RwLock<Document>,
    writer: Mutex<()>,
}

impl JsonDocumentStore {
    /// Opens the data file, creating an empty document if it does not exist.
    pub fn open(path: impl AsRef<Path>, pretty: bool) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let document = if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| StoreError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
            let document: Document = serde_json::from_str(&content)
                .map_err(|e| StoreError::Corrupt(format!("Failed to parse {}: {}", path.display(), e)))?;
            document.validate()?;
            document
        } else {
            info!("Store file {} does not exist, starting with an empty document", path.display());
            Document::default()
        };

        let store = Self {
            path,
            pretty,
            document: RwLock::new(document),
            writer: Mutex::new(()),
        };
        store.flush()?;

        let doc = store.read();
        info!(
            "Opened store {} with {} passengers, {} flights, {} reservations",
            store.path.display(),
            doc.passengers.len(),
            doc.flights.len(),
            doc.reservations.len()
        );
        drop(doc);

        Ok(store)
    }

    pub fn from_config(config: &StoreConfig) -> StoreResult<Self> {
        Self::open(&config.path, config.pretty)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the whole document.
    pub fn snapshot(&self) -> Document {
        self.read().clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.document.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Document> {
        self.document.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, document: &Document) -> StoreResult<()> {
        let content = if self.pretty {
            serde_json::to_string_pretty(document)
        } else {
            serde_json::to_string(document)
        }
        .map_err(|e| StoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("Failed to create {}: {}", parent.display(), e)))?;
        }

        // Write to a temporary file first, then rename over the data file.
        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| StoreError::Io(format!("Failed to create {}: {}", temp_path.display(), e)))?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StoreError::Io(format!("Failed to write {}: {}", temp_path.display(), e)))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| StoreError::Io(format!("Failed to replace {}: {}", self.path.display(), e)))?;

        debug!("Flushed {} bytes to {}", content.len(), self.path.display());
        Ok(())
    }
}

impl ReservationStore for JsonDocumentStore {
    fn get_passenger(&self, cpf: &str) -> StoreResult<Option<Passenger>> {
        Ok(self.read().passengers.get(cpf).cloned())
    }

    fn get_flight(&self, flight_number: &str) -> StoreResult<Option<Flight>> {
        Ok(self.read().flights.get(flight_number).cloned())
    }

    fn list_flights(&self) -> StoreResult<Vec<Flight>> {
        Ok(self.read().flights.values().cloned().collect())
    }

    fn get_reservation(&self, passenger_id: &str, flight_number: &str) -> StoreResult<Option<Reservation>> {
        Ok(self
            .read()
            .reservations
            .get(&reservation_key(passenger_id, flight_number))
            .cloned())
    }

    fn list_reservations(&self, passenger_id: &str) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .read()
            .reservations
            .values()
            .filter(|r| r.cpf == passenger_id)
            .cloned()
            .collect())
    }

    fn apply(&self, mutations: Vec<StoreMutation>) -> StoreResult<()> {
        let _writer = self.lock_writer();
        let mut next = self.read().clone();

        for mutation in mutations {
            next.apply(mutation)?;
        }

        if let Err(e) = self.persist(&next) {
            error!("Store flush failed, discarding batch: {}", e);
            return Err(e);
        }

        *self.write() = next;
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        let _writer = self.lock_writer();
        let current = self.read().clone();
        self.persist(&current)
    }
}
