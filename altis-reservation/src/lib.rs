pub mod error;
pub mod locks;
pub mod engine;

pub use error::{ConflictReason, NotFoundReason, PolicyReason, ReservationError, ReservationResult};
pub use locks::FlightLockRegistry;
pub use engine::{
    CancellationConfirmation, FlightSummary, ModificationConfirmation, ReservationConfirmation,
    ReservationEngine, SeatMapView, SeatRow,
};
