pub mod pii;
pub mod models;

pub use pii::{mask_document, Masked};
pub use models::events::{SeatEvent, SeatEventKind};
