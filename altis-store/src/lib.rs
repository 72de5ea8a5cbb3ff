pub mod app_config;
pub mod document_store;

pub use document_store::{Document, JsonDocumentStore};
