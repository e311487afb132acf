//! Spreadsheet-backed row store for Jobs and Applications.

pub mod api;
pub mod schema;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use api::{HttpSheets, SheetsApi};
pub use store::{normalize_id, JobStore};
pub use types::{Application, Job, JobStatus, NewJob};
