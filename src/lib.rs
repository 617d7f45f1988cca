//! Lead reporting: load a lead export, narrow it by date, dealer and brand,
//! and build the status, source and cancellation reports.
pub mod aggregate;
pub mod cache;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
