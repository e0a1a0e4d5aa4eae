//! Pipeline entry points.
//!
//! - `run_extract`: run strategies against one page and record the outcome

pub mod extract;

pub use extract::run_extract;
