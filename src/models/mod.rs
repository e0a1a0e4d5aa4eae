// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod outcome;
mod record;
mod strategy;

// Re-export all public types
pub use config::{Config, ExtractionConfig, HttpConfig, StorageConfig};
pub use outcome::{ExecutionResult, ExtractionReport, StrategyFailure};
pub use record::{DomainRecord, FailureEntry, SuccessEntry};
pub use strategy::{Action, Step, StepIter, Strategy};
