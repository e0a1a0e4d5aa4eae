// src/lib.rs

//! Harvester library
//!
//! Learns, per site domain, which click strategy reveals the most full-size
//! listing images, and tries that strategy first next time.

pub mod error;
pub mod models;
pub mod page;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
