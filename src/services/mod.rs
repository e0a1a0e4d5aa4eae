//! Extraction services.
//!
//! - [`StrategyRegistry`]: the fixed strategy catalogue
//! - [`StrategyExecutor`]: runs one strategy against a page
//! - [`Orchestrator`]: picks strategies per domain and records outcomes

pub mod cancel;
pub mod executor;
pub mod orchestrator;
pub mod registry;

pub use cancel::CancelToken;
pub use executor::StrategyExecutor;
pub use orchestrator::Orchestrator;
pub use registry::StrategyRegistry;
