//! Storage abstractions for pattern persistence.
//!
//! Records are opaque JSON values addressed by string keys. Any backend that
//! returns the most recent write for a key satisfies the contract.
//!
//! ## Directory Structure (LocalStorage)
//!
//! ```text
//! storage/
//! └── patterns/
//!     ├── craigslist.org.json
//!     └── example.org.json
//! ```

pub mod local;
pub mod memory;
pub mod patterns;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStore;
pub use patterns::PatternStore;

/// Trait for key-value storage backends.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, or `None` if absent.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Delete `key`. Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool>;
}
