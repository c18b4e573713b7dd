//! Time-bounded local cache and the cache-first fetch policy.
//!
//! - [`SerializedStore`] is the flat, persistent key-value substrate
//! - [`Cache`] stores serde values with a write timestamp per key
//! - [`CacheLayer`] serves fresh entries and otherwise fetches and refreshes
//!
//! Stale entries are never served: past its max-age an entry only exists to
//! be overwritten.

mod layer;
mod manager;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use manager::{Cache, CacheKey, CacheMaxAge, CacheWriteError, CACHE_TIME_PREFIX};
pub use storage::{MemoryStore, NoopStore, SerializedStore, SqliteStore, StoreValue};
pub use traits::{CacheResult, CacheSource};
