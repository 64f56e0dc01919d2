//! Permanent caching of expensive remote computations.
//!
//! Provides:
//! - [`CacheStore`] implementations: local disk, Redis, in-memory
//! - [`CacheKey`] canonicalisation of a namespace plus call arguments
//! - [`MemoCache`], which runs a computation at most once per key

pub mod disk;
pub mod key;
pub mod memo;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use disk::DiskStore;
pub use key::{CacheArgs, CacheKey};
pub use memo::{MemoCache, MemoStats};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::CacheStore;
