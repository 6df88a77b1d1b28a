//! TTL cache for follower counts.
//!
//! [`TtlCache`] layers expiry and fail-open semantics over any
//! [`CacheBackend`](follower_core::CacheBackend); [`MemoryCacheBackend`] is the
//! in-process backend.

mod backend;
mod cache;

pub use backend::MemoryCacheBackend;
pub use cache::{CacheConfig, CacheStats, TtlCache};
