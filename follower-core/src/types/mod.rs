//! Domain types for the follower-count service.
//!
//! - [`UserRecord`]: per-user OAuth credentials and last fetched count
//! - [`CacheEntry`]: a cached payload with its absolute expiry
//! - [`MetricSample`]: one buffered counter or latency observation
//! - [`FollowerCountResult`]: the response contract
//! - [`GraphApiError`]: classified Graph API failure

mod count;
mod entry;
mod graph;
mod metric;
mod user;

pub use count::*;
pub use entry::*;
pub use graph::*;
pub use metric::*;
pub use user::*;
