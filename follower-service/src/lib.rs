//! # Follower Service
//!
//! Answers "what is this user's follower count" with as few Graph API calls as
//! possible.
//!
//! ```text
//! CacheLookup ─hit──────────────────────────────────────────────▶ Done (cached)
//!      │miss
//!      ▼
//! TokenLookup ─unknown──▶ NotFound
//!      │
//!      ├─record fresh───────────────────────────────────────────▶ Done (cached)
//!      ▼
//! TokenValid? ─no──▶ Refresh ─fail──▶ Upstream/Transport
//!      │yes            │ok
//!      ▼               ▼
//! FetchRemote ─fail──▶ RateLimit/Upstream/Transport
//!      │
//!      ▼
//! PersistResult ─fail──▶ Storage (unless serving unpersisted)
//!      │
//!      ▼
//!    Done (fresh)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod service;

pub use service::{FollowerCountService, ServiceConfig};
