//! # Follower Core
//!
//! Core types, errors, and traits shared by every crate of the follower-count
//! service.
//!
//! - **Types**: user records, cache entries, metric samples, Graph API payloads
//! - **Errors**: the [`FollowerError`] taxonomy and its [`ErrorKind`] tags
//! - **Traits**: the storage, cache, Graph API, and metrics-sink seams
//! - **Clock**: injectable "now" for every expiry and freshness comparison
//!
//! ## Example
//!
//! ```rust
//! use follower_core::{AccessToken, UserRecord};
//!
//! let record = UserRecord::from_grant("17841400", "bob", AccessToken::new("IGQV..."), 3600, 1_700_000_000);
//! assert_eq!(record.token_expires_at, 1_700_003_600);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use constants::*;
pub use error::{ErrorKind, FollowerError, Result};
pub use traits::*;
pub use types::*;
