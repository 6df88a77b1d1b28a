//! # Follower Store
//!
//! Durable per-user OAuth state for the follower-count service.
//!
//! This crate provides two [`TokenStore`] backends:
//!
//! - **Memory**: in-process storage for development and testing
//! - **File**: a JSON file rewritten atomically on every save
//!
//! ## Example
//!
//! ```rust,ignore
//! use follower_store::{FileTokenStore, TokenStore};
//!
//! let store = FileTokenStore::open("users.db").await?;
//! store.save(&record).await?;
//! let loaded = store.load("bob").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;

// Re-export the trait from core
pub use follower_core::traits::TokenStore;
