//! # Follower Graph
//!
//! Typed client for the two Instagram Graph API endpoints the service calls:
//! the profile endpoint (follower count) and long-lived token refresh.
//!
//! Every failure is classified into a
//! [`GraphApiError`](follower_core::GraphApiError); the client never retries.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;

pub use client::{GraphConfig, InstagramGraphClient};
