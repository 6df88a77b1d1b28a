//! Per-user OAuth credentials and fetch bookkeeping.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::types::RefreshedToken;

/// Bearer token issued by the Graph API.
///
/// The secret is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wraps a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for use in a request.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Stored OAuth state and last known follower count for one user.
///
/// Keyed by `username` in the token store. `token_expires_at` is only ever
/// derived from a provider `expires_in`, see [`UserRecord::from_grant`] and
/// [`UserRecord::apply_refresh`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Provider user id
    pub user_id: String,
    /// Instagram username (store key)
    pub username: String,
    /// Current long-lived access token
    pub access_token: AccessToken,
    /// Token expiry in epoch seconds
    pub token_expires_at: i64,
    /// Last fetched follower count
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
    /// When `follower_count` was fetched, epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetched_at: Option<i64>,
}

impl UserRecord {
    /// Builds a record from the result of an OAuth exchange.
    pub fn from_grant(
        user_id: impl Into<String>,
        username: impl Into<String>,
        access_token: AccessToken,
        expires_in: i64,
        now: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            access_token,
            token_expires_at: now.saturating_add(expires_in),
            follower_count: None,
            last_fetched_at: None,
        }
    }

    /// Seconds of token lifetime left at `now` (negative once expired).
    pub fn token_remaining(&self, now: i64) -> i64 {
        self.token_expires_at.saturating_sub(now)
    }

    /// True when less than `margin` seconds of token lifetime remain.
    pub fn token_needs_refresh(&self, now: i64, margin: i64) -> bool {
        self.token_remaining(now) < margin
    }

    /// Returns the stored count and its fetch time if it is younger than `window`.
    pub fn fresh_count(&self, now: i64, window: i64) -> Option<(u64, i64)> {
        match (self.follower_count, self.last_fetched_at) {
            (Some(count), Some(fetched_at)) if now.saturating_sub(fetched_at) < window => {
                Some((count, fetched_at))
            }
            _ => None,
        }
    }

    /// Replaces the token with a refreshed one.
    pub fn apply_refresh(&mut self, refreshed: RefreshedToken, now: i64) {
        self.token_expires_at = now.saturating_add(refreshed.expires_in_seconds);
        self.access_token = refreshed.access_token;
    }

    /// Records a successful follower-count fetch.
    pub fn record_fetch(&mut self, follower_count: u64, now: i64) {
        self.follower_count = Some(follower_count);
        self.last_fetched_at = Some(now);
    }
}
