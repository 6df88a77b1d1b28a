//! Follower-count payloads.

use serde::{Deserialize, Serialize};

/// Follower count as cached between requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerSnapshot {
    /// Instagram username
    pub username: String,
    /// Follower count
    pub follower_count: u64,
    /// When the count was fetched, epoch seconds
    pub last_fetched_at: i64,
}

impl FollowerSnapshot {
    /// Converts into a response, tagging whether the Graph API was skipped.
    pub fn into_result(self, cached: bool) -> FollowerCountResult {
        FollowerCountResult {
            username: self.username,
            follower_count: self.follower_count,
            last_fetched_at: self.last_fetched_at,
            cached,
        }
    }
}

/// Answer to "what is this user's follower count".
///
/// `cached` is true iff the value was served without calling the Graph API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowerCountResult {
    /// Instagram username
    pub username: String,
    /// Follower count
    pub follower_count: u64,
    /// When the count was fetched, epoch seconds
    pub last_fetched_at: i64,
    /// Served without an external call
    pub cached: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_serializes_camel_case() {
        let result = FollowerSnapshot {
            username: "bob".into(),
            follower_count: 500,
            last_fetched_at: 1_000,
        }
        .into_result(true);

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "username": "bob",
                "followerCount": 500,
                "lastFetchedAt": 1000,
                "cached": true,
            })
        );
    }
}
