//! API route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::dto::*;
use crate::error::ApiError;
use crate::pipeline::{build_registration, PipelineResponse};
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.pipeline.cache_stats();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        cache: CacheHealth {
            hits: stats.hits,
            misses: stats.misses,
            errors: stats.errors,
            hit_rate: stats.hit_rate(),
        },
    })
}

/// GET /api/v1/users/:username/followers
pub async fn get_followers(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> PipelineResponse {
    state.pipeline.handle(&username).await
}

/// PUT /api/v1/users/:username
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    headers: HeaderMap,
    payload: std::result::Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterUserResponse>)> {
    authorize_admin(state.config.admin_token.as_deref(), &headers)?;

    let Json(req) = payload.map_err(|e| ApiError::validation(format!("Invalid request body: {}", e.body_text())))?;

    let record = build_registration(
        &username,
        &req.user_id,
        &req.access_token,
        req.expires_in,
        state.clock.now(),
    )?;
    state.store.save(&record).await?;

    info!(
        username = %record.username,
        token_expires_at = record.token_expires_at,
        "Registered user"
    );

    Ok((
        StatusCode::OK,
        Json(RegisterUserResponse {
            username: record.username.clone(),
            user_id: record.user_id.clone(),
            token_expires_at: record.token_expires_at,
        }),
    ))
}

fn authorize_admin(expected: Option<&str>, headers: &HeaderMap) -> Result<()> {
    let Some(expected) = expected else {
        warn!("Registration attempted but ADMIN_TOKEN is not configured");
        return Err(ApiError::unauthorized("Registration is disabled"));
    };

    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match presented {
        Some(token) if tokens_match(token, expected) => Ok(()),
        Some(_) => Err(ApiError::unauthorized("Invalid admin token")),
        None => Err(ApiError::unauthorized("Missing bearer token")),
    }
}

/// Constant-time for equal lengths; the length itself is not secret.
fn tokens_match(presented: &str, expected: &str) -> bool {
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn test_admin_token_accepted() {
        assert!(authorize_admin(Some("s3cret"), &bearer("s3cret")).is_ok());
    }

    #[test]
    fn test_admin_token_rejections() {
        let cases = [
            (Some("s3cret"), bearer("wrong")),
            (Some("s3cret"), bearer("s3cre")),
            (Some("s3cret"), bearer("s3cretX")),
            (Some("s3cret"), HeaderMap::new()),
            (None, bearer("s3cret")),
        ];
        for (expected, headers) in cases {
            let err = authorize_admin(expected, &headers).unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(err.code(), "AUTHENTICATION_ERROR");
        }
    }

    #[test]
    fn test_tokens_match_compares_whole_token() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3creT", "s3cret"));
        assert!(!tokens_match("s3cre", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }
}
