//! Authentication extractors.
//!
//! Session issuance lives in the auth collaborator; these extractors only
//! resolve a `Authorization: Bearer <session-token>` header to the caller's
//! identity.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn handler(OptionalAuth(user): OptionalAuth) -> impl IntoResponse {
//!     match user {
//!         Some(user) => format!("order will belong to {}", user.id),
//!         None => "guest checkout".to_string(),
//!     }
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::db;
use crate::error::AppError;
use crate::models::user::CurrentUser;
use crate::state::AppState;

/// Extractor that optionally resolves the current user.
///
/// Guests (no token, expired token, lookup failure) resolve to `None`
/// rather than rejecting the request: guest checkout is a supported path.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(Self(None));
        };

        let user = match db::users::find_session_user(state.pool(), &token).await {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, "session lookup failed; treating as guest");
                None
            }
        };

        Ok(Self(user))
    }
}

/// Extractor that requires a verified staff user (moderator or admin).
///
/// Rejects with 401 otherwise, without revealing whether the token was
/// missing, expired, or merely under-privileged.
pub struct RequireStaff(pub CurrentUser);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts).ok_or_else(|| AppError::Unauthorized("Unauthorized".to_owned()))?;

        let user = db::users::find_session_user(state.pool(), &token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unauthorized".to_owned()))?;

        if !user.is_staff() {
            return Err(AppError::Unauthorized("Unauthorized".to_owned()));
        }

        Ok(Self(user))
    }
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        if let Some(value) = value {
            builder = builder.header(AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).expect("valid request").into_parts();
        parts
    }

    #[test]
    fn test_bearer_token_extraction() {
        let parts = parts_with_header(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_missing_header_yields_no_token() {
        let parts = parts_with_header(None);
        assert!(bearer_token(&parts).is_none());
    }

    #[test]
    fn test_non_bearer_scheme_is_ignored() {
        let parts = parts_with_header(Some("Basic dXNlcjpwdw=="));
        assert!(bearer_token(&parts).is_none());
    }
}
