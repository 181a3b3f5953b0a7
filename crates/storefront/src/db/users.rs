//! Session-token lookups for the auth boundary.
//!
//! Session issuance (login, signup, verification) belongs to the auth
//! collaborator. The storefront only resolves a bearer token to the minimal
//! caller identity: user id, role, and whether the email is verified.

use sqlx::PgPool;

use ambra_core::{UserId, UserRole};

use super::RepositoryError;
use crate::models::user::CurrentUser;

/// Resolve an unexpired session token to its user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_session_user(
    pool: &PgPool,
    session_token: &str,
) -> Result<Option<CurrentUser>, RepositoryError> {
    #[derive(sqlx::FromRow)]
    struct Record {
        id: uuid::Uuid,
        role: UserRole,
        email_verified: bool,
    }

    let record = sqlx::query_as::<_, Record>(
        r"
        SELECT u.id, u.role, u.email_verified
        FROM sessions s
        INNER JOIN users u ON u.id = s.user_id
        WHERE s.id = $1 AND s.expires_at > now()
        ",
    )
    .bind(session_token)
    .fetch_optional(pool)
    .await?;

    Ok(record.map(|r| CurrentUser {
        id: UserId::new(r.id),
        role: r.role,
        email_verified: r.email_verified,
    }))
}
