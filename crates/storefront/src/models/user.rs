//! Authenticated caller identity.

use ambra_core::{UserId, UserRole};

/// The caller resolved from a bearer session token.
///
/// Session issuance lives in the auth collaborator; this is the minimal
/// identity the storefront needs to attribute orders and gate staff
/// mutations.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: UserId,
    pub role: UserRole,
    pub email_verified: bool,
}

impl CurrentUser {
    /// Whether this user may call the staff-only entry points.
    ///
    /// Mirrors the dashboard gate: a verified email and a non-customer role.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.email_verified && self.role.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unverified_staff_is_rejected() {
        let user = CurrentUser {
            id: UserId::generate(),
            role: UserRole::Admin,
            email_verified: false,
        };
        assert!(!user.is_staff());
    }

    #[test]
    fn test_verified_moderator_is_staff() {
        let user = CurrentUser {
            id: UserId::generate(),
            role: UserRole::Moderator,
            email_verified: true,
        };
        assert!(user.is_staff());
    }
}
