use chrono::{DateTime, Utc};
use uuid::Uuid;

use innkeep_auth::{roles_for_flags, JwtClaims, Principal, Role};
use innkeep_core::GuestId;
use innkeep_hotels::Guest;

/// Authenticated guest for a request.
///
/// Roles come from the stored account, not from the token, so a demotion takes
/// effect on the next request. The token id is kept for logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    guest_id: GuestId,
    roles: Vec<Role>,
    token_id: Uuid,
    token_expires_at: DateTime<Utc>,
}

impl PrincipalContext {
    pub fn for_guest(claims: &JwtClaims, guest: &Guest) -> Self {
        Self {
            guest_id: guest.id,
            roles: roles_for_flags(guest.is_staff, guest.is_user),
            token_id: claims.jti,
            token_expires_at: claims.expires_at,
        }
    }

    pub fn guest_id(&self) -> GuestId {
        self.guest_id
    }

    pub fn token_id(&self) -> Uuid {
        self.token_id
    }

    pub fn token_expires_at(&self) -> DateTime<Utc> {
        self.token_expires_at
    }

    pub fn principal(&self) -> Principal {
        Principal::from_roles(self.guest_id, self.roles.clone())
    }
}

/// Set by the optional-auth layer: `None` for anonymous visitors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaybePrincipal(pub Option<PrincipalContext>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_follow_the_account_not_the_token() {
        let now = Utc::now();
        let mut guest = Guest::new("ann@example.com".into(), "01001012345".into(), "hash".into(), now).unwrap();
        let claims = JwtClaims {
            sub: guest.id,
            roles: vec![Role::STAFF, Role::GUEST],
            jti: Uuid::now_v7(),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        };

        let ctx = PrincipalContext::for_guest(&claims, &guest);
        assert_eq!(ctx.principal().roles, vec![Role::GUEST]);
        assert_eq!(ctx.token_id(), claims.jti);

        guest.is_staff = true;
        guest.is_user = false;
        assert_eq!(PrincipalContext::for_guest(&claims, &guest).principal().roles, vec![Role::STAFF]);
    }
}
