use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{self, Permission};

/// Role identifier used for RBAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const STAFF: Role = Role(Cow::Borrowed("staff"));
    pub const GUEST: Role = Role(Cow::Borrowed("guest"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Roles carried in a token, derived from the account flags.
pub fn roles_for_flags(is_staff: bool, is_user: bool) -> Vec<Role> {
    let mut roles = Vec::new();
    if is_staff {
        roles.push(Role::STAFF);
    }
    if is_user {
        roles.push(Role::GUEST);
    }
    roles
}

/// Role→permission policy.
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.iter().any(|r| *r == Role::STAFF) {
        return vec![permissions::WILDCARD];
    }

    if roles.iter().any(|r| *r == Role::GUEST) {
        return vec![
            permissions::RESERVATIONS_CREATE,
            permissions::RESERVATIONS_READ,
            permissions::ROOM_SERVICE_REQUEST,
            permissions::ROOM_SERVICE_READ,
        ];
    }

    Vec::new()
}
