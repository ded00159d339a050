use innkeep_core::GuestId;

use crate::{Permission, Role};

/// A fully resolved principal for authorization decisions.
///
/// The API builds it from the guest's current flags on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub guest_id: GuestId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl Principal {
    pub fn from_roles(guest_id: GuestId, roles: Vec<Role>) -> Self {
        let permissions = crate::permissions_for_roles(&roles);
        Self {
            guest_id,
            roles,
            permissions,
        }
    }
}
