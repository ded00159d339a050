use thiserror::Error;

use crate::{Permission, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for a single permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let granted = principal
        .permissions
        .iter()
        .any(|p| p.is_wildcard() || p == required);

    if granted {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::{ADMIN_MANAGE, RESERVATIONS_CREATE};
    use crate::Role;
    use innkeep_core::GuestId;

    #[test]
    fn guest_may_reserve_but_not_administer() {
        let p = Principal::from_roles(GuestId::new(), vec![Role::GUEST]);
        assert!(authorize(&p, &RESERVATIONS_CREATE).is_ok());
        assert_eq!(
            authorize(&p, &ADMIN_MANAGE),
            Err(AuthzError::Forbidden("admin.manage".to_string()))
        );
    }

    #[test]
    fn wildcard_allows_everything() {
        let p = Principal::from_roles(GuestId::new(), vec![Role::STAFF]);
        assert!(authorize(&p, &ADMIN_MANAGE).is_ok());
        assert!(authorize(&p, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn guest_without_roles_is_denied_everything() {
        let p = Principal::from_roles(GuestId::new(), vec![]);
        assert!(authorize(&p, &RESERVATIONS_CREATE).is_err());
    }
}
