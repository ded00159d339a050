//! API-side authorization guard.
//!
//! Checked in handlers before touching storage, so the store stays
//! auth-agnostic.

use innkeep_auth::{AuthzError, Permission};

use crate::context::PrincipalContext;

/// Check that the request's principal holds `required`.
pub fn authorize(principal: &PrincipalContext, required: &Permission) -> Result<(), AuthzError> {
    innkeep_auth::authorize(&principal.principal(), required)
}
