use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "reservations.create").
/// A special wildcard permission `"*"` is granted to staff and allows all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

pub const WILDCARD: Permission = Permission::from_static("*");
pub const RESERVATIONS_CREATE: Permission = Permission::from_static("reservations.create");
pub const RESERVATIONS_READ: Permission = Permission::from_static("reservations.read");
pub const ROOM_SERVICE_REQUEST: Permission = Permission::from_static("room_service.request");
pub const ROOM_SERVICE_READ: Permission = Permission::from_static("room_service.read");
/// Admin CRUD; only reachable through the wildcard.
pub const ADMIN_MANAGE: Permission = Permission::from_static("admin.manage");
