//! `innkeep-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how
//! to hash passwords, mint and check tokens, and decide permissions, but not
//! where guests are stored or how requests arrive.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod roles;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256Jwt, IssuedToken, JwtError, JwtValidator};
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::Permission;
pub use principal::Principal;
pub use roles::{permissions_for_roles, roles_for_flags, Role};
