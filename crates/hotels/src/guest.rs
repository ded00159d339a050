//! Guest accounts and hotel memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use innkeep_core::{DomainError, DomainResult, GuestId, HotelId, MembershipId};

use crate::validate;

pub const PRIVATE_NUMBER_MAX: usize = 20;
pub const BANK_CARD_MAX: usize = 16;

/// A login account. Authenticates by email; identified to staff by the
/// private number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    pub email: String,
    pub private_number: String,
    /// Argon2 PHC string; never serialized to clients.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub bank_card: Option<String>,
    pub is_staff: bool,
    pub is_user: bool,
    pub hotel_id: Option<HotelId>,
    pub date_joined: DateTime<Utc>,
}

impl Guest {
    pub fn new(
        email: String,
        private_number: String,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let guest = Self {
            id: GuestId::new(),
            email: validate::normalize_email(&email),
            private_number: private_number.trim().to_string(),
            password_hash,
            bank_card: None,
            is_staff: false,
            is_user: true,
            hotel_id: None,
            date_joined: now,
        };
        guest.validate()?;
        Ok(guest)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::email("email", &self.email)?;
        validate::text("private_number", &self.private_number, PRIVATE_NUMBER_MAX)?;
        if let Some(card) = &self.bank_card {
            if card.is_empty()
                || card.chars().count() > BANK_CARD_MAX
                || !card.chars().all(|c| c.is_ascii_digit())
            {
                return Err(DomainError::validation(
                    "bank_card: must be up to 16 digits",
                ));
            }
        }
        Ok(())
    }
}

impl core::fmt::Display for Guest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.private_number)
    }
}

/// Proof that a person (private number + email) may transact at a hotel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: MembershipId,
    pub hotel_id: HotelId,
    pub private_number: String,
    pub email: String,
}

impl Membership {
    pub fn new(hotel_id: HotelId, private_number: String, email: String) -> DomainResult<Self> {
        let m = Self {
            id: MembershipId::new(),
            hotel_id,
            private_number: private_number.trim().to_string(),
            email: validate::normalize_email(&email),
        };
        m.validate()?;
        Ok(m)
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate::text("private_number", &self.private_number, PRIVATE_NUMBER_MAX)?;
        validate::email("email", &self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_defaults_to_plain_user() {
        let g = Guest::new("A@Example.com".into(), " 123 ".into(), "h".into(), Utc::now()).unwrap();
        assert!(g.is_user);
        assert!(!g.is_staff);
        assert_eq!(g.email, "A@example.com");
        assert_eq!(g.private_number, "123");
        assert_eq!(g.to_string(), "123");
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let g = Guest::new("a@example.com".into(), "1".into(), "secret-hash".into(), Utc::now()).unwrap();
        let json = serde_json::to_value(&g).unwrap();
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn bank_card_must_be_digits() {
        let mut g = Guest::new("a@example.com".into(), "1".into(), "h".into(), Utc::now()).unwrap();
        g.bank_card = Some("1234-5678".into());
        assert!(g.validate().is_err());
        g.bank_card = Some("4111111111111111".into());
        assert!(g.validate().is_ok());
    }

    #[test]
    fn membership_validates_email() {
        assert!(Membership::new(HotelId::new(), "77".into(), "nope".into()).is_err());
    }
}
