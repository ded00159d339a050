//! `innkeep-core`: shared building blocks for the hotel domain.
//!
//! This crate contains **pure** primitives (no infrastructure concerns):
//! identifiers, the domain error model, money and a clock abstraction.

pub mod clock;
pub mod error;
pub mod id;
pub mod value_object;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{DomainError, DomainResult};
pub use id::{
    GuestId, HotelId, MembershipId, ReservationId, RoomServiceId, RoomServiceRequestId, ServiceId,
    SlotId,
};
pub use value_object::Money;
