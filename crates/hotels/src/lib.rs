//! Hotel domain: records, input validation and booking rules.
//!
//! Everything here is deterministic domain logic (no IO, no HTTP, no storage).
//! Callers pass `now` explicitly.

pub mod booking;
pub mod forms;
pub mod guest;
pub mod hotel;
pub mod room_service;
pub mod schedule;
mod validate;

pub use booking::{AvailableTime, Reservation};
pub use forms::{FormErrors, LoginForm, RegistrationForm, ValidRegistration};
pub use guest::{Guest, Membership};
pub use hotel::{Hotel, RoomService, Service};
pub use room_service::{RequestStatus, RoomServiceRequest};
pub use schedule::{BookingPlan, BookingPolicy, BookingRejection};
pub use validate::normalize_email;
