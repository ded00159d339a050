//! Storage contracts for every record type, with an in-memory and a Postgres
//! implementation.
//!
//! Traits are split by concern so handlers only see what they use; `Store`
//! bundles them for wiring.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use innkeep_core::{
    GuestId, HotelId, MembershipId, ReservationId, RoomServiceId, RoomServiceRequestId, ServiceId,
    SlotId,
};
use innkeep_hotels::{
    AvailableTime, Guest, Hotel, Membership, Reservation, RoomService, RoomServiceRequest, Service,
};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record to update or delete does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness rule was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A booking asked for starts that are already reserved.
    #[error("already reserved: {}", format_starts(.0))]
    SlotsTaken(Vec<DateTime<Utc>>),

    /// A foreign key points at a record that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait HotelDirectory: Send + Sync {
    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>>;
    async fn get_hotel(&self, id: HotelId) -> StoreResult<Option<Hotel>>;
    async fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()>;
    async fn update_hotel(&self, hotel: Hotel) -> StoreResult<()>;
    /// Cascades to services, room services and memberships; guests keep
    /// their account but lose the hotel link.
    async fn delete_hotel(&self, id: HotelId) -> StoreResult<()>;

    async fn list_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<Service>>;
    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<Service>>;
    async fn insert_service(&self, service: Service) -> StoreResult<()>;
    async fn update_service(&self, service: Service) -> StoreResult<()>;
    async fn delete_service(&self, id: ServiceId) -> StoreResult<()>;

    async fn list_room_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<RoomService>>;
    async fn get_room_service(&self, id: RoomServiceId) -> StoreResult<Option<RoomService>>;
    async fn insert_room_service(&self, room_service: RoomService) -> StoreResult<()>;
    async fn update_room_service(&self, room_service: RoomService) -> StoreResult<()>;
    async fn delete_room_service(&self, id: RoomServiceId) -> StoreResult<()>;
}

#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    async fn list_memberships(&self) -> StoreResult<Vec<Membership>>;
    async fn get_membership(&self, id: MembershipId) -> StoreResult<Option<Membership>>;
    async fn insert_membership(&self, membership: Membership) -> StoreResult<()>;
    async fn update_membership(&self, membership: Membership) -> StoreResult<()>;
    async fn delete_membership(&self, id: MembershipId) -> StoreResult<()>;

    /// Whether `private_number` is registered at `hotel`.
    async fn is_member(&self, hotel: HotelId, private_number: &str) -> StoreResult<bool>;

    /// The membership matching both identifiers, if any.
    async fn find_membership(&self, private_number: &str, email: &str) -> StoreResult<Option<Membership>>;
}

#[async_trait]
pub trait GuestAccounts: Send + Sync {
    async fn list_guests(&self) -> StoreResult<Vec<Guest>>;
    async fn get_guest(&self, id: GuestId) -> StoreResult<Option<Guest>>;
    async fn guest_by_email(&self, email: &str) -> StoreResult<Option<Guest>>;
    async fn guest_by_private_number(&self, private_number: &str) -> StoreResult<Option<Guest>>;
    async fn insert_guest(&self, guest: Guest) -> StoreResult<()>;
    async fn update_guest(&self, guest: Guest) -> StoreResult<()>;
    async fn delete_guest(&self, id: GuestId) -> StoreResult<()>;

    /// Record a logged-out token. Entries whose token expired by `now` are
    /// dropped on the way, since expired tokens fail validation anyway.
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> StoreResult<()>;
    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait BookingLedger: Send + Sync {
    async fn list_slots(&self, service: Option<ServiceId>) -> StoreResult<Vec<AvailableTime>>;
    async fn get_slot(&self, id: SlotId) -> StoreResult<Option<AvailableTime>>;
    async fn insert_slot(&self, slot: AvailableTime) -> StoreResult<()>;
    async fn update_slot(&self, slot: AvailableTime) -> StoreResult<()>;
    async fn delete_slot(&self, id: SlotId) -> StoreResult<()>;

    /// Reservations newest first, optionally only one guest's.
    async fn list_reservations(&self, guest: Option<GuestId>) -> StoreResult<Vec<Reservation>>;
    async fn get_reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>>;
    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()>;
    async fn update_reservation(&self, reservation: Reservation) -> StoreResult<()>;
    async fn delete_reservation(&self, id: ReservationId) -> StoreResult<()>;

    /// Starts of reserved slots for `service` within `[from, until)`.
    async fn reserved_starts(
        &self,
        service: ServiceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<HashSet<DateTime<Utc>>>;

    /// Reserve every start for `guest` atomically.
    ///
    /// Each start reuses the matching slot or creates one, marks it reserved
    /// and gets a reservation. Fails with `SlotsTaken` (writing nothing) when
    /// any start is already reserved, naming those starts.
    async fn book(
        &self,
        guest: GuestId,
        service: ServiceId,
        starts: &[DateTime<Utc>],
        slot_length: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(Reservation, AvailableTime)>>;
}

#[async_trait]
pub trait RoomServiceDesk: Send + Sync {
    /// Requests newest first, optionally only one guest's.
    async fn list_requests(&self, guest: Option<GuestId>) -> StoreResult<Vec<RoomServiceRequest>>;
    async fn get_request(&self, id: RoomServiceRequestId) -> StoreResult<Option<RoomServiceRequest>>;
    async fn insert_request(&self, request: RoomServiceRequest) -> StoreResult<()>;
    async fn update_request(&self, request: RoomServiceRequest) -> StoreResult<()>;
    async fn delete_request(&self, id: RoomServiceRequestId) -> StoreResult<()>;
}

/// Everything the application needs from storage.
pub trait Store:
    HotelDirectory + MembershipRegistry + GuestAccounts + BookingLedger + RoomServiceDesk
{
}

impl<T> Store for T where
    T: HotelDirectory + MembershipRegistry + GuestAccounts + BookingLedger + RoomServiceDesk
{
}

fn format_starts(starts: &[DateTime<Utc>]) -> String {
    starts.iter().map(|s| s.to_rfc3339()).collect::<Vec<_>>().join(", ")
}
