//! Store doubles for black-box tests.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use innkeep_core::{
    GuestId, HotelId, MembershipId, ReservationId, RoomServiceId, RoomServiceRequestId, ServiceId,
    SlotId,
};
use innkeep_hotels::{
    AvailableTime, Guest, Hotel, Membership, Reservation, RoomService, RoomServiceRequest, Service,
};
use innkeep_infra::{
    BookingLedger, GuestAccounts, HotelDirectory, InMemoryStore, MembershipRegistry, RoomServiceDesk,
    StoreResult,
};

/// An in-memory store whose availability reads never see reservations, as if
/// another booking always lands between the page read and the write.
#[derive(Default)]
pub struct StaleReads(pub InMemoryStore);

#[async_trait]
impl HotelDirectory for StaleReads {
    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>> {
        self.0.list_hotels().await
    }
    async fn get_hotel(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        self.0.get_hotel(id).await
    }
    async fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        self.0.insert_hotel(hotel).await
    }
    async fn update_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        self.0.update_hotel(hotel).await
    }
    async fn delete_hotel(&self, id: HotelId) -> StoreResult<()> {
        self.0.delete_hotel(id).await
    }
    async fn list_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<Service>> {
        self.0.list_services(hotel).await
    }
    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<Service>> {
        self.0.get_service(id).await
    }
    async fn insert_service(&self, service: Service) -> StoreResult<()> {
        self.0.insert_service(service).await
    }
    async fn update_service(&self, service: Service) -> StoreResult<()> {
        self.0.update_service(service).await
    }
    async fn delete_service(&self, id: ServiceId) -> StoreResult<()> {
        self.0.delete_service(id).await
    }
    async fn list_room_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<RoomService>> {
        self.0.list_room_services(hotel).await
    }
    async fn get_room_service(&self, id: RoomServiceId) -> StoreResult<Option<RoomService>> {
        self.0.get_room_service(id).await
    }
    async fn insert_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        self.0.insert_room_service(room_service).await
    }
    async fn update_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        self.0.update_room_service(room_service).await
    }
    async fn delete_room_service(&self, id: RoomServiceId) -> StoreResult<()> {
        self.0.delete_room_service(id).await
    }
}

#[async_trait]
impl MembershipRegistry for StaleReads {
    async fn list_memberships(&self) -> StoreResult<Vec<Membership>> {
        self.0.list_memberships().await
    }
    async fn get_membership(&self, id: MembershipId) -> StoreResult<Option<Membership>> {
        self.0.get_membership(id).await
    }
    async fn insert_membership(&self, membership: Membership) -> StoreResult<()> {
        self.0.insert_membership(membership).await
    }
    async fn update_membership(&self, membership: Membership) -> StoreResult<()> {
        self.0.update_membership(membership).await
    }
    async fn delete_membership(&self, id: MembershipId) -> StoreResult<()> {
        self.0.delete_membership(id).await
    }
    async fn is_member(&self, hotel: HotelId, private_number: &str) -> StoreResult<bool> {
        self.0.is_member(hotel, private_number).await
    }
    async fn find_membership(&self, private_number: &str, email: &str) -> StoreResult<Option<Membership>> {
        self.0.find_membership(private_number, email).await
    }
}

#[async_trait]
impl GuestAccounts for StaleReads {
    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        self.0.list_guests().await
    }
    async fn get_guest(&self, id: GuestId) -> StoreResult<Option<Guest>> {
        self.0.get_guest(id).await
    }
    async fn guest_by_email(&self, email: &str) -> StoreResult<Option<Guest>> {
        self.0.guest_by_email(email).await
    }
    async fn guest_by_private_number(&self, private_number: &str) -> StoreResult<Option<Guest>> {
        self.0.guest_by_private_number(private_number).await
    }
    async fn insert_guest(&self, guest: Guest) -> StoreResult<()> {
        self.0.insert_guest(guest).await
    }
    async fn update_guest(&self, guest: Guest) -> StoreResult<()> {
        self.0.update_guest(guest).await
    }
    async fn delete_guest(&self, id: GuestId) -> StoreResult<()> {
        self.0.delete_guest(id).await
    }
    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> StoreResult<()> {
        self.0.revoke_token(jti, expires_at, now).await
    }
    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        self.0.is_token_revoked(jti).await
    }
}

#[async_trait]
impl BookingLedger for StaleReads {
    async fn list_slots(&self, service: Option<ServiceId>) -> StoreResult<Vec<AvailableTime>> {
        self.0.list_slots(service).await
    }
    async fn get_slot(&self, id: SlotId) -> StoreResult<Option<AvailableTime>> {
        self.0.get_slot(id).await
    }
    async fn insert_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        self.0.insert_slot(slot).await
    }
    async fn update_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        self.0.update_slot(slot).await
    }
    async fn delete_slot(&self, id: SlotId) -> StoreResult<()> {
        self.0.delete_slot(id).await
    }
    async fn list_reservations(&self, guest: Option<GuestId>) -> StoreResult<Vec<Reservation>> {
        self.0.list_reservations(guest).await
    }
    async fn get_reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        self.0.get_reservation(id).await
    }
    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        self.0.insert_reservation(reservation).await
    }
    async fn update_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        self.0.update_reservation(reservation).await
    }
    async fn delete_reservation(&self, id: ReservationId) -> StoreResult<()> {
        self.0.delete_reservation(id).await
    }

    async fn reserved_starts(
        &self,
        _service: ServiceId,
        _from: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> StoreResult<HashSet<DateTime<Utc>>> {
        Ok(HashSet::new())
    }

    async fn book(
        &self,
        guest: GuestId,
        service: ServiceId,
        starts: &[DateTime<Utc>],
        slot_length: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(Reservation, AvailableTime)>> {
        self.0.book(guest, service, starts, slot_length, now).await
    }
}

#[async_trait]
impl RoomServiceDesk for StaleReads {
    async fn list_requests(&self, guest: Option<GuestId>) -> StoreResult<Vec<RoomServiceRequest>> {
        self.0.list_requests(guest).await
    }
    async fn get_request(&self, id: RoomServiceRequestId) -> StoreResult<Option<RoomServiceRequest>> {
        self.0.get_request(id).await
    }
    async fn insert_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        self.0.insert_request(request).await
    }
    async fn update_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        self.0.update_request(request).await
    }
    async fn delete_request(&self, id: RoomServiceRequestId) -> StoreResult<()> {
        self.0.delete_request(id).await
    }
}
