//! In-memory store for tests/dev.
//!
//! One `RwLock` guards all tables, so multi-table operations (cascading
//! deletes, bookings) are atomic.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

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

use super::{
    BookingLedger, GuestAccounts, HotelDirectory, MembershipRegistry,
    RoomServiceDesk, StoreError, StoreResult,
};

#[derive(Debug, Default)]
struct Tables {
    hotels: BTreeMap<HotelId, Hotel>,
    guests: BTreeMap<GuestId, Guest>,
    memberships: BTreeMap<MembershipId, Membership>,
    services: BTreeMap<ServiceId, Service>,
    slots: BTreeMap<SlotId, AvailableTime>,
    reservations: BTreeMap<ReservationId, Reservation>,
    room_services: BTreeMap<RoomServiceId, RoomService>,
    requests: BTreeMap<RoomServiceRequestId, RoomServiceRequest>,
    revoked_tokens: HashMap<Uuid, DateTime<Utc>>,
}

impl Tables {
    fn require_hotel(&self, id: HotelId) -> StoreResult<()> {
        if self.hotels.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("hotel {id}")))
        }
    }

    fn require_service(&self, id: ServiceId) -> StoreResult<()> {
        if self.services.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("service {id}")))
        }
    }

    fn require_guest(&self, id: GuestId) -> StoreResult<()> {
        if self.guests.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::InvalidReference(format!("guest {id}")))
        }
    }

    fn check_guest_unique(&self, guest: &Guest) -> StoreResult<()> {
        for other in self.guests.values().filter(|g| g.id != guest.id) {
            if other.email.eq_ignore_ascii_case(&guest.email) {
                return Err(StoreError::Conflict("a guest with this email already exists".into()));
            }
            if other.private_number == guest.private_number {
                return Err(StoreError::Conflict(
                    "a guest with this private number already exists".into(),
                ));
            }
        }
        Ok(())
    }

    fn check_membership_unique(&self, m: &Membership) -> StoreResult<()> {
        for other in self.memberships.values().filter(|o| o.id != m.id) {
            if other.private_number == m.private_number {
                return Err(StoreError::Conflict(
                    "a membership with this private number already exists".into(),
                ));
            }
            if other.email.eq_ignore_ascii_case(&m.email) {
                return Err(StoreError::Conflict("a membership with this email already exists".into()));
            }
        }
        Ok(())
    }

    fn check_reservation_refs(&self, r: &Reservation) -> StoreResult<()> {
        self.require_guest(r.guest_id)?;
        self.require_service(r.service_id)?;
        if !self.slots.contains_key(&r.reserved_for) {
            return Err(StoreError::InvalidReference(format!("available time {}", r.reserved_for)));
        }
        Ok(())
    }

    fn remove_slot_cascade(&mut self, id: SlotId) {
        self.slots.remove(&id);
        self.reservations.retain(|_, r| r.reserved_for != id);
    }

    fn remove_service_cascade(&mut self, id: ServiceId) {
        self.services.remove(&id);
        let slots: Vec<SlotId> = self
            .slots
            .values()
            .filter(|s| s.service_id == id)
            .map(|s| s.id)
            .collect();
        for slot in slots {
            self.remove_slot_cascade(slot);
        }
        self.reservations.retain(|_, r| r.service_id != id);
    }

    fn remove_room_service_cascade(&mut self, id: RoomServiceId) {
        self.room_services.remove(&id);
        self.requests.retain(|_, r| r.room_service_id != id);
    }

    fn slot_start(&self, id: SlotId) -> Option<DateTime<Utc>> {
        self.slots.get(&id).map(|s| s.start_time)
    }
}

/// All tables behind one lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }
}

fn replace<K: Ord, V>(map: &mut BTreeMap<K, V>, key: K, value: V) -> StoreResult<()> {
    match map.get_mut(&key) {
        Some(slot) => {
            *slot = value;
            Ok(())
        }
        None => Err(StoreError::NotFound),
    }
}

/// Insert under a fresh key; an existing key is a conflict, never overwritten.
fn insert_new<K: Ord + Copy + std::fmt::Display, V>(
    map: &mut BTreeMap<K, V>,
    key: K,
    value: V,
    what: &str,
) -> StoreResult<()> {
    match map.entry(key) {
        Entry::Vacant(entry) => {
            entry.insert(value);
            Ok(())
        }
        Entry::Occupied(_) => Err(StoreError::Conflict(format!("{what} {key} already exists"))),
    }
}

fn found<T>(removed: Option<T>) -> StoreResult<()> {
    removed.map(|_| ()).ok_or(StoreError::NotFound)
}

#[async_trait]
impl HotelDirectory for InMemoryStore {
    async fn list_hotels(&self) -> StoreResult<Vec<Hotel>> {
        Ok(self.read()?.hotels.values().cloned().collect())
    }

    async fn get_hotel(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        Ok(self.read()?.hotels.get(&id).cloned())
    }

    async fn insert_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        let id = hotel.id;
        insert_new(&mut self.write()?.hotels, id, hotel, "hotel")
    }

    async fn update_hotel(&self, hotel: Hotel) -> StoreResult<()> {
        replace(&mut self.write()?.hotels, hotel.id, hotel)
    }

    async fn delete_hotel(&self, id: HotelId) -> StoreResult<()> {
        let mut t = self.write()?;
        found(t.hotels.remove(&id))?;

        let services: Vec<ServiceId> = t
            .services
            .values()
            .filter(|s| s.hotel_id == id)
            .map(|s| s.id)
            .collect();
        for service in services {
            t.remove_service_cascade(service);
        }

        let room_services: Vec<RoomServiceId> = t
            .room_services
            .values()
            .filter(|r| r.hotel_id == id)
            .map(|r| r.id)
            .collect();
        for rs in room_services {
            t.remove_room_service_cascade(rs);
        }

        t.memberships.retain(|_, m| m.hotel_id != id);
        for guest in t.guests.values_mut().filter(|g| g.hotel_id == Some(id)) {
            guest.hotel_id = None;
        }
        Ok(())
    }

    async fn list_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<Service>> {
        Ok(self
            .read()?
            .services
            .values()
            .filter(|s| hotel.is_none_or(|h| s.hotel_id == h))
            .cloned()
            .collect())
    }

    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<Service>> {
        Ok(self.read()?.services.get(&id).cloned())
    }

    async fn insert_service(&self, service: Service) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(service.hotel_id)?;
        insert_new(&mut t.services, service.id, service, "service")
    }

    async fn update_service(&self, service: Service) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(service.hotel_id)?;
        replace(&mut t.services, service.id, service)
    }

    async fn delete_service(&self, id: ServiceId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.services.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        t.remove_service_cascade(id);
        Ok(())
    }

    async fn list_room_services(&self, hotel: Option<HotelId>) -> StoreResult<Vec<RoomService>> {
        Ok(self
            .read()?
            .room_services
            .values()
            .filter(|r| hotel.is_none_or(|h| r.hotel_id == h))
            .cloned()
            .collect())
    }

    async fn get_room_service(&self, id: RoomServiceId) -> StoreResult<Option<RoomService>> {
        Ok(self.read()?.room_services.get(&id).cloned())
    }

    async fn insert_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(room_service.hotel_id)?;
        insert_new(&mut t.room_services, room_service.id, room_service, "room service")
    }

    async fn update_room_service(&self, room_service: RoomService) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(room_service.hotel_id)?;
        replace(&mut t.room_services, room_service.id, room_service)
    }

    async fn delete_room_service(&self, id: RoomServiceId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.room_services.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        t.remove_room_service_cascade(id);
        Ok(())
    }
}

#[async_trait]
impl MembershipRegistry for InMemoryStore {
    async fn list_memberships(&self) -> StoreResult<Vec<Membership>> {
        Ok(self.read()?.memberships.values().cloned().collect())
    }

    async fn get_membership(&self, id: MembershipId) -> StoreResult<Option<Membership>> {
        Ok(self.read()?.memberships.get(&id).cloned())
    }

    async fn insert_membership(&self, membership: Membership) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(membership.hotel_id)?;
        t.check_membership_unique(&membership)?;
        insert_new(&mut t.memberships, membership.id, membership, "membership")
    }

    async fn update_membership(&self, membership: Membership) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_hotel(membership.hotel_id)?;
        t.check_membership_unique(&membership)?;
        replace(&mut t.memberships, membership.id, membership)
    }

    async fn delete_membership(&self, id: MembershipId) -> StoreResult<()> {
        found(self.write()?.memberships.remove(&id))
    }

    async fn is_member(&self, hotel: HotelId, private_number: &str) -> StoreResult<bool> {
        Ok(self
            .read()?
            .memberships
            .values()
            .any(|m| m.hotel_id == hotel && m.private_number == private_number))
    }

    async fn find_membership(&self, private_number: &str, email: &str) -> StoreResult<Option<Membership>> {
        Ok(self
            .read()?
            .memberships
            .values()
            .find(|m| m.private_number == private_number && m.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

#[async_trait]
impl GuestAccounts for InMemoryStore {
    async fn list_guests(&self) -> StoreResult<Vec<Guest>> {
        Ok(self.read()?.guests.values().cloned().collect())
    }

    async fn get_guest(&self, id: GuestId) -> StoreResult<Option<Guest>> {
        Ok(self.read()?.guests.get(&id).cloned())
    }

    async fn guest_by_email(&self, email: &str) -> StoreResult<Option<Guest>> {
        Ok(self
            .read()?
            .guests
            .values()
            .find(|g| g.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn guest_by_private_number(&self, private_number: &str) -> StoreResult<Option<Guest>> {
        Ok(self
            .read()?
            .guests
            .values()
            .find(|g| g.private_number == private_number)
            .cloned())
    }

    async fn insert_guest(&self, guest: Guest) -> StoreResult<()> {
        let mut t = self.write()?;
        if let Some(hotel) = guest.hotel_id {
            t.require_hotel(hotel)?;
        }
        t.check_guest_unique(&guest)?;
        insert_new(&mut t.guests, guest.id, guest, "guest")
    }

    async fn update_guest(&self, guest: Guest) -> StoreResult<()> {
        let mut t = self.write()?;
        if let Some(hotel) = guest.hotel_id {
            t.require_hotel(hotel)?;
        }
        t.check_guest_unique(&guest)?;
        replace(&mut t.guests, guest.id, guest)
    }

    async fn delete_guest(&self, id: GuestId) -> StoreResult<()> {
        let mut t = self.write()?;
        found(t.guests.remove(&id))?;
        t.reservations.retain(|_, r| r.guest_id != id);
        t.requests.retain(|_, r| r.guest_id != id);
        Ok(())
    }

    async fn revoke_token(&self, jti: Uuid, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> StoreResult<()> {
        let mut t = self.write()?;
        t.revoked_tokens.retain(|_, expiry| *expiry > now);
        t.revoked_tokens.insert(jti, expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: Uuid) -> StoreResult<bool> {
        Ok(self.read()?.revoked_tokens.contains_key(&jti))
    }
}

#[async_trait]
impl BookingLedger for InMemoryStore {
    async fn list_slots(&self, service: Option<ServiceId>) -> StoreResult<Vec<AvailableTime>> {
        let mut slots: Vec<AvailableTime> = self
            .read()?
            .slots
            .values()
            .filter(|s| service.is_none_or(|id| s.service_id == id))
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.start_time, s.id));
        Ok(slots)
    }

    async fn get_slot(&self, id: SlotId) -> StoreResult<Option<AvailableTime>> {
        Ok(self.read()?.slots.get(&id).cloned())
    }

    async fn insert_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_service(slot.service_id)?;
        insert_new(&mut t.slots, slot.id, slot, "available time")
    }

    async fn update_slot(&self, slot: AvailableTime) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_service(slot.service_id)?;
        replace(&mut t.slots, slot.id, slot)
    }

    async fn delete_slot(&self, id: SlotId) -> StoreResult<()> {
        let mut t = self.write()?;
        if !t.slots.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        t.remove_slot_cascade(id);
        Ok(())
    }

    async fn list_reservations(&self, guest: Option<GuestId>) -> StoreResult<Vec<Reservation>> {
        let mut reservations: Vec<Reservation> = self
            .read()?
            .reservations
            .values()
            .filter(|r| guest.is_none_or(|g| r.guest_id == g))
            .cloned()
            .collect();
        reservations.sort_by(|a, b| b.reservation_date.cmp(&a.reservation_date).then(b.id.cmp(&a.id)));
        Ok(reservations)
    }

    async fn get_reservation(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        Ok(self.read()?.reservations.get(&id).cloned())
    }

    async fn insert_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        let mut t = self.write()?;
        t.check_reservation_refs(&reservation)?;
        insert_new(&mut t.reservations, reservation.id, reservation, "reservation")
    }

    async fn update_reservation(&self, reservation: Reservation) -> StoreResult<()> {
        let mut t = self.write()?;
        t.check_reservation_refs(&reservation)?;
        replace(&mut t.reservations, reservation.id, reservation)
    }

    async fn delete_reservation(&self, id: ReservationId) -> StoreResult<()> {
        found(self.write()?.reservations.remove(&id))
    }

    async fn reserved_starts(
        &self,
        service: ServiceId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> StoreResult<HashSet<DateTime<Utc>>> {
        let t = self.read()?;
        Ok(t.reservations
            .values()
            .filter(|r| r.service_id == service)
            .filter_map(|r| t.slot_start(r.reserved_for))
            .filter(|start| *start >= from && *start < until)
            .collect())
    }

    async fn book(
        &self,
        guest: GuestId,
        service: ServiceId,
        starts: &[DateTime<Utc>],
        slot_length: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<(Reservation, AvailableTime)>> {
        let mut t = self.write()?;
        t.require_guest(guest)?;
        t.require_service(service)?;

        let taken: HashSet<DateTime<Utc>> = t
            .reservations
            .values()
            .filter(|r| r.service_id == service)
            .filter_map(|r| t.slot_start(r.reserved_for))
            .collect();
        let clashes: Vec<DateTime<Utc>> = starts.iter().filter(|s| taken.contains(*s)).copied().collect();
        if !clashes.is_empty() {
            return Err(StoreError::SlotsTaken(clashes));
        }

        let mut booked = Vec::with_capacity(starts.len());
        for start in starts {
            let end = *start + slot_length;
            let existing = t
                .slots
                .values()
                .find(|s| s.service_id == service && s.start_time == *start && s.end_time == end)
                .map(|s| s.id);

            let slot_id = match existing {
                Some(id) => id,
                None => {
                    let slot = AvailableTime::new(service, *start, slot_length);
                    let id = slot.id;
                    t.slots.insert(id, slot);
                    id
                }
            };

            let slot = match t.slots.get_mut(&slot_id) {
                Some(slot) => {
                    slot.is_reserved = true;
                    slot.clone()
                }
                None => return Err(StoreError::Backend("slot vanished during booking".into())),
            };

            let reservation = Reservation::new(guest, service, slot_id, now);
            t.reservations.insert(reservation.id, reservation.clone());
            booked.push((reservation, slot));
        }
        Ok(booked)
    }
}

#[async_trait]
impl RoomServiceDesk for InMemoryStore {
    async fn list_requests(&self, guest: Option<GuestId>) -> StoreResult<Vec<RoomServiceRequest>> {
        let mut requests: Vec<RoomServiceRequest> = self
            .read()?
            .requests
            .values()
            .filter(|r| guest.is_none_or(|g| r.guest_id == g))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.request_date.cmp(&a.request_date).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn get_request(&self, id: RoomServiceRequestId) -> StoreResult<Option<RoomServiceRequest>> {
        Ok(self.read()?.requests.get(&id).cloned())
    }

    async fn insert_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_guest(request.guest_id)?;
        if !t.room_services.contains_key(&request.room_service_id) {
            return Err(StoreError::InvalidReference(format!(
                "room service {}",
                request.room_service_id
            )));
        }
        insert_new(&mut t.requests, request.id, request, "room service request")
    }

    async fn update_request(&self, request: RoomServiceRequest) -> StoreResult<()> {
        let mut t = self.write()?;
        t.require_guest(request.guest_id)?;
        if !t.room_services.contains_key(&request.room_service_id) {
            return Err(StoreError::InvalidReference(format!(
                "room service {}",
                request.room_service_id
            )));
        }
        replace(&mut t.requests, request.id, request)
    }

    async fn delete_request(&self, id: RoomServiceRequestId) -> StoreResult<()> {
        found(self.write()?.requests.remove(&id))
    }
}
