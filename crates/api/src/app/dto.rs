use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use innkeep_core::{GuestId, HotelId, Money, RoomServiceId, ServiceId, SlotId};
use innkeep_hotels::{
    AvailableTime, BookingPolicy, Hotel, RequestStatus, Reservation, RoomService, RoomServiceRequest,
    Service,
};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ReserveRequest {
    /// Local start times, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default)]
    pub reservation_times: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoomServiceRequestBody {
    pub room_service: Option<RoomServiceId>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub hotel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HotelInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct GuestInput {
    pub email: String,
    pub private_number: String,
    /// Required when creating; keeps the current hash when omitted on update.
    pub password: Option<String>,
    pub bank_card: Option<String>,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default = "yes")]
    pub is_user: bool,
    pub hotel_id: Option<HotelId>,
}

#[derive(Debug, Deserialize)]
pub struct MembershipInput {
    pub hotel_id: HotelId,
    pub private_number: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ServiceInput {
    pub hotel_id: HotelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default = "yes")]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct AvailableTimeInput {
    pub service_id: ServiceId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub is_reserved: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReservationInput {
    pub guest_id: GuestId,
    pub service_id: ServiceId,
    pub reserved_for: SlotId,
    pub reservation_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RoomServiceInput {
    pub hotel_id: HotelId,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomServiceRequestInput {
    pub guest_id: GuestId,
    pub room_service_id: RoomServiceId,
    #[serde(default)]
    pub status: RequestStatus,
    pub request_date: Option<DateTime<Utc>>,
}

// -------------------------
// Response mapping
// -------------------------

pub fn hotel_to_json(h: &Hotel) -> Value {
    json!({
        "id": h.id.to_string(),
        "name": h.name,
        "description": h.description,
        "location": h.location,
    })
}

pub fn service_to_json(s: &Service) -> Value {
    json!({
        "id": s.id.to_string(),
        "hotel_id": s.hotel_id.to_string(),
        "name": s.name,
        "description": s.description,
        "price": s.price.to_string(),
        "available": s.available,
    })
}

pub fn room_service_to_json(rs: &RoomService) -> Value {
    json!({
        "id": rs.id.to_string(),
        "hotel_id": rs.hotel_id.to_string(),
        "name": rs.name,
    })
}

pub fn slot_to_json(slot: &AvailableTime, policy: &BookingPolicy) -> Value {
    json!({
        "id": slot.id.to_string(),
        "service_id": slot.service_id.to_string(),
        "start_time": slot.start_time.to_rfc3339(),
        "end_time": slot.end_time.to_rfc3339(),
        "local_start": policy.format_local(slot.start_time),
        "is_reserved": slot.is_reserved,
    })
}

/// A guest's reservation with the service name and booked window inlined.
pub fn reservation_to_json(
    r: &Reservation,
    service: Option<&Service>,
    slot: Option<&AvailableTime>,
    policy: &BookingPolicy,
) -> Value {
    json!({
        "id": r.id.to_string(),
        "service": {
            "id": r.service_id.to_string(),
            "name": service.map(|s| s.name.as_str()),
        },
        "reservation_date": r.reservation_date.to_rfc3339(),
        "reserved_for": slot.map(|s| slot_to_json(s, policy)),
    })
}

pub fn request_to_json(r: &RoomServiceRequest, room_service: Option<&RoomService>) -> Value {
    json!({
        "id": r.id.to_string(),
        "room_service": {
            "id": r.room_service_id.to_string(),
            "name": room_service.map(|rs| rs.name.as_str()),
        },
        "request_date": r.request_date.to_rfc3339(),
        "status": r.status.as_str(),
    })
}
