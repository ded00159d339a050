//! Staff back office: CRUD over every record type.
//!
//! Each record type implements [`AdminModel`]; the handlers are generic over
//! it, so all models share one permission check, id parsing and error mapping.
//! Updates replace the whole record (PUT semantics).

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use innkeep_auth::permissions::ADMIN_MANAGE;
use innkeep_core::{
    DomainError, GuestId, HotelId, MembershipId, ReservationId, RoomServiceId, RoomServiceRequestId,
    ServiceId, SlotId,
};
use innkeep_hotels::{
    normalize_email, AvailableTime, Guest, Hotel, Membership, Reservation, RoomService,
    RoomServiceRequest, Service,
};
use innkeep_infra::{
    BookingLedger, GuestAccounts, HotelDirectory, MembershipRegistry, RoomServiceDesk, Store,
    StoreResult,
};

use crate::app::routes::common::{hash_secret, require};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

#[async_trait]
pub trait AdminModel: Send + Sync + 'static {
    type Id: FromStr<Err = DomainError> + Copy + Display + Send + Sync;
    type Record: Serialize + Send + Sync;
    type Input: DeserializeOwned + Send + 'static;

    /// Singular name used in messages.
    const LABEL: &'static str;

    fn id_of(record: &Self::Record) -> Self::Id;

    /// Build a record from input; `existing` is the stored record on update.
    async fn build(
        services: &AppServices,
        input: Self::Input,
        existing: Option<Self::Record>,
    ) -> Result<Self::Record, Response>;

    async fn list(store: &dyn Store) -> StoreResult<Vec<Self::Record>>;
    async fn get(store: &dyn Store, id: Self::Id) -> StoreResult<Option<Self::Record>>;
    async fn insert(store: &dyn Store, record: Self::Record) -> StoreResult<()>;
    async fn update(store: &dyn Store, record: Self::Record) -> StoreResult<()>;
    async fn delete(store: &dyn Store, id: Self::Id) -> StoreResult<()>;

    /// The list-view columns for one record.
    async fn row(store: &dyn Store, record: &Self::Record) -> StoreResult<Value>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

pub fn router() -> Router {
    Router::new()
        .nest("/hotels", model_routes::<Hotels>())
        .nest("/guests", model_routes::<Guests>())
        .nest("/memberships", model_routes::<Memberships>())
        .nest("/services", model_routes::<Services>())
        .nest("/available_times", model_routes::<AvailableTimes>())
        .nest("/reservations", model_routes::<Reservations>())
        .nest("/room_services", model_routes::<RoomServices>())
        .nest("/room_service_requests", model_routes::<RoomServiceRequests>())
}

fn model_routes<M: AdminModel>() -> Router {
    Router::new()
        .route("/", get(list::<M>).post(create::<M>))
        .route("/:id", get(detail::<M>).put(update::<M>).delete(remove::<M>))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list<M: AdminModel>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    if let Err(res) = require(&principal, ADMIN_MANAGE) {
        return res;
    }
    let records = match M::list(&*services.store).await {
        Ok(r) => r,
        Err(e) => return errors::store_error_to_response(e),
    };
    let mut items = Vec::with_capacity(records.len());
    for record in &records {
        match M::row(&*services.store, record).await {
            Ok(row) => items.push(row),
            Err(e) => return errors::store_error_to_response(e),
        }
    }
    (StatusCode::OK, Json(json!({ "items": items }))).into_response()
}

async fn detail<M: AdminModel>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(res) = require(&principal, ADMIN_MANAGE) {
        return res;
    }
    let id: M::Id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match M::get(&*services.store, id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => errors::not_found(M::LABEL),
        Err(e) => errors::store_error_to_response(e),
    }
}

async fn create<M: AdminModel>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Json(input): Json<M::Input>,
) -> Response {
    if let Err(res) = require(&principal, ADMIN_MANAGE) {
        return res;
    }
    let record = match M::build(&services, input, None).await {
        Ok(r) => r,
        Err(res) => return res,
    };
    let id = M::id_of(&record);
    let body = Json(&record).into_response();
    if let Err(e) = M::insert(&*services.store, record).await {
        return errors::store_error_to_response(e);
    }
    tracing::info!(model = M::LABEL, id = %id, staff_id = %principal.guest_id(), "admin created record");
    (StatusCode::CREATED, body).into_response()
}

async fn update<M: AdminModel>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(input): Json<M::Input>,
) -> Response {
    if let Err(res) = require(&principal, ADMIN_MANAGE) {
        return res;
    }
    let id: M::Id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    let existing = match M::get(&*services.store, id).await {
        Ok(Some(r)) => r,
        Ok(None) => return errors::not_found(M::LABEL),
        Err(e) => return errors::store_error_to_response(e),
    };
    let record = match M::build(&services, input, Some(existing)).await {
        Ok(r) => r,
        Err(res) => return res,
    };
    let body = Json(&record).into_response();
    if let Err(e) = M::update(&*services.store, record).await {
        return errors::store_error_to_response(e);
    }
    tracing::info!(model = M::LABEL, id = %id, staff_id = %principal.guest_id(), "admin updated record");
    body
}

async fn remove<M: AdminModel>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    if let Err(res) = require(&principal, ADMIN_MANAGE) {
        return res;
    }
    let id: M::Id = match errors::parse_id(&id) {
        Ok(id) => id,
        Err(res) => return res,
    };
    match M::delete(&*services.store, id).await {
        Ok(()) => {
            tracing::info!(model = M::LABEL, id = %id, staff_id = %principal.guest_id(), "admin deleted record");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Models
// ─────────────────────────────────────────────────────────────────────────────

fn invalid(err: DomainError) -> Response {
    errors::domain_error_to_response(err)
}

async fn hotel_name(store: &dyn Store, id: HotelId) -> StoreResult<Option<String>> {
    Ok(store.get_hotel(id).await?.map(|h| h.name))
}

async fn service_name(store: &dyn Store, id: ServiceId) -> StoreResult<Option<String>> {
    Ok(store.get_service(id).await?.map(|s| s.name))
}

async fn guest_label(store: &dyn Store, id: GuestId) -> StoreResult<Option<String>> {
    Ok(store.get_guest(id).await?.map(|g| g.to_string()))
}

pub struct Hotels;

#[async_trait]
impl AdminModel for Hotels {
    type Id = HotelId;
    type Record = Hotel;
    type Input = dto::HotelInput;
    const LABEL: &'static str = "hotel";

    fn id_of(record: &Hotel) -> HotelId {
        record.id
    }

    async fn build(_: &AppServices, input: dto::HotelInput, existing: Option<Hotel>) -> Result<Hotel, Response> {
        let hotel = Hotel {
            id: existing.map(|h| h.id).unwrap_or_default(),
            name: input.name.trim().to_string(),
            description: input.description,
            location: input.location.trim().to_string(),
        };
        hotel.validate().map_err(invalid)?;
        Ok(hotel)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<Hotel>> {
        store.list_hotels().await
    }
    async fn get(store: &dyn Store, id: HotelId) -> StoreResult<Option<Hotel>> {
        store.get_hotel(id).await
    }
    async fn insert(store: &dyn Store, record: Hotel) -> StoreResult<()> {
        store.insert_hotel(record).await
    }
    async fn update(store: &dyn Store, record: Hotel) -> StoreResult<()> {
        store.update_hotel(record).await
    }
    async fn delete(store: &dyn Store, id: HotelId) -> StoreResult<()> {
        store.delete_hotel(id).await
    }

    async fn row(_: &dyn Store, h: &Hotel) -> StoreResult<Value> {
        Ok(json!({ "id": h.id.to_string(), "name": h.name, "location": h.location }))
    }
}

pub struct Guests;

#[async_trait]
impl AdminModel for Guests {
    type Id = GuestId;
    type Record = Guest;
    type Input = dto::GuestInput;
    const LABEL: &'static str = "guest";

    fn id_of(record: &Guest) -> GuestId {
        record.id
    }

    async fn build(services: &AppServices, input: dto::GuestInput, existing: Option<Guest>) -> Result<Guest, Response> {
        let password_hash = match (input.password.filter(|p| !p.is_empty()), &existing) {
            (Some(password), _) => hash_secret(password).await?,
            (None, Some(current)) => current.password_hash.clone(),
            (None, None) => return Err(invalid(DomainError::validation("password: This field is required."))),
        };

        let guest = Guest {
            id: existing.as_ref().map(|g| g.id).unwrap_or_default(),
            email: normalize_email(&input.email),
            private_number: input.private_number.trim().to_string(),
            password_hash,
            bank_card: input.bank_card.filter(|c| !c.is_empty()),
            is_staff: input.is_staff,
            is_user: input.is_user,
            hotel_id: input.hotel_id,
            date_joined: existing.map(|g| g.date_joined).unwrap_or_else(|| services.now()),
        };
        guest.validate().map_err(invalid)?;
        Ok(guest)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<Guest>> {
        store.list_guests().await
    }
    async fn get(store: &dyn Store, id: GuestId) -> StoreResult<Option<Guest>> {
        store.get_guest(id).await
    }
    async fn insert(store: &dyn Store, record: Guest) -> StoreResult<()> {
        store.insert_guest(record).await
    }
    async fn update(store: &dyn Store, record: Guest) -> StoreResult<()> {
        store.update_guest(record).await
    }
    async fn delete(store: &dyn Store, id: GuestId) -> StoreResult<()> {
        store.delete_guest(id).await
    }

    async fn row(_: &dyn Store, g: &Guest) -> StoreResult<Value> {
        Ok(json!({
            "id": g.id.to_string(),
            "email": g.email,
            "private_number": g.private_number,
            "is_staff": g.is_staff,
            "is_user": g.is_user,
        }))
    }
}

pub struct Memberships;

#[async_trait]
impl AdminModel for Memberships {
    type Id = MembershipId;
    type Record = Membership;
    type Input = dto::MembershipInput;
    const LABEL: &'static str = "membership";

    fn id_of(record: &Membership) -> MembershipId {
        record.id
    }

    async fn build(_: &AppServices, input: dto::MembershipInput, existing: Option<Membership>) -> Result<Membership, Response> {
        let membership = Membership {
            id: existing.map(|m| m.id).unwrap_or_default(),
            hotel_id: input.hotel_id,
            private_number: input.private_number.trim().to_string(),
            email: normalize_email(&input.email),
        };
        membership.validate().map_err(invalid)?;
        Ok(membership)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<Membership>> {
        store.list_memberships().await
    }
    async fn get(store: &dyn Store, id: MembershipId) -> StoreResult<Option<Membership>> {
        store.get_membership(id).await
    }
    async fn insert(store: &dyn Store, record: Membership) -> StoreResult<()> {
        store.insert_membership(record).await
    }
    async fn update(store: &dyn Store, record: Membership) -> StoreResult<()> {
        store.update_membership(record).await
    }
    async fn delete(store: &dyn Store, id: MembershipId) -> StoreResult<()> {
        store.delete_membership(id).await
    }

    async fn row(store: &dyn Store, m: &Membership) -> StoreResult<Value> {
        Ok(json!({
            "id": m.id.to_string(),
            "hotel": hotel_name(store, m.hotel_id).await?,
            "private_number": m.private_number,
            "email": m.email,
        }))
    }
}

pub struct Services;

#[async_trait]
impl AdminModel for Services {
    type Id = ServiceId;
    type Record = Service;
    type Input = dto::ServiceInput;
    const LABEL: &'static str = "service";

    fn id_of(record: &Service) -> ServiceId {
        record.id
    }

    async fn build(_: &AppServices, input: dto::ServiceInput, existing: Option<Service>) -> Result<Service, Response> {
        let service = Service {
            id: existing.map(|s| s.id).unwrap_or_default(),
            hotel_id: input.hotel_id,
            name: input.name.trim().to_string(),
            description: input.description,
            price: input.price,
            available: input.available,
        };
        service.validate().map_err(invalid)?;
        Ok(service)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<Service>> {
        store.list_services(None).await
    }
    async fn get(store: &dyn Store, id: ServiceId) -> StoreResult<Option<Service>> {
        store.get_service(id).await
    }
    async fn insert(store: &dyn Store, record: Service) -> StoreResult<()> {
        store.insert_service(record).await
    }
    async fn update(store: &dyn Store, record: Service) -> StoreResult<()> {
        store.update_service(record).await
    }
    async fn delete(store: &dyn Store, id: ServiceId) -> StoreResult<()> {
        store.delete_service(id).await
    }

    async fn row(store: &dyn Store, s: &Service) -> StoreResult<Value> {
        Ok(json!({
            "id": s.id.to_string(),
            "name": s.name,
            "hotel": hotel_name(store, s.hotel_id).await?,
            "price": s.price.to_string(),
            "available": s.available,
        }))
    }
}

pub struct AvailableTimes;

#[async_trait]
impl AdminModel for AvailableTimes {
    type Id = SlotId;
    type Record = AvailableTime;
    type Input = dto::AvailableTimeInput;
    const LABEL: &'static str = "available time";

    fn id_of(record: &AvailableTime) -> SlotId {
        record.id
    }

    async fn build(
        _: &AppServices,
        input: dto::AvailableTimeInput,
        existing: Option<AvailableTime>,
    ) -> Result<AvailableTime, Response> {
        let slot = AvailableTime {
            id: existing.map(|s| s.id).unwrap_or_default(),
            service_id: input.service_id,
            start_time: input.start_time,
            end_time: input.end_time,
            is_reserved: input.is_reserved,
        };
        slot.validate().map_err(invalid)?;
        Ok(slot)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<AvailableTime>> {
        store.list_slots(None).await
    }
    async fn get(store: &dyn Store, id: SlotId) -> StoreResult<Option<AvailableTime>> {
        store.get_slot(id).await
    }
    async fn insert(store: &dyn Store, record: AvailableTime) -> StoreResult<()> {
        store.insert_slot(record).await
    }
    async fn update(store: &dyn Store, record: AvailableTime) -> StoreResult<()> {
        store.update_slot(record).await
    }
    async fn delete(store: &dyn Store, id: SlotId) -> StoreResult<()> {
        store.delete_slot(id).await
    }

    async fn row(store: &dyn Store, t: &AvailableTime) -> StoreResult<Value> {
        Ok(json!({
            "id": t.id.to_string(),
            "service": service_name(store, t.service_id).await?,
            "start_time": t.start_time.to_rfc3339(),
            "end_time": t.end_time.to_rfc3339(),
            "is_reserved": t.is_reserved,
        }))
    }
}

pub struct Reservations;

#[async_trait]
impl AdminModel for Reservations {
    type Id = ReservationId;
    type Record = Reservation;
    type Input = dto::ReservationInput;
    const LABEL: &'static str = "reservation";

    fn id_of(record: &Reservation) -> ReservationId {
        record.id
    }

    async fn build(
        services: &AppServices,
        input: dto::ReservationInput,
        existing: Option<Reservation>,
    ) -> Result<Reservation, Response> {
        // A missing slot is left to the store's reference check.
        match services.store.get_slot(input.reserved_for).await {
            Ok(Some(slot)) if slot.service_id != input.service_id => {
                return Err(invalid(DomainError::validation(
                    "reserved_for: The selected time belongs to another service.",
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(errors::store_error_to_response(e)),
        }

        let reservation_date = input
            .reservation_date
            .or(existing.as_ref().map(|r| r.reservation_date))
            .unwrap_or_else(|| services.now());
        Ok(Reservation {
            id: existing.map(|r| r.id).unwrap_or_default(),
            guest_id: input.guest_id,
            service_id: input.service_id,
            reservation_date,
            reserved_for: input.reserved_for,
        })
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<Reservation>> {
        store.list_reservations(None).await
    }
    async fn get(store: &dyn Store, id: ReservationId) -> StoreResult<Option<Reservation>> {
        store.get_reservation(id).await
    }
    async fn insert(store: &dyn Store, record: Reservation) -> StoreResult<()> {
        store.insert_reservation(record).await
    }
    async fn update(store: &dyn Store, record: Reservation) -> StoreResult<()> {
        store.update_reservation(record).await
    }
    async fn delete(store: &dyn Store, id: ReservationId) -> StoreResult<()> {
        store.delete_reservation(id).await
    }

    async fn row(store: &dyn Store, r: &Reservation) -> StoreResult<Value> {
        let service = service_name(store, r.service_id).await?;
        let slot = store.get_slot(r.reserved_for).await?;
        Ok(json!({
            "id": r.id.to_string(),
            "user": guest_label(store, r.guest_id).await?,
            "service": service,
            "reservation_date": r.reservation_date.to_rfc3339(),
            "reserved_for": slot.map(|s| s.describe(service.as_deref().unwrap_or_default())),
        }))
    }
}

pub struct RoomServices;

#[async_trait]
impl AdminModel for RoomServices {
    type Id = RoomServiceId;
    type Record = RoomService;
    type Input = dto::RoomServiceInput;
    const LABEL: &'static str = "room service";

    fn id_of(record: &RoomService) -> RoomServiceId {
        record.id
    }

    async fn build(
        _: &AppServices,
        input: dto::RoomServiceInput,
        existing: Option<RoomService>,
    ) -> Result<RoomService, Response> {
        let room_service = RoomService {
            id: existing.map(|r| r.id).unwrap_or_default(),
            hotel_id: input.hotel_id,
            name: input.name.trim().to_string(),
        };
        room_service.validate().map_err(invalid)?;
        Ok(room_service)
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<RoomService>> {
        store.list_room_services(None).await
    }
    async fn get(store: &dyn Store, id: RoomServiceId) -> StoreResult<Option<RoomService>> {
        store.get_room_service(id).await
    }
    async fn insert(store: &dyn Store, record: RoomService) -> StoreResult<()> {
        store.insert_room_service(record).await
    }
    async fn update(store: &dyn Store, record: RoomService) -> StoreResult<()> {
        store.update_room_service(record).await
    }
    async fn delete(store: &dyn Store, id: RoomServiceId) -> StoreResult<()> {
        store.delete_room_service(id).await
    }

    async fn row(store: &dyn Store, r: &RoomService) -> StoreResult<Value> {
        Ok(json!({
            "id": r.id.to_string(),
            "hotel": hotel_name(store, r.hotel_id).await?,
            "name": r.name,
        }))
    }
}

pub struct RoomServiceRequests;

#[async_trait]
impl AdminModel for RoomServiceRequests {
    type Id = RoomServiceRequestId;
    type Record = RoomServiceRequest;
    type Input = dto::RoomServiceRequestInput;
    const LABEL: &'static str = "room service request";

    fn id_of(record: &RoomServiceRequest) -> RoomServiceRequestId {
        record.id
    }

    async fn build(
        services: &AppServices,
        input: dto::RoomServiceRequestInput,
        existing: Option<RoomServiceRequest>,
    ) -> Result<RoomServiceRequest, Response> {
        let request_date = input
            .request_date
            .or(existing.as_ref().map(|r| r.request_date))
            .unwrap_or_else(|| services.now());
        Ok(RoomServiceRequest {
            id: existing.map(|r| r.id).unwrap_or_default(),
            guest_id: input.guest_id,
            room_service_id: input.room_service_id,
            request_date,
            status: input.status,
        })
    }

    async fn list(store: &dyn Store) -> StoreResult<Vec<RoomServiceRequest>> {
        store.list_requests(None).await
    }
    async fn get(store: &dyn Store, id: RoomServiceRequestId) -> StoreResult<Option<RoomServiceRequest>> {
        store.get_request(id).await
    }
    async fn insert(store: &dyn Store, record: RoomServiceRequest) -> StoreResult<()> {
        store.insert_request(record).await
    }
    async fn update(store: &dyn Store, record: RoomServiceRequest) -> StoreResult<()> {
        store.update_request(record).await
    }
    async fn delete(store: &dyn Store, id: RoomServiceRequestId) -> StoreResult<()> {
        store.delete_request(id).await
    }

    async fn row(store: &dyn Store, r: &RoomServiceRequest) -> StoreResult<Value> {
        let room_service = store.get_room_service(r.room_service_id).await?;
        Ok(json!({
            "id": r.id.to_string(),
            "user": guest_label(store, r.guest_id).await?,
            "room_service": room_service.map(|rs| rs.name),
            "request_date": r.request_date.to_rfc3339(),
            "status": r.status.as_str(),
        }))
    }
}
