use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use innkeep_auth::permissions::{RESERVATIONS_CREATE, RESERVATIONS_READ};
use innkeep_core::ServiceId;
use innkeep_hotels::schedule::NO_TIMES_MESSAGE;
use innkeep_hotels::{BookingRejection, Service};
use innkeep_infra::{BookingLedger, HotelDirectory, StoreError};

use crate::app::routes::common::{require, require_membership};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

async fn load_service(services: &AppServices, raw_id: &str) -> Result<Service, axum::response::Response> {
    let id: ServiceId = errors::parse_id(raw_id)?;
    match services.store.get_service(id).await {
        Ok(Some(s)) => Ok(s),
        Ok(None) => Err(errors::not_found("service")),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

/// Starts already booked for `service` during today's opening hours.
async fn reserved_today(
    services: &AppServices,
    service: ServiceId,
) -> Result<std::collections::HashSet<chrono::DateTime<chrono::Utc>>, axum::response::Response> {
    let (from, until) = services.policy.day_window(services.policy.local_day(services.now()));
    services
        .store
        .reserved_starts(service, from, until)
        .await
        .map_err(errors::store_error_to_response)
}

pub async fn reserve_view(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(service_id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, RESERVATIONS_CREATE) {
        return res;
    }
    let service = match load_service(&services, &service_id).await {
        Ok(s) => s,
        Err(res) => return res,
    };
    if let Err(res) = require_membership(&services, &principal, service.hotel_id).await {
        return res;
    }

    let reserved = match reserved_today(&services, service.id).await {
        Ok(r) => r,
        Err(res) => return res,
    };
    let available = services.policy.available_times(services.now(), &reserved);
    let no_times_message = available.is_empty().then_some(NO_TIMES_MESSAGE);

    (
        StatusCode::OK,
        Json(json!({
            "service": dto::service_to_json(&service),
            "available_times": available
                .iter()
                .map(|t| services.policy.format_local(*t))
                .collect::<Vec<_>>(),
            "no_times_message": no_times_message,
        })),
    )
        .into_response()
}

pub async fn reserve(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(service_id): Path<String>,
    Json(body): Json<dto::ReserveRequest>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, RESERVATIONS_CREATE) {
        return res;
    }
    let service = match load_service(&services, &service_id).await {
        Ok(s) => s,
        Err(res) => return res,
    };
    let guest = match require_membership(&services, &principal, service.hotel_id).await {
        Ok(g) => g,
        Err(res) => return res,
    };

    let now = services.now();
    let reserved = match reserved_today(&services, service.id).await {
        Ok(r) => r,
        Err(res) => return res,
    };

    let plan = match services
        .policy
        .plan_booking(&service, &body.reservation_times, &reserved, now)
    {
        Ok(plan) => plan,
        Err(rejection) => {
            tracing::info!(guest_id = %guest.id, service_id = %service.id, reason = %rejection, "reservation rejected");
            return errors::booking_rejection_to_response(rejection);
        }
    };

    let booked = match services
        .store
        .book(guest.id, service.id, &plan.starts, plan.slot_length, now)
        .await
    {
        Ok(b) => b,
        Err(StoreError::SlotsTaken(taken)) => {
            // Lost a race with another booking since `reserved_today`.
            tracing::info!(guest_id = %guest.id, service_id = %service.id, clashes = taken.len(), "reservation lost a race");
            let clashes = taken.iter().map(|s| services.policy.format_short(*s)).collect();
            return errors::booking_rejection_to_response(BookingRejection::Conflicts(clashes));
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    tracing::info!(
        guest_id = %guest.id,
        service_id = %service.id,
        hours = plan.hours(),
        total = %plan.total,
        discounted = %plan.discounted,
        "reservation created"
    );

    let reservations = booked
        .iter()
        .map(|(r, slot)| dto::reservation_to_json(r, Some(&service), Some(slot), &services.policy))
        .collect::<Vec<_>>();

    (
        StatusCode::CREATED,
        Json(json!({
            "message": plan.success_message(),
            "total_price": plan.total.to_string(),
            "discounted_price": plan.discounted.to_string(),
            "reservations": reservations,
            "redirect_to": format!("/reserve/{}", service.id),
        })),
    )
        .into_response()
}

pub async fn my_reservations(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, RESERVATIONS_READ) {
        return res;
    }

    let reservations = match services.store.list_reservations(Some(principal.guest_id())).await {
        Ok(r) => r,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut service_cache: HashMap<ServiceId, Option<Service>> = HashMap::new();
    let mut items = Vec::with_capacity(reservations.len());
    for r in &reservations {
        if !service_cache.contains_key(&r.service_id) {
            match services.store.get_service(r.service_id).await {
                Ok(s) => {
                    service_cache.insert(r.service_id, s);
                }
                Err(e) => return errors::store_error_to_response(e),
            }
        }
        let slot = match services.store.get_slot(r.reserved_for).await {
            Ok(s) => s,
            Err(e) => return errors::store_error_to_response(e),
        };
        let service = service_cache.get(&r.service_id).and_then(Option::as_ref);
        items.push(dto::reservation_to_json(r, service, slot.as_ref(), &services.policy));
    }

    (StatusCode::OK, Json(json!({ "reservations": items }))).into_response()
}
