use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use innkeep_auth::permissions::{ROOM_SERVICE_READ, ROOM_SERVICE_REQUEST};
use innkeep_core::RoomServiceId;
use innkeep_hotels::{RoomService, RoomServiceRequest};
use innkeep_infra::{HotelDirectory, RoomServiceDesk};

use crate::app::routes::common::{require, require_membership};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

async fn load_room_service(
    services: &AppServices,
    raw_id: &str,
) -> Result<RoomService, axum::response::Response> {
    let id: RoomServiceId = errors::parse_id(raw_id)?;
    match services.store.get_room_service(id).await {
        Ok(Some(rs)) => Ok(rs),
        Ok(None) => Err(errors::not_found("room service")),
        Err(e) => Err(errors::store_error_to_response(e)),
    }
}

pub async fn request_form(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(room_service_id): Path<String>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, ROOM_SERVICE_REQUEST) {
        return res;
    }
    let room_service = match load_room_service(&services, &room_service_id).await {
        Ok(rs) => rs,
        Err(res) => return res,
    };
    if let Err(res) = require_membership(&services, &principal, room_service.hotel_id).await {
        return res;
    }

    (
        StatusCode::OK,
        Json(json!({
            "room_service": dto::room_service_to_json(&room_service),
            "form": { "room_service": room_service.id.to_string() },
        })),
    )
        .into_response()
}

pub async fn create_request(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(room_service_id): Path<String>,
    body: Option<Json<dto::RoomServiceRequestBody>>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, ROOM_SERVICE_REQUEST) {
        return res;
    }
    let room_service = match load_room_service(&services, &room_service_id).await {
        Ok(rs) => rs,
        Err(res) => return res,
    };
    let guest = match require_membership(&services, &principal, room_service.hotel_id).await {
        Ok(g) => g,
        Err(res) => return res,
    };

    if let Some(Json(dto::RoomServiceRequestBody { room_service: Some(chosen) })) = body {
        if chosen != room_service.id {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "validation_error",
                "room_service does not match the requested room service",
            );
        }
    }

    let request = RoomServiceRequest::new(guest.id, room_service.id, services.now());
    if let Err(e) = services.store.insert_request(request.clone()).await {
        return errors::store_error_to_response(e);
    }

    tracing::info!(
        guest_id = %guest.id,
        room_service_id = %room_service.id,
        request_id = %request.id,
        "room service requested"
    );

    (
        StatusCode::CREATED,
        Json(json!({
            "request": dto::request_to_json(&request, Some(&room_service)),
            "redirect_to": format!("/hotels/{}", room_service.hotel_id),
        })),
    )
        .into_response()
}

pub async fn my_requests(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(res) = require(&principal, ROOM_SERVICE_READ) {
        return res;
    }

    let requests = match services.store.list_requests(Some(principal.guest_id())).await {
        Ok(r) => r,
        Err(e) => return errors::store_error_to_response(e),
    };

    let mut room_services: HashMap<RoomServiceId, Option<RoomService>> = HashMap::new();
    let mut items = Vec::with_capacity(requests.len());
    for r in &requests {
        if !room_services.contains_key(&r.room_service_id) {
            match services.store.get_room_service(r.room_service_id).await {
                Ok(rs) => {
                    room_services.insert(r.room_service_id, rs);
                }
                Err(e) => return errors::store_error_to_response(e),
            }
        }
        let rs = room_services.get(&r.room_service_id).and_then(Option::as_ref);
        items.push(dto::request_to_json(r, rs));
    }

    (StatusCode::OK, Json(json!({ "requests": items }))).into_response()
}
