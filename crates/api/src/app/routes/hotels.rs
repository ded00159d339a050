use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use innkeep_core::HotelId;
use innkeep_infra::{GuestAccounts, HotelDirectory, MembershipRegistry};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::MaybePrincipal;

pub async fn list_hotels(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.store.list_hotels().await {
        Ok(hotels) => {
            let hotels = hotels.iter().map(dto::hotel_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "hotels": hotels }))).into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn hotel_detail(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(MaybePrincipal(principal)): Extension<MaybePrincipal>,
    Path(hotel_id): Path<String>,
) -> axum::response::Response {
    let hotel_id: HotelId = match errors::parse_id(&hotel_id) {
        Ok(id) => id,
        Err(res) => return res,
    };

    let hotel = match services.store.get_hotel(hotel_id).await {
        Ok(Some(h)) => h,
        Ok(None) => return errors::not_found("hotel"),
        Err(e) => return errors::store_error_to_response(e),
    };

    let services_offered = match services.store.list_services(Some(hotel_id)).await {
        Ok(v) => v,
        Err(e) => return errors::store_error_to_response(e),
    };
    let room_services = match services.store.list_room_services(Some(hotel_id)).await {
        Ok(v) => v,
        Err(e) => return errors::store_error_to_response(e),
    };

    let is_registered = match principal {
        Some(principal) => match services.store.get_guest(principal.guest_id()).await {
            Ok(Some(guest)) => match services.store.is_member(hotel_id, &guest.private_number).await {
                Ok(member) => member,
                Err(e) => return errors::store_error_to_response(e),
            },
            Ok(None) => false,
            Err(e) => return errors::store_error_to_response(e),
        },
        None => false,
    };

    (
        StatusCode::OK,
        Json(json!({
            "hotel": dto::hotel_to_json(&hotel),
            "services": services_offered.iter().map(dto::service_to_json).collect::<Vec<_>>(),
            "room_services": room_services.iter().map(dto::room_service_to_json).collect::<Vec<_>>(),
            "is_registered": is_registered,
        })),
    )
        .into_response()
}
