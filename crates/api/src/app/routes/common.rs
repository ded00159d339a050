use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use innkeep_auth::{hash_password, verify_password, Permission};
use innkeep_core::HotelId;
use innkeep_hotels::Guest;
use innkeep_infra::{GuestAccounts, MembershipRegistry};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Authorize `principal` for `required`, or build the 403 response.
pub fn require(principal: &PrincipalContext, required: Permission) -> Result<(), Response> {
    crate::authz::authorize(principal, &required)
        .map_err(|e| errors::json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()))
}

/// Argon2 hash on the blocking pool, answering 500 if it fails.
pub async fn hash_secret(password: String) -> Result<String, Response> {
    match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "password hashing failed");
            Err(errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "could not store password"))
        }
        Err(e) => {
            tracing::error!(error = %e, "password hashing task failed");
            Err(errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "could not store password"))
        }
    }
}

/// Argon2 verify on the blocking pool. An unreadable stored hash never matches.
pub async fn verify_secret(password: String, hash: String) -> Result<bool, Response> {
    match tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await {
        Ok(Ok(matches)) => Ok(matches),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "stored password hash is unreadable");
            Ok(false)
        }
        Err(e) => {
            tracing::error!(error = %e, "password check task failed");
            Err(errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "hash_error", "could not check password"))
        }
    }
}

/// The calling guest, provided their private number is registered at `hotel`.
///
/// Answers 403 `not_registered` pointing back at the hotel page otherwise.
pub async fn require_membership(
    services: &AppServices,
    principal: &PrincipalContext,
    hotel: HotelId,
) -> Result<Guest, Response> {
    let guest = services
        .store
        .get_guest(principal.guest_id())
        .await
        .map_err(errors::store_error_to_response)?
        .ok_or_else(|| {
            errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "account no longer exists")
        })?;

    let member = services
        .store
        .is_member(hotel, &guest.private_number)
        .await
        .map_err(errors::store_error_to_response)?;
    if !member {
        tracing::info!(guest_id = %guest.id, hotel_id = %hotel, "membership gate rejected guest");
        return Err((
            StatusCode::FORBIDDEN,
            axum::Json(json!({
                "error": "not_registered",
                "message": "You are not registered at this hotel.",
                "redirect_to": format!("/hotels/{hotel}"),
            })),
        )
            .into_response());
    }
    Ok(guest)
}
