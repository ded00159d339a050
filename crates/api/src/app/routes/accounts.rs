use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use innkeep_auth::{roles_for_flags, IssuedToken};
use innkeep_core::HotelId;
use innkeep_hotels::{FormErrors, Guest, LoginForm, RegistrationForm};
use innkeep_infra::{GuestAccounts, MembershipRegistry, StoreError};

use crate::app::routes::common::{hash_secret, verify_secret};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

const CORRECT_ERRORS: &str = "Please correct the error below.";
const NOT_A_MEMBER: &str = "Private number and email not found in the database.";
const BAD_CREDENTIALS: &str = "Please enter a correct email and password.";

fn issue_for(services: &AppServices, guest: &Guest) -> Result<IssuedToken, axum::response::Response> {
    services
        .jwt
        .issue(guest.id, roles_for_flags(guest.is_staff, guest.is_user), services.now())
        .map_err(|e| {
            tracing::error!(error = %e, "failed to issue token");
            errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue token")
        })
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(form): Json<RegistrationForm>,
) -> axum::response::Response {
    let mut valid = form.validate();

    // Account uniqueness is part of form validation.
    if let Ok(reg) = &valid {
        let mut taken = FormErrors::default();
        match services.store.guest_by_email(&reg.email).await {
            Ok(Some(_)) => taken.add("email", "Guest with this Email already exists."),
            Ok(None) => {}
            Err(e) => return errors::store_error_to_response(e),
        }
        match services.store.guest_by_private_number(&reg.private_number).await {
            Ok(Some(_)) => taken.add("private_number", "Guest with this Private number already exists."),
            Ok(None) => {}
            Err(e) => return errors::store_error_to_response(e),
        }
        if !taken.is_empty() {
            valid = Err(taken);
        }
    }

    let reg = match valid {
        Ok(reg) => reg,
        Err(fields) => return errors::form_error(CORRECT_ERRORS, &fields),
    };

    let membership = match services.store.find_membership(&reg.private_number, &reg.email).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            tracing::info!(private_number = %reg.private_number, "registration without membership");
            return errors::json_error(StatusCode::BAD_REQUEST, "not_a_member", NOT_A_MEMBER);
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    let password_hash = match hash_secret(reg.password).await {
        Ok(h) => h,
        Err(res) => return res,
    };

    let mut guest = match Guest::new(reg.email, reg.private_number, password_hash, services.now()) {
        Ok(g) => g,
        Err(e) => return errors::domain_error_to_response(e),
    };
    guest.hotel_id = Some(membership.hotel_id);

    match services.store.insert_guest(guest.clone()).await {
        Ok(()) => {}
        Err(StoreError::Conflict(msg)) => {
            let mut fields = FormErrors::default();
            fields.add("__all__", msg);
            return errors::form_error(CORRECT_ERRORS, &fields);
        }
        Err(e) => return errors::store_error_to_response(e),
    }

    let issued = match issue_for(&services, &guest) {
        Ok(t) => t,
        Err(res) => return res,
    };

    tracing::info!(guest_id = %guest.id, hotel_id = %membership.hotel_id, "guest registered");

    (
        StatusCode::CREATED,
        Json(json!({
            "guest": guest,
            "token": issued.token,
            "expires_at": issued.claims.expires_at.to_rfc3339(),
            "redirect_to": "/",
        })),
    )
        .into_response()
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::LoginQuery>,
    Json(form): Json<LoginForm>,
) -> axum::response::Response {
    let (email, password) = match form.validate() {
        Ok(v) => v,
        Err(fields) => return errors::form_error(CORRECT_ERRORS, &fields),
    };

    let guest = match services.store.guest_by_email(&email).await {
        Ok(Some(g)) => g,
        Ok(None) => return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", BAD_CREDENTIALS),
        Err(e) => return errors::store_error_to_response(e),
    };

    match verify_secret(password.to_string(), guest.password_hash.clone()).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!(guest_id = %guest.id, "login failed");
            return errors::json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", BAD_CREDENTIALS);
        }
        Err(res) => return res,
    }

    let issued = match issue_for(&services, &guest) {
        Ok(t) => t,
        Err(res) => return res,
    };

    let redirect_to = query
        .hotel_id
        .as_deref()
        .and_then(|raw| raw.parse::<HotelId>().ok())
        .map(|id| format!("/hotels/{id}"))
        .unwrap_or_else(|| "/".to_string());

    tracing::info!(guest_id = %guest.id, "guest logged in");

    (
        StatusCode::OK,
        Json(json!({
            "token": issued.token,
            "expires_at": issued.claims.expires_at.to_rfc3339(),
            "redirect_to": redirect_to,
        })),
    )
        .into_response()
}

pub async fn logout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = services
        .store
        .revoke_token(principal.token_id(), principal.token_expires_at(), services.now())
        .await
    {
        return errors::store_error_to_response(e);
    }
    tracing::info!(guest_id = %principal.guest_id(), "guest logged out");
    (StatusCode::OK, Json(json!({ "redirect_to": "/" }))).into_response()
}
