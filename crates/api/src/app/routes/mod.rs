use axum::{
    routing::{get, post},
    Router,
};

pub mod accounts;
pub mod admin;
pub mod common;
pub mod hotels;
pub mod reservations;
pub mod room_service;
pub mod system;

/// Endpoints anyone can call.
pub fn public_router() -> Router {
    Router::new()
        .route("/", get(hotels::list_hotels))
        .route("/hotels", get(hotels::list_hotels))
        .route("/register", post(accounts::register))
        .route("/login", post(accounts::login))
}

/// Endpoints that read an optional principal.
pub fn browsing_router() -> Router {
    Router::new().route("/hotels/:hotel_id", get(hotels::hotel_detail))
}

/// Endpoints that require a signed-in guest.
pub fn protected_router() -> Router {
    Router::new()
        .route(
            "/reserve/:service_id",
            get(reservations::reserve_view).post(reservations::reserve),
        )
        .route(
            "/room_service_request/:room_service_id",
            get(room_service::request_form).post(room_service::create_request),
        )
        .route("/reservations", get(reservations::my_reservations))
        .route("/room_service_requests", get(room_service::my_requests))
        .route("/logout", post(accounts::logout))
        .nest("/admin", admin::router())
}
