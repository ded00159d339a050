use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use innkeep_core::DomainError;
use innkeep_hotels::{BookingRejection, FormErrors};
use innkeep_infra::StoreError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// A 400 carrying per-field messages alongside the summary.
pub fn form_error(message: impl Into<String>, fields: &FormErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        axum::Json(json!({
            "error": "invalid_form",
            "message": message.into(),
            "fields": fields,
        })),
    )
        .into_response()
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        taken @ StoreError::SlotsTaken(_) => json_error(StatusCode::CONFLICT, "times_reserved", taken.to_string()),
        StoreError::InvalidReference(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_reference", msg),
        StoreError::Backend(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "internal storage error")
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
    }
}

pub fn booking_rejection_to_response(rejection: BookingRejection) -> Response {
    let (status, code) = match &rejection {
        BookingRejection::Unparsable(_) => (StatusCode::BAD_REQUEST, "invalid_time"),
        BookingRejection::Unavailable => (StatusCode::CONFLICT, "service_unavailable"),
        BookingRejection::Empty => (StatusCode::BAD_REQUEST, "no_times_selected"),
        BookingRejection::Conflicts(_) => (StatusCode::CONFLICT, "times_reserved"),
        BookingRejection::Past => (StatusCode::BAD_REQUEST, "times_in_past"),
        BookingRejection::NotOffered(_) => (StatusCode::BAD_REQUEST, "times_not_offered"),
    };
    json_error(status, code, rejection.to_string())
}

pub fn not_found(what: &str) -> Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

/// Parse a path id, answering 400 if it is malformed.
pub fn parse_id<T>(raw: &str) -> Result<T, Response>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse().map_err(domain_error_to_response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        assert_eq!(store_error_to_response(StoreError::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            store_error_to_response(StoreError::Conflict("dup".into())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            store_error_to_response(StoreError::SlotsTaken(Vec::new())).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            store_error_to_response(StoreError::InvalidReference("hotel".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            store_error_to_response(StoreError::Backend("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn booking_rejections_map_to_statuses() {
        assert_eq!(
            booking_rejection_to_response(BookingRejection::Conflicts(vec!["x".into()])).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            booking_rejection_to_response(BookingRejection::Past).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            booking_rejection_to_response(BookingRejection::Unavailable).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn malformed_ids_are_bad_requests() {
        let res = parse_id::<innkeep_core::HotelId>("not-a-uuid").unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
