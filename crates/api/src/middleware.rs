use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use innkeep_auth::JwtValidator;
use innkeep_core::Clock;
use innkeep_infra::{GuestAccounts, Store};

use crate::app::errors;
use crate::context::{MaybePrincipal, PrincipalContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug)]
enum AuthFailure {
    Missing,
    Invalid,
    Revoked,
    UnknownGuest,
    Store,
}

impl AuthFailure {
    fn into_response(self) -> Response {
        match self {
            AuthFailure::Missing => {
                errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
            }
            AuthFailure::Invalid => {
                errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "invalid or expired token")
            }
            AuthFailure::Revoked => {
                errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "token has been revoked")
            }
            AuthFailure::UnknownGuest => {
                errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "account no longer exists")
            }
            AuthFailure::Store => errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                "could not check token status",
            ),
        }
    }
}

async fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<PrincipalContext, AuthFailure> {
    let token = extract_bearer(headers).ok_or(AuthFailure::Missing)?;

    let claims = state.jwt.validate(token, state.clock.now()).map_err(|e| {
        tracing::debug!(error = %e, "rejected bearer token");
        AuthFailure::Invalid
    })?;

    match state.store.is_token_revoked(claims.jti).await {
        Ok(true) => return Err(AuthFailure::Revoked),
        Ok(false) => {}
        Err(e) => {
            tracing::error!(error = %e, "revocation lookup failed");
            return Err(AuthFailure::Store);
        }
    }

    // Roles are re-read so demoted or deleted accounts lose access at once.
    let guest = match state.store.get_guest(claims.sub).await {
        Ok(Some(guest)) => guest,
        Ok(None) => {
            tracing::info!(guest_id = %claims.sub, "token for a deleted account");
            return Err(AuthFailure::UnknownGuest);
        }
        Err(e) => {
            tracing::error!(error = %e, "guest lookup failed");
            return Err(AuthFailure::Store);
        }
    };

    Ok(PrincipalContext::for_guest(&claims, &guest))
}

/// Rejects the request with 401 unless it carries a live token.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let principal = authenticate(&state, req.headers())
        .await
        .map_err(AuthFailure::into_response)?;

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Attaches a `MaybePrincipal`; a missing or bad token means anonymous.
pub async fn optional_auth(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let principal = authenticate(&state, req.headers()).await.ok();
    req.extensions_mut().insert(MaybePrincipal(principal));
    next.run(req).await
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def")), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Bearer   ")), None);
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }
}
