use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::server::AppState;
use crate::types::{Tenant, User};

/// Tenant resolved by [`require_tenant`] for the current request.
pub struct TenantContext(pub Tenant);

/// Extractor that requires a live bearer session in the request's tenant.
pub struct RequireSession {
    pub tenant: Tenant,
    pub user: User,
    pub token_hash: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingContext,
    Unauthorized,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingContext => {
                (StatusCode::UNAUTHORIZED, "Missing project context headers")
            }
            AuthError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AuthError::InternalError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        };

        let mut response = (status, Json(json!({ "error": message }))).into_response();

        if matches!(self, AuthError::Unauthorized) {
            response.headers_mut().insert(
                "WWW-Authenticate",
                HeaderValue::from_static("Bearer realm=\"venuedesk\""),
            );
        }

        response
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Rejects requests without tenant and identity headers, then sweeps expired tokens.
pub async fn require_tenant(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let headers = request.headers();
    let tenant = header_value(headers, &state.config.tenant_header).and_then(Tenant::new);
    let identity = header_value(headers, &state.config.identity_header);

    let (Some(tenant), Some(_)) = (tenant, identity) else {
        return AuthError::MissingContext.into_response();
    };

    if let Err(e) = state.sessions.purge_expired(Utc::now()) {
        tracing::warn!("Failed to purge expired tokens: {e}");
    }

    request.extensions_mut().insert(tenant);
    next.run(request).await
}

fn tenant_from_parts(parts: &Parts) -> Result<Tenant, AuthError> {
    parts
        .extensions
        .get::<Tenant>()
        .cloned()
        .ok_or(AuthError::MissingContext)
}

/// Extracts the raw token from `Authorization: Bearer <token>`.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl<S: Send + Sync> FromRequestParts<S> for TenantContext {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        tenant_from_parts(parts).map(TenantContext)
    }
}

impl FromRequestParts<Arc<AppState>> for RequireSession {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let tenant = tenant_from_parts(parts)?;
        let raw_token = bearer_token(&parts.headers).ok_or(AuthError::Unauthorized)?;

        let session = state
            .sessions
            .validate(&tenant, raw_token)
            .map_err(|e| {
                tracing::error!("Session validation failed: {e}");
                AuthError::InternalError
            })?
            .ok_or(AuthError::Unauthorized)?;

        Ok(RequireSession {
            tenant,
            user: session.user,
            token_hash: session.token_hash,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc123"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_blank_headers_are_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("X-Project-Id", HeaderValue::from_static("  "));
        assert_eq!(header_value(&headers, "X-Project-Id"), None);

        headers.insert("X-Project-Id", HeaderValue::from_static(" acme "));
        assert_eq!(header_value(&headers, "x-project-id"), Some("acme"));
    }
}
