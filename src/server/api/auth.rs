use std::sync::Arc;

use axum::{Json, extract::State};

use crate::auth::{RequireSession, TenantContext};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{LoginRequest, LoginResponse, SuccessResponse, UserResponse};
use crate::server::response::{ApiError, JsonBody};

pub async fn login(
    State(state): State<Arc<AppState>>,
    TenantContext(tenant): TenantContext,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(ApiError::bad_request("Username and password are required"));
    };

    let issued = state
        .sessions
        .issue(&tenant, &username, &password)
        .map_err(|e| match e {
            Error::InvalidCredentials => ApiError::unauthorized("Invalid credentials"),
            other => ApiError::internal("Failed to sign in").with_details(other),
        })?;

    Ok(Json(LoginResponse {
        token: issued.token,
        expires_at: issued.expires_at,
        user: issued.user,
    }))
}

pub async fn logout(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .sessions
        .revoke(&session.token_hash)
        .map_err(|e| ApiError::internal("Failed to sign out").with_details(e))?;

    tracing::info!(tenant = %session.tenant, user_id = %session.user.id, "Session revoked");
    Ok(Json(SuccessResponse::ok()))
}

pub async fn me(session: RequireSession) -> Json<UserResponse> {
    Json(UserResponse { user: session.user })
}
