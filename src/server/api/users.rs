use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use super::access::require;
use crate::auth::{Action, CredentialHasher, NewAccount, RequireSession, create_account};
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{
    CreateUserRequest, SuccessResponse, UpdateUserRequest, UserResponse, UsersResponse,
};
use crate::server::response::{ApiError, JsonBody, StoreOptionExt, StoreResultExt};
use crate::server::validation::parse_role;

pub async fn list_users(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<UsersResponse>, ApiError> {
    require(&session.user, Action::ListUsers, None)?;

    let users = state
        .store
        .list_users(&session.tenant)
        .api_err("Failed to list users")?;

    Ok(Json(UsersResponse { users }))
}

pub async fn create_user(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    JsonBody(req): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    // Staff roles are turned away before the body is inspected.
    require(&session.user, Action::ListUsers, None)?;

    let (
        Some(username),
        Some(password),
        Some(role),
        Some(first_name),
        Some(last_name),
        Some(phone),
        Some(email),
    ) = (
        req.username,
        req.password,
        req.role,
        req.first_name,
        req.last_name,
        req.phone,
        req.email,
    )
    else {
        return Err(ApiError::bad_request("Missing required user fields"));
    };

    if username.trim().is_empty() || password.is_empty() {
        return Err(ApiError::bad_request("Missing required user fields"));
    }

    let role = parse_role(&role)?;
    require(&session.user, Action::CreateUser, Some(role))?;

    let user = create_account(
        state.store.as_ref(),
        &state.config,
        &session.tenant,
        NewAccount {
            username: &username,
            password: &password,
            role,
            first_name: &first_name,
            last_name: &last_name,
            phone: &phone,
            email: &email,
            is_default_admin: false,
        },
    )
    .map_err(|e| match e {
        Error::AlreadyExists => ApiError::bad_request("Username already exists"),
        other => ApiError::internal("Failed to create user").with_details(other),
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse { user })))
}

pub async fn update_user(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let actor = &session.user;
    let mut target = state
        .store
        .get_user(&session.tenant, &id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if target.id != actor.id {
        require(actor, Action::UpdateUser, Some(target.role))?;
    }

    let new_role = req.role.as_deref().map(parse_role).transpose()?;
    if let Some(role) = new_role.filter(|role| *role != target.role) {
        if target.is_default_admin {
            return Err(ApiError::forbidden("Default admin must remain an admin"));
        }
        require(actor, Action::AssignRole, Some(role))?;
        target.role = role;
    }

    if let Some(first_name) = req.first_name {
        target.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        target.last_name = last_name;
    }
    if let Some(phone) = req.phone {
        target.phone = phone;
    }
    if let Some(email) = req.email {
        target.email = email;
    }

    if let Some(password) = req.password.filter(|p| !p.is_empty()) {
        let hashed = CredentialHasher::new()
            .hash_password(&password)
            .api_err("Failed to hash password")?;
        target.password_hash = hashed.hash;
        target.password_salt = hashed.salt;
    }

    target.updated_at = Utc::now();
    state
        .store
        .update_user(&target)
        .api_err("Failed to update user")?;

    Ok(Json(UserResponse { user: target }))
}

pub async fn delete_user(
    session: RequireSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let store = state.store.as_ref();
    let target = store
        .get_user(&session.tenant, &id)
        .api_err("Failed to get user")?
        .or_not_found("User not found")?;

    if target.is_default_admin {
        return Err(ApiError::forbidden("Cannot delete the default admin account"));
    }

    require(&session.user, Action::DeleteUser, Some(target.role))?;

    store
        .delete_user_tokens(&session.tenant, &target.id)
        .api_err("Failed to revoke user sessions")?;
    store
        .delete_user(&session.tenant, &target.id)
        .api_err("Failed to delete user")?;

    tracing::info!(tenant = %session.tenant, user_id = %target.id, "User deleted");
    Ok(Json(SuccessResponse::ok()))
}
