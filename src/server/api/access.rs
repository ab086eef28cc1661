use crate::auth::{Action, Decision, authorize};
use crate::server::response::ApiError;
use crate::types::{Role, User};

/// Fails with 403 unless the policy allows `action` for the actor's current role.
pub fn require(actor: &User, action: Action, target: Option<Role>) -> Result<(), ApiError> {
    match authorize(actor.role, action, target) {
        Decision::Allow => Ok(()),
        Decision::Deny(message) => Err(ApiError::forbidden(message)),
    }
}

/// Like [`require`], but reports `message` instead of the policy's wording.
pub fn require_with(
    actor: &User,
    action: Action,
    target: Option<Role>,
    message: &'static str,
) -> Result<(), ApiError> {
    require(actor, action, target).map_err(|_| ApiError::forbidden(message))
}
