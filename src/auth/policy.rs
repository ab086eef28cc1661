//! Role-based authorization, evaluated without touching the store.
//!
//! Callers pass the actor's and target's *current* roles; nothing here is cached.

use crate::types::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListUsers,
    /// Target is the role requested for the new account.
    CreateUser,
    /// Target is the account's current role.
    UpdateUser,
    /// Target is the role being assigned.
    AssignRole,
    DeleteUser,
    ReadEvents,
    WriteEvents,
    DeleteEvents,
    ManageLicenses,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn manager_may_touch(target: Option<Role>) -> bool {
    matches!(target, Some(Role::Host | Role::Operator))
}

#[must_use]
pub fn authorize(actor: Role, action: Action, target: Option<Role>) -> Decision {
    if actor == Role::Admin {
        return Decision::Allow;
    }

    match action {
        Action::ReadEvents | Action::WriteEvents => Decision::Allow,
        Action::ListUsers if actor == Role::Manager => Decision::Allow,
        Action::ListUsers => Decision::Deny("Forbidden"),
        Action::DeleteEvents if actor.is_elevated() => Decision::Allow,
        Action::DeleteEvents => Decision::Deny("Only admin or manager can delete events"),
        Action::ManageLicenses => Decision::Deny("Only admins can manage licenses"),
        Action::CreateUser
        | Action::UpdateUser
        | Action::AssignRole
        | Action::DeleteUser
            if actor != Role::Manager =>
        {
            Decision::Deny("Forbidden")
        }
        Action::CreateUser if manager_may_touch(target) => Decision::Allow,
        Action::CreateUser => Decision::Deny("Managers can only create host or operator accounts"),
        Action::UpdateUser if manager_may_touch(target) => Decision::Allow,
        Action::UpdateUser => Decision::Deny("Managers can only modify host or operator accounts"),
        Action::AssignRole if manager_may_touch(target) => Decision::Allow,
        Action::AssignRole => Decision::Deny("Managers cannot promote users to admin or manager"),
        Action::DeleteUser if manager_may_touch(target) => Decision::Allow,
        Action::DeleteUser => Decision::Deny("Managers can only delete host or operator accounts"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_ACTIONS: [Action; 5] = [
        Action::ListUsers,
        Action::CreateUser,
        Action::UpdateUser,
        Action::AssignRole,
        Action::DeleteUser,
    ];

    #[test]
    fn test_admin_is_unrestricted() {
        for role in Role::ALL {
            for action in USER_ACTIONS {
                assert!(authorize(Role::Admin, action, Some(role)).is_allowed());
            }
        }
        assert!(authorize(Role::Admin, Action::ManageLicenses, None).is_allowed());
        assert!(authorize(Role::Admin, Action::DeleteEvents, None).is_allowed());
    }

    #[test]
    fn test_manager_limited_to_host_and_operator() {
        for action in [Action::CreateUser, Action::UpdateUser, Action::AssignRole, Action::DeleteUser] {
            assert!(authorize(Role::Manager, action, Some(Role::Host)).is_allowed());
            assert!(authorize(Role::Manager, action, Some(Role::Operator)).is_allowed());
            assert!(!authorize(Role::Manager, action, Some(Role::Admin)).is_allowed());
            assert!(!authorize(Role::Manager, action, Some(Role::Manager)).is_allowed());
        }
        assert_eq!(
            authorize(Role::Manager, Action::CreateUser, Some(Role::Admin)),
            Decision::Deny("Managers can only create host or operator accounts")
        );
        assert!(authorize(Role::Manager, Action::ListUsers, None).is_allowed());
    }

    #[test]
    fn test_staff_roles_have_no_user_rights() {
        for actor in [Role::Host, Role::Operator] {
            for action in USER_ACTIONS {
                assert!(!authorize(actor, action, Some(Role::Operator)).is_allowed());
            }
        }
    }

    #[test]
    fn test_event_rules() {
        for actor in Role::ALL {
            assert!(authorize(actor, Action::ReadEvents, None).is_allowed());
            assert!(authorize(actor, Action::WriteEvents, None).is_allowed());
        }
        assert!(authorize(Role::Manager, Action::DeleteEvents, None).is_allowed());
        assert!(!authorize(Role::Host, Action::DeleteEvents, None).is_allowed());
        assert!(!authorize(Role::Operator, Action::DeleteEvents, None).is_allowed());
    }

    #[test]
    fn test_licenses_are_admin_only() {
        for actor in [Role::Manager, Role::Host, Role::Operator] {
            assert!(!authorize(actor, Action::ManageLicenses, None).is_allowed());
        }
    }
}
