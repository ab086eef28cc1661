use chrono::Utc;

use super::hasher::CredentialHasher;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Role, Tenant, User};

const ID_ATTEMPTS: usize = 3;

pub struct NewAccount<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub role: Role,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
    pub is_default_admin: bool,
}

/// Formats a tenant-scoped user id such as `EVN007`.
#[must_use]
pub fn format_user_id(prefix: &str, sequence: u32) -> String {
    format!("{prefix}{sequence:03}")
}

pub fn next_user_id(store: &dyn Store, tenant: &Tenant, prefix: &str) -> Result<String> {
    let sequence = store.max_user_sequence(tenant, prefix)?.unwrap_or(0) + 1;
    Ok(format_user_id(prefix, sequence))
}

/// Creates a user with the next free sequential id.
///
/// Returns `AlreadyExists` when the username is taken in this tenant.
pub fn create_account(
    store: &dyn Store,
    config: &ServiceConfig,
    tenant: &Tenant,
    account: NewAccount<'_>,
) -> Result<User> {
    let username = account.username.trim();
    if store.get_user_by_username(tenant, username)?.is_some() {
        return Err(Error::AlreadyExists);
    }

    let hashed = CredentialHasher::new().hash_password(account.password)?;
    let now = Utc::now();

    let mut user = User {
        id: String::new(),
        tenant_id: tenant.as_str().to_string(),
        username: username.to_string(),
        role: account.role,
        first_name: account.first_name.trim().to_string(),
        last_name: account.last_name.trim().to_string(),
        phone: account.phone.trim().to_string(),
        email: account.email.trim().to_string(),
        password_hash: hashed.hash,
        password_salt: hashed.salt,
        is_default_admin: account.is_default_admin,
        created_at: now,
        updated_at: now,
    };

    // A concurrent create can claim the same sequence number; retry with a fresh one.
    for _ in 0..ID_ATTEMPTS {
        user.id = next_user_id(store, tenant, &config.user_id_prefix)?;
        match store.create_user(&user) {
            Ok(()) => {
                tracing::info!(tenant = %tenant, user_id = %user.id, role = %user.role, "User created");
                return Ok(user);
            }
            Err(Error::AlreadyExists) => {
                if store.get_user_by_username(tenant, username)?.is_some() {
                    return Err(Error::AlreadyExists);
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::AlreadyExists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use tempfile::TempDir;

    fn account(username: &str) -> NewAccount<'_> {
        NewAccount {
            username,
            password: "pw",
            role: Role::Operator,
            first_name: "",
            last_name: "",
            phone: "",
            email: "",
            is_default_admin: false,
        }
    }

    #[test]
    fn test_format_user_id() {
        assert_eq!(format_user_id("EVN", 1), "EVN001");
        assert_eq!(format_user_id("EVN", 42), "EVN042");
        assert_eq!(format_user_id("EVN", 1234), "EVN1234");
    }

    #[test]
    fn test_ids_are_sequential_per_tenant() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let config = ServiceConfig::default();

        let acme = Tenant::new("acme").unwrap();
        let globex = Tenant::new("globex").unwrap();

        let a = create_account(&store, &config, &acme, account("one")).unwrap();
        let b = create_account(&store, &config, &acme, account("two")).unwrap();
        let c = create_account(&store, &config, &globex, account("one")).unwrap();

        assert_eq!(a.id, "EVN001");
        assert_eq!(b.id, "EVN002");
        assert_eq!(c.id, "EVN001");
    }

    #[test]
    fn test_duplicate_username_rejected_case_insensitively() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        let config = ServiceConfig::default();
        let acme = Tenant::new("acme").unwrap();

        create_account(&store, &config, &acme, account("Alice")).unwrap();
        let dup = create_account(&store, &config, &acme, account("  alice "));

        assert!(matches!(dup, Err(Error::AlreadyExists)));
    }
}
