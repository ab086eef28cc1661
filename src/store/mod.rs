mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every read and write except the legacy-event adoption and the global token
/// sweep is filtered by tenant.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, tenant: &Tenant, id: &str) -> Result<Option<User>>;
    /// Case-insensitive username match.
    fn get_user_by_username(&self, tenant: &Tenant, username: &str) -> Result<Option<User>>;
    fn list_users(&self, tenant: &Tenant) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;
    fn delete_user(&self, tenant: &Tenant, id: &str) -> Result<bool>;
    /// Highest numeric suffix among ids carrying `prefix`, if any.
    fn max_user_sequence(&self, tenant: &Tenant, prefix: &str) -> Result<Option<u32>>;
    fn has_default_admin(&self, tenant: &Tenant) -> Result<bool>;

    // Session token operations
    fn create_token(&self, token: &SessionToken) -> Result<()>;
    fn get_token(&self, tenant: &Tenant, token_hash: &str) -> Result<Option<SessionToken>>;
    fn delete_token(&self, token_hash: &str) -> Result<bool>;
    fn delete_user_tokens(&self, tenant: &Tenant, user_id: &str) -> Result<usize>;
    /// Atomically drops the owner's other tokens and stores `token`. Returns how many were dropped.
    fn replace_user_tokens(&self, token: &SessionToken) -> Result<usize>;
    /// Removes every token, in any tenant, that expired before `now`.
    fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<usize>;

    // Event operations
    fn create_event(&self, event: &Event) -> Result<()>;
    /// Inserts all events or none.
    fn create_events(&self, events: &[Event]) -> Result<()>;
    fn get_event(&self, tenant: &Tenant, id: &str) -> Result<Option<Event>>;
    fn list_events(&self, tenant: &Tenant) -> Result<Vec<Event>>;
    /// Stamps every event lacking a tenant marker with `tenant`, skipping ids the tenant already uses.
    fn adopt_ownerless_events(&self, tenant: &Tenant) -> Result<usize>;
    fn update_event(&self, event: &Event) -> Result<()>;
    fn delete_event(&self, tenant: &Tenant, id: &str) -> Result<bool>;
    fn delete_tenant_events(&self, tenant: &Tenant) -> Result<usize>;

    // License operations
    fn create_license(&self, license: &License) -> Result<()>;
    fn get_license(&self, tenant: &Tenant, id: &str) -> Result<Option<License>>;
    fn get_license_by_serial(&self, tenant: &Tenant, serial: &str) -> Result<Option<License>>;
    /// True if another license in the tenant already uses `serial`.
    fn serial_exists(&self, tenant: &Tenant, serial: &str, exclude_id: Option<&str>)
    -> Result<bool>;
    fn list_licenses(&self, tenant: &Tenant) -> Result<Vec<License>>;
    fn update_license(&self, license: &License) -> Result<()>;
    fn set_license_status(
        &self,
        tenant: &Tenant,
        id: &str,
        status: LicenseStatus,
        at: DateTime<Utc>,
    ) -> Result<()>;
    fn delete_license(&self, tenant: &Tenant, id: &str) -> Result<bool>;
}
