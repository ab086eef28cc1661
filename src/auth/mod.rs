pub mod accounts;
mod hasher;
mod middleware;
pub mod policy;
mod session;

pub use accounts::{NewAccount, create_account};
pub use hasher::{CredentialHasher, HashedPassword, generate_token, hash_token};
pub use middleware::{AuthError, RequireSession, TenantContext, bearer_token, require_tenant};
pub use policy::{Action, Decision, authorize};
pub use session::{IssuedSession, SessionManager, ValidSession};
