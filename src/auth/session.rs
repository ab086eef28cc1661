use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::hasher::{CredentialHasher, generate_token, hash_token};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{SessionToken, Tenant, User};

/// Returned once at login; the raw token cannot be recovered afterwards.
#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

#[derive(Debug)]
pub struct ValidSession {
    pub user: User,
    pub token_hash: String,
}

pub struct SessionManager {
    store: Arc<dyn Store>,
    hasher: CredentialHasher,
    ttl: Duration,
}

impl SessionManager {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        Self {
            store,
            hasher: CredentialHasher::new(),
            ttl: config.token_ttl,
        }
    }

    pub fn issue(&self, tenant: &Tenant, username: &str, password: &str) -> Result<IssuedSession> {
        self.issue_at(tenant, username, password, Utc::now())
    }

    /// Checks credentials and replaces any live session of the user with a new one.
    ///
    /// Unknown usernames and wrong passwords both yield `InvalidCredentials`.
    pub fn issue_at(
        &self,
        tenant: &Tenant,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession> {
        let user = self
            .store
            .get_user_by_username(tenant, username)?
            .ok_or(Error::InvalidCredentials)?;

        if !self
            .hasher
            .verify_password(password, &user.password_hash, &user.password_salt)?
        {
            return Err(Error::InvalidCredentials);
        }

        let token = generate_token();
        let expires_at = now + self.ttl;
        let replaced = self.store.replace_user_tokens(&SessionToken {
            token_hash: hash_token(&token),
            user_id: user.id.clone(),
            tenant_id: tenant.as_str().to_string(),
            expires_at,
            created_at: now,
        })?;

        tracing::info!(
            tenant = %tenant,
            user_id = %user.id,
            replaced,
            "Session issued"
        );

        Ok(IssuedSession {
            token,
            expires_at,
            user,
        })
    }

    pub fn validate(&self, tenant: &Tenant, raw_token: &str) -> Result<Option<ValidSession>> {
        self.validate_at(tenant, raw_token, Utc::now())
    }

    /// Resolves a raw token to its user. Expired and orphaned tokens are deleted on sight.
    pub fn validate_at(
        &self,
        tenant: &Tenant,
        raw_token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ValidSession>> {
        let token_hash = hash_token(raw_token);

        let Some(token) = self.store.get_token(tenant, &token_hash)? else {
            return Ok(None);
        };

        if token.expires_at <= now {
            self.store.delete_token(&token_hash)?;
            return Ok(None);
        }

        match self.store.get_user(tenant, &token.user_id)? {
            Some(user) => Ok(Some(ValidSession { user, token_hash })),
            None => {
                self.store.delete_token(&token_hash)?;
                Ok(None)
            }
        }
    }

    pub fn revoke(&self, token_hash: &str) -> Result<()> {
        self.store.delete_token(token_hash)?;
        Ok(())
    }

    /// Drops every expired token across all tenants.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        self.store.delete_expired_tokens(now)
    }
}
