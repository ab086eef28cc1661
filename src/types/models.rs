use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{LicenseStatus, PlanType, Role};

/// Isolation boundary for every row; resolved once per request from headers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant(String);

impl Tenant {
    /// Returns `None` for blank identifiers.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    #[serde(skip)]
    pub tenant_id: String,
    pub username: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub password_salt: String,
    pub is_default_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Name stamped onto events this user touches.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = [self.first_name.trim(), self.last_name.trim()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }

    #[must_use]
    pub fn attribution(&self) -> Attribution {
        Attribution {
            user_id: self.id.clone(),
            display_name: Some(self.display_name()),
            role: Some(self.role),
        }
    }
}

/// Persisted session; the raw bearer value is never stored.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub token_hash: String,
    pub user_id: String,
    pub tenant_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of who wrote an event, kept even if the user is later renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribution {
    pub user_id: String,
    pub display_name: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    /// `None` only for rows written before tenancy existed.
    #[serde(skip)]
    pub tenant_id: Option<String>,
    pub title: String,
    pub venue: String,
    pub venue_id: String,
    pub color: Option<String>,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub contact: Contact,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pricing: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Attribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<Attribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct License {
    pub id: String,
    #[serde(skip)]
    pub tenant_id: String,
    pub serial_number: String,
    pub user_name: String,
    pub plan_type: PlanType,
    pub start_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: LicenseStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: "EVN001".to_string(),
            tenant_id: "t1".to_string(),
            username: "frontdesk".to_string(),
            role: Role::Host,
            first_name: first.to_string(),
            last_name: last.to_string(),
            phone: String::new(),
            email: String::new(),
            password_hash: "hash".to_string(),
            password_salt: "salt".to_string(),
            is_default_admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name_falls_back_to_username() {
        assert_eq!(user("Ana", "Ruiz").display_name(), "Ana Ruiz");
        assert_eq!(user("Ana", "").display_name(), "Ana");
        assert_eq!(user(" ", "").display_name(), "frontdesk");
    }

    #[test]
    fn test_user_json_hides_credentials() {
        let json = serde_json::to_value(user("Ana", "Ruiz")).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("passwordSalt").is_none());
        assert!(json.get("tenantId").is_none());
        assert_eq!(json["isDefaultAdmin"], false);
        assert_eq!(json["role"], "host");
    }

    #[test]
    fn test_blank_tenant_rejected() {
        assert!(Tenant::new("  ").is_none());
        assert_eq!(Tenant::new(" acme ").unwrap().as_str(), "acme");
    }
}
