use std::fmt;

use serde::{Deserialize, Serialize};

/// Role held by a user within a tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Host,
    Operator,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Manager, Role::Host, Role::Operator];

    /// Parses a role name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "host" => Some(Role::Host),
            "operator" => Some(Role::Operator),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Host => "host",
            Role::Operator => "operator",
        }
    }

    /// Admin and manager accounts; the ones a manager may not touch.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Yearly,
}

impl PlanType {
    pub fn parse(s: &str) -> Option<PlanType> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Some(PlanType::Monthly),
            "yearly" => Some(PlanType::Yearly),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            PlanType::Monthly => "monthly",
            PlanType::Yearly => "yearly",
        }
    }

    /// Plan segment embedded in serial numbers.
    #[must_use]
    pub const fn serial_code(self) -> &'static str {
        match self {
            PlanType::Monthly => "MN",
            PlanType::Yearly => "YR",
        }
    }

    #[must_use]
    pub const fn months(self) -> u32 {
        match self {
            PlanType::Monthly => 1,
            PlanType::Yearly => 12,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    Active,
    Expired,
    Disabled,
}

impl LicenseStatus {
    pub fn parse(s: &str) -> Option<LicenseStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Some(LicenseStatus::Active),
            "expired" => Some(LicenseStatus::Expired),
            "disabled" => Some(LicenseStatus::Disabled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LicenseStatus::Active => "active",
            LicenseStatus::Expired => "expired",
            LicenseStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("Manager"), Some(Role::Manager));
        assert_eq!(Role::parse(" OPERATOR "), Some(Role::Operator));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn test_role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_plan_serial_codes() {
        assert_eq!(PlanType::Yearly.serial_code(), "YR");
        assert_eq!(PlanType::Monthly.serial_code(), "MN");
        assert_eq!(PlanType::parse("YEARLY"), Some(PlanType::Yearly));
        assert_eq!(PlanType::parse("weekly"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&LicenseStatus::Disabled).unwrap();
        assert_eq!(json, "\"disabled\"");
    }
}
