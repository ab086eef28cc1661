use std::ops::RangeInclusive;

use chrono::Duration;

/// Tunables shared by the session, license and event managers.
///
/// Built once at startup and handed to each manager by value; nothing reads
/// these from globals.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Lifetime of a bearer token, measured from login.
    pub token_ttl: Duration,
    /// Header carrying the tenant identifier.
    pub tenant_header: String,
    /// Header carrying the end-user identity.
    pub identity_header: String,
    /// Prefix for sequential user ids (`EVN001`, `EVN002`, ...).
    pub user_id_prefix: String,
    pub serial_max_attempts: u32,
    pub serial_default_random_len: usize,
    pub serial_random_len_range: RangeInclusive<usize>,
    pub serial_fallback_base: String,
    pub serial_base_max_len: usize,
    /// Assignee label used when a generated license names nobody.
    pub unassigned_license_user: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            token_ttl: Duration::hours(12),
            tenant_header: "X-Project-Id".to_string(),
            identity_header: "X-Encrypted-Yw-ID".to_string(),
            user_id_prefix: "EVN".to_string(),
            serial_max_attempts: 12,
            serial_default_random_len: 4,
            serial_random_len_range: 2..=8,
            serial_fallback_base: "CLIENT".to_string(),
            serial_base_max_len: 12,
            unassigned_license_user: "Unassigned".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Clamps a requested random-suffix length into the configured range.
    #[must_use]
    pub fn serial_random_len(&self, requested: Option<i64>) -> usize {
        let (min, max) = (
            *self.serial_random_len_range.start(),
            *self.serial_random_len_range.end(),
        );
        match requested {
            Some(len) => usize::try_from(len).unwrap_or(0).clamp(min, max),
            None => self.serial_default_random_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_len_is_clamped() {
        let config = ServiceConfig::default();
        assert_eq!(config.serial_random_len(None), 4);
        assert_eq!(config.serial_random_len(Some(1)), 2);
        assert_eq!(config.serial_random_len(Some(9)), 8);
        assert_eq!(config.serial_random_len(Some(-3)), 2);
        assert_eq!(config.serial_random_len(Some(2)), 2);
        assert_eq!(config.serial_random_len(Some(8)), 8);
    }
}
