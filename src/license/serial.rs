use chrono::NaiveDate;
use rand::Rng;

use crate::types::PlanType;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Uppercases, strips non-alphanumerics and truncates; blank input yields `fallback`.
#[must_use]
pub fn sanitize_base(input: Option<&str>, fallback: &str, max_len: usize) -> String {
    let cleaned: String = input
        .unwrap_or_default()
        .chars()
        .flat_map(char::to_uppercase)
        .filter(char::is_ascii_alphanumeric)
        .take(max_len)
        .collect();

    if cleaned.is_empty() {
        fallback.chars().take(max_len).collect()
    } else {
        cleaned
    }
}

#[must_use]
pub fn random_segment(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Assembles `BASE-PLAN-YYYYMMDD-RAND`.
#[must_use]
pub fn build_serial(base: &str, plan: PlanType, issued_on: NaiveDate, random: &str) -> String {
    format!(
        "{base}-{}-{}-{random}",
        plan.serial_code(),
        issued_on.format("%Y%m%d")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_base() {
        assert_eq!(sanitize_base(Some("Acme Hotels, Ltd."), "CLIENT", 12), "ACMEHOTELSLT");
        assert_eq!(sanitize_base(Some("grand-hall"), "CLIENT", 12), "GRANDHALL");
        assert_eq!(sanitize_base(Some("!!!"), "CLIENT", 12), "CLIENT");
        assert_eq!(sanitize_base(None, "CLIENT", 12), "CLIENT");
        assert_eq!(sanitize_base(Some("ñandú 7"), "CLIENT", 12), "ND7");
    }

    #[test]
    fn test_random_segment_alphabet() {
        let segment = random_segment(8);
        assert_eq!(segment.len(), 8);
        assert!(segment.bytes().all(|b| CHARSET.contains(&b)));
    }

    #[test]
    fn test_build_serial_layout() {
        let issued = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        assert_eq!(
            build_serial("ACME", PlanType::Yearly, issued, "X9Q2"),
            "ACME-YR-20250107-X9Q2"
        );
        assert_eq!(
            build_serial("CLIENT", PlanType::Monthly, issued, "AB"),
            "CLIENT-MN-20250107-AB"
        );
    }
}
