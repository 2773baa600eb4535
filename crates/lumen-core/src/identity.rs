use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Derive a pseudonymous identity token.
///
/// Formula: sha256(site_id + ip + user_agent + bucket)[0..8] encoded as
/// 16 hex chars (~64 bits). One-way and deterministic: identical inputs in
/// the same bucket always yield the same token, and crossing a bucket
/// boundary rotates it even when everything else is unchanged. Raw IP and
/// user-agent never leave this function.
pub fn hash_token(site_id: &str, client_ip: &str, user_agent: &str, bucket: &str) -> String {
    let input = format!("{}{}{}{}", site_id, client_ip, user_agent, bucket);
    let hash = Sha256::digest(input.as_bytes());
    // First 8 bytes → 16 hex characters.
    hex::encode(&hash[..8])
}

/// UTC calendar day, e.g. "2026-08-06". Visitor-scope bucket.
pub fn day_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

/// UTC calendar hour, e.g. "2026-08-06T14". Session-scope bucket.
pub fn hour_bucket(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H").to_string()
}

/// Visitor token at evaluation instant `at` — rotates at midnight UTC.
pub fn visitor_token(
    site_id: &str,
    client_ip: &str,
    user_agent: &str,
    at: DateTime<Utc>,
) -> String {
    hash_token(site_id, client_ip, user_agent, &day_bucket(at))
}

/// Session token at evaluation instant `at` — rotates on the hour.
pub fn session_token(
    site_id: &str,
    client_ip: &str,
    user_agent: &str,
    at: DateTime<Utc>,
) -> String {
    hash_token(site_id, client_ip, user_agent, &hour_bucket(at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const UA: &str = "Mozilla/5.0 Chrome/126";

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn token_is_16_hex_chars() {
        let id = visitor_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 10, 0));
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn visitor_token_stable_within_a_day() {
        let morning = visitor_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 0, 5));
        let evening = visitor_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 23, 55));
        assert_eq!(morning, evening);
    }

    #[test]
    fn visitor_token_rotates_across_days() {
        let today = visitor_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 23, 59));
        let tomorrow = visitor_token("site_a", "1.2.3.4", UA, at(2026, 8, 7, 0, 1));
        assert_ne!(today, tomorrow);
    }

    #[test]
    fn session_token_stable_within_an_hour_rotates_across_hours() {
        let early = session_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 14, 1));
        let late = session_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 14, 59));
        let next = session_token("site_a", "1.2.3.4", UA, at(2026, 8, 6, 15, 0));
        assert_eq!(early, late);
        assert_ne!(late, next);
    }

    #[test]
    fn tokens_differ_per_site() {
        let now = at(2026, 8, 6, 14, 0);
        let a = visitor_token("site_a", "1.2.3.4", UA, now);
        let b = visitor_token("site_b", "1.2.3.4", UA, now);
        assert_ne!(a, b, "the same person on two sites must not be linkable");
    }
}
