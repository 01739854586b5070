use chrono::{DateTime, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;

const SUFFIX_LEN: usize = 9;

/// Generates an opaque visit id: `v{unix-millis in base 36}-{random suffix}`.
///
/// Uniqueness is best-effort. Nothing looks visits up by id, so a collision
/// between two simultaneous visits has no effect on the statistics.
pub fn generate_visit_id(now: DateTime<Utc>) -> String {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("v{}-{suffix}", to_base36(millis))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
