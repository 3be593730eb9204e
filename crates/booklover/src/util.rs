use chrono::{TimeZone, Utc};
use getrandom::fill;

pub fn now_ts() -> i64 {
    Utc::now().timestamp()
}

/// Render a unix timestamp as a short date for display.
pub fn ts_to_date(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
        .format("%Y-%m-%d")
        .to_string()
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    fill(&mut out).expect("Failed to generate random bytes");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ts_to_date_formats_epoch_days() {
        assert_eq!(ts_to_date(0), "1970-01-01");
        assert_eq!(ts_to_date(86_400), "1970-01-02");
    }

    #[test]
    fn ts_to_date_tolerates_out_of_range_values() {
        // Far out-of-range timestamps fall back to the epoch instead of panicking.
        assert_eq!(ts_to_date(i64::MAX), "1970-01-01");
    }

    #[test]
    fn random_bytes_has_requested_length() {
        assert_eq!(random_bytes(64).len(), 64);
        assert_ne!(random_bytes(32), random_bytes(32));
    }
}
