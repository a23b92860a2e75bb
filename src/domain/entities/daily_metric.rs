//! Daily rollup of click events per tracked link.

use chrono::{DateTime, NaiveDate, Utc};
use sha2::{Digest, Sha256};

/// Aggregated clicks for one `(tracked_link_id, date)` pair.
///
/// Derived from `click_events` and rebuildable from them.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMetric {
    pub tracked_link_id: i64,
    pub date: NaiveDate,
    pub clicks: i64,
    pub valid_clicks: i64,
    pub uniques: i64,
    pub updated_at: DateTime<Utc>,
}

/// The delta one click contributes to its day's rollup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricIncrement {
    pub clicks: i64,
    pub valid_clicks: i64,
    /// Hashed client address; the store bumps `uniques` the first time it
    /// sees this key for the day.
    pub visitor_key: Option<String>,
}

impl MetricIncrement {
    pub fn for_click(is_bot: bool, ip: Option<&str>) -> Self {
        Self {
            clicks: 1,
            valid_clicks: if is_bot { 0 } else { 1 },
            visitor_key: ip.filter(|ip| !ip.is_empty()).map(visitor_key),
        }
    }
}

/// SHA-256 of the client address, lowercase hex.
///
/// Matches `encode(sha256(convert_to(ip, 'UTF8')), 'hex')` in Postgres, which
/// the rebuild query relies on.
pub fn visitor_key(ip: &str) -> String {
    hex::encode(Sha256::digest(ip.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_click_increment() {
        let inc = MetricIncrement::for_click(false, Some("203.0.113.7"));

        assert_eq!(inc.clicks, 1);
        assert_eq!(inc.valid_clicks, 1);
        assert_eq!(inc.visitor_key, Some(visitor_key("203.0.113.7")));
    }

    #[test]
    fn test_bot_click_increment() {
        let inc = MetricIncrement::for_click(true, None);

        assert_eq!(inc.clicks, 1);
        assert_eq!(inc.valid_clicks, 0);
        assert!(inc.visitor_key.is_none());
    }

    #[test]
    fn test_empty_ip_has_no_visitor() {
        assert!(MetricIncrement::for_click(false, Some("")).visitor_key.is_none());
    }

    #[test]
    fn test_visitor_key_is_sha256_hex() {
        // sha256("127.0.0.1")
        assert_eq!(
            visitor_key("127.0.0.1"),
            "12ca17b49af2289436f303e0166030a21e525d266e209267433801a8fd4071a0"
        );
    }
}
