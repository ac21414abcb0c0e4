//! Ordering of replication values.
//!
//! Slack timestamps are strings such as `"1700000000.000200"`: seconds and
//! microseconds joined by a dot. Comparing them as text breaks as soon as
//! the integer parts differ in length, so they are compared numerically.
//! RFC 3339 timestamps compare as instants, JSON numbers by value, and
//! anything else lexically.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;

/// How a resource renders instants as replication values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicationFormat {
    /// Slack epoch timestamp, `"<secs>.<micros>"`.
    #[default]
    SlackTs,
    /// RFC 3339 string.
    Rfc3339,
}

impl ReplicationFormat {
    /// Renders `instant` in this format.
    pub fn render(&self, instant: DateTime<Utc>) -> Value {
        match self {
            ReplicationFormat::SlackTs => Value::String(datetime_to_slack_ts(instant)),
            ReplicationFormat::Rfc3339 => Value::String(instant.to_rfc3339()),
        }
    }
}

/// Formats an instant as a Slack timestamp.
pub fn datetime_to_slack_ts(instant: DateTime<Utc>) -> String {
    format!(
        "{}.{:06}",
        instant.timestamp(),
        instant.timestamp_subsec_micros()
    )
}

/// Parses a Slack timestamp into an instant.
pub fn slack_ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, micros) = split_slack_ts(ts)?;
    let secs = i64::try_from(secs).ok()?;
    Utc.timestamp_opt(secs, micros.checked_mul(1000)?).single()
}

fn split_slack_ts(ts: &str) -> Option<(u64, u32)> {
    let (int_part, frac_part) = match ts.split_once('.') {
        Some((i, f)) => (i, f),
        None => (ts, ""),
    };
    if int_part.is_empty()
        || !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
        || frac_part.len() > 9
    {
        return None;
    }
    let secs = int_part.parse().ok()?;
    // Right-pad to microseconds so "1.5" and "1.500000" are equal.
    let mut frac = frac_part.to_string();
    frac.truncate(6);
    while frac.len() < 6 {
        frac.push('0');
    }
    let micros = frac.parse().ok()?;
    Some((secs, micros))
}

/// Total order over replication values.
pub fn compare_replication_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => compare_strings(x, y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn compare_strings(a: &str, b: &str) -> Ordering {
    if let (Some(x), Some(y)) = (split_slack_ts(a), split_slack_ts(b)) {
        return x.cmp(&y);
    }
    if let (Ok(x), Ok(y)) = (
        DateTime::parse_from_rfc3339(a),
        DateTime::parse_from_rfc3339(b),
    ) {
        return x.cmp(&y);
    }
    a.cmp(b)
}

/// Returns the larger of two optional replication values.
pub fn max_replication_value(a: Option<Value>, b: Option<Value>) -> Option<Value> {
    match (a, b) {
        (Some(x), Some(y)) => {
            if compare_replication_values(&y, &x) == Ordering::Greater {
                Some(y)
            } else {
                Some(x)
            }
        }
        (x, None) => x,
        (None, y) => y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn slack_ts_compares_numerically() {
        assert_eq!(
            compare_replication_values(&json!("999999999.000001"), &json!("1700000000.000000")),
            Ordering::Less
        );
        assert_eq!(
            compare_replication_values(&json!("1700000000.5"), &json!("1700000000.500000")),
            Ordering::Equal
        );
    }

    #[test]
    fn rfc3339_compares_as_instants() {
        assert_eq!(
            compare_replication_values(
                &json!("2024-01-01T01:00:00+01:00"),
                &json!("2024-01-01T00:30:00Z")
            ),
            Ordering::Less
        );
    }

    #[test]
    fn null_sorts_first() {
        assert_eq!(
            compare_replication_values(&Value::Null, &json!("1.0")),
            Ordering::Less
        );
        assert_eq!(max_replication_value(None, Some(json!(4))), Some(json!(4)));
        assert_eq!(
            max_replication_value(Some(json!(5)), Some(json!(4))),
            Some(json!(5))
        );
    }

    #[test]
    fn start_date_renders_as_slack_ts() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(datetime_to_slack_ts(start), "1704067200.000000");
        assert_eq!(
            ReplicationFormat::Rfc3339.render(start),
            json!("2024-01-01T00:00:00+00:00")
        );
        assert_eq!(slack_ts_to_datetime("1704067200.000000"), Some(start));
        assert_eq!(slack_ts_to_datetime("not-a-ts"), None);
    }

    proptest! {
        #[test]
        fn slack_ts_order_matches_instant_order(a in 0i64..4_000_000_000, am in 0u32..1_000_000,
                                                b in 0i64..4_000_000_000, bm in 0u32..1_000_000) {
            let x = format!("{a}.{am:06}");
            let y = format!("{b}.{bm:06}");
            prop_assert_eq!(
                compare_replication_values(&json!(x), &json!(y)),
                (a, am).cmp(&(b, bm))
            );
        }
    }
}
