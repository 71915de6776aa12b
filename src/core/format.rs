// Data structures for the reading log and aggregate tables

use chrono::{DateTime, Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::constants::*;

/// One timestamped set of values taken from a single sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub values: Vec<f64>,
}

impl Reading {
    /// Builds a reading, truncating the timestamp to whole seconds.
    pub fn new(timestamp: NaiveDateTime, values: Vec<f64>) -> Self {
        Self {
            timestamp: truncate_to_second(timestamp),
            values,
        }
    }

    pub fn now(values: Vec<f64>) -> Self {
        Self::new(Local::now().naive_local(), values)
    }

    /// Serializes as `<ts>\t<v1>, <v2>, ...\n`.
    pub fn to_line(&self) -> String {
        let values: Vec<String> = self.values.iter().map(|v| format_value(*v)).collect();
        format!(
            "{}{}{}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            FIELD_SEPARATOR,
            values.join(VALUE_SEPARATOR)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BucketWidth {
    Minute,
    Hour,
}

impl BucketWidth {
    pub const ALL: [BucketWidth; 2] = [BucketWidth::Minute, BucketWidth::Hour];

    /// Truncates `ts` down to the start of its bucket.
    pub fn floor(self, ts: NaiveDateTime) -> NaiveDateTime {
        let ts = truncate_to_second(ts);
        let floored = match self {
            BucketWidth::Minute => ts.with_second(0),
            BucketWidth::Hour => ts.with_second(0).and_then(|t| t.with_minute(0)),
        };
        // zero is always a valid minute/second
        floored.unwrap_or(ts)
    }

    pub fn label(self) -> &'static str {
        match self {
            BucketWidth::Minute => "minute",
            BucketWidth::Hour => "hour",
        }
    }
}

impl fmt::Display for BucketWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Summary statistics for one bucket of one width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    pub bucket_start: NaiveDateTime,
    #[serde(rename = "cnt")]
    pub count: u64,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl AggregateBucket {
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.bucket_start.format(TIMESTAMP_FORMAT),
            self.count,
            format_value(self.avg),
            format_value(self.min),
            format_value(self.max)
        )
    }
}

/// Shortest round-trippable decimal, always with a radix point (`24.0`, not `24`).
pub fn format_value(v: f64) -> String {
    format!("{:?}", v)
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in TIMESTAMP_READ_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(truncate_to_second(ts));
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| truncate_to_second(ts.with_timezone(&Local).naive_local()))
}

/// Parses the comma-separated value field of a log line.
///
/// Returns the accepted values and the tokens that were rejected, so the
/// caller can report them. Empty tokens are ignored silently.
pub fn parse_values(raw: &str) -> (Vec<f64>, Vec<&str>) {
    let mut values = Vec::new();
    let mut rejected = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<f64>() {
            Ok(v) if v.is_finite() => values.push(v),
            _ => rejected.push(token),
        }
    }
    (values, rejected)
}

fn truncate_to_second(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_line_layout() {
        let reading = Reading::new(ts(10, 0, 5), vec![23.5, 23.6]);
        assert_eq!(reading.to_line(), "2024-01-01T10:00:05\t23.5, 23.6\n");

        let whole = Reading::new(ts(10, 0, 40), vec![24.0]);
        assert_eq!(whole.to_line(), "2024-01-01T10:00:40\t24.0\n");
    }

    #[test]
    fn test_new_truncates_subseconds() {
        let precise = ts(10, 0, 5).with_nanosecond(750_000_000).unwrap();
        let reading = Reading::new(precise, vec![1.0]);
        assert_eq!(reading.timestamp, ts(10, 0, 5));
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("2024-01-01T10:00:05"), Some(ts(10, 0, 5)));
        assert_eq!(parse_timestamp("2024-01-01 10:00:05"), Some(ts(10, 0, 5)));
        assert_eq!(parse_timestamp("2024-01-01T10:00:05.123"), Some(ts(10, 0, 5)));
        assert!(parse_timestamp("2024-01-01T10:00:05+00:00").is_some());
        assert_eq!(parse_timestamp("garbage"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_parse_values_skips_bad_tokens() {
        let (values, rejected) = parse_values("1.5, abc, 2, , nan, 3.25");
        assert_eq!(values, vec![1.5, 2.0, 3.25]);
        assert_eq!(rejected, vec!["abc", "nan"]);
    }

    #[test]
    fn test_floor_boundaries() {
        assert_eq!(BucketWidth::Minute.floor(ts(10, 0, 59)), ts(10, 0, 0));
        assert_eq!(BucketWidth::Minute.floor(ts(10, 1, 0)), ts(10, 1, 0));
        assert_eq!(BucketWidth::Hour.floor(ts(10, 59, 59)), ts(10, 0, 0));
        assert_eq!(BucketWidth::Hour.floor(ts(11, 0, 0)), ts(11, 0, 0));
    }

    #[test]
    fn test_csv_row() {
        let bucket = AggregateBucket {
            bucket_start: ts(10, 0, 0),
            count: 3,
            avg: 23.75,
            min: 23.5,
            max: 24.0,
        };
        assert_eq!(bucket.to_csv_row(), "2024-01-01T10:00:00,3,23.75,23.5,24.0");
    }
}
