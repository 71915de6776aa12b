// Format and tuning constants for the reading log and aggregate tables

use std::time::Duration;

// Reading log line: ISO_TS \t v1, v2, ...
pub const FIELD_SEPARATOR: char = '\t';
pub const VALUE_SEPARATOR: &str = ", ";

// Second precision, naive local time
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

// Accepted on read in addition to RFC 3339
pub const TIMESTAMP_READ_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

pub const TABLE_HEADER: &str = "bucket_start,cnt,avg,min,max";

// Recognizer
pub const DIGIT_WHITELIST: &str = "0123456789:.,";
pub const DEFAULT_OEM: u8 = 3;
pub const DEFAULT_PSM: u8 = 7; // single text line

// Numeric token after ':' and ',' are folded into '.'
pub const NUMBER_PATTERN: &str = r"\d+(?:\.\d+)?";

// Preprocessing
pub const FOREGROUND_RATIO_THRESHOLD: f64 = 0.45;
pub const BILATERAL_DIAMETER: u32 = 9;
pub const BILATERAL_SIGMA_COLOR: f64 = 75.0;
pub const BILATERAL_SIGMA_SPACE: f64 = 75.0;
pub const UPSCALE_FACTOR: u32 = 2;

// Scheduling defaults
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_secs(1);
pub const DEFAULT_FRAME_RETRY: Duration = Duration::from_millis(100);
pub const DEFAULT_PROCESSOR_PERIOD: Duration = Duration::from_secs(60);

// Accepted range for configured loop periods
pub const MIN_SAMPLE_PERIOD_SECS: f64 = 0.01;
pub const MAX_PERIOD_SECS: u64 = 86_400;

// Longest uninterrupted sleep inside the sampling loop before the stop
// signal is re-checked
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);
