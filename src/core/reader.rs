// Reading log reader - tolerant parser for the append-only log

use crate::core::constants::FIELD_SEPARATOR;
use crate::core::error::Result;
use crate::core::format::{parse_timestamp, parse_values, Reading};
use chrono::{Duration, Local, NaiveDateTime};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReadingLogReader {
    path: PathBuf,
}

impl ReadingLogReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every reading, optionally only those newer than `now - max_age`.
    ///
    /// A missing log is an empty series. Malformed lines and tokens are
    /// skipped; the result is sorted by timestamp. An age reaching past the
    /// representable calendar means no cutoff.
    pub fn load(&self, max_age: Option<Duration>) -> Result<Vec<Reading>> {
        let now = Local::now().naive_local();
        let cutoff = max_age.and_then(|age| now.checked_sub_signed(age));
        self.load_since(cutoff)
    }

    pub fn load_since(&self, cutoff: Option<NaiveDateTime>) -> Result<Vec<Reading>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let text = String::from_utf8_lossy(&bytes);
        let mut readings = parse_log(&text);

        if let Some(cutoff) = cutoff {
            readings.retain(|r| r.timestamp >= cutoff);
        }
        Ok(readings)
    }
}

/// Parses log text into readings sorted by timestamp.
///
/// Only newline-terminated lines count: a trailing fragment is an append
/// still in flight and is left for the next load.
pub fn parse_log(text: &str) -> Vec<Reading> {
    let complete = match text.rfind('\n') {
        Some(end) => &text[..=end],
        None => "",
    };

    let mut readings: Vec<Reading> = complete
        .lines()
        .enumerate()
        .filter_map(|(i, line)| parse_line(i + 1, line))
        .collect();

    // stable: equal timestamps keep append order
    readings.sort_by_key(|r| r.timestamp);
    readings
}

fn parse_line(line_no: usize, raw: &str) -> Option<Reading> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    let Some((ts_str, values_str)) = line.split_once(FIELD_SEPARATOR) else {
        debug!("Line {} has no separator, skipped", line_no);
        return None;
    };

    let Some(timestamp) = parse_timestamp(ts_str) else {
        debug!("Line {} timestamp unparsable, skipped: {:?}", line_no, ts_str);
        return None;
    };

    let (values, rejected) = parse_values(values_str);
    for token in rejected {
        debug!("Line {} value unparsable, skipped: {:?}", line_no, token);
    }

    if values.is_empty() {
        return None;
    }
    Some(Reading::new(timestamp, values))
}
