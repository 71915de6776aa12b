// Region image -> numeric values

use crate::core::constants::{DIGIT_WHITELIST, NUMBER_PATTERN};
use crate::vision::preprocess::normalize;
use crate::vision::recognizer::Recognizer;
use image::{GrayImage, RgbImage};
use regex::Regex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{debug, warn};

pub struct DigitExtractor<R> {
    recognizer: R,
    whitelist: String,
}

impl<R: Recognizer> DigitExtractor<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            whitelist: DIGIT_WHITELIST.to_string(),
        }
    }

    pub fn with_whitelist(mut self, whitelist: impl Into<String>) -> Self {
        self.whitelist = whitelist.into();
        self
    }

    /// Never fails: any stage that goes wrong yields no values.
    pub fn extract(&self, region: &RgbImage) -> Vec<f64> {
        if region.width() == 0 || region.height() == 0 {
            return Vec::new();
        }

        let text = match panic::catch_unwind(AssertUnwindSafe(|| {
            let binary = normalize(region);
            self.recognize_text(&binary)
        })) {
            Ok(text) => text,
            Err(_) => {
                warn!("Digit extraction panicked, tick dropped");
                return Vec::new();
            }
        };

        let values = parse_numbers(&text);
        debug!("Recognized {:?} -> {:?}", text, values);
        values
    }

    fn recognize_text(&self, binary: &GrayImage) -> String {
        match self.recognizer.recognize(binary, &self.whitelist) {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Recognizer failed: {}", e);
                String::new()
            }
        }
    }
}

fn number_regex() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(NUMBER_PATTERN).expect("number pattern is valid"))
}

/// Pulls every integer or decimal out of recognizer text.
///
/// `:` and `,` are read as decimal points; the recognizer confuses them
/// with `.` on segment displays.
pub fn parse_numbers(raw: &str) -> Vec<f64> {
    let clean = raw.replace([':', ','], ".");
    number_regex()
        .find_iter(&clean)
        .filter_map(|m| match m.as_str().parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                debug!("Number parse skipped: {}", m.as_str());
                None
            }
        })
        .collect()
}
