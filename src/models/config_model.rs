// Runtime configuration model

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::core::constants::{
    DEFAULT_OEM, DEFAULT_PSM, DEFAULT_SAMPLE_PERIOD, DIGIT_WHITELIST, MAX_PERIOD_SECS,
    MIN_SAMPLE_PERIOD_SECS,
};
use crate::core::error::{MeterError, Result};
use crate::vision::camera::CameraSettings;
use crate::vision::frame_source::Region;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Base for relative paths; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub paths: PathsConfig,
    pub sampling: SamplingConfig,
    pub processor: ProcessorConfig,
    pub camera: CameraConfig,
    pub ocr: OcrConfig,
    /// Default window for `recent`.
    pub recent_window_mins: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub readings: PathBuf,
    pub minute_table: PathBuf,
    pub hour_table: PathBuf,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub period_secs: f64,
    pub frame_retry_ms: u64,
    pub sync_writes: bool,
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub candidates: Vec<u32>,
    pub ffmpeg: PathBuf,
    pub width: u32,
    pub height: u32,
    pub open_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: Option<PathBuf>,
    pub oem: u8,
    pub psm: u8,
    pub whitelist: String,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            paths: PathsConfig::default(),
            sampling: SamplingConfig::default(),
            processor: ProcessorConfig::default(),
            camera: CameraConfig::default(),
            ocr: OcrConfig::default(),
            recent_window_mins: 30,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            readings: PathBuf::from("readings.txt"),
            minute_table: PathBuf::from("minute_agg.csv"),
            hour_table: PathBuf::from("hour_agg.csv"),
            log_file: PathBuf::from("app.log"),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_secs: 1.0,
            frame_retry_ms: 100,
            sync_writes: false,
            region: None,
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self { period_secs: 60 }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        let settings = CameraSettings::default();
        Self {
            candidates: vec![0, 1, 2],
            ffmpeg: settings.ffmpeg,
            width: settings.width,
            height: settings.height,
            open_timeout_ms: settings.open_timeout.as_millis() as u64,
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: None,
            oem: DEFAULT_OEM,
            psm: DEFAULT_PSM,
            whitelist: DIGIT_WHITELIST.to_string(),
        }
    }
}

impl MeterConfig {
    pub fn validate(&self) -> Result<()> {
        let sample = self.sampling.period_secs;
        if !(MIN_SAMPLE_PERIOD_SECS..=MAX_PERIOD_SECS as f64).contains(&sample) {
            return Err(MeterError::Config(format!(
                "sampling.period_secs must be within {MIN_SAMPLE_PERIOD_SECS}..={MAX_PERIOD_SECS}, got {sample}"
            )));
        }
        if !(1..=MAX_PERIOD_SECS).contains(&self.processor.period_secs) {
            return Err(MeterError::Config(format!(
                "processor.period_secs must be within 1..={MAX_PERIOD_SECS}, got {}",
                self.processor.period_secs
            )));
        }
        if self.camera.candidates.is_empty() {
            return Err(MeterError::Config("camera.candidates is empty".into()));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(MeterError::Config("camera frame size must be non-zero".into()));
        }
        if let Some(region) = &self.sampling.region {
            region.validate()?;
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.sampling.period_secs).unwrap_or(DEFAULT_SAMPLE_PERIOD)
    }

    pub fn frame_retry(&self) -> Duration {
        Duration::from_millis(self.sampling.frame_retry_ms)
    }

    pub fn processor_period(&self) -> Duration {
        Duration::from_secs(self.processor.period_secs)
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            ffmpeg: self.camera.ffmpeg.clone(),
            width: self.camera.width,
            height: self.camera.height,
            open_timeout: Duration::from_millis(self.camera.open_timeout_ms),
            ..CameraSettings::default()
        }
    }
}
