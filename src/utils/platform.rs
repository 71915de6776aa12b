//! OS-dependent defaults, consulted once at startup.

use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "ocr-meter";

/// Directory for the reading log, aggregate tables and app log.
///
/// Returns `$XDG_DATA_HOME/ocr-meter` if set, otherwise
/// `~/.local/share/ocr-meter`.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share").join(APP_DIR)
    } else {
        PathBuf::from(".local/share").join(APP_DIR)
    }
}

/// Where the installer usually puts tesseract when it is not on `PATH`.
pub fn default_tesseract_path() -> Option<PathBuf> {
    if cfg!(windows) {
        Some(PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"))
    } else if cfg!(target_os = "macos") {
        Some(PathBuf::from("/opt/homebrew/bin/tesseract"))
    } else {
        None
    }
}

/// ffmpeg input arguments selecting camera `index` on this OS.
pub fn capture_input_args(index: u32) -> Vec<String> {
    if cfg!(target_os = "macos") {
        vec![
            "-f".into(),
            "avfoundation".into(),
            "-framerate".into(),
            "30".into(),
            "-i".into(),
            format!("{index}:none"),
        ]
    } else if cfg!(windows) {
        vec!["-f".into(), "vfwcap".into(), "-i".into(), index.to_string()]
    } else {
        vec![
            "-f".into(),
            "v4l2".into(),
            "-i".into(),
            format!("/dev/video{index}"),
        ]
    }
}

pub fn device_path(index: u32) -> Option<PathBuf> {
    if cfg!(target_os = "linux") {
        Some(PathBuf::from(format!("/dev/video{index}")))
    } else {
        None
    }
}

/// V4L2 device name from sysfs; `None` elsewhere.
pub fn device_name(index: u32) -> Option<String> {
    if !cfg!(target_os = "linux") {
        return None;
    }
    let name_file = PathBuf::from(format!("/sys/class/video4linux/video{index}/name"));
    fs::read_to_string(name_file)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
