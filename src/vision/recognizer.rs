// Text recognition backends

use crate::core::constants::{DEFAULT_OEM, DEFAULT_PSM};
use crate::core::error::{MeterError, Result};
use image::{GrayImage, ImageFormat};
use std::env;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::info;

/// Turns a binarized image into raw text, restricted to `whitelist`.
pub trait Recognizer {
    fn recognize(&self, image: &GrayImage, whitelist: &str) -> Result<String>;
}

impl<R: Recognizer + ?Sized> Recognizer for Box<R> {
    fn recognize(&self, image: &GrayImage, whitelist: &str) -> Result<String> {
        (**self).recognize(image, whitelist)
    }
}

/// Runs the `tesseract` CLI once per image, piping PNG bytes through stdin.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    exe: PathBuf,
    oem: u8,
    psm: u8,
}

impl TesseractRecognizer {
    pub fn new<P: Into<PathBuf>>(exe: P) -> Self {
        Self {
            exe: exe.into(),
            oem: DEFAULT_OEM,
            psm: DEFAULT_PSM,
        }
    }

    pub fn with_modes(mut self, oem: u8, psm: u8) -> Self {
        self.oem = oem;
        self.psm = psm;
        self
    }

    pub fn exe(&self) -> &Path {
        &self.exe
    }

    /// Resolves the binary: explicit path, then the platform default, then `PATH`.
    pub fn locate(configured: Option<&Path>, platform_default: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = configured {
            if path.is_file() {
                return Ok(path.to_path_buf());
            }
            return Err(MeterError::Config(format!(
                "tesseract not found at configured path {}",
                path.display()
            )));
        }
        if let Some(path) = platform_default.filter(|p| p.is_file()) {
            return Ok(path.to_path_buf());
        }
        find_on_path("tesseract").ok_or_else(|| {
            MeterError::Config(
                "tesseract not found on PATH; install it (e.g. `apt install tesseract-ocr`) \
                 or set `tesseract_path` in the config"
                    .to_string(),
            )
        })
    }

    /// Runs `tesseract --version` to prove the binary is usable.
    pub fn probe(&self) -> Result<String> {
        let output = Command::new(&self.exe)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| MeterError::Recognizer(format!("{}: {}", self.exe.display(), e)))?;

        if !output.status.success() {
            return Err(MeterError::Recognizer(format!(
                "{} --version exited with {}",
                self.exe.display(),
                output.status
            )));
        }

        // older builds print the banner on stderr
        let banner = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
        let version = String::from_utf8_lossy(banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        info!("Recognizer ready: {} ({})", self.exe.display(), version);
        Ok(version)
    }
}

impl Recognizer for TesseractRecognizer {
    fn recognize(&self, image: &GrayImage, whitelist: &str) -> Result<String> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut child = Command::new(&self.exe)
            .args(["stdin", "stdout", "--oem"])
            .arg(self.oem.to_string())
            .arg("--psm")
            .arg(self.psm.to_string())
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={whitelist}"))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MeterError::Recognizer(format!("spawn {}: {}", self.exe.display(), e)))?;

        // tesseract reads all of stdin before writing, so no pipe deadlock
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(MeterError::Recognizer(format!(
                "exit {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn find_on_path(name: &str) -> Option<PathBuf> {
    let exe_name = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(&exe_name))
        .find(|candidate| candidate.is_file())
}
