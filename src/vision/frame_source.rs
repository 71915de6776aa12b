// Frame sources and regions of interest

use crate::core::error::{MeterError, Result};
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

/// Anything that can hand out camera frames.
///
/// `read_frame` returning `None` is a transient failure; callers back off
/// and try again. The device is released by `release` or on drop.
pub trait FrameSource {
    fn read_frame(&mut self) -> Option<RgbImage>;

    fn release(&mut self) {}
}

/// Rectangle in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        let region = Self { x, y, width, height };
        region.validate()?;
        Ok(region)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(MeterError::InvalidRegion {
                x: self.x,
                y: self.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Cuts the region out of `frame`, clipped to the frame bounds.
    /// `None` when nothing of the region lies inside the frame.
    pub fn crop(&self, frame: &RgbImage) -> Option<RgbImage> {
        if self.x >= frame.width() || self.y >= frame.height() {
            return None;
        }
        let width = self.width.min(frame.width() - self.x);
        let height = self.height.min(frame.height() - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(imageops::crop_imm(frame, self.x, self.y, width, height).to_image())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.x, self.y, self.width, self.height)
    }
}

/// Parses `x,y,width,height`.
impl FromStr for Region {
    type Err = MeterError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<u32> = s
            .split(',')
            .map(|p| p.trim().parse::<u32>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| MeterError::Parse(format!("region {s:?}: {e}")))?;

        match parts.as_slice() {
            [x, y, w, h] => Region::new(*x, *y, *w, *h),
            _ => Err(MeterError::Parse(format!(
                "region {s:?}: expected x,y,width,height"
            ))),
        }
    }
}

/// Tries each candidate in order and keeps the first that opens.
pub fn open_first<S, F>(candidates: &[u32], mut open: F) -> Option<(u32, S)>
where
    F: FnMut(u32) -> Result<S>,
{
    for &index in candidates {
        match open(index) {
            Ok(source) => {
                info!("Camera opened: index={}", index);
                return Some((index, source));
            }
            Err(e) => warn!("Camera index {} unavailable: {}", index, e),
        }
    }
    None
}
