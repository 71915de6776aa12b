//! Camera frames through a long-lived ffmpeg subprocess.
//!
//! ffmpeg decodes the device and writes raw RGB24 frames of a fixed size to
//! stdout. A reader thread keeps only the newest frame; `read_frame` waits
//! briefly for a frame newer than the last one handed out, so a stalled
//! device shows up as a transient failure instead of a frozen picture.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbImage;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::error::{MeterError, Result};
use crate::utils::platform;
use crate::vision::frame_source::FrameSource;

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub ffmpeg: PathBuf,
    pub width: u32,
    pub height: u32,
    /// How long `open` waits for the first frame before giving up.
    pub open_timeout: Duration,
    /// How long `read_frame` waits for a fresh frame.
    pub frame_timeout: Duration,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            width: 640,
            height: 480,
            open_timeout: Duration::from_secs(2),
            frame_timeout: Duration::from_secs(1),
        }
    }
}

impl CameraSettings {
    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

#[derive(Default)]
struct FrameSlot {
    frame: Option<Vec<u8>>,
    seq: u64,
    alive: bool,
}

struct Shared {
    slot: Mutex<FrameSlot>,
    ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, FrameSlot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct Capture {
    child: Child,
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn(index: u32, settings: &CameraSettings) -> Result<Self> {
        let mut child = Command::new(&settings.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(platform::capture_input_args(index))
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-vf"])
            .arg(format!("scale={}:{}", settings.width, settings.height))
            .arg("pipe:1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MeterError::FrameSource(format!("spawn {}: {}", settings.ffmpeg.display(), e)))?;

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(MeterError::FrameSource("ffmpeg stdout unavailable".into()));
        };

        let shared = Arc::new(Shared {
            slot: Mutex::new(FrameSlot {
                alive: true,
                ..FrameSlot::default()
            }),
            ready: Condvar::new(),
        });
        let frame_len = settings.frame_len();
        let reader = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || reader_loop(stdout, frame_len, shared))
        };

        let mut capture = Capture {
            child,
            shared,
            reader: Some(reader),
        };

        if capture.wait_newer(0, settings.open_timeout).is_none() {
            capture.shutdown();
            return Err(MeterError::FrameSource(format!(
                "camera {index} produced no frame within {:?}",
                settings.open_timeout
            )));
        }
        Ok(capture)
    }

    /// Waits for a frame with sequence number above `seen`.
    fn wait_newer(&self, seen: u64, timeout: Duration) -> Option<(u64, Vec<u8>)> {
        let guard = self.shared.lock();
        let (guard, _) = self
            .shared
            .ready
            .wait_timeout_while(guard, timeout, |slot| slot.alive && slot.seq <= seen)
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if guard.seq > seen {
            guard.frame.clone().map(|f| (guard.seq, f))
        } else {
            None
        }
    }

    fn is_alive(&self) -> bool {
        self.shared.lock().alive
    }

    fn shutdown(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        // pipe is closed now, so the reader hits EOF
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}

fn reader_loop(mut stdout: ChildStdout, frame_len: usize, shared: Arc<Shared>) {
    let mut buf = vec![0u8; frame_len];
    loop {
        let ok = stdout.read_exact(&mut buf).is_ok();
        let mut slot = shared.lock();
        if ok {
            slot.frame = Some(buf.clone());
            slot.seq += 1;
        } else {
            slot.alive = false;
        }
        shared.ready.notify_all();
        if !ok {
            return;
        }
    }
}

/// Camera `index` read through ffmpeg. Released on drop.
pub struct FfmpegCamera {
    index: u32,
    settings: CameraSettings,
    capture: Option<Capture>,
    last_seq: u64,
}

impl FfmpegCamera {
    /// Opens the device and waits for its first frame.
    pub fn open(index: u32, settings: CameraSettings) -> Result<Self> {
        let capture = Capture::spawn(index, &settings)?;
        Ok(Self {
            index,
            settings,
            capture: Some(capture),
            last_seq: 0,
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

impl FrameSource for FfmpegCamera {
    fn read_frame(&mut self) -> Option<RgbImage> {
        let alive = self.capture.as_ref().is_some_and(Capture::is_alive);
        if !alive {
            if let Some(mut dead) = self.capture.take() {
                warn!("Camera {} stream ended, reopening", self.index);
                dead.shutdown();
            }
            match Capture::spawn(self.index, &self.settings) {
                Ok(capture) => {
                    info!("Camera {} reopened", self.index);
                    self.capture = Some(capture);
                    self.last_seq = 0;
                }
                Err(e) => debug!("Camera {} reopen failed: {}", self.index, e),
            }
            return None;
        }

        let capture = self.capture.as_ref()?;
        let (seq, bytes) = capture.wait_newer(self.last_seq, self.settings.frame_timeout)?;
        self.last_seq = seq;
        RgbImage::from_raw(self.settings.width, self.settings.height, bytes)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.shutdown();
            info!("Camera {} released", self.index);
        }
    }
}

impl Drop for FfmpegCamera {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraInfo {
    pub index: u32,
    pub path: Option<PathBuf>,
    pub name: Option<String>,
}

/// Lists the camera indices in `0..=max_index` that deliver a frame.
pub fn scan_cameras(max_index: u32, settings: &CameraSettings) -> Vec<CameraInfo> {
    (0..=max_index)
        .filter(|&index| match FfmpegCamera::open(index, settings.clone()) {
            Ok(_camera) => true,
            Err(e) => {
                debug!("Camera {} not usable: {}", index, e);
                false
            }
        })
        .map(|index| CameraInfo {
            index,
            path: platform::device_path(index),
            name: platform::device_name(index),
        })
        .collect()
}
