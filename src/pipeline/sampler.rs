//! Periodic acquisition loop: frame -> region -> values -> reading log.
//!
//! Runs on a blocking thread. The loop is keyed to a deadline grid, not to
//! frame arrival, and checks the stop token at the top of every iteration
//! and while sleeping.

use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::constants::{CANCEL_POLL_INTERVAL, DEFAULT_FRAME_RETRY, DEFAULT_SAMPLE_PERIOD};
use crate::core::format::Reading;
use crate::core::writer::ReadingLogWriter;
use crate::pipeline::deadline::Deadline;
use crate::state::region_state::RegionState;
use crate::vision::extract::DigitExtractor;
use crate::vision::frame_source::{FrameSource, Region};
use crate::vision::recognizer::Recognizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    NoRegionSelected,
    Sampling,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    pub readings: u64,
    pub empty_ticks: u64,
    pub frame_failures: u64,
    pub skipped_periods: u64,
}

pub struct Sampler<S: FrameSource, R> {
    source: S,
    extractor: DigitExtractor<R>,
    writer: ReadingLogWriter,
    region: RegionState,
    period: Duration,
    frame_retry: Duration,
    state: SamplerState,
    stats: SamplerStats,
}

impl<S: FrameSource, R: Recognizer> Sampler<S, R> {
    pub fn new(
        source: S,
        extractor: DigitExtractor<R>,
        writer: ReadingLogWriter,
        region: RegionState,
    ) -> Self {
        Self {
            source,
            extractor,
            writer,
            region,
            period: DEFAULT_SAMPLE_PERIOD,
            frame_retry: DEFAULT_FRAME_RETRY,
            state: SamplerState::NoRegionSelected,
            stats: SamplerStats::default(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_frame_retry(mut self, frame_retry: Duration) -> Self {
        self.frame_retry = frame_retry;
        self
    }

    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Samples until `cancel` fires. The frame source is released when the
    /// sampler is dropped, which covers normal return and unwinding alike.
    pub fn run(mut self, cancel: CancellationToken) -> SamplerStats {
        info!(
            "Sampler started: period {:?}, log {}",
            self.period,
            self.writer.path().display()
        );

        let mut deadline = Deadline::new(Instant::now(), self.period);

        while !cancel.is_cancelled() {
            let region = match self.state {
                SamplerState::NoRegionSelected => match self.region.current() {
                    Some(region) => {
                        info!("Region selected ({}), sampling", region);
                        self.state = SamplerState::Sampling;
                        deadline.reset(Instant::now());
                        region
                    }
                    None => {
                        sleep_cancellable(self.frame_retry, &cancel);
                        continue;
                    }
                },
                // the region may have been moved since the last tick
                SamplerState::Sampling => match self.region.current() {
                    Some(region) => region,
                    None => {
                        sleep_cancellable(self.frame_retry, &cancel);
                        continue;
                    }
                },
            };

            if !sleep_until(deadline.next(), &cancel) {
                break;
            }

            let Some(frame) = self.source.read_frame() else {
                self.stats.frame_failures += 1;
                warn!("No frame, retrying in {:?}", self.frame_retry);
                sleep_cancellable(self.frame_retry, &cancel);
                continue;
            };

            self.sample(&frame, region);

            let skipped = deadline.advance(Instant::now());
            if skipped > 0 {
                self.stats.skipped_periods += u64::from(skipped);
                warn!("Sampling fell behind, skipped {} period(s)", skipped);
            }
        }

        info!(
            "Sampler stopped: {} ticks, {} readings, {} empty, {} frame failures, {} skipped",
            self.stats.ticks,
            self.stats.readings,
            self.stats.empty_ticks,
            self.stats.frame_failures,
            self.stats.skipped_periods
        );
        self.stats
    }

    fn sample(&mut self, frame: &image::RgbImage, region: Region) {
        self.stats.ticks += 1;

        let values = match region.crop(frame) {
            Some(crop) => self.extractor.extract(&crop),
            None => {
                warn!(
                    "Region {} lies outside the {}x{} frame",
                    region,
                    frame.width(),
                    frame.height()
                );
                Vec::new()
            }
        };

        if values.is_empty() {
            self.stats.empty_ticks += 1;
            debug!("No values this tick");
            return;
        }

        self.writer.append(&Reading::now(values));
        self.stats.readings += 1;
    }
}

impl<S: FrameSource, R> Drop for Sampler<S, R> {
    fn drop(&mut self) {
        self.source.release();
    }
}

/// Sleeps in short slices; `false` when cancelled before `until`.
fn sleep_until(until: Instant, cancel: &CancellationToken) -> bool {
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= until {
            return true;
        }
        thread::sleep((until - now).min(CANCEL_POLL_INTERVAL));
    }
}

fn sleep_cancellable(duration: Duration, cancel: &CancellationToken) {
    sleep_until(Instant::now() + duration, cancel);
}
