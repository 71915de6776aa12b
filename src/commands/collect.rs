// collect - sample the camera into the reading log

use std::io::BufRead;
use std::thread;

use anyhow::{anyhow, Context};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use meter_log::core::writer::ReadingLogWriter;
use meter_log::models::config_model::MeterConfig;
use meter_log::pipeline::sampler::Sampler;
use meter_log::state::region_state::RegionState;
use meter_log::utils::{platform, shutdown};
use meter_log::vision::camera::FfmpegCamera;
use meter_log::vision::extract::DigitExtractor;
use meter_log::vision::frame_source::{open_first, Region};
use meter_log::vision::recognizer::TesseractRecognizer;

pub async fn run(config: &MeterConfig, roi: Option<Region>) -> anyhow::Result<()> {
    let default_exe = platform::default_tesseract_path();
    let exe = TesseractRecognizer::locate(config.ocr.tesseract_path.as_deref(), default_exe.as_deref())?;
    let recognizer = TesseractRecognizer::new(exe).with_modes(config.ocr.oem, config.ocr.psm);
    recognizer.probe().context("tesseract is not usable")?;

    let writer = ReadingLogWriter::new(&config.paths.readings).with_sync(config.sampling.sync_writes);
    writer
        .ensure_exists()
        .with_context(|| format!("cannot create reading log {}", writer.path().display()))?;
    info!("Readings are logged to {}", writer.path().display());

    let region = match roi.or(config.sampling.region) {
        Some(region) => RegionState::with_region(region),
        None => {
            info!("No region configured; enter x,y,width,height on stdin to start sampling");
            RegionState::new()
        }
    };

    let cancel = CancellationToken::new();
    let listener = shutdown::cancel_on_signal(cancel.clone());
    spawn_region_input(region.clone(), cancel.clone());

    let candidates = config.camera.candidates.clone();
    let settings = config.camera_settings();
    let extractor = DigitExtractor::new(recognizer).with_whitelist(config.ocr.whitelist.clone());
    let period = config.sample_period();
    let frame_retry = config.frame_retry();

    let sampler_cancel = cancel.clone();
    let stats = tokio::task::spawn_blocking(move || {
        let (_, camera) = open_first(&candidates, |index| FfmpegCamera::open(index, settings.clone()))
            .ok_or_else(|| anyhow!("no camera could be opened (tried {:?})", candidates))?;

        let sampler = Sampler::new(camera, extractor, writer, region)
            .with_period(period)
            .with_frame_retry(frame_retry);
        Ok::<_, anyhow::Error>(sampler.run(sampler_cancel))
    })
    .await
    .context("sampling thread panicked")?;

    cancel.cancel();
    listener.await.ok();
    let stats = stats?;

    info!(
        "Collector stopped: {} ticks, {} readings, {} empty, {} frame failures, {} skipped periods",
        stats.ticks, stats.readings, stats.empty_ticks, stats.frame_failures, stats.skipped_periods
    );
    Ok(())
}

/// Reads `x,y,width,height` lines from stdin; each valid line selects the region.
///
/// Runs on a plain thread so a blocked read never holds up runtime shutdown.
fn spawn_region_input(region: RegionState, cancel: CancellationToken) {
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if cancel.is_cancelled() {
                break;
            }
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse::<Region>() {
                Ok(selected) => {
                    info!("Region set to {}", selected);
                    region.select(selected);
                }
                Err(e) => warn!("Ignoring region input: {}", e),
            }
        }
    });
}
