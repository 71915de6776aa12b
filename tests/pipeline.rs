//! Sampler -> reading log -> processor -> tables, through the public API.

use std::fs;
use std::path::Path;
use std::time::Duration;

use image::{GrayImage, RgbImage};
use meter_log::core::constants::TABLE_HEADER;
use meter_log::state::region_state::RegionState;
use meter_log::vision::extract::DigitExtractor;
use meter_log::vision::frame_source::{FrameSource, Region};
use meter_log::vision::recognizer::Recognizer;
use meter_log::{BucketWidth, Processor, ReadingLogReader, ReadingLogWriter, Sampler};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

struct Frames {
    left: usize,
    cancel: CancellationToken,
}

impl FrameSource for Frames {
    fn read_frame(&mut self) -> Option<RgbImage> {
        if self.left == 0 {
            self.cancel.cancel();
            return None;
        }
        self.left -= 1;
        Some(RgbImage::new(64, 32))
    }
}

struct MeterDisplay(&'static str);

impl Recognizer for MeterDisplay {
    fn recognize(&self, _image: &GrayImage, _whitelist: &str) -> meter_log::Result<String> {
        Ok(self.0.to_string())
    }
}

fn processor(dir: &Path) -> Processor {
    Processor::new(
        ReadingLogReader::new(dir.join("readings.txt")),
        dir.join("minute_agg.csv"),
        dir.join("hour_agg.csv"),
    )
}

fn data_rows(path: &Path) -> Vec<Vec<String>> {
    let text = fs::read_to_string(path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(TABLE_HEADER));
    lines
        .map(|l| l.split(',').map(str::to_string).collect())
        .collect()
}

#[test]
fn sampled_readings_reach_both_tables() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let writer = ReadingLogWriter::new(dir.path().join("readings.txt"));
    writer.ensure_exists().unwrap();

    let sampler = Sampler::new(
        Frames { left: 4, cancel: cancel.clone() },
        DigitExtractor::new(MeterDisplay("12.5 7")),
        writer,
        RegionState::with_region(Region::new(0, 0, 64, 32).unwrap()),
    )
    .with_period(Duration::from_millis(5))
    .with_frame_retry(Duration::from_millis(1));

    let stats = sampler.run(cancel);
    assert_eq!(stats.readings, 4);

    let p = processor(dir.path());
    let summary = p.run_once().unwrap();
    assert_eq!(summary.readings, 4);
    assert_eq!(summary.values, 8);

    for width in BucketWidth::ALL {
        let rows = data_rows(p.table_path(width));
        assert!(!rows.is_empty());
        let total: u64 = rows.iter().map(|r| r[1].parse::<u64>().unwrap()).sum();
        assert_eq!(total, 8, "{width} table");
        for row in &rows {
            assert_eq!(row[3], "7.0");
            assert_eq!(row[4], "12.5");
        }
    }
}

#[test]
fn garbage_lines_do_not_break_aggregation() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("readings.txt"),
        "2024-03-01T08:15:02\t10.0, 20.0\n\
         this line is noise\n\
         2024-03-01T08:15:59\tabc, 30.0\n\
         not-a-time\t5.0\n\
         2024-03-01T08:16:00\t40.0\n\
         2024-03-01T08:17:00\t50",
    )
    .unwrap();

    let p = processor(dir.path());
    let summary = p.run_once().unwrap();
    assert_eq!(summary.readings, 3);

    let minutes = data_rows(p.table_path(BucketWidth::Minute));
    assert_eq!(minutes.len(), 2);
    assert_eq!(minutes[0][..2], ["2024-03-01T08:15:00", "3"]);
    assert_eq!(minutes[0][2..], ["20.0", "10.0", "30.0"]);
    assert_eq!(minutes[1], ["2024-03-01T08:16:00", "1", "40.0", "40.0", "40.0"]);

    let hours = data_rows(p.table_path(BucketWidth::Hour));
    assert_eq!(hours, vec![vec!["2024-03-01T08:00:00", "4", "25.0", "10.0", "40.0"]]);
}

#[test]
fn missing_log_yields_header_only_tables() {
    let dir = TempDir::new().unwrap();
    let p = processor(dir.path());
    p.run_once().unwrap();

    for width in BucketWidth::ALL {
        assert_eq!(
            fs::read_to_string(p.table_path(width)).unwrap(),
            format!("{TABLE_HEADER}\n")
        );
    }
}
