// Aggregation scheduler - rebuilds the minute and hour tables

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::aggregate::aggregate;
use crate::core::error::Result;
use crate::core::format::BucketWidth;
use crate::core::reader::ReadingLogReader;
use crate::core::table::{ensure_table, write_table};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub readings: usize,
    pub values: usize,
    pub minute_rows: usize,
    pub hour_rows: usize,
    /// Header-only tables created because the log was empty.
    pub initialized: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    pub cycles: u64,
    pub failures: u64,
}

/// Rebuilds the minute and hour tables from the reading log.
#[derive(Debug, Clone)]
pub struct Processor {
    reader: ReadingLogReader,
    minute_table: PathBuf,
    hour_table: PathBuf,
}

impl Processor {
    pub fn new(reader: ReadingLogReader, minute_table: PathBuf, hour_table: PathBuf) -> Self {
        Self {
            reader,
            minute_table,
            hour_table,
        }
    }

    pub fn table_path(&self, width: BucketWidth) -> &Path {
        match width {
            BucketWidth::Minute => &self.minute_table,
            BucketWidth::Hour => &self.hour_table,
        }
    }

    /// One full recompute: load, aggregate both widths, replace both tables.
    pub fn run_once(&self) -> Result<CycleSummary> {
        let readings = self.reader.load(None)?;
        let mut summary = CycleSummary {
            readings: readings.len(),
            values: readings.iter().map(|r| r.values.len()).sum(),
            ..CycleSummary::default()
        };

        if readings.is_empty() {
            for width in BucketWidth::ALL {
                if ensure_table(self.table_path(width))? {
                    summary.initialized += 1;
                }
            }
            return Ok(summary);
        }

        for width in BucketWidth::ALL {
            let table = aggregate(&readings, width);
            write_table(&table, self.table_path(width))?;
            match width {
                BucketWidth::Minute => summary.minute_rows = table.len(),
                BucketWidth::Hour => summary.hour_rows = table.len(),
            }
        }
        Ok(summary)
    }

    /// Runs a cycle now and then every `period` until `cancel` fires.
    ///
    /// Cycles run on the blocking pool; an error or a panic in one cycle is
    /// logged and the next cycle runs as scheduled.
    pub async fn run_forever(self: Arc<Self>, period: Duration, cancel: CancellationToken) -> ProcessorStats {
        info!(
            "Processor started: source {}, every {:?}",
            self.reader.path().display(),
            period
        );

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut stats = ProcessorStats::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    stats.cycles += 1;
                    let processor = Arc::clone(&self);
                    match tokio::task::spawn_blocking(move || processor.run_once()).await {
                        Ok(Ok(summary)) => info!(
                            "Aggregates updated -> {}, {} ({} readings, {} minute rows, {} hour rows)",
                            self.minute_table.display(),
                            self.hour_table.display(),
                            summary.readings,
                            summary.minute_rows,
                            summary.hour_rows
                        ),
                        Ok(Err(err)) => {
                            stats.failures += 1;
                            error!("Aggregation cycle {} failed: {err:?}", stats.cycles);
                        }
                        Err(join_err) => {
                            stats.failures += 1;
                            error!("Aggregation cycle {} panicked: {join_err}", stats.cycles);
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    info!("Processor shutting down");
                    break;
                }
            }
        }
        stats
    }
}
