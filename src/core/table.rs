// Aggregate table persistence - write to a sibling temp file, then rename

use crate::core::constants::TABLE_HEADER;
use crate::core::error::{MeterError, Result};
use crate::core::format::AggregateBucket;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Replaces `target` with the CSV rendering of `table`.
///
/// Readers of `target` see either the previous complete file or the new
/// complete file, never a partial one.
pub fn write_table(table: &[AggregateBucket], target: &Path) -> Result<()> {
    write_atomic(target, |out| {
        writeln!(out, "{}", TABLE_HEADER)?;
        for bucket in table {
            writeln!(out, "{}", bucket.to_csv_row())?;
        }
        Ok(())
    })
}

/// Writes a header-only table unless `target` already exists.
///
/// Returns whether a file was written.
pub fn ensure_table(target: &Path) -> Result<bool> {
    if target.exists() {
        return Ok(false);
    }
    write_table(&[], target)?;
    Ok(true)
}

pub(crate) fn write_atomic<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let tmp = temp_path_for(target)?;

    let result = (|| -> Result<()> {
        let mut out = BufWriter::new(File::create(&tmp)?);
        fill(&mut out)?;
        let file = out
            .into_inner()
            .map_err(|e| MeterError::Io(e.into_error()))?;
        file.sync_all()?;
        fs::rename(&tmp, target)?;
        Ok(())
    })();

    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            warn!("Could not remove temp table {}: {}", tmp.display(), e);
        }
    }
    result
}

/// Sibling of `target`: same directory, so the rename never crosses a
/// filesystem boundary.
fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| MeterError::Config(format!("table path has no file name: {}", target.display())))?;
    let tmp_name = format!(".{}.{}.tmp", name.to_string_lossy(), uuid::Uuid::new_v4().simple());
    Ok(target.with_file_name(tmp_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn bucket(minute: u32, count: u64) -> AggregateBucket {
        AggregateBucket {
            bucket_start: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, minute, 0)
                .unwrap(),
            count,
            avg: 1.5,
            min: 1.0,
            max: 2.0,
        }
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn test_write_table_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("minute_agg.csv");
        write_table(&[bucket(0, 2), bucket(1, 4)], &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "bucket_start,cnt,avg,min,max\n\
             2024-01-01T10:00:00,2,1.5,1.0,2.0\n\
             2024-01-01T10:01:00,4,1.5,1.0,2.0\n"
        );
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_empty_table_has_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hour_agg.csv");
        assert!(ensure_table(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "bucket_start,cnt,avg,min,max\n");
    }

    #[test]
    fn test_ensure_table_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hour_agg.csv");
        write_table(&[bucket(0, 1)], &path).unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(!ensure_table(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_interrupted_write_leaves_old_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("minute_agg.csv");
        write_table(&[bucket(0, 1)], &path).unwrap();
        let old = fs::read_to_string(&path).unwrap();

        let result = write_atomic(&path, |out| {
            writeln!(out, "{}", TABLE_HEADER)?;
            writeln!(out, "2024-01-01T10:05")?;
            Err(io::Error::new(io::ErrorKind::Other, "interrupted"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), old);
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_concurrent_reader_sees_whole_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("minute_agg.csv");

        let small: Vec<_> = (0..2).map(|m| bucket(m, 1)).collect();
        let large: Vec<_> = (0..60).map(|m| bucket(m, 100)).collect();
        write_table(&small, &path).unwrap();

        let render = |rows: &[AggregateBucket]| {
            let mut s = format!("{}\n", TABLE_HEADER);
            for r in rows {
                s.push_str(&r.to_csv_row());
                s.push('\n');
            }
            s
        };
        let versions = [render(&small), render(&large)];

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let done = Arc::clone(&done);
            let path = path.clone();
            let versions = versions.clone();
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let seen = fs::read_to_string(&path).unwrap();
                    assert!(versions.contains(&seen), "observed a partial table");
                }
            })
        };

        for i in 0..200 {
            let rows = if i % 2 == 0 { &large } else { &small };
            write_table(rows, &path).unwrap();
        }
        done.store(true, Ordering::Relaxed);
        reader.join().unwrap();
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent").join("minute_agg.csv");
        assert!(write_table(&[], &path).is_err());
    }
}
