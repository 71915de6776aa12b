// Reading log writer - line-at-a-time appends

use crate::core::error::Result;
use crate::core::format::Reading;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct ReadingLogWriter {
    path: PathBuf,
    sync: bool,
}

impl ReadingLogWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sync: false,
        }
    }

    /// Also fsync after every append.
    pub fn with_sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the log (and its directory) if missing; never truncates.
    pub fn ensure_exists(&self) -> Result<()> {
        self.ensure_parent_dir()?;
        OpenOptions::new().create(true).append(true).open(&self.path)?;
        Ok(())
    }

    /// Appends one reading. Failures are logged and swallowed so a
    /// sampling loop never stops over a single lost write.
    pub fn append(&self, reading: &Reading) {
        match self.try_append(reading) {
            Ok(()) => debug!("Appended {} value(s) to {}", reading.values.len(), self.path.display()),
            Err(e) => error!("Failed to append reading to {}: {}", self.path.display(), e),
        }
    }

    pub fn try_append(&self, reading: &Reading) -> Result<()> {
        self.ensure_parent_dir()?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // close off a fragment left by an interrupted append
        let mut line = String::new();
        if ends_mid_line(&mut file)? {
            debug!("Closing unterminated tail of {}", self.path.display());
            line.push('\n');
        }
        line.push_str(&reading.to_line());

        // whole line in one call so readers never see a torn line
        file.write_all(line.as_bytes())?;
        file.flush()?;
        if self.sync {
            file.sync_data()?;
        }
        Ok(())
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn ends_mid_line(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
