//! The daemon's `watch.log`.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};

use crate::logging::{LOG_TIMESTAMP_FORMAT, LOG_TIMESTAMP_LEN};

#[derive(Debug, Clone)]
pub struct WatchLog {
    path: PathBuf,
}

impl WatchLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> io::Result<Option<String>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Remove lines whose leading timestamp is older than `retention_days`.
    ///
    /// Lines without a parsable timestamp (continuations, panics) are kept.
    /// The file is truncated and rewritten rather than replaced, so a writer
    /// holding it open in append mode keeps logging to the same file.
    /// Returns the number of lines removed.
    pub fn clean_old_entries(&self, retention_days: u32) -> io::Result<usize> {
        if retention_days == 0 {
            return Ok(0);
        }
        let Some(text) = self.read_all()? else {
            return Ok(0);
        };
        let cutoff = Local::now().naive_local() - Duration::days(i64::from(retention_days));

        let mut kept = String::with_capacity(text.len());
        let mut removed = 0;
        for line in text.lines() {
            match line_timestamp(line) {
                Some(ts) if ts < cutoff => removed += 1,
                _ => {
                    kept.push_str(line);
                    kept.push('\n');
                }
            }
        }

        if removed > 0 {
            std::fs::write(&self.path, kept)?;
        }
        Ok(removed)
    }

    /// The last `n` lines, oldest first. A missing file has no lines.
    pub fn read_last_lines(&self, n: usize) -> io::Result<Vec<String>> {
        let Some(text) = self.read_all()? else {
            return Ok(Vec::new());
        };
        let lines: Vec<&str> = text.lines().collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].iter().map(|l| l.to_string()).collect())
    }

    /// Content appended since `offset`, and the offset to resume from.
    ///
    /// If the file shrank (retention cleanup), reading restarts at 0.
    pub fn read_from(&self, offset: u64) -> io::Result<(String, u64)> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((String::new(), 0)),
            Err(e) => return Err(e),
        };
        let len = file.metadata()?.len();
        let start = if offset > len { 0 } else { offset };
        file.seek(SeekFrom::Start(start))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;
        let next = start + buf.len() as u64;
        Ok((String::from_utf8_lossy(&buf).into_owned(), next))
    }

    /// Current size in bytes, 0 when missing.
    pub fn size(&self) -> io::Result<u64> {
        match std::fs::metadata(&self.path) {
            Ok(m) => Ok(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }
}

fn line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let head = line.get(..LOG_TIMESTAMP_LEN)?;
    NaiveDateTime::parse_from_str(head, LOG_TIMESTAMP_FORMAT).ok()
}
