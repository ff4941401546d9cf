// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the foreman authors

//! Append-only write-ahead log of [`foreman_core::Event`]s.
//!
//! Writes are buffered and flushed in batches (either on a timer or once a
//! threshold of pending entries accumulates) to amortise the `fsync` cost.
//! On open, a corrupt tail — a partial line left by a crash mid-write — is
//! detected and the file is rotated to a `.bak` path, keeping the valid
//! prefix as the live log.

use foreman_core::Event;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::snapshot::rotate_bak_path;

/// How often buffered writes are flushed even if the threshold isn't hit.
const FLUSH_INTERVAL: Duration = Duration::from_millis(10);
/// How many buffered writes force an immediate flush.
const FLUSH_THRESHOLD: usize = 100;

#[derive(Debug, Error)]
pub enum WalError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corrupt WAL at offset {offset}: {message}")]
    Corrupt { offset: u64, message: String },
}

#[derive(Serialize)]
struct WalRecordRef<'a> {
    seq: u64,
    event: &'a Event,
}

#[derive(Deserialize)]
struct WalRecord {
    seq: u64,
    event: Event,
}

/// One entry read back from the log.
#[derive(Debug, Clone)]
pub struct WalEntry {
    pub seq: u64,
    pub event: Event,
}

/// The write-ahead log itself.
///
/// `append` buffers without flushing; callers that need durability before
/// proceeding must call `flush` explicitly (the checkpoint path does this
/// implicitly via `next_unprocessed`).
pub struct Wal {
    file: File,
    path: PathBuf,
    write_seq: u64,
    processed_seq: u64,
    write_buffer: Vec<Vec<u8>>,
    last_flush: Instant,
    read_offset: u64,
}

impl Wal {
    /// Open (creating if absent) the log at `path`, recovering from any
    /// crash-truncated tail and resuming after `processed_seq`.
    pub fn open(path: impl AsRef<Path>, processed_seq: u64) -> Result<Self, WalError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match Self::scan_wal(&path) {
            Ok((write_seq, read_offset)) => {
                let file = OpenOptions::new().read(true).append(true).create(true).open(&path)?;
                Ok(Self {
                    file,
                    path,
                    write_seq,
                    processed_seq,
                    write_buffer: Vec::new(),
                    last_flush: Instant::now(),
                    read_offset,
                })
            }
            Err(WalError::Corrupt { offset, message }) => {
                tracing::warn!(offset, message, path = %path.display(), "corrupt WAL tail, rotating to .bak");
                let valid_lines = Self::read_valid_lines(&path, offset)?;
                rotate_bak_path(&path)?;
                let mut file = OpenOptions::new().write(true).create(true).truncate(true).open(&path)?;
                for line in &valid_lines {
                    file.write_all(line)?;
                    file.write_all(b"\n")?;
                }
                file.sync_all()?;
                let file = OpenOptions::new().read(true).append(true).open(&path)?;
                let write_seq = valid_lines
                    .iter()
                    .filter_map(|l| serde_json::from_slice::<WalRecord>(l).ok())
                    .map(|r| r.seq)
                    .max()
                    .unwrap_or(0);
                Ok(Self {
                    file,
                    path,
                    write_seq,
                    processed_seq,
                    write_buffer: Vec::new(),
                    last_flush: Instant::now(),
                    read_offset: 0,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Scan the log to find the highest sequence number written and the
    /// byte offset of the first record past `processed_seq` is left to the
    /// caller; here we only establish `(max_seq, 0)` since read position is
    /// recomputed lazily by `next_unprocessed`.
    fn scan_wal(path: &Path) -> Result<(u64, u64), WalError> {
        if !path.exists() {
            return Ok((0, 0));
        }
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut offset = 0u64;
        let mut max_seq = 0u64;
        let mut line = String::new();
        loop {
            line.clear();
            let start_offset = offset;
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            offset += bytes_read as u64;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<WalRecord>(trimmed) {
                Ok(record) => max_seq = max_seq.max(record.seq),
                Err(e) => {
                    // A trailing partial line (no newline flushed before crash)
                    // is only "corrupt" if it isn't the very last line.
                    if bytes_read > 0 && !line.ends_with('\n') {
                        return Err(WalError::Corrupt { offset: start_offset, message: e.to_string() });
                    }
                    return Err(WalError::Corrupt { offset: start_offset, message: e.to_string() });
                }
            }
        }
        Ok((max_seq, 0))
    }

    /// Read every syntactically valid line up to the byte offset at which
    /// corruption was first observed.
    fn read_valid_lines(path: &Path, corrupt_offset: u64) -> Result<Vec<Vec<u8>>, WalError> {
        let mut file = File::open(path)?;
        let mut buf = vec![0u8; corrupt_offset as usize];
        file.read_exact(&mut buf)?;
        Ok(buf.split(|&b| b == b'\n').filter(|l| !l.is_empty()).map(|l| l.to_vec()).collect())
    }

    /// Buffer `event` for append; returns its assigned sequence number.
    /// Does not itself guarantee durability — call `flush` or rely on the
    /// threshold/interval policy.
    pub fn append(&mut self, event: &Event) -> Result<u64, WalError> {
        self.write_seq += 1;
        let seq = self.write_seq;
        let record = WalRecordRef { seq, event };
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        self.write_buffer.push(line);
        if self.needs_flush() {
            self.flush()?;
        }
        Ok(seq)
    }

    pub fn needs_flush(&self) -> bool {
        self.write_buffer.len() >= FLUSH_THRESHOLD || self.last_flush.elapsed() >= FLUSH_INTERVAL
    }

    /// Write buffered entries and fsync.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.write_buffer.is_empty() {
            self.last_flush = Instant::now();
            return Ok(());
        }
        for line in self.write_buffer.drain(..) {
            self.file.write_all(&line)?;
        }
        self.file.sync_all()?;
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Flush, then return the next entry past `processed_seq`, if any.
    pub fn next_unprocessed(&mut self) -> Result<Option<WalEntry>, WalError> {
        self.flush()?;
        let mut reader = BufReader::new(&self.file);
        reader.seek(SeekFrom::Start(self.read_offset))?;
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.read_offset += bytes_read as u64;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = serde_json::from_str(trimmed)?;
            if record.seq <= self.processed_seq {
                continue;
            }
            return Ok(Some(WalEntry { seq: record.seq, event: record.event }));
        }
    }

    pub fn mark_processed(&mut self, seq: u64) {
        self.processed_seq = self.processed_seq.max(seq);
    }

    pub fn processed_seq(&self) -> u64 {
        self.processed_seq
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }

    /// Rewrite the log keeping only entries with `seq > seq`, via a
    /// `.tmp` file and atomic rename. Safe only after the corresponding
    /// snapshot has been durably checkpointed.
    pub fn truncate_before(&mut self, seq: u64) -> Result<(), WalError> {
        self.flush()?;
        let tmp_path = self.path.with_extension("wal.tmp");
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut tmp = File::create(&tmp_path)?;
        let mut line = String::new();
        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break;
            }
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = serde_json::from_str(trimmed)?;
            if record.seq > seq {
                tmp.write_all(trimmed.as_bytes())?;
                tmp.write_all(b"\n")?;
            }
        }
        tmp.sync_all()?;
        std::fs::rename(&tmp_path, &self.path)?;
        self.file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        // Every remaining entry has seq > the truncation point, which is
        // always >= processed_seq, so starting from 0 never re-yields an
        // already-processed entry.
        self.read_offset = 0;
        Ok(())
    }

    /// Full scan returning every entry with `seq` greater than the given
    /// value, used to replay the tail after loading a snapshot.
    pub fn entries_after(&self, seq: u64) -> Result<Vec<WalEntry>, WalError> {
        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut out = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            let record: WalRecord = serde_json::from_str(trimmed)?;
            if record.seq > seq {
                out.push(WalEntry { seq: record.seq, event: record.event });
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
