use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::warn;

use super::event::TraceRecord;
use super::metrics::{compute_stats, TraceStats};

const MAX_RECORDS: usize = 10_000;

/// Receives trace records from the scheduler.
pub trait TraceSink: Send {
    fn write(&mut self, record: &TraceRecord);

    /// Whether payload digests should be computed for this sink.
    fn include_payload(&self) -> bool {
        true
    }
}

/// Bounded in-memory sink. Clones share the same buffer so a test or driver can keep
/// a handle while the scheduler owns another.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    buffer: Arc<Mutex<VecDeque<TraceRecord>>>,
    capacity: usize,
}

impl Default for TraceRecorder {
    fn default() -> Self {
        Self::with_capacity(MAX_RECORDS)
    }
}

impl TraceRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(MAX_RECORDS)))),
            capacity: capacity.max(1),
        }
    }

    pub fn records(&self) -> Vec<TraceRecord> {
        match self.buffer.lock() {
            Ok(buf) => buf.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> TraceStats {
        compute_stats(&self.records())
    }

    pub fn clear(&self) {
        if let Ok(mut buf) = self.buffer.lock() {
            buf.clear();
        }
    }
}

impl TraceSink for TraceRecorder {
    fn write(&mut self, record: &TraceRecord) {
        let mut buf = match self.buffer.lock() {
            Ok(buf) => buf,
            Err(poisoned) => poisoned.into_inner(),
        };
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(record.clone());
    }
}

/// Appends one JSON object per line to a file, flushing after every record.
pub struct JsonlTraceSink {
    path: PathBuf,
    include_payload: bool,
    writer: Option<BufWriter<File>>,
}

impl JsonlTraceSink {
    /// Opens (creating parent directories) in append mode.
    pub fn open(path: impl AsRef<Path>, include_payload: bool) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            include_payload,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TraceSink for JsonlTraceSink {
    fn write(&mut self, record: &TraceRecord) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };

        let result = serde_json::to_string(record)
            .map_err(std::io::Error::from)
            .and_then(|line| {
                writer.write_all(line.as_bytes())?;
                writer.write_all(b"\n")?;
                writer.flush()
            });

        if let Err(e) = result {
            // trace failures never reach the scheduler
            warn!(path = %self.path.display(), "trace sink disabled: {}", e);
            self.writer = None;
        }
    }

    fn include_payload(&self) -> bool {
        self.include_payload
    }
}
