//! Byte-offset transcript tailer.
//!
//! Tracks a read offset into the transcript JSONL file and yields newly
//! appended, successfully parsed [`TranscriptLine`]s. Malformed lines are
//! logged and skipped rather than treated as fatal, since a partially
//! flushed write can leave a trailing incomplete JSON object that becomes
//! well-formed on the next read.

use crate::types::TranscriptLine;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct TranscriptTailer {
    path: PathBuf,
    offset: u64,
    poll_interval: Duration,
}

impl TranscriptTailer {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_offset(path: PathBuf, offset: u64) -> Self {
        Self {
            path,
            offset,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read and parse every complete line appended since the last read.
    /// Detects truncation (e.g. after a `/clear`) by noticing the file
    /// shrank below the tracked offset, and resets to the start in that
    /// case.
    pub fn read_new_lines(&mut self) -> std::io::Result<Vec<TranscriptLine>> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e),
        };

        if let Ok(meta) = file.metadata() {
            if meta.len() < self.offset {
                debug!(path = %self.path.display(), "transcript file truncated, resetting offset");
                self.offset = 0;
            }
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.offset))?;

        let mut lines = Vec::new();
        let mut raw = String::new();
        loop {
            raw.clear();
            let bytes_read = reader.read_line(&mut raw)?;
            if bytes_read == 0 {
                break;
            }
            self.offset += bytes_read as u64;
            let trimmed = raw.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<TranscriptLine>(trimmed) {
                Ok(line) => lines.push(line),
                Err(e) => warn!(error = %e, "skipping malformed transcript line"),
            }
        }

        Ok(lines)
    }

    /// Run the tailer until `shutdown` is cancelled, sending batches of
    /// newly parsed lines on `line_tx`. Uses `notify` for filesystem events
    /// with a polling fallback, matching the tight-retry-loop cadence by
    /// default (500 ms).
    pub async fn run(mut self, line_tx: mpsc::Sender<Vec<TranscriptLine>>, shutdown: CancellationToken) {
        let (wake_tx, mut wake_rx) = mpsc::channel::<()>(1);
        let _watcher = self.setup_notify_watcher(wake_tx);

        let mut poll_interval = tokio::time::interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = wake_rx.recv() => {}
                _ = poll_interval.tick() => {}
            }

            match self.read_new_lines() {
                Ok(lines) if !lines.is_empty() => {
                    if line_tx.send(lines).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "transcript tailer read failed"),
            }
        }
    }

    fn setup_notify_watcher(&self, wake_tx: mpsc::Sender<()>) -> Option<notify::RecommendedWatcher> {
        use notify::{RecursiveMode, Watcher};

        let mut watcher = notify::recommended_watcher(move |_: notify::Result<notify::Event>| {
            let _ = wake_tx.try_send(());
        })
        .ok()?;

        let watch_path = self.path.parent().unwrap_or(self.path.as_ref());
        watcher.watch(watch_path, RecursiveMode::NonRecursive).ok()?;

        Some(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_lines_appended_after_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(
            &path,
            r#"{"type":"user","message":{"content":[{"type":"text","text":"hi"}]}}
"#,
        )
        .unwrap();

        let mut tailer = TranscriptTailer::new(path.clone());
        let first = tailer.read_new_lines().unwrap();
        assert_eq!(first.len(), 1);

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            r#"{{"type":"assistant","message":{{"content":[{{"type":"text","text":"hello back"}}]}}}}"#
        )
        .unwrap();

        let second = tailer.read_new_lines().unwrap();
        assert_eq!(second.len(), 1);
        assert!(second[0].is_assistant());
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, "{not valid json\n{\"type\":\"user\"}\n").unwrap();

        let mut tailer = TranscriptTailer::new(path);
        let lines = tailer.read_new_lines().unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn truncation_resets_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transcript.jsonl");
        std::fs::write(&path, "{\"type\":\"user\"}\n{\"type\":\"user\"}\n{\"type\":\"user\"}\n").unwrap();

        let mut tailer = TranscriptTailer::new(path.clone());
        tailer.read_new_lines().unwrap();
        assert!(tailer.offset() > 0);

        std::fs::write(&path, "{\"type\":\"assistant\"}\n").unwrap();
        let lines = tailer.read_new_lines().unwrap();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn missing_file_returns_empty_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.jsonl");
        let mut tailer = TranscriptTailer::new(path);
        assert_eq!(tailer.read_new_lines().unwrap().len(), 0);
    }
}
