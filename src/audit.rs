//! Structured audit log
//!
//! One record per executed command, accumulated append-only for the whole
//! session and flushed to the log file exactly once, at termination. The
//! on-disk form is a single JSON document.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use chrono::Local;
use serde::{Deserialize, Serialize};

/// One logged `{timestamp, command, result}` triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandRecord {
    pub timestamp: String,
    pub command: String,
    pub result: String,
}

/// Append-only record sequence for one session.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    session: String,
    records: Vec<CommandRecord>,
}

impl AuditLog {
    pub fn new(session: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            records: Vec::new(),
        }
    }

    /// Append a record stamped with the current local time.
    pub fn record(&mut self, command: &str, result: &str) {
        self.records.push(CommandRecord {
            timestamp: Local::now().to_rfc3339(),
            command: command.to_string(),
            result: result.to_string(),
        });
    }

    /// Rewrite the result of the most recent record.
    ///
    /// The termination record is staged before the flush; when the flush
    /// fails, the record's outcome is only known afterwards.
    pub fn amend_last(&mut self, result: &str) {
        if let Some(last) = self.records.last_mut() {
            last.result = result.to_string();
        }
    }

    pub fn records(&self) -> &[CommandRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Serialize the whole log to a writer.
    pub fn write_to<W: Write>(&self, writer: W) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, self).map_err(io::Error::from)
    }

    /// One-shot flush to the log file.
    pub fn flush(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_accumulate_in_order() {
        let mut log = AuditLog::new("alice");
        assert!(log.is_empty());
        log.record("ls", "file1.txt  file2.txt");
        log.record("cd subdir", "Changed directory to '/subdir'.");
        assert_eq!(log.len(), 2);
        assert_eq!(log.records()[0].command, "ls");
        assert_eq!(log.records()[1].command, "cd subdir");
        assert!(!log.records()[0].timestamp.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut log = AuditLog::new("alice");
        log.record("ls", "file1.txt");
        let mut buf = Vec::new();
        log.write_to(&mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["session"], "alice");
        assert_eq!(value["records"][0]["command"], "ls");
        assert_eq!(value["records"][0]["result"], "file1.txt");
    }

    #[test]
    fn test_flush_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut log = AuditLog::new("bob");
        log.record("cat file1.txt", "a\nb\na\n");
        log.record("exit", "Session terminated.");
        log.flush(&path).unwrap();

        let loaded: AuditLog =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.session, "bob");
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.records()[1].command, "exit");
    }

    #[test]
    fn test_flush_to_bad_path_fails() {
        let log = AuditLog::new("bob");
        assert!(log.flush(Path::new("/nonexistent/dir/log.json")).is_err());
    }
}
