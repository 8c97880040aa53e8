use crate::capture::RawTelemetry;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// One JSONL line of the attempts feed: who is logging in plus the raw
/// client telemetry to derive features from
#[derive(Debug, Clone, Deserialize)]
pub struct AttemptRecord {
    pub username: String,
    pub telemetry: RawTelemetry,
}

/// Tail a JSONL attempts file and parse login attempt records
pub struct AttemptReader {
    file_path: PathBuf,
    reader: Option<BufReader<File>>,
}

impl AttemptReader {
    /// Create a new attempt reader
    pub fn new(file_path: PathBuf) -> Self {
        AttemptReader {
            file_path,
            reader: None,
        }
    }

    /// Initialize the reader, seeking to the end so only new attempts
    /// are picked up
    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let file = File::open(&self.file_path)?;
        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::End(0))?;
        self.reader = Some(reader);
        Ok(())
    }

    /// Read any newly appended attempt records
    pub fn read_attempts(&mut self) -> Result<Vec<AttemptRecord>, Box<dyn std::error::Error>> {
        if self.reader.is_none() {
            self.initialize()?;
        }

        let reader = self.reader.as_mut().ok_or("Reader not initialized")?;
        let mut records = Vec::new();

        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line)?;
            if bytes_read == 0 {
                break; // EOF
            }
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AttemptRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unparseable attempt line: {}", e),
            }
        }

        Ok(records)
    }

    /// Check if the attempts file still exists and is readable
    pub fn is_valid(&self) -> bool {
        self.file_path.exists()
    }

    /// Read a whole attempts file from the top, for one-shot scoring
    pub fn read_all(path: &Path) -> Result<Vec<AttemptRecord>, Box<dyn std::error::Error>> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AttemptRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => log::warn!("Skipping unparseable attempt line: {}", e),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE_LINE: &str = r#"{"username":"alice","telemetry":{"password":"S3cure!pass","locale":"en-US","browser_tab_count":4,"timezone":"UTC","login_attempts":1,"capslock_on":false}}"#;

    #[test]
    fn test_parse_attempt_line() {
        let record: AttemptRecord = serde_json::from_str(SAMPLE_LINE).unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.telemetry.password, "S3cure!pass");
        assert_eq!(record.telemetry.browser_tab_count, Some(4));
    }

    #[test]
    fn test_read_all_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", SAMPLE_LINE).unwrap();
        writeln!(file, "not json at all").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "{}", SAMPLE_LINE).unwrap();

        let records = AttemptReader::read_all(&path).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_tail_only_sees_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("attempts.jsonl");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{}", SAMPLE_LINE).unwrap();
        file.flush().unwrap();

        let mut reader = AttemptReader::new(path.clone());
        reader.initialize().unwrap();
        // The pre-existing line was skipped by the seek
        assert!(reader.read_attempts().unwrap().is_empty());

        writeln!(file, "{}", SAMPLE_LINE).unwrap();
        file.flush().unwrap();
        assert_eq!(reader.read_attempts().unwrap().len(), 1);
    }
}
