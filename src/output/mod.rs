use crate::models::{Outcome, RiskLevel};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Flat record of one processed attempt, for sinks and log files
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub event_id: Option<i64>,
    pub username: String,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub reasons: Vec<String>,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Console,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "jsonl" => OutputFormat::Jsonl,
            "console" => OutputFormat::Console,
            _ => OutputFormat::Jsonl, // Default
        }
    }
}

/// Output handler for login decisions
pub struct DecisionWriter {
    format: OutputFormat,
    writer: Option<Box<dyn Write + Send>>,
}

impl DecisionWriter {
    /// Create a new decision writer
    pub fn new(
        format: OutputFormat,
        file_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let writer: Option<Box<dyn Write + Send>> = match (&format, file_path) {
            (OutputFormat::Console, _) => None,
            (_, Some(path)) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Box::new(BufWriter::new(file)))
            }
            (_, None) => None,
        };

        Ok(DecisionWriter { format, writer })
    }

    /// Write one decision record
    pub fn write_decision(
        &mut self,
        record: &DecisionRecord,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(record)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Jsonl => {
                let json = serde_json::to_string(record)?;
                self.write_output(&format!("{}\n", json))?;
            }
            OutputFormat::Console => {
                let output = format!(
                    "[{}] {} - score: {:.2}, outcome: {}, reasons: {}\n",
                    record.risk_level,
                    record.username,
                    record.risk_score,
                    record.outcome,
                    if record.reasons.is_empty() {
                        "none".to_string()
                    } else {
                        record.reasons.join(", ")
                    }
                );
                self.write_output(&output)?;
            }
        }
        Ok(())
    }

    fn write_output(&mut self, data: &str) -> Result<(), Box<dyn std::error::Error>> {
        match &mut self.writer {
            Some(writer) => {
                writer.write_all(data.as_bytes())?;
                writer.flush()?;
            }
            None => {
                print!("{}", data);
                std::io::stdout().flush()?;
            }
        }
        Ok(())
    }

    /// Flush any buffered output
    pub fn flush(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(writer) = &mut self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> DecisionRecord {
        DecisionRecord {
            event_id: Some(12),
            username: "alice".to_string(),
            risk_score: 0.42,
            risk_level: RiskLevel::Medium,
            reasons: vec!["capslock_on".to_string()],
            outcome: Outcome::Allowed,
            error: None,
        }
    }

    #[test]
    fn test_jsonl_output_is_one_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.jsonl");
        let mut writer =
            DecisionWriter::new(OutputFormat::Jsonl, Some(path.clone())).unwrap();
        writer.write_decision(&record()).unwrap();
        writer.write_decision(&record()).unwrap();
        writer.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        let parsed: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["username"], "alice");
        assert_eq!(parsed["risk_level"], "medium");
        // error field is elided when absent
        assert!(parsed.get("error").is_none());
    }

    #[test]
    fn test_error_field_serialized_when_present() {
        let mut rec = record();
        rec.event_id = None;
        rec.error = Some("Invalid username or password".to_string());
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("Invalid username or password"));
    }

    #[test]
    fn test_format_from_str_defaults_to_jsonl() {
        assert!(matches!(OutputFormat::from_str("JSON"), OutputFormat::Json));
        assert!(matches!(
            OutputFormat::from_str("console"),
            OutputFormat::Console
        ));
        assert!(matches!(
            OutputFormat::from_str("whatever"),
            OutputFormat::Jsonl
        ));
    }
}
