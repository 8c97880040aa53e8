use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::RiskLevel;

/// Configuration for the vigil engine and daemon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Event store configuration
    pub store: StoreConfig,
    /// Scoring pipeline configuration
    pub scoring: ScoringConfig,
    /// Session issuance configuration
    pub session: SessionConfig,
    /// Real-time delivery configuration
    pub delivery: DeliveryConfig,
    /// Daemon input configuration
    pub input: InputConfig,
    /// Daemon output configuration
    pub output: OutputConfig,
}

/// Event store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
}

/// Scoring pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Path to the trained classifier artifact (JSON). When absent or
    /// unreadable the scorer runs heuristics-only.
    pub model_path: Option<PathBuf>,
    /// Score-to-level mapping thresholds
    pub thresholds: RiskThresholds,
    /// Heuristic boundaries
    pub heuristics: HeuristicConfig,
}

/// Score-to-level mapping.
///
/// The exact cut points are a policy choice, not a constant:
/// `score < medium` is low, `score < high` is medium, everything else high.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub medium: f64,
    pub high: f64,
}

impl RiskThresholds {
    /// Map a score in [0, 1] to its discrete level. Monotonic by construction.
    pub fn level_for(&self, score: f64) -> RiskLevel {
        if score >= self.high {
            RiskLevel::High
        } else if score >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Boundaries for the deterministic heuristic stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeuristicConfig {
    /// Passwords shorter than this are flagged very short
    pub very_short_password_len: u32,
    /// Passwords shorter than this (but not very short) are flagged short
    pub short_password_len: u32,
    /// WPM at or above this forces a high-risk floor (bot-like typing)
    pub fast_typing_wpm: f64,
    /// WPM at or below this is flagged as very slow
    pub slow_typing_wpm: f64,
    /// Attempt count at or above this is flagged as repeated
    pub multiple_attempts: u32,
    /// Attempt count at or above this forces a high-risk floor
    pub excessive_attempts: u32,
    /// Tab counts above this are flagged
    pub many_tabs: u32,
    /// Tab counts above this are flagged harder
    pub too_many_tabs: u32,
    /// Keyboard languages considered unremarkable
    pub expected_keyboard_languages: Vec<String>,
}

/// Session issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bearer token lifetime in seconds
    pub ttl_seconds: i64,
}

/// Real-time delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Page size when the poller does not supply a limit
    pub default_limit: usize,
    /// Hard cap on the page size
    pub max_limit: usize,
    /// Client-side merge buffer capacity
    pub buffer_capacity: usize,
    /// Capacity of the push broadcast channel
    pub broadcast_capacity: usize,
}

/// Daemon input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// JSONL file of raw attempt telemetry to tail
    pub attempts_path: PathBuf,
}

/// Daemon output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (if format is not "console")
    pub file_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store: StoreConfig {
                db_path: PathBuf::from("vigil.db"),
            },
            scoring: ScoringConfig {
                model_path: Some(PathBuf::from("risk_model.json")),
                thresholds: RiskThresholds {
                    medium: 0.34,
                    high: 0.7,
                },
                heuristics: HeuristicConfig {
                    very_short_password_len: 8,
                    short_password_len: 10,
                    fast_typing_wpm: 150.0,
                    slow_typing_wpm: 35.0,
                    multiple_attempts: 3,
                    excessive_attempts: 5,
                    many_tabs: 10,
                    too_many_tabs: 15,
                    expected_keyboard_languages: vec![
                        "EN".to_string(),
                        "US".to_string(),
                        "GB".to_string(),
                        "AU".to_string(),
                        "CA".to_string(),
                    ],
                },
            },
            session: SessionConfig { ttl_seconds: 3600 },
            delivery: DeliveryConfig {
                default_limit: 50,
                max_limit: 500,
                buffer_capacity: 50,
                broadcast_capacity: 256,
            },
            input: InputConfig {
                attempts_path: PathBuf::from("attempts.jsonl"),
            },
            output: OutputConfig {
                format: "jsonl".to_string(),
                file_path: Some(PathBuf::from("decisions.jsonl")),
            },
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds_map_monotonically() {
        let thresholds = Config::default().scoring.thresholds;
        assert_eq!(thresholds.level_for(0.0), RiskLevel::Low);
        assert_eq!(thresholds.level_for(0.33), RiskLevel::Low);
        assert_eq!(thresholds.level_for(0.34), RiskLevel::Medium);
        assert_eq!(thresholds.level_for(0.69), RiskLevel::Medium);
        assert_eq!(thresholds.level_for(0.7), RiskLevel::High);
        assert_eq!(thresholds.level_for(1.0), RiskLevel::High);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let back: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.scoring.thresholds.high, config.scoring.thresholds.high);
        assert_eq!(back.delivery.buffer_capacity, config.delivery.buffer_capacity);
        assert_eq!(back.store.db_path, config.store.db_path);
    }
}
