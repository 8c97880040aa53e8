use std::env;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use vigil::capture;
use vigil::config::Config;
use vigil::engine::{EngineError, LoginRequest, LoginRiskEngine};
use vigil::input::{AttemptReader, AttemptRecord};
use vigil::output::{DecisionRecord, DecisionWriter, OutputFormat};

/// Main daemon entry point for the login risk engine
fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting Vigil daemon...");

    // Load configuration
    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = if config_path.exists() {
        Config::from_file(&config_path)?
    } else {
        log::warn!("Config file not found, using defaults");
        Config::default()
    };

    // Setup graceful shutdown signal handling
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal, gracefully stopping...");
        r.store(false, Ordering::SeqCst);
    })?;

    // Initialize output handler
    let output_format = OutputFormat::from_str(&config.output.format);
    let mut decision_writer = DecisionWriter::new(output_format, config.output.file_path.clone())?;

    // Initialize the engine and the attempts feed
    let engine = LoginRiskEngine::from_config(&config)?;
    let mut attempt_reader = AttemptReader::new(config.input.attempts_path.clone());
    attempt_reader.initialize()?;

    log::info!("Tailing attempts feed: {:?}", config.input.attempts_path);
    log::info!("Daemon running. Press Ctrl+C to stop.");

    // Main attempt processing loop
    while running.load(Ordering::SeqCst) {
        if attempt_reader.is_valid() {
            match attempt_reader.read_attempts() {
                Ok(records) => {
                    for record in records {
                        if let Err(e) = process_attempt(&engine, record, &mut decision_writer) {
                            log::error!("Error processing attempt: {}", e);
                        }
                    }
                }
                Err(e) => log::error!("Error reading attempts feed: {}", e),
            }
        }

        // Sleep to avoid busy-waiting
        std::thread::sleep(Duration::from_millis(100));
    }

    decision_writer.flush()?;
    log::info!("Vigil daemon stopped");
    Ok(())
}

/// Run a single attempt through capture, scoring, and policy, then write
/// the decision to the configured sink
fn process_attempt(
    engine: &LoginRiskEngine,
    record: AttemptRecord,
    decision_writer: &mut DecisionWriter,
) -> Result<(), Box<dyn std::error::Error>> {
    let payload = capture::capture_features(&record.telemetry);
    let request = LoginRequest {
        username: record.username.clone(),
        password: record.telemetry.password.clone(),
        payload,
    };

    let decision = match engine.submit_attempt(&request) {
        Ok(response) => DecisionRecord {
            event_id: Some(response.event_id),
            username: record.username,
            risk_score: response.risk_score,
            risk_level: response.risk_level,
            reasons: response.reasons,
            outcome: response.outcome,
            error: None,
        },
        Err(EngineError::HighRisk { assessment }) => {
            log::warn!(
                "BLOCKED: user '{}', score {:.2}, reasons: {}",
                record.username,
                assessment.risk_score,
                assessment.reasons.join(", ")
            );
            DecisionRecord {
                event_id: None,
                username: record.username,
                risk_score: assessment.risk_score,
                risk_level: assessment.risk_level,
                reasons: assessment.reasons,
                outcome: vigil::models::Outcome::Denied,
                error: Some("Login blocked: high risk detected".to_string()),
            }
        }
        Err(e) => {
            log::warn!("Attempt for '{}' rejected: {}", record.username, e);
            return Ok(());
        }
    };

    decision_writer.write_decision(&decision)?;
    Ok(())
}
