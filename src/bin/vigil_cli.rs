use std::path::PathBuf;
use structopt::StructOpt;

use vigil::capture;
use vigil::config::Config;
use vigil::engine::{EngineError, LoginRiskEngine};
use vigil::input::AttemptReader;
use vigil::models::UserRecord;

/// Behavioral Login Risk Engine Command Line Interface
#[derive(StructOpt, Debug)]
#[structopt(name = "vigil", about = "Behavioral login risk engine CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Seed the user directory with demo accounts
    Seed {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Score the attempts in a JSONL file and record the outcomes
    Score {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Path to the attempts file
        #[structopt(short, long)]
        file: PathBuf,
    },
    /// Show event counts over a trailing window
    Stats {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Window size in minutes
        #[structopt(short, long, default_value = "60")]
        window_minutes: u32,
    },
    /// Show the most recent login events
    Recent {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Number of events to show
        #[structopt(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show the monitoring view for one user
    User {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        /// Username to inspect
        username: String,
    },
    /// List all users with their latest risk state
    Users {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

const SEED_PASSWORD: &str = "password123";

const SEED_USERS: &[(&str, &str, &str, &str, &str)] = &[
    ("alice", "Alice Johnson", "alice@example.com", "Dev", "Engineer"),
    ("bob", "Bob Smith", "bob@example.com", "Dev", "Engineer"),
    ("carol", "Carol Lee", "carol@example.com", "IT", "Admin"),
    ("dave", "Dave Martinez", "dave@example.com", "IT", "Analyst"),
    ("erin", "Erin Patel", "erin@example.com", "HR", "Manager"),
    ("frank", "Frank Wright", "frank@example.com", "HR", "Specialist"),
    ("grace", "Grace Kim", "grace@example.com", "Management", "Director"),
    ("heidi", "Heidi Chen", "heidi@example.com", "Management", "VP"),
    ("ivan", "Ivan Petrov", "ivan@example.com", "Dev", "Engineer"),
    ("judy", "Judy Brown", "judy@example.com", "IT", "Engineer"),
    ("mallory", "Mallory Davis", "mallory@example.com", "Security", "Analyst"),
    ("oscar", "Oscar Ruiz", "oscar@example.com", "Security", "Engineer"),
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Warn)
        .init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Seed { config } => {
            let engine = load_engine(&config)?;
            for (username, full_name, email, department, role) in SEED_USERS {
                engine.register_user(
                    &UserRecord {
                        username: username.to_string(),
                        full_name: Some(full_name.to_string()),
                        email: Some(email.to_string()),
                        department: Some(department.to_string()),
                        role: Some(role.to_string()),
                    },
                    SEED_PASSWORD,
                )?;
            }
            println!("Seeded {} demo users", SEED_USERS.len());
        }
        Cli::Score { config, file } => {
            if !file.exists() {
                eprintln!("File not found: {:?}", file);
                std::process::exit(1);
            }
            let engine = load_engine(&config)?;
            let records = AttemptReader::read_all(&file)?;
            println!("Scoring {} attempt(s):\n", records.len());

            for record in records {
                let payload = capture::capture_features(&record.telemetry);
                let request = vigil::engine::LoginRequest {
                    username: record.username.clone(),
                    password: record.telemetry.password.clone(),
                    payload,
                };
                match engine.submit_attempt(&request) {
                    Ok(response) => println!(
                        "  {} -> {} (score {:.2}, reasons: {})",
                        record.username,
                        response.outcome,
                        response.risk_score,
                        join_reasons(&response.reasons)
                    ),
                    Err(EngineError::HighRisk { assessment }) => println!(
                        "  {} -> denied (score {:.2}, reasons: {})",
                        record.username,
                        assessment.risk_score,
                        join_reasons(&assessment.reasons)
                    ),
                    Err(e) => println!("  {} -> rejected ({})", record.username, e),
                }
            }
        }
        Cli::Stats {
            config,
            window_minutes,
        } => {
            let engine = load_engine(&config)?;
            let stats = engine.global_stats(window_minutes)?;
            println!("Events in the last {} minute(s):", stats.window_minutes);
            println!("  Total:  {}", stats.total_events);
            println!("  High:   {}", stats.high);
            println!("  Medium: {}", stats.medium);
            println!("  Low:    {}", stats.low);
        }
        Cli::Recent { config, limit } => {
            let engine = load_engine(&config)?;
            let events = engine.recent_events(limit)?;
            println!("Showing {} event(s):\n", events.len());
            for event in events {
                println!(
                    "  #{} {} - user: {}, score: {:.2}, level: {}, outcome: {}",
                    event.id,
                    event.created_at_ms,
                    event.username,
                    event.assessment.risk_score,
                    event.assessment.risk_level,
                    event.outcome
                );
            }
        }
        Cli::User { config, username } => {
            let engine = load_engine(&config)?;
            let view = engine.user_monitoring(&username)?;
            if !view.exists {
                println!("No such user: {}", username);
                return Ok(());
            }
            println!("User: {}", view.username);
            if let Some(name) = &view.full_name {
                println!("  Name:       {}", name);
            }
            if let Some(department) = &view.department {
                println!("  Department: {}", department);
            }
            if let Some(role) = &view.role {
                println!("  Role:       {}", role);
            }
            println!("  Logins:     {}", view.total_logins);
            println!("  Avg score:  {:.2}", view.avg_risk_score);
            println!(
                "  High/Med/Low: {}/{}/{}",
                view.high_risk_count, view.medium_risk_count, view.low_risk_count
            );
        }
        Cli::Users { config } => {
            let engine = load_engine(&config)?;
            let users = engine.list_users()?;
            println!("{} user(s):\n", users.len());
            for user in users {
                match (user.last_risk_level, user.last_risk_score) {
                    (Some(level), Some(score)) => println!(
                        "  {} ({}) - last risk: {} ({:.2})",
                        user.username,
                        user.department.as_deref().unwrap_or("-"),
                        level,
                        score
                    ),
                    _ => println!(
                        "  {} ({}) - no logins yet",
                        user.username,
                        user.department.as_deref().unwrap_or("-")
                    ),
                }
            }
        }
    }

    Ok(())
}

fn load_engine(config_path: &PathBuf) -> Result<LoginRiskEngine, Box<dyn std::error::Error>> {
    let config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };
    Ok(LoginRiskEngine::from_config(&config)?)
}

fn join_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        "none".to_string()
    } else {
        reasons.join(", ")
    }
}
