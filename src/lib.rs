pub mod auth;
pub mod capture;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod input;
pub mod models;
pub mod monitoring;
pub mod output;
pub mod persistence;
pub mod policy;
pub mod scoring;

// Re-export commonly used types
pub use config::Config;
pub use engine::{EngineError, LoginRequest, LoginResponse, LoginRiskEngine};
pub use models::{FeaturePayload, LoginEvent, Outcome, RiskAssessment, RiskLevel};
pub use persistence::{RiskStore, SqliteRiskStore};
pub use scoring::{RiskScorer, ScoreContext};
