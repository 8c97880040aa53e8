pub mod event;
pub mod payload;
pub mod profile;
pub mod reasons;

pub use event::{LoginEvent, NewLoginEvent, Outcome, RiskAssessment, RiskLevel};
pub use payload::FeaturePayload;
pub use profile::{UserRecord, UserRiskProfile};
