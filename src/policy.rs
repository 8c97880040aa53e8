//! Access decision policy: risk level in, allow/deny out. Stateless.

use crate::models::{Outcome, RiskLevel};

/// Maps a risk level to an access outcome.
///
/// Low and medium attempts proceed to credential verification; high-risk
/// attempts are denied outright and never receive a session. A denied
/// attempt is not retried automatically; the caller must resubmit with
/// fresh capture.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn decide(&self, level: RiskLevel) -> Outcome {
        match level {
            RiskLevel::Low | RiskLevel::Medium => Outcome::Allowed,
            RiskLevel::High => Outcome::Denied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_high_is_denied() {
        let policy = AccessPolicy;
        assert_eq!(policy.decide(RiskLevel::Low), Outcome::Allowed);
        assert_eq!(policy.decide(RiskLevel::Medium), Outcome::Allowed);
        assert_eq!(policy.decide(RiskLevel::High), Outcome::Denied);
    }
}
