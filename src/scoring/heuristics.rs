//! Deterministic heuristic stages layered on the classifier score.
//!
//! Each stage is a pure function of the payload and the lightweight
//! per-user context. A stage either stays silent or emits a trigger with a
//! reason code, an additive boost, and optionally a floor the final score
//! may not fall below. Stages run in a fixed order so reason lists are
//! deterministic.

use crate::config::{HeuristicConfig, RiskThresholds};
use crate::models::{reasons, FeaturePayload};

/// Lightweight per-user history consulted during scoring.
///
/// Built from the derived risk profile; empty for unseen users and for
/// anonymous score previews.
#[derive(Debug, Clone, Default)]
pub struct ScoreContext {
    /// Timezone recorded on the user's previous attempt
    pub last_timezone: Option<String>,
}

/// One fired heuristic
#[derive(Debug, Clone)]
pub struct Trigger {
    pub reason: &'static str,
    /// Additive contribution to the score
    pub boost: f64,
    /// Minimum final score this trigger enforces (floor, never a ceiling)
    pub floor: Option<f64>,
}

type Stage =
    fn(&FeaturePayload, &ScoreContext, &HeuristicConfig, &RiskThresholds) -> Option<Trigger>;

/// Stage order is part of the contract: reasons appear in this order
const STAGES: &[Stage] = &[
    password_length_stage,
    special_characters_stage,
    login_attempts_stage,
    typing_speed_stage,
    capslock_stage,
    browser_tabs_stage,
    keyboard_language_stage,
    timezone_stage,
];

/// Run every stage in order and collect the fired triggers
pub fn evaluate(
    payload: &FeaturePayload,
    context: &ScoreContext,
    config: &HeuristicConfig,
    thresholds: &RiskThresholds,
) -> Vec<Trigger> {
    STAGES
        .iter()
        .filter_map(|stage| stage(payload, context, config, thresholds))
        .collect()
}

fn password_length_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.password_length < config.very_short_password_len {
        Some(Trigger {
            reason: reasons::VERY_SHORT_PASSWORD,
            boost: 0.15,
            floor: None,
        })
    } else if payload.password_length < config.short_password_len {
        Some(Trigger {
            reason: reasons::SHORT_PASSWORD,
            boost: 0.08,
            floor: None,
        })
    } else {
        None
    }
}

fn special_characters_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    _config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.used_special_characters {
        None
    } else {
        Some(Trigger {
            reason: reasons::NO_SPECIAL_CHARACTERS,
            boost: 0.10,
            floor: None,
        })
    }
}

fn login_attempts_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    config: &HeuristicConfig,
    thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.login_attempts >= config.excessive_attempts {
        // Hammering the form escalates straight to the high bucket
        Some(Trigger {
            reason: reasons::EXCESSIVE_LOGIN_ATTEMPTS,
            boost: 0.20,
            floor: Some(thresholds.high),
        })
    } else if payload.login_attempts >= config.multiple_attempts {
        Some(Trigger {
            reason: reasons::MULTIPLE_LOGIN_ATTEMPTS,
            boost: 0.10,
            floor: None,
        })
    } else {
        None
    }
}

fn typing_speed_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.typing_speed_wpm >= config.fast_typing_wpm {
        // Bot-like typing is an unconditional red flag regardless of what
        // the classifier thinks
        Some(Trigger {
            reason: reasons::UNUSUALLY_FAST_TYPING,
            boost: 0.25,
            floor: Some(0.95),
        })
    } else if payload.typing_speed_wpm <= config.slow_typing_wpm {
        Some(Trigger {
            reason: reasons::VERY_SLOW_TYPING,
            boost: 0.08,
            floor: None,
        })
    } else {
        None
    }
}

fn capslock_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    _config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.was_capslock_on {
        Some(Trigger {
            reason: reasons::CAPSLOCK_ON,
            boost: 0.05,
            floor: None,
        })
    } else {
        None
    }
}

fn browser_tabs_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    if payload.browser_tab_count > config.too_many_tabs {
        Some(Trigger {
            reason: reasons::TOO_MANY_BROWSER_TABS,
            boost: 0.12,
            floor: None,
        })
    } else if payload.browser_tab_count > config.many_tabs {
        Some(Trigger {
            reason: reasons::MANY_BROWSER_TABS,
            boost: 0.06,
            floor: None,
        })
    } else {
        None
    }
}

fn keyboard_language_stage(
    payload: &FeaturePayload,
    _context: &ScoreContext,
    config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    let known = config
        .expected_keyboard_languages
        .iter()
        .any(|lang| lang.eq_ignore_ascii_case(&payload.keyboard_language));
    if known {
        None
    } else {
        Some(Trigger {
            reason: reasons::UNUSUAL_KEYBOARD_LANGUAGE,
            boost: 0.10,
            floor: None,
        })
    }
}

fn timezone_stage(
    payload: &FeaturePayload,
    context: &ScoreContext,
    _config: &HeuristicConfig,
    _thresholds: &RiskThresholds,
) -> Option<Trigger> {
    match context.last_timezone.as_deref() {
        Some(last) if last != payload.timezone => Some(Trigger {
            reason: reasons::NEW_TIMEZONE_FOR_USER,
            boost: 0.15,
            floor: None,
        }),
        // First attempt for a user establishes the baseline silently
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn baseline_payload() -> FeaturePayload {
        FeaturePayload {
            password_length: 14,
            used_special_characters: true,
            keyboard_language: "EN".to_string(),
            login_attempts: 1,
            was_capslock_on: false,
            browser_tab_count: 3,
            challenge_sequence: "3-3-3".to_string(),
            timezone: "UTC".to_string(),
            typing_speed_wpm: 70.0,
        }
    }

    fn run(payload: &FeaturePayload, context: &ScoreContext) -> Vec<&'static str> {
        let config = Config::default().scoring;
        evaluate(payload, context, &config.heuristics, &config.thresholds)
            .iter()
            .map(|t| t.reason)
            .collect()
    }

    #[test]
    fn test_clean_payload_triggers_nothing() {
        let fired = run(&baseline_payload(), &ScoreContext::default());
        assert!(fired.is_empty(), "unexpected triggers: {:?}", fired);
    }

    #[test]
    fn test_password_length_boundaries() {
        let mut payload = baseline_payload();
        payload.password_length = 7;
        assert_eq!(run(&payload, &ScoreContext::default()), vec![reasons::VERY_SHORT_PASSWORD]);

        payload.password_length = 8;
        assert_eq!(run(&payload, &ScoreContext::default()), vec![reasons::SHORT_PASSWORD]);

        payload.password_length = 10;
        assert!(run(&payload, &ScoreContext::default()).is_empty());
    }

    #[test]
    fn test_fast_typing_carries_high_floor() {
        let mut payload = baseline_payload();
        payload.typing_speed_wpm = 150.0;

        let config = Config::default().scoring;
        let triggers = evaluate(
            &payload,
            &ScoreContext::default(),
            &config.heuristics,
            &config.thresholds,
        );
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].reason, reasons::UNUSUALLY_FAST_TYPING);
        assert!(triggers[0].floor.unwrap() >= config.thresholds.high);
    }

    #[test]
    fn test_excessive_attempts_floor_at_high_threshold() {
        let mut payload = baseline_payload();
        payload.login_attempts = 5;

        let config = Config::default().scoring;
        let triggers = evaluate(
            &payload,
            &ScoreContext::default(),
            &config.heuristics,
            &config.thresholds,
        );
        assert_eq!(triggers[0].reason, reasons::EXCESSIVE_LOGIN_ATTEMPTS);
        assert_eq!(triggers[0].floor, Some(config.thresholds.high));
    }

    #[test]
    fn test_multiple_attempts_has_no_floor() {
        let mut payload = baseline_payload();
        payload.login_attempts = 3;

        let config = Config::default().scoring;
        let triggers = evaluate(
            &payload,
            &ScoreContext::default(),
            &config.heuristics,
            &config.thresholds,
        );
        assert_eq!(triggers[0].reason, reasons::MULTIPLE_LOGIN_ATTEMPTS);
        assert!(triggers[0].floor.is_none());
    }

    #[test]
    fn test_timezone_change_fires_only_with_history() {
        let mut payload = baseline_payload();
        payload.timezone = "Asia/Tokyo".to_string();

        // No history: establishes baseline, nothing fires
        assert!(run(&payload, &ScoreContext::default()).is_empty());

        // Same timezone as last attempt: silent
        let same = ScoreContext {
            last_timezone: Some("Asia/Tokyo".to_string()),
        };
        assert!(run(&payload, &same).is_empty());

        // Changed timezone
        let moved = ScoreContext {
            last_timezone: Some("UTC".to_string()),
        };
        assert_eq!(run(&payload, &moved), vec![reasons::NEW_TIMEZONE_FOR_USER]);
    }

    #[test]
    fn test_unusual_keyboard_language() {
        let mut payload = baseline_payload();
        payload.keyboard_language = "RU".to_string();
        assert_eq!(
            run(&payload, &ScoreContext::default()),
            vec![reasons::UNUSUAL_KEYBOARD_LANGUAGE]
        );

        payload.keyboard_language = "gb".to_string();
        assert!(run(&payload, &ScoreContext::default()).is_empty());
    }

    #[test]
    fn test_reasons_come_out_in_stage_order() {
        let mut payload = baseline_payload();
        payload.password_length = 6;
        payload.used_special_characters = false;
        payload.login_attempts = 3;
        payload.was_capslock_on = true;
        payload.browser_tab_count = 16;

        let fired = run(&payload, &ScoreContext::default());
        assert_eq!(
            fired,
            vec![
                reasons::VERY_SHORT_PASSWORD,
                reasons::NO_SPECIAL_CHARACTERS,
                reasons::MULTIPLE_LOGIN_ATTEMPTS,
                reasons::CAPSLOCK_ON,
                reasons::TOO_MANY_BROWSER_TABS,
            ]
        );
    }
}
