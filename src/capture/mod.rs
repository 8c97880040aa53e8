//! Feature capture: raw interaction telemetry in, bounded payload out.
//!
//! Converts keystroke timing, the submitted password, and best-effort
//! environment signals into a `FeaturePayload`. Every numeric output is
//! clamped and every missing signal degrades to a documented default, so
//! capture never fails a login attempt and never blocks on I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::FeaturePayload;

/// Lower clamp bound for the typing speed estimate
pub const WPM_FLOOR: f64 = 30.0;
/// Upper clamp bound for the typing speed estimate
pub const WPM_CEIL: f64 = 150.0;
/// Speed reported when no usable timing data exists (paste, autofill)
pub const WPM_DEFAULT: f64 = 60.0;
/// Bucket width for inter-keystroke intervals
pub const INTERVAL_BUCKET_MS: f64 = 50.0;
/// Maximum number of tokens kept in the challenge sequence
pub const SEQUENCE_MAX_TOKENS: usize = 10;

/// One observed key press during password entry.
///
/// `key` is the produced character where the client could observe it;
/// modifier-only presses carry `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keystroke {
    /// Milliseconds since an arbitrary client epoch
    pub at_ms: f64,
    #[serde(default)]
    pub key: Option<char>,
    #[serde(default)]
    pub shift: bool,
}

/// Raw signals observed by the client during one login attempt.
///
/// All environment fields are optional; capture substitutes defaults.
/// The tab count is an explicit input here rather than a shared client
/// counter, with `1` as the documented default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTelemetry {
    pub password: String,
    #[serde(default)]
    pub keystrokes: Vec<Keystroke>,
    /// Fallback timing pair for degenerate keystroke data
    #[serde(default)]
    pub typing_start_ms: Option<f64>,
    #[serde(default)]
    pub typing_end_ms: Option<f64>,
    /// Explicit caps-lock modifier state, when the client exposes one
    #[serde(default)]
    pub capslock_on: Option<bool>,
    /// BCP 47 locale, e.g. "en-US"
    #[serde(default)]
    pub locale: Option<String>,
    #[serde(default)]
    pub browser_tab_count: Option<u32>,
    /// Resolved IANA zone, e.g. "Europe/Berlin"
    #[serde(default)]
    pub timezone: Option<String>,
    /// Attempt counter within the client session, starting at 1
    #[serde(default)]
    pub login_attempts: Option<u32>,
}

/// Password character-class membership flags.
///
/// Only these booleans and the length travel past capture; the raw
/// password is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordComposition {
    pub has_special: bool,
    pub has_numbers: bool,
    pub has_upper: bool,
    pub has_lower: bool,
}

/// Build the bounded feature payload from raw telemetry.
///
/// Always returns a complete payload; degraded defaults stand in for any
/// missing signal.
pub fn capture_features(telemetry: &RawTelemetry) -> FeaturePayload {
    let password_length = telemetry.password.chars().count() as u32;
    let composition = password_composition(&telemetry.password);

    FeaturePayload {
        password_length,
        used_special_characters: composition.has_special,
        keyboard_language: keyboard_language(telemetry.locale.as_deref()),
        login_attempts: telemetry.login_attempts.unwrap_or(1).max(1),
        was_capslock_on: detect_capslock(telemetry),
        browser_tab_count: telemetry.browser_tab_count.unwrap_or(1).max(1),
        challenge_sequence: challenge_sequence(&telemetry.keystrokes),
        timezone: telemetry
            .timezone
            .as_deref()
            .filter(|tz| !tz.is_empty())
            .unwrap_or("UTC")
            .to_string(),
        typing_speed_wpm: typing_speed_wpm(telemetry, password_length),
    }
}

/// Estimate typing speed in words per minute, clamped to [30, 150].
///
/// Prefers first-to-last keystroke duration; short passwords and
/// paste-based entry yield degenerate timing, so a start/end pair is the
/// fallback and `60.0` the last resort. An unbounded or undefined speed
/// is never propagated.
pub fn typing_speed_wpm(telemetry: &RawTelemetry, password_length: u32) -> f64 {
    let words = password_length as f64 / 5.0;

    if telemetry.keystrokes.len() >= 2 {
        let first = telemetry.keystrokes[0].at_ms;
        let last = telemetry.keystrokes[telemetry.keystrokes.len() - 1].at_ms;
        let duration_s = (last - first) / 1000.0;
        if duration_s > 0.0 {
            return clamp_wpm(words / duration_s * 60.0);
        }
    }

    if let (Some(start), Some(end)) = (telemetry.typing_start_ms, telemetry.typing_end_ms) {
        let duration_s = (end - start) / 1000.0;
        if duration_s > 0.0 {
            return clamp_wpm(words / duration_s * 60.0);
        }
    }

    WPM_DEFAULT
}

fn clamp_wpm(wpm: f64) -> f64 {
    wpm.clamp(WPM_FLOOR, WPM_CEIL)
}

/// Bucket consecutive keystroke intervals into a dash-joined fingerprint.
///
/// Each interval maps to `clamp(floor(interval_ms / 50), 1, 9)`; at most
/// the first ten tokens are kept. The result preserves rhythm ordering
/// without leaking raw timing. Empty under two keystrokes.
pub fn challenge_sequence(keystrokes: &[Keystroke]) -> String {
    if keystrokes.len() < 2 {
        return String::new();
    }

    keystrokes
        .windows(2)
        .take(SEQUENCE_MAX_TOKENS)
        .map(|pair| {
            let interval_ms = pair[1].at_ms - pair[0].at_ms;
            let bucket = (interval_ms / INTERVAL_BUCKET_MS).floor() as i64;
            bucket.clamp(1, 9).to_string()
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Caps-lock state: explicit modifier signal when available, otherwise a
/// case/shift mismatch heuristic (unshifted uppercase or shifted
/// lowercase output implies the lock was on).
pub fn detect_capslock(telemetry: &RawTelemetry) -> bool {
    if let Some(explicit) = telemetry.capslock_on {
        return explicit;
    }

    telemetry.keystrokes.iter().any(|k| match k.key {
        Some(c) if c.is_alphabetic() => {
            (c.is_uppercase() && !k.shift) || (c.is_lowercase() && k.shift)
        }
        _ => false,
    })
}

// Fixed punctuation class; kept in sync with the dashboard's capture
static SPECIAL_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>\[\]\\/~`_+=;'-]"#).expect("valid literal"));

/// Character-class membership tests over the raw password
pub fn password_composition(password: &str) -> PasswordComposition {
    PasswordComposition {
        has_special: SPECIAL_CLASS.is_match(password),
        has_numbers: password.chars().any(|c| c.is_ascii_digit()),
        has_upper: password.chars().any(|c| c.is_uppercase()),
        has_lower: password.chars().any(|c| c.is_lowercase()),
    }
}

/// Primary locale subtag, uppercased. Defaults to "EN".
pub fn keyboard_language(locale: Option<&str>) -> String {
    locale
        .and_then(|l| l.split(['-', '_']).next())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_uppercase())
        .unwrap_or_else(|| "EN".to_string())
}
