//! Reason codes attached to risk assessments.
//!
//! Each code names the heuristic or feature boundary that triggered it.
//! Codes are stable strings: they are persisted in the event store and
//! rendered verbatim in the dashboard.

pub const VERY_SHORT_PASSWORD: &str = "very_short_password";
pub const SHORT_PASSWORD: &str = "short_password";
pub const NO_SPECIAL_CHARACTERS: &str = "no_special_characters";
pub const MULTIPLE_LOGIN_ATTEMPTS: &str = "multiple_login_attempts";
pub const EXCESSIVE_LOGIN_ATTEMPTS: &str = "excessive_login_attempts";
pub const UNUSUALLY_FAST_TYPING: &str = "unusually_fast_typing";
pub const VERY_SLOW_TYPING: &str = "very_slow_typing";
pub const CAPSLOCK_ON: &str = "capslock_on";
pub const MANY_BROWSER_TABS: &str = "many_browser_tabs";
pub const TOO_MANY_BROWSER_TABS: &str = "too_many_browser_tabs";
pub const UNUSUAL_KEYBOARD_LANGUAGE: &str = "unusual_keyboard_language";
pub const NEW_TIMEZONE_FOR_USER: &str = "new_timezone_for_user";

/// Tagged on every assessment produced without a trained classifier
pub const HEURISTIC_FALLBACK: &str = "heuristic_fallback";
