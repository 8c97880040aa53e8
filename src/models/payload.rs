use serde::{Deserialize, Serialize};

/// Normalized behavioral features extracted from one login interaction.
///
/// Every numeric field is produced by a clamping transform in the capture
/// module; raw keystroke timing and the password itself never travel past
/// capture. The payload is created per attempt and discarded once it has
/// been embedded into a `LoginEvent`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeaturePayload {
    /// Length of the submitted password in characters
    pub password_length: u32,
    /// Whether the password contained any punctuation-class character
    pub used_special_characters: bool,
    /// Primary locale subtag, uppercased (e.g. "EN")
    pub keyboard_language: String,
    /// Attempt counter within the client session, monotonic, starts at 1
    pub login_attempts: u32,
    /// Caps-lock state, explicit signal or case/shift mismatch inference
    pub was_capslock_on: bool,
    /// Open browser tab count as reported by the client, at least 1
    pub browser_tab_count: u32,
    /// Bucketed inter-keystroke rhythm fingerprint, e.g. "3-3-3-3"
    pub challenge_sequence: String,
    /// IANA timezone name resolved on the client, e.g. "Europe/Berlin"
    pub timezone: String,
    /// Estimated typing speed, clamped to [30, 150]
    pub typing_speed_wpm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_json_roundtrip() {
        let payload = FeaturePayload {
            password_length: 12,
            used_special_characters: true,
            keyboard_language: "EN".to_string(),
            login_attempts: 1,
            was_capslock_on: false,
            browser_tab_count: 4,
            challenge_sequence: "3-3-2-4".to_string(),
            timezone: "UTC".to_string(),
            typing_speed_wpm: 72.5,
        };

        let json = serde_json::to_string(&payload).unwrap();
        let back: FeaturePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
