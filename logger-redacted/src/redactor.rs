use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Marker written in place of a redacted value.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Key fragments whose values are always redacted, matched case-insensitively
/// as substrings of the map key.
pub const SENSITIVE_KEY_FRAGMENTS: &[&str] =
    &["password", "token", "secret", "key", "ssn", "credit_card"];

lazy_static! {
    static ref SSN_REGEX: Regex = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap();
    static ref CREDIT_CARD_REGEX: Regex =
        Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").unwrap();
}

/// True if a map key matches the sensitive-key heuristic.
pub fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Redaction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Scan string values for SSN / card-number shapes.
    pub scrub_patterns: bool,
    /// Replace scrubbed matches with a short content hash instead of a
    /// fixed mask, so redacted values stay correlatable across entries.
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            scrub_patterns: true,
            hash_for_correlation: false,
        }
    }
}

/// Redacts sensitive fields from JSON payloads before they are persisted.
pub struct FieldRedactor {
    config: RedactionConfig,
}

impl FieldRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    /// Walk a JSON value in place, replacing every value whose key matches
    /// the sensitive-key heuristic and scrubbing PII shapes out of the
    /// remaining string values.
    pub fn redact_in_place(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, entry) in map.iter_mut() {
                    if is_sensitive_key(key) {
                        *entry = Value::String(REDACTION_MARKER.to_string());
                    } else {
                        self.redact_in_place(entry);
                    }
                }
            }
            Value::Array(items) => {
                for item in items.iter_mut() {
                    self.redact_in_place(item);
                }
            }
            Value::String(text) => {
                if self.config.scrub_patterns {
                    let scrubbed = self.scrub_text(text);
                    if scrubbed != *text {
                        *text = scrubbed;
                    }
                }
            }
            _ => {}
        }
    }

    /// Scrub SSN and card-number shapes out of free text.
    pub fn scrub_text(&self, text: &str) -> String {
        let mut result = SSN_REGEX
            .replace_all(text, |caps: &regex::Captures| self.replacement("SSN", &caps[0]))
            .to_string();
        result = CREDIT_CARD_REGEX
            .replace_all(&result, |caps: &regex::Captures| {
                self.replacement("CC", &caps[0])
            })
            .to_string();
        result
    }

    fn replacement(&self, label: &str, matched: &str) -> String {
        if self.config.hash_for_correlation {
            format!("{}[{}]", label, hash_value(matched))
        } else {
            REDACTION_MARKER.to_string()
        }
    }
}

impl Default for FieldRedactor {
    fn default() -> Self {
        Self::new(RedactionConfig::default())
    }
}

fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    // First 8 bytes are plenty for correlation.
    general_purpose::STANDARD.encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_heuristic_is_substring_and_case_insensitive() {
        assert!(is_sensitive_key("password"));
        assert!(is_sensitive_key("userPassword"));
        assert!(is_sensitive_key("API_KEY"));
        assert!(is_sensitive_key("creditCardSsn"));
        assert!(!is_sensitive_key("note"));
        // Substring matching also catches unrelated keys containing "key".
        assert!(is_sensitive_key("monkey"));
    }

    #[test]
    fn redacts_matching_keys_and_keeps_others() {
        let redactor = FieldRedactor::default();
        let mut value = json!({"password": "x", "note": "y"});
        redactor.redact_in_place(&mut value);
        assert_eq!(value["password"], REDACTION_MARKER);
        assert_eq!(value["note"], "y");
    }

    #[test]
    fn redacts_nested_objects_and_arrays() {
        let redactor = FieldRedactor::default();
        let mut value = json!({
            "changes": [{"refresh_token": "abc", "status": "active"}],
            "meta": {"apiSecret": 42}
        });
        redactor.redact_in_place(&mut value);
        assert_eq!(value["changes"][0]["refresh_token"], REDACTION_MARKER);
        assert_eq!(value["changes"][0]["status"], "active");
        assert_eq!(value["meta"]["apiSecret"], REDACTION_MARKER);
    }

    #[test]
    fn scrubs_ssn_shapes_from_free_text() {
        let redactor = FieldRedactor::default();
        let mut value = json!({"note": "member ssn is 123-45-6789 on file"});
        redactor.redact_in_place(&mut value);
        let note = value["note"].as_str().unwrap();
        assert!(!note.contains("123-45-6789"));
        assert!(note.contains(REDACTION_MARKER));
    }

    #[test]
    fn hashed_scrubbing_is_stable_for_correlation() {
        let redactor = FieldRedactor::new(RedactionConfig {
            scrub_patterns: true,
            hash_for_correlation: true,
        });
        let a = redactor.scrub_text("card 4111-1111-1111-1111");
        let b = redactor.scrub_text("card 4111-1111-1111-1111");
        assert_eq!(a, b);
        assert!(a.starts_with("card CC["));
    }
}
