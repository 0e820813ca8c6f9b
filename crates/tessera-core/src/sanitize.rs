//! Redaction of sensitive payload fields.
//!
//! Redaction runs once, inside the chain builder, before the payload is
//! hashed. The original values never reach the store.

use std::collections::BTreeMap;

use tessera_contracts::event_data::{EventData, EventValue};

use crate::traits::EventSanitizer;

/// Replacement written in place of a redacted value.
pub const REDACTED: &str = "[REDACTED]";

/// Key fragments redacted by default. Matching is case-insensitive and
/// ignores `-`, `_` and spaces, so `API-Key`, `api_key` and `apiKey` all
/// match `apikey`.
const DEFAULT_SENSITIVE_FRAGMENTS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "apikey",
    "privatekey",
    "authorization",
    "ssn",
    "cpf",
    "rg",
    "cns",
    "nationalid",
    "cardnumber",
    "creditcard",
    "cvv",
];

/// Recursively redacts values whose key names look sensitive.
#[derive(Debug, Clone)]
pub struct RedactingSanitizer {
    fragments: Vec<String>,
}

impl RedactingSanitizer {
    pub fn new() -> Self {
        Self {
            fragments: DEFAULT_SENSITIVE_FRAGMENTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Also redact keys containing `fragment`.
    pub fn with_fragment(mut self, fragment: &str) -> Self {
        self.fragments.push(normalize(fragment));
        self
    }

    /// True if a field called `key` must be redacted.
    ///
    /// Short fragments (three characters or fewer, e.g. `rg`, `cpf`) must
    /// match a whole word so that `surgeon` or `organization` are left
    /// alone. Words split on `_`, `-`, spaces and camelCase boundaries, so
    /// `patientCpf` and `patientSSN` both contain a whole-word identifier.
    pub fn is_sensitive(&self, key: &str) -> bool {
        let normalized = normalize(key);
        let words = split_words(key);

        self.fragments.iter().any(|fragment| {
            if fragment.len() <= 3 {
                words.iter().any(|w| w == fragment)
            } else {
                normalized.contains(fragment.as_str())
            }
        })
    }

    fn sanitize_value(&self, value: EventValue) -> EventValue {
        match value {
            EventValue::Map(map) => EventValue::Map(self.sanitize_map(map)),
            EventValue::List(items) => {
                EventValue::List(items.into_iter().map(|v| self.sanitize_value(v)).collect())
            }
            other => other,
        }
    }

    fn sanitize_map(&self, map: BTreeMap<String, EventValue>) -> BTreeMap<String, EventValue> {
        map.into_iter()
            .map(|(key, value)| {
                if self.is_sensitive(&key) {
                    (key, EventValue::Text(REDACTED.to_string()))
                } else {
                    let value = self.sanitize_value(value);
                    (key, value)
                }
            })
            .collect()
    }
}

impl Default for RedactingSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSanitizer for RedactingSanitizer {
    fn sanitize(&self, data: EventData) -> EventData {
        EventData::from(self.sanitize_map(data.into_inner()))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, '_' | '-' | ' '))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Lowercased words of `key`. `patientSSN` gives `patient`, `ssn`;
/// `SSNNumber` gives `ssn`, `number`.
fn split_words(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let starts_word = c.is_uppercase()
            && i > 0
            && match chars[i - 1] {
                prev if prev.is_lowercase() || prev.is_ascii_digit() => true,
                prev if prev.is_uppercase() => chars.get(i + 1).is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
        if starts_word && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
