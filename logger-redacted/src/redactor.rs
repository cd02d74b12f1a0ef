use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde_json::Value;
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Option<Regex> =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok();
    static ref PHONE_REGEX: Option<Regex> = Regex::new(
        r"(?:\+\d{7,15}\b)|\b(?:\+1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})\b"
    )
    .ok();
    static ref SSN_REGEX: Option<Regex> = Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").ok();
    static ref CREDIT_CARD_REGEX: Option<Regex> =
        Regex::new(r"\b\d{4}[-\s]?\d{4}[-\s]?\d{4}[-\s]?\d{4}\b").ok();
    static ref IP_REGEX: Option<Regex> = Regex::new(r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b").ok();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub redact_ssn: bool,
    pub redact_credit_cards: bool,
    pub redact_ip_addresses: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ssn: true,
            redact_credit_cards: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

impl RedactionConfig {
    /// Add an extra pattern; invalid expressions are ignored
    pub fn with_custom_pattern(mut self, pattern: &str, replacement: &str) -> Self {
        if let Ok(regex) = Regex::new(pattern) {
            self.custom_patterns.push((regex, replacement.to_string()));
        }
        self
    }
}

/// PII redactor for log messages
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.replace(&EMAIL_REGEX, &result, "EMAIL", |email| {
                let mut parts = email.splitn(2, '@');
                match (parts.next(), parts.next()) {
                    (Some(user), Some(domain)) => format!(
                        "{}***@{}***",
                        user.chars().next().unwrap_or('*'),
                        domain.chars().next().unwrap_or('*')
                    ),
                    _ => "***@***".to_string(),
                }
            });
        }

        if self.config.redact_phones {
            result = self.replace(&PHONE_REGEX, &result, "PHONE", |_| "(***) ***-****".to_string());
        }

        // card numbers before SSNs so a 16-digit run is not split
        if self.config.redact_credit_cards {
            result = self.replace(&CREDIT_CARD_REGEX, &result, "CC", |_| {
                "****-****-****-****".to_string()
            });
        }

        if self.config.redact_ssn {
            result = self.replace(&SSN_REGEX, &result, "SSN", |_| "***-**-****".to_string());
        }

        if self.config.redact_ip_addresses {
            result = self.replace(&IP_REGEX, &result, "IP", |ip| {
                let parts: Vec<&str> = ip.split('.').collect();
                match (parts.first(), parts.last()) {
                    (Some(first), Some(last)) if parts.len() == 4 => {
                        format!("{}.***.***.{}", first, last)
                    }
                    _ => "***.***.***.***".to_string(),
                }
            });
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).to_string();
        }

        result
    }

    /// Redact every string inside a JSON document
    pub fn redact_value(&self, value: &Value) -> Value {
        match value {
            Value::String(text) => Value::String(self.redact(text)),
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.redact_value(v)).collect())
            }
            Value::Object(map) => Value::Object(
                map.iter()
                    .map(|(key, v)| (key.clone(), self.redact_value(v)))
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    fn replace(
        &self,
        regex: &Option<Regex>,
        text: &str,
        label: &str,
        mask: impl Fn(&str) -> String,
    ) -> String {
        let Some(regex) = regex else {
            return text.to_string();
        };
        regex
            .replace_all(text, |caps: &Captures| {
                let matched = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                if self.config.hash_for_correlation {
                    format!("{}[{}]", label, Self::hash_value(matched))
                } else {
                    mask(matched)
                }
            })
            .to_string()
    }

    fn hash_value(value: &str) -> String {
        let digest = Sha256::digest(value.as_bytes());
        // first 8 bytes keep the token short
        general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn masking() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking().redact("User john.doe@example.com logged in");
        assert!(redacted.contains("j***@e***"));
        assert!(!redacted.contains("john.doe"));
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));

        let intl = masking().redact("Patient phone +254712345678 on file");
        assert!(!intl.contains("254712345678"));
    }

    #[test]
    fn hashed_tokens_are_stable_for_correlation() {
        let redactor = PiiRedactor::default();
        let first = redactor.redact("contact jane@clinic.org");
        let second = redactor.redact("again jane@clinic.org");
        let token = first.trim_start_matches("contact ");
        assert!(token.starts_with("EMAIL["));
        assert!(second.ends_with(token));
    }

    #[test]
    fn redacts_strings_inside_json() {
        let value = json!({
            "message": "Result ready for jane@clinic.org",
            "count": 3,
            "nested": ["123-45-6789"]
        });
        let redacted = masking().redact_value(&value);
        assert_eq!(redacted["count"], 3);
        assert_eq!(redacted["nested"][0], "***-**-****");
        assert!(!redacted["message"].as_str().unwrap().contains("jane"));
    }

    #[test]
    fn custom_patterns_apply_last() {
        let redactor = PiiRedactor::new(
            RedactionConfig::default().with_custom_pattern(r"PAT-\d{8}-\d{6}", "PAT-[REDACTED]"),
        );
        assert_eq!(
            redactor.redact("Admitted PAT-20240101-123456"),
            "Admitted PAT-[REDACTED]"
        );
    }
}
