//! Logging with automatic PII redaction
//!
//! Notification bodies, patient names and contact details flow through log
//! statements in the notification hub and the WebSocket layer. Everything
//! logged through a [`RedactedLogger`] is passed through [`PiiRedactor`]
//! first; detected values are replaced by a short SHA-256 token so the same
//! value can still be correlated across log lines.
//!
//! # Example
//!
//! ```rust
//! use logger_redacted::{redacted_info, RedactedLogger};
//!
//! let logger = RedactedLogger::new("notifications");
//! redacted_info!(logger, "Lab result sent to {}", "jane.doe@clinic.org");
//! ```

pub mod config;
pub mod macros;
pub mod redactor;

pub use config::*;
pub use redactor::*;

use serde_json::Value;

/// Component-scoped logger that redacts before emitting to `tracing`
#[derive(Debug, Clone)]
pub struct RedactedLogger {
    component: String,
    redactor: PiiRedactor,
    enabled: bool,
}

impl RedactedLogger {
    pub fn new(component: impl Into<String>) -> Self {
        Self::with_config(component, &LoggerConfig::default())
    }

    pub fn with_config(component: impl Into<String>, config: &LoggerConfig) -> Self {
        let component = component.into();
        Self {
            enabled: config.redacts(&component),
            redactor: PiiRedactor::new(config.redaction()),
            component,
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    /// The text that would be written for `message`
    pub fn sanitize(&self, message: &str) -> String {
        if self.enabled {
            self.redactor.redact(message)
        } else {
            message.to_string()
        }
    }

    pub fn sanitize_value(&self, value: &Value) -> Value {
        if self.enabled {
            self.redactor.redact_value(value)
        } else {
            value.clone()
        }
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(component = %self.component, "{}", self.sanitize(message));
    }

    /// Debug line with a JSON payload attached as the `data` field
    pub fn debug_with_data(&self, message: &str, data: &Value) {
        tracing::debug!(
            component = %self.component,
            data = %self.sanitize_value(data),
            "{}",
            self.sanitize(message)
        );
    }

    pub fn info(&self, message: &str) {
        tracing::info!(component = %self.component, "{}", self.sanitize(message));
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(component = %self.component, "{}", self.sanitize(message));
    }

    pub fn error(&self, message: &str) {
        tracing::error!(component = %self.component, "{}", self.sanitize(message));
    }

    pub fn error_with_data(&self, message: &str, data: &Value) {
        tracing::error!(
            component = %self.component,
            data = %self.sanitize_value(data),
            "{}",
            self.sanitize(message)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_redaction_passes_text_through() {
        let config = LoggerConfig {
            redaction_enabled: false,
            ..Default::default()
        };
        let logger = RedactedLogger::with_config("test", &config);
        assert_eq!(logger.sanitize("a@b.com"), "a@b.com");
    }

    #[test]
    fn verbatim_components_skip_redaction() {
        let config = LoggerConfig {
            verbatim_components: vec!["health".into()],
            ..Default::default()
        };
        let health = RedactedLogger::with_config("health", &config);
        let wards = RedactedLogger::with_config("wards", &config);
        assert_eq!(health.sanitize("a@b.com"), "a@b.com");
        assert_ne!(wards.sanitize("a@b.com"), "a@b.com");
    }

    #[test]
    fn configured_patterns_mask_site_identifiers() {
        let config = LoggerConfig {
            custom_patterns: vec![CustomPattern {
                pattern: r"PAT-\d{8}-\d{6}".into(),
                replacement: "PAT-[REDACTED]".into(),
            }],
            ..Default::default()
        };
        let logger = RedactedLogger::with_config("wards", &config);
        assert_eq!(
            logger.sanitize("Admitted PAT-20240101-123456"),
            "Admitted PAT-[REDACTED]"
        );

        let data = serde_json::json!({ "patient": "PAT-20240101-123456", "bed": "A1" });
        let clean = logger.sanitize_value(&data);
        assert_eq!(clean["patient"], "PAT-[REDACTED]");
        assert_eq!(clean["bed"], "A1");
    }

    #[test]
    fn enabled_redaction_hides_contact_details() {
        let logger = RedactedLogger::new("test");
        assert!(!logger.sanitize("mail a.b@clinic.org").contains("clinic.org"));
        assert_eq!(logger.component(), "test");
    }
}
