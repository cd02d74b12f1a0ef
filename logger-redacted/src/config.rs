use serde::{Deserialize, Serialize};

use crate::redactor::RedactionConfig;

/// Extra pattern masked after the built-in detectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomPattern {
    pub pattern: String,
    pub replacement: String,
}

/// Redaction switches for [`crate::RedactedLogger`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub redaction_enabled: bool,
    /// Components whose messages are logged verbatim, e.g. `["health"]`
    pub verbatim_components: Vec<String>,
    /// Site-specific identifiers, e.g. patient numbers
    pub custom_patterns: Vec<CustomPattern>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            redaction_enabled: true,
            verbatim_components: Vec::new(),
            custom_patterns: Vec::new(),
        }
    }
}

impl LoggerConfig {
    pub fn redacts(&self, component: &str) -> bool {
        self.redaction_enabled && !self.verbatim_components.iter().any(|c| c == component)
    }

    /// Detector settings with the custom patterns appended
    pub fn redaction(&self) -> RedactionConfig {
        self.custom_patterns
            .iter()
            .fold(RedactionConfig::default(), |config, custom| {
                config.with_custom_pattern(&custom.pattern, &custom.replacement)
            })
    }
}
