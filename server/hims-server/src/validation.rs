//! Request validation for payloads defined by the HTTP layer
//!
//! Domain request types are validated by their services; this covers the
//! small bodies that only exist at the API surface.

use crate::error::ApiError;

/// Trait for validating request payloads
pub trait RequestValidation {
    /// Returns `Err(ApiError)` with a validation message if the payload is unusable
    fn validate(&self) -> Result<(), ApiError>;
}

/// Fail validation unless the predicate holds
#[macro_export]
macro_rules! validate_field {
    ($predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Fail validation on an empty or whitespace-only string
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(!$field.trim().is_empty(), $message);
    };
}

/// Fail validation unless the string length is within bounds
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!(len >= $min && len <= $max, $message);
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note {
        text: String,
    }

    impl RequestValidation for Note {
        fn validate(&self) -> Result<(), ApiError> {
            validate_required!(self.text, "Note text is required");
            validate_length!(self.text, 1, 10, "Note must be at most 10 characters");
            Ok(())
        }
    }

    #[test]
    fn required_and_length_checks() {
        assert!(Note { text: "  ".into() }.validate().is_err());
        assert!(Note { text: "way too long for this".into() }.validate().is_err());
        assert!(Note { text: "ok".into() }.validate().is_ok());
    }
}
