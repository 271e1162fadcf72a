//! Security utilities for SQL generation.
//!
//! Comparison levels and pipelines interpolate user-supplied names and
//! predicates into SQL text. This module validates those inputs before they
//! reach a backend.

use crate::error::{LinkError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum identifier length accepted for columns and pipeline outputs.
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Maximum length of a custom predicate.
const MAX_EXPRESSION_LENGTH: usize = 5000;

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    // Letters, digits and underscores, not starting with a digit
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("Hard-coded regex pattern should be valid")
});

/// SQL identifier and expression validation.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a SQL identifier (column name, pipeline output name).
    ///
    /// # Examples
    /// ```rust
    /// use term_link::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("first_name").is_ok());
    /// assert!(SqlSecurity::validate_identifier("__link__df_blocked").is_ok());
    /// assert!(SqlSecurity::validate_identifier("id; DROP TABLE users--").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(LinkError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(LinkError::SecurityError(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(LinkError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers and underscores"
            )));
        }

        Ok(())
    }

    /// Validates a custom boolean predicate.
    ///
    /// Predicates are spliced into a `CASE WHEN`, so anything that could end
    /// the surrounding statement or hide the remainder of it is rejected.
    pub fn validate_sql_expression(expression: &str) -> Result<()> {
        if expression.trim().is_empty() {
            return Err(LinkError::SecurityError(
                "SQL expression cannot be empty".to_string(),
            ));
        }

        if expression.len() > MAX_EXPRESSION_LENGTH {
            return Err(LinkError::SecurityError(format!(
                "SQL expression too long (max {MAX_EXPRESSION_LENGTH} characters)"
            )));
        }

        if expression.contains('\0') {
            return Err(LinkError::SecurityError(
                "SQL expression cannot contain null bytes".to_string(),
            ));
        }

        for marker in ["--", "/*", "*/"] {
            if expression.contains(marker) {
                return Err(LinkError::SecurityError(format!(
                    "SQL expression contains comment marker: '{marker}'"
                )));
            }
        }

        if expression.contains(';') {
            return Err(LinkError::SecurityError(
                "SQL expression contains a statement separator".to_string(),
            ));
        }

        Ok(())
    }
}

/// Input validation for numeric parameters.
pub struct InputValidator;

impl InputValidator {
    /// Validates that a threshold is finite.
    pub fn validate_threshold(value: f64, name: &str) -> Result<()> {
        if !value.is_finite() {
            return Err(LinkError::SecurityError(format!(
                "Invalid {name} value: must be finite (not NaN or infinite)"
            )));
        }
        Ok(())
    }

    /// Validates that a threshold is finite and not negative.
    pub fn validate_non_negative(value: f64, name: &str) -> Result<()> {
        Self::validate_threshold(value, name)?;

        if value < 0.0 {
            return Err(LinkError::SecurityError(format!(
                "Invalid {name} value: must not be negative, got {value}"
            )));
        }
        Ok(())
    }

    /// Validates a similarity score (0.0 to 1.0).
    pub fn validate_similarity(value: f64, name: &str) -> Result<()> {
        Self::validate_threshold(value, name)?;

        if !(0.0..=1.0).contains(&value) {
            return Err(LinkError::SecurityError(format!(
                "Invalid {name} value: must be between 0.0 and 1.0, got {value}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sql_identifiers() {
        assert!(SqlSecurity::validate_identifier("customer_id").is_ok());
        assert!(SqlSecurity::validate_identifier("table1").is_ok());
        assert!(SqlSecurity::validate_identifier("_private_col").is_ok());
        assert!(SqlSecurity::validate_identifier("__link__df_comparison_vectors").is_ok());
    }

    #[test]
    fn test_invalid_sql_identifiers() {
        assert!(SqlSecurity::validate_identifier("").is_err());
        assert!(SqlSecurity::validate_identifier("   ").is_err());
        assert!(SqlSecurity::validate_identifier(&"a".repeat(200)).is_err());
        assert!(SqlSecurity::validate_identifier("id; DROP TABLE").is_err());
        assert!(SqlSecurity::validate_identifier("col name").is_err());
        assert!(SqlSecurity::validate_identifier("col-name").is_err());
        assert!(SqlSecurity::validate_identifier("123col").is_err());
        assert!(SqlSecurity::validate_identifier("schema.table").is_err());
    }

    #[test]
    fn test_sql_expression_validation() {
        assert!(SqlSecurity::validate_sql_expression("dob_l = dob_r").is_ok());
        assert!(SqlSecurity::validate_sql_expression(
            "substr(postcode_l, 1, 3) = substr(postcode_r, 1, 3)"
        )
        .is_ok());

        assert!(SqlSecurity::validate_sql_expression("").is_err());
        assert!(SqlSecurity::validate_sql_expression("a_l = a_r;").is_err());
        assert!(SqlSecurity::validate_sql_expression("a_l = a_r; DROP TABLE users").is_err());
        assert!(SqlSecurity::validate_sql_expression("a_l = a_r -- hidden").is_err());
        assert!(SqlSecurity::validate_sql_expression("a_l /* x */ = a_r").is_err());
    }

    #[test]
    fn test_input_validation() {
        assert!(InputValidator::validate_threshold(-5.5, "threshold").is_ok());
        assert!(InputValidator::validate_non_negative(0.0, "distance").is_ok());
        assert!(InputValidator::validate_similarity(0.92, "similarity").is_ok());

        assert!(InputValidator::validate_threshold(f64::NAN, "threshold").is_err());
        assert!(InputValidator::validate_threshold(f64::INFINITY, "threshold").is_err());
        assert!(InputValidator::validate_non_negative(-0.1, "distance").is_err());
        assert!(InputValidator::validate_similarity(1.5, "similarity").is_err());
    }
}
