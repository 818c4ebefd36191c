// Error handling utilities for consistent error messages and exit codes

use std::process;

/// Exit with a user error (exit code 1)
/// User errors are for invalid input, missing resources, etc.
pub fn user_error(message: &str) -> ! {
    eprintln!("Error: {}", message);
    process::exit(1);
}

/// Exit with an internal error (exit code >1)
/// Internal errors are for unexpected system failures, database corruption, etc.
pub fn internal_error(message: &str) -> ! {
    eprintln!("Internal error: {}", message);
    process::exit(2);
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate stage code format (alphanumeric, dots, underscores, hyphens)
pub fn validate_stage_code(code: &str) -> Result<(), String> {
    if code.trim().is_empty() {
        return Err("Stage code cannot be empty".to_string());
    }

    if code.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '-') {
        Ok(())
    } else {
        Err(format!("Invalid stage code: '{}'. Stage codes can only contain letters, numbers, dots, underscores, and hyphens.", code))
    }
}

/// Validate that a template ID is valid (positive integer)
pub fn validate_template_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid template ID: '{}'. Template ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid template ID: {}. Template ID must be positive.", id))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("test", "field").is_ok());
        assert!(validate_non_empty("", "field").is_err());
        assert!(validate_non_empty("   ", "field").is_err());
    }

    #[test]
    fn test_validate_stage_code() {
        assert!(validate_stage_code("bienvenida").is_ok());
        assert!(validate_stage_code("precio_asesorias").is_ok());
        assert!(validate_stage_code("follow-up.2").is_ok());
        assert!(validate_stage_code("").is_err());
        assert!(validate_stage_code("precio asesorias").is_err());
        assert!(validate_stage_code("precio@casa").is_err());
    }

    #[test]
    fn test_validate_template_id() {
        assert_eq!(validate_template_id("1"), Ok(1));
        assert_eq!(validate_template_id("42"), Ok(42));
        assert!(validate_template_id("0").is_err());
        assert!(validate_template_id("-1").is_err());
        assert!(validate_template_id("abc").is_err());
        assert!(validate_template_id("").is_err());
    }
}
