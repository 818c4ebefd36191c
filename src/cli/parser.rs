// CLI parsing utilities for resolve commands

use std::collections::HashMap;

/// Error parsing a `--var key=value` assignment
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VarParseError {
    #[error("Invalid variable assignment '{0}'. Expected key=value.")]
    MissingEquals(String),
    #[error("Invalid variable key '{0}'. Keys start with a letter or underscore and contain only letters, numbers, and underscores.")]
    InvalidKey(String),
}

fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parse `--var key=value` tokens into a substitution map.
/// Later assignments override earlier ones. Values may contain '='.
pub fn parse_var_args(tokens: &[String]) -> Result<HashMap<String, String>, VarParseError> {
    let mut vars = HashMap::new();

    for token in tokens {
        let eq_pos = token
            .find('=')
            .ok_or_else(|| VarParseError::MissingEquals(token.clone()))?;
        let key = &token[..eq_pos];
        let value = &token[eq_pos + 1..];

        if !is_valid_key(key) {
            return Err(VarParseError::InvalidKey(key.to_string()));
        }

        vars.insert(key.to_string(), value.to_string());
    }

    Ok(vars)
}
