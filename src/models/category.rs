use serde::{Deserialize, Serialize};

/// Product category model
///
/// A lightweight reference to a CRM pipeline entity. Templates may target a
/// category; lookups may name one by id or display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub name: String,
    pub crm_ref: Option<String>,
    pub active: bool,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Category {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            name,
            crm_ref: None,
            active: true,
            created_ts: now,
            modified_ts: now,
        }
    }
}

/// Category reference as supplied by the automation tool: an integer id or a
/// display-name string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryRef {
    Id(i64),
    Name(String),
}

impl CategoryRef {
    /// Parse a raw argument. All-digit input is treated as an id, anything
    /// else as a display name.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(id) => CategoryRef::Id(id),
            Err(_) => CategoryRef::Name(trimmed.to_string()),
        }
    }
}

impl std::fmt::Display for CategoryRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CategoryRef::Id(id) => write!(f, "{}", id),
            CategoryRef::Name(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_ref_parse() {
        assert_eq!(CategoryRef::parse("42"), CategoryRef::Id(42));
        assert_eq!(CategoryRef::parse(" 7 "), CategoryRef::Id(7));
        assert_eq!(
            CategoryRef::parse("Cursos"),
            CategoryRef::Name("Cursos".to_string())
        );
        assert_eq!(
            CategoryRef::parse("plan 3"),
            CategoryRef::Name("plan 3".to_string())
        );
    }
}
