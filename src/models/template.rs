use serde::{Deserialize, Serialize};

/// Message template model
///
/// A parametrized message owned by exactly one conversation stage and
/// optionally targeted at a product category. A template without a category
/// is the stage's generic fallback. `variables` caches the placeholder names
/// found in the message body, comma-joined ('none' when empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: Option<i64>,
    pub name: String,
    pub stage_id: i64,
    pub category_id: Option<i64>,
    pub message: String,
    pub variables: String,
    pub sequence: i64,
    pub active: bool,
    pub notes: Option<String>,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Template {
    /// The cached placeholder names as a list (empty for the 'none' sentinel)
    pub fn variable_names(&self) -> Vec<&str> {
        if self.variables == crate::resolver::placeholder::NONE_SENTINEL {
            return Vec::new();
        }
        self.variables
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
