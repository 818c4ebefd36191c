use serde::{Deserialize, Serialize};

/// Conversation stage model
///
/// A named point in a scripted conversation flow. External automation looks
/// stages up by `code` (e.g. `bienvenida`, `precio_asesorias`); `name` is the
/// display label shown to administrators. `next_stage_id` optionally points
/// at the stage the flow moves to after this one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Option<i64>,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub sequence: i64,
    pub next_stage_id: Option<i64>,
    pub active: bool,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Stage {
    /// Create a new stage with default ordering
    pub fn new(name: String, code: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            name,
            code,
            description: None,
            sequence: 10,
            next_stage_id: None,
            active: true,
            created_ts: now,
            modified_ts: now,
        }
    }
}
