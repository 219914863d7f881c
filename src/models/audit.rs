use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    pub id: Uuid,
    #[schema(example = "actor.permission_granted")]
    pub event_name: String,
    pub actor_id: Option<Uuid>,
    pub subject_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
    #[schema(example = "critical")]
    pub severity: String,
    #[schema(value_type = Object)]
    pub payload: Value,
    pub prev_hash: Option<String>,
    pub hash: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditLogQuery {
    /// Maximum number of entries, newest first (default 100, max 500)
    pub limit: Option<i64>,
}
