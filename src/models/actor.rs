use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::{Actor, PermissionSet, Role};
use crate::events::{Loggable, Severity};

/// Persisted actor as stored by an [`crate::store::ActorStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ActorRecord {
    pub id: Uuid,
    #[schema(example = "owner@example.com")]
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub role: Role,
    #[schema(value_type = Vec<String>, example = json!(["viewReports"]))]
    pub permissions: PermissionSet,
    /// Bumped on every write; used for compare-and-swap updates.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActorRecord {
    pub fn to_actor(&self) -> Actor {
        Actor {
            id: self.id,
            email: crate::utils::normalize_email(&self.email),
            role: self.role,
            permissions: self.permissions.clone(),
        }
    }
}

impl Loggable for ActorRecord {
    fn entity_type() -> &'static str { "actor" }
    fn subject_id(&self) -> Uuid { self.id }
    fn severity(&self) -> Severity { Severity::Critical }
}

#[derive(Debug, Clone)]
pub struct NewActor {
    pub email: String,
    pub display_name: Option<String>,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl NewActor {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            role,
            permissions: PermissionSet::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_permissions<S: Into<String>>(mut self, perms: impl IntoIterator<Item = S>) -> Self {
        self.permissions = perms.into_iter().collect();
        self
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct GrantPermissionRequest {
    #[schema(example = "viewAuditLogs")]
    pub permission: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Result of an administrative permission or role change.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActorMutationResponse {
    /// `false` when the request was already satisfied and nothing was written.
    pub changed: bool,
    pub actor: ActorRecord,
}
