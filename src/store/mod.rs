//! Backing store for actor records.
//!
//! The authorization core only ever reads an actor and writes a full
//! replacement of its role or permission set. Writes are conditional on the
//! record version the caller read, so two concurrent read-modify-write
//! sequences cannot silently overwrite each other.

use async_trait::async_trait;
use uuid::Uuid;

use crate::authz::{PermissionSet, Role};
use crate::models::actor::ActorRecord;

mod memory;
mod sqlite;

pub use memory::MemoryActorStore;
pub use sqlite::SqliteActorStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt(message.into())
    }
}

/// Fields to replace. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorPatch {
    pub role: Option<Role>,
    pub permissions: Option<PermissionSet>,
}

impl ActorPatch {
    pub fn permissions(permissions: PermissionSet) -> Self {
        Self {
            permissions: Some(permissions),
            ..Self::default()
        }
    }

    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Applied(ActorRecord),
    /// The record changed since it was read.
    VersionConflict,
    Missing,
}

#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn find_actor(&self, id: Uuid) -> Result<Option<ActorRecord>, StoreError>;

    /// Applies `patch` only if the stored version still equals `expected_version`.
    async fn update_actor(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: ActorPatch,
    ) -> Result<UpdateOutcome, StoreError>;
}
