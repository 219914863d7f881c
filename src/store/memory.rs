use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ActorPatch, ActorStore, StoreError, UpdateOutcome};
use crate::models::actor::{ActorRecord, NewActor};
use crate::utils::{normalize_email, utc_now};

/// In-process store. Version check and write happen under one write lock.
#[derive(Debug, Default)]
pub struct MemoryActorStore {
    actors: RwLock<HashMap<Uuid, ActorRecord>>,
}

impl MemoryActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, new: NewActor) -> ActorRecord {
        let now = utc_now();
        let record = ActorRecord {
            id: Uuid::new_v4(),
            email: normalize_email(&new.email),
            display_name: new.display_name,
            role: new.role,
            permissions: new.permissions,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        self.actors.write().await.insert(record.id, record.clone());
        record
    }
}

#[async_trait]
impl ActorStore for MemoryActorStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<ActorRecord>, StoreError> {
        Ok(self.actors.read().await.get(&id).cloned())
    }

    async fn update_actor(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: ActorPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut actors = self.actors.write().await;
        let Some(record) = actors.get_mut(&id) else {
            return Ok(UpdateOutcome::Missing);
        };

        if record.version != expected_version {
            return Ok(UpdateOutcome::VersionConflict);
        }

        if let Some(role) = patch.role {
            record.role = role;
        }
        if let Some(permissions) = patch.permissions {
            record.permissions = permissions;
        }
        record.version += 1;
        record.updated_at = utc_now();

        Ok(UpdateOutcome::Applied(record.clone()))
    }
}
