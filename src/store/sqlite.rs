use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::{ActorPatch, ActorStore, StoreError, UpdateOutcome};
use crate::db::row_parsers::actor_from_row;
use crate::models::actor::{ActorRecord, NewActor};
use crate::utils::{normalize_email, utc_now};

const ACTOR_COLUMNS: &str =
    "id, email, display_name, role, permissions, version, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteActorStore {
    pool: SqlitePool,
}

impl SqliteActorStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, new: NewActor) -> Result<ActorRecord, StoreError> {
        let id = Uuid::new_v4();
        let now = utc_now().to_rfc3339();
        let permissions = serde_json::to_string(&new.permissions)
            .map_err(|e| StoreError::corrupt(e.to_string()))?;

        sqlx::query(
            "INSERT INTO actors (id, email, display_name, role, permissions, version, created_at, updated_at) VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
        )
        .bind(id.to_string())
        .bind(normalize_email(&new.email))
        .bind(&new.display_name)
        .bind(new.role.as_str())
        .bind(&permissions)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_actor(id)
            .await?
            .ok_or_else(|| StoreError::corrupt("inserted actor vanished"))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<ActorRecord>, StoreError> {
        let sql = format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE email = ?");
        let row = sqlx::query(&sql)
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(actor_from_row).transpose()
    }
}

#[async_trait]
impl ActorStore for SqliteActorStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<ActorRecord>, StoreError> {
        let sql = format!("SELECT {ACTOR_COLUMNS} FROM actors WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(actor_from_row).transpose()
    }

    async fn update_actor(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: ActorPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        let permissions = patch
            .permissions
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| StoreError::corrupt(e.to_string()))?;

        let sql = format!(
            r#"
            UPDATE actors
            SET role = COALESCE(?, role),
                permissions = COALESCE(?, permissions),
                version = version + 1,
                updated_at = ?
            WHERE id = ? AND version = ?
            RETURNING {ACTOR_COLUMNS}
            "#
        );

        let updated = sqlx::query(&sql)
            .bind(patch.role.map(|r| r.as_str()))
            .bind(&permissions)
            .bind(utc_now().to_rfc3339())
            .bind(id.to_string())
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = updated {
            return Ok(UpdateOutcome::Applied(actor_from_row(&row)?));
        }

        // nothing matched: tell a vanished row apart from a moved version
        match self.find_actor(id).await? {
            Some(_) => Ok(UpdateOutcome::VersionConflict),
            None => Ok(UpdateOutcome::Missing),
        }
    }
}
