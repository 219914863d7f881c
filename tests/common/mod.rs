#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use hoa_portal::authz::Role;
use hoa_portal::build_app;
use hoa_portal::jwt::JwtConfig;
use hoa_portal::models::actor::{ActorRecord, NewActor};
use hoa_portal::store::SqliteActorStore;

pub const TEST_SECRET: &str = "test-secret";

/// Router over a migrated sqlite file that lives as long as `_dir`.
pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub store: SqliteActorStore,
    pub jwt: JwtConfig,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let opts = SqliteConnectOptions::new()
            .filename(dir.path().join("test.db"))
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(opts).await?;
        hoa_portal::db::migrate(&pool).await?;

        let jwt = JwtConfig::new(TEST_SECRET, 1);
        let app = build_app(pool.clone(), jwt.clone());

        Ok(Self {
            app,
            store: SqliteActorStore::new(pool.clone()),
            pool,
            jwt,
            _dir: dir,
        })
    }

    pub async fn actor(&self, email: &str, role: Role) -> Result<ActorRecord> {
        Ok(self.store.insert(NewActor::new(email, role)).await?)
    }

    pub async fn actor_with(&self, new: NewActor) -> Result<ActorRecord> {
        Ok(self.store.insert(new).await?)
    }

    pub fn token(&self, actor_id: Uuid) -> Result<String> {
        Ok(self.jwt.encode(actor_id)?)
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))?,
            None => builder.body(Body::empty())?,
        };

        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}
