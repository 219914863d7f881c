mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use hoa_portal::authz::{permissions, Role};
use hoa_portal::models::actor::{ActorRecord, NewActor};
use hoa_portal::services::{AuthzError, PermissionService};
use hoa_portal::store::{ActorPatch, ActorStore, MemoryActorStore, StoreError, UpdateOutcome};

use common::TestApp;

/// Counts writes that reach the inner store.
struct CountingStore {
    inner: MemoryActorStore,
    writes: AtomicUsize,
}

#[async_trait]
impl ActorStore for CountingStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<ActorRecord>, StoreError> {
        self.inner.find_actor(id).await
    }

    async fn update_actor(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: ActorPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_actor(id, expected_version, patch).await
    }
}

/// Sneaks in a competing grant right before the first write lands, the way a
/// second admin request would between our read and our write.
struct InterleavingStore {
    inner: Arc<MemoryActorStore>,
    competing: &'static str,
    fired: AtomicUsize,
}

#[async_trait]
impl ActorStore for InterleavingStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<ActorRecord>, StoreError> {
        self.inner.find_actor(id).await
    }

    async fn update_actor(
        &self,
        id: Uuid,
        expected_version: i64,
        patch: ActorPatch,
    ) -> Result<UpdateOutcome, StoreError> {
        if self.fired.fetch_add(1, Ordering::SeqCst) == 0 {
            let competitor = PermissionService::new(self.inner.clone());
            competitor
                .grant_permission(id, self.competing)
                .await
                .map_err(|e| StoreError::corrupt(e.to_string()))?;
        }
        self.inner.update_actor(id, expected_version, patch).await
    }
}

#[tokio::test]
async fn repeated_grant_and_absent_revoke_do_not_write() -> Result<()> {
    let inner = MemoryActorStore::new();
    let actor = inner.insert(NewActor::new("board@example.com", Role::User)).await;
    let store = Arc::new(CountingStore { inner, writes: AtomicUsize::new(0) });
    let service = PermissionService::new(store.clone());

    assert!(service.grant_permission(actor.id, permissions::VIEW_REPORTS).await?.is_changed());
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    let again = service.grant_permission(actor.id, permissions::VIEW_REPORTS).await?;
    assert!(!again.is_changed());
    assert_eq!(again.record().permissions.len(), 1);
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    let absent = service.revoke_permission(actor.id, permissions::MANAGE_POLLS).await?;
    assert!(!absent.is_changed());
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    // role writes happen even when nothing changes
    service.set_role(actor.id, Role::User).await?;
    service.set_role(actor.id, Role::User).await?;
    assert_eq!(store.writes.load(Ordering::SeqCst), 3);

    Ok(())
}

#[tokio::test]
async fn interleaved_grant_is_not_lost() -> Result<()> {
    let inner = Arc::new(MemoryActorStore::new());
    let actor = inner.insert(NewActor::new("a@example.com", Role::User)).await;
    let store = Arc::new(InterleavingStore {
        inner: inner.clone(),
        competing: permissions::MANAGE_POLLS,
        fired: AtomicUsize::new(0),
    });
    let service = PermissionService::new(store.clone());

    let outcome = service.grant_permission(actor.id, permissions::VIEW_REPORTS).await?;
    assert!(outcome.is_changed());

    // the pre-image is the competitor's write, not our first read
    let previous = outcome.previous().expect("changed outcome carries a pre-image");
    assert_eq!(previous.version, 1);
    let before: Vec<&str> = previous.permissions.iter().collect();
    assert_eq!(before, vec![permissions::MANAGE_POLLS]);

    let stored = inner.find_actor(actor.id).await?.expect("actor exists");
    assert!(stored.permissions.contains(permissions::VIEW_REPORTS));
    assert!(stored.permissions.contains(permissions::MANAGE_POLLS));
    assert_eq!(stored.version, 2);
    // first write conflicted, second applied
    assert_eq!(store.fired.load(Ordering::SeqCst), 2);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_grants_of_distinct_permissions_all_land() -> Result<()> {
    let store = Arc::new(MemoryActorStore::new());
    let actor = store.insert(NewActor::new("a@example.com", Role::User)).await;
    let service = PermissionService::new(store.clone());

    let handles: Vec<_> = permissions::ALL
        .iter()
        .map(|permission| {
            let service = service.clone();
            let id = actor.id;
            tokio::spawn(async move { service.grant_permission(id, permission).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await??.is_changed());
    }

    let stored = store.find_actor(actor.id).await?.expect("actor exists");
    assert_eq!(stored.permissions.len(), permissions::ALL.len());
    assert_eq!(stored.version, permissions::ALL.len() as i64);

    Ok(())
}

#[tokio::test]
async fn every_operation_reports_missing_actor() -> Result<()> {
    let t = TestApp::new().await?;
    let service = PermissionService::new(Arc::new(t.store.clone()));
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.grant_permission(missing, permissions::VIEW_REPORTS).await,
        Err(AuthzError::NotFound(id)) if id == missing
    ));
    assert!(matches!(
        service.revoke_permission(missing, permissions::VIEW_REPORTS).await,
        Err(AuthzError::NotFound(_))
    ));
    assert!(matches!(service.set_role(missing, Role::Admin).await, Err(AuthzError::NotFound(_))));

    Ok(())
}

#[tokio::test]
async fn sqlite_store_rejects_stale_versions() -> Result<()> {
    let t = TestApp::new().await?;
    let actor = t.actor("editor@example.com", Role::User).await?;

    let first = t
        .store
        .update_actor(actor.id, 0, ActorPatch::role(Role::ContentEditor))
        .await?;
    let UpdateOutcome::Applied(record) = first else {
        panic!("expected applied update, got {:?}", first);
    };
    assert_eq!(record.version, 1);
    assert_eq!(record.role, Role::ContentEditor);

    let stale = t.store.update_actor(actor.id, 0, ActorPatch::role(Role::Admin)).await?;
    assert_eq!(stale, UpdateOutcome::VersionConflict);

    let gone = t.store.update_actor(Uuid::new_v4(), 0, ActorPatch::role(Role::Admin)).await?;
    assert_eq!(gone, UpdateOutcome::Missing);

    let stored = t.store.find_actor(actor.id).await?.expect("actor exists");
    assert_eq!(stored.role, Role::ContentEditor);

    Ok(())
}

#[tokio::test]
async fn sqlite_lookup_by_email_is_normalized() -> Result<()> {
    let t = TestApp::new().await?;
    let actor = t.actor("Treasurer@Example.com", Role::User).await?;

    let found = t.store.find_by_email("  TREASURER@example.COM ").await?;
    assert_eq!(found.map(|r| r.id), Some(actor.id));
    assert!(t.store.find_by_email("nobody@example.com").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn sqlite_grant_revoke_round_trip_preserves_other_entries() -> Result<()> {
    let t = TestApp::new().await?;
    let actor = t
        .actor_with(
            NewActor::new("treasurer@example.com", Role::User)
                .with_permissions([permissions::VIEW_REPORTS, permissions::MANAGE_POLLS]),
        )
        .await?;
    let service = PermissionService::new(Arc::new(t.store.clone()));

    service.grant_permission(actor.id, permissions::VIEW_AUDIT_LOGS).await?;
    let outcome = service.revoke_permission(actor.id, permissions::VIEW_REPORTS).await?;

    let perms: Vec<&str> = outcome.record().permissions.iter().collect();
    assert_eq!(perms, vec![permissions::MANAGE_POLLS, permissions::VIEW_AUDIT_LOGS]);
    assert_eq!(outcome.record().role, Role::User);
    assert_eq!(outcome.record().version, 2);

    Ok(())
}
