//! Administrative permission and role changes.
//!
//! Each operation is a read-modify-write against an [`ActorStore`]. Writes are
//! compare-and-swap on the record version; on a conflict the mutation is
//! re-applied to a fresh read. Store failures are returned as-is and never
//! retried.

use std::sync::Arc;

use uuid::Uuid;

use crate::authz::{permissions, Role};
use crate::models::actor::ActorRecord;
use crate::store::{ActorPatch, ActorStore, StoreError, UpdateOutcome};

/// Upper bound on compare-and-swap rounds for a single mutation.
const MAX_ATTEMPTS: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("actor {0} not found")]
    NotFound(Uuid),
    #[error("actor {0} is being modified concurrently, try again")]
    Conflict(Uuid),
    #[error("unknown permission: {0}")]
    InvalidPermission(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// `previous` is the exact version the write replaced.
    Changed { previous: ActorRecord, current: ActorRecord },
    /// Already in the requested state; nothing was written.
    Unchanged(ActorRecord),
}

impl MutationOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, MutationOutcome::Changed { .. })
    }

    pub fn record(&self) -> &ActorRecord {
        match self {
            MutationOutcome::Changed { current, .. } | MutationOutcome::Unchanged(current) => current,
        }
    }

    pub fn previous(&self) -> Option<&ActorRecord> {
        match self {
            MutationOutcome::Changed { previous, .. } => Some(previous),
            MutationOutcome::Unchanged(_) => None,
        }
    }

    pub fn into_record(self) -> ActorRecord {
        match self {
            MutationOutcome::Changed { current, .. } | MutationOutcome::Unchanged(current) => current,
        }
    }
}

#[derive(Clone)]
pub struct PermissionService {
    store: Arc<dyn ActorStore>,
}

impl PermissionService {
    pub fn new(store: Arc<dyn ActorStore>) -> Self {
        Self { store }
    }

    pub async fn grant_permission(&self, actor_id: Uuid, permission: &str) -> Result<MutationOutcome, AuthzError> {
        if !permissions::is_known(permission) {
            return Err(AuthzError::InvalidPermission(permission.to_string()));
        }

        let outcome = self
            .mutate(actor_id, |record| {
                let mut perms = record.permissions.clone();
                perms.insert(permission).then(|| ActorPatch::permissions(perms))
            })
            .await?;

        if outcome.is_changed() {
            tracing::info!(actor_id = %actor_id, permission = %permission, "permission granted");
        }
        Ok(outcome)
    }

    /// Unknown names are accepted so stale entries can be cleaned up.
    pub async fn revoke_permission(&self, actor_id: Uuid, permission: &str) -> Result<MutationOutcome, AuthzError> {
        let outcome = self
            .mutate(actor_id, |record| {
                let mut perms = record.permissions.clone();
                perms.remove(permission).then(|| ActorPatch::permissions(perms))
            })
            .await?;

        if outcome.is_changed() {
            tracing::info!(actor_id = %actor_id, permission = %permission, "permission revoked");
        }
        Ok(outcome)
    }

    /// Always writes, even when the role is unchanged.
    pub async fn set_role(&self, actor_id: Uuid, role: Role) -> Result<MutationOutcome, AuthzError> {
        let outcome = self
            .mutate(actor_id, |_| Some(ActorPatch::role(role)))
            .await?;

        tracing::info!(actor_id = %actor_id, role = %role, "role set");
        Ok(outcome)
    }

    async fn mutate<F>(&self, actor_id: Uuid, apply: F) -> Result<MutationOutcome, AuthzError>
    where
        F: Fn(&ActorRecord) -> Option<ActorPatch>,
    {
        for attempt in 1..=MAX_ATTEMPTS {
            let record = self
                .store
                .find_actor(actor_id)
                .await?
                .ok_or(AuthzError::NotFound(actor_id))?;

            let Some(patch) = apply(&record) else {
                return Ok(MutationOutcome::Unchanged(record));
            };

            match self.store.update_actor(actor_id, record.version, patch).await? {
                UpdateOutcome::Applied(current) => {
                    return Ok(MutationOutcome::Changed { previous: record, current })
                }
                UpdateOutcome::Missing => return Err(AuthzError::NotFound(actor_id)),
                UpdateOutcome::VersionConflict => {
                    tracing::debug!(actor_id = %actor_id, attempt, "actor version moved, re-reading");
                }
            }
        }

        tracing::warn!(actor_id = %actor_id, "gave up after {} conflicting writes", MAX_ATTEMPTS);
        Err(AuthzError::Conflict(actor_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::actor::NewActor;
    use crate::store::MemoryActorStore;

    async fn setup(new: NewActor) -> (PermissionService, Arc<MemoryActorStore>, Uuid) {
        let store = Arc::new(MemoryActorStore::new());
        let actor = store.insert(new).await;
        (PermissionService::new(store.clone()), store, actor.id)
    }

    #[tokio::test]
    async fn grant_then_grant_again_is_unchanged() {
        let (service, _store, id) = setup(NewActor::new("a@x.com", Role::User)).await;

        let first = service.grant_permission(id, permissions::VIEW_REPORTS).await.unwrap();
        assert!(first.is_changed());
        assert_eq!(first.record().version, 1);
        assert_eq!(first.previous().map(|r| r.version), Some(0));
        assert!(first.previous().is_some_and(|r| r.permissions.is_empty()));

        let second = service.grant_permission(id, permissions::VIEW_REPORTS).await.unwrap();
        assert!(!second.is_changed());
        assert!(second.previous().is_none());
        assert_eq!(second.record().version, 1);
        assert_eq!(second.record().permissions, first.record().permissions);
    }

    #[tokio::test]
    async fn revoke_absent_is_unchanged() {
        let (service, _store, id) = setup(NewActor::new("a@x.com", Role::User)).await;
        let outcome = service.revoke_permission(id, permissions::VIEW_REPORTS).await.unwrap();
        assert!(!outcome.is_changed());
        assert_eq!(outcome.record().version, 0);
    }

    #[tokio::test]
    async fn revoke_present_removes_only_that_entry() {
        let (service, _store, id) = setup(
            NewActor::new("a@x.com", Role::User)
                .with_permissions([permissions::VIEW_REPORTS, permissions::MANAGE_POLLS]),
        )
        .await;

        let outcome = service.revoke_permission(id, permissions::VIEW_REPORTS).await.unwrap();
        assert!(outcome.is_changed());
        let perms: Vec<&str> = outcome.record().permissions.iter().collect();
        assert_eq!(perms, vec![permissions::MANAGE_POLLS]);
    }

    #[tokio::test]
    async fn unknown_permission_is_refused_on_grant() {
        let (service, _store, id) = setup(NewActor::new("a@x.com", Role::User)).await;
        let err = service.grant_permission(id, "launchMissiles").await.unwrap_err();
        assert!(matches!(err, AuthzError::InvalidPermission(_)));
    }

    #[tokio::test]
    async fn missing_actor_is_not_found() {
        let store = Arc::new(MemoryActorStore::new());
        let service = PermissionService::new(store);
        let id = Uuid::new_v4();

        assert!(matches!(
            service.grant_permission(id, permissions::VIEW_REPORTS).await,
            Err(AuthzError::NotFound(missing)) if missing == id
        ));
        assert!(matches!(
            service.revoke_permission(id, permissions::VIEW_REPORTS).await,
            Err(AuthzError::NotFound(_))
        ));
        assert!(matches!(service.set_role(id, Role::Admin).await, Err(AuthzError::NotFound(_))));
    }

    #[tokio::test]
    async fn set_role_writes_even_when_equal() {
        let (service, _store, id) = setup(NewActor::new("a@x.com", Role::ContentEditor)).await;
        let outcome = service.set_role(id, Role::ContentEditor).await.unwrap();
        assert!(outcome.is_changed());
        assert_eq!(outcome.record().version, 1);
        assert_eq!(outcome.record().role, Role::ContentEditor);
    }
}
