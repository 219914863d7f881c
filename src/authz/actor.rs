use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;

/// Explicit, individually granted capabilities of an actor.
///
/// Backed by an ordered set so the stored JSON array is stable and can never
/// carry duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<String>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.0.contains(permission)
    }

    /// Returns `false` when the permission was already present.
    pub fn insert(&mut self, permission: impl Into<String>) -> bool {
        self.0.insert(permission.into())
    }

    /// Returns `false` when the permission was not present.
    pub fn remove(&mut self, permission: &str) -> bool {
        self.0.remove(permission)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Authenticated identity a decision is made for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl Actor {
    pub fn new(id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: crate::utils::normalize_email(&email.into()),
            role,
            permissions: PermissionSet::new(),
        }
    }

    pub fn with_permissions<S: Into<String>>(mut self, perms: impl IntoIterator<Item = S>) -> Self {
        self.permissions = perms.into_iter().collect();
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_content_editor(&self) -> bool {
        self.role.can_edit_content()
    }

    /// Permission check with the admin override applied.
    pub fn can(&self, permission: &str) -> bool {
        self.role.implies_all_permissions()
            || super::evaluator::has_permission(Some(&self.permissions), permission)
    }

    pub fn owns_email(&self, email: &str) -> bool {
        !self.email.is_empty() && self.email == crate::utils::normalize_email(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_set_collapses_duplicates() {
        let set: PermissionSet = serde_json::from_str(r#"["viewReports","viewReports","manageDocuments"]"#).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["manageDocuments","viewReports"]"#);
    }

    #[test]
    fn admin_can_everything_without_explicit_entries() {
        let admin = Actor::new(Uuid::new_v4(), "board@hoa.test", Role::Admin);
        assert!(admin.permissions.is_empty());
        assert!(admin.can("viewAuditLogs"));
        assert!(admin.can("somethingNobodyDefined"));
    }

    #[test]
    fn explicit_permission_without_role() {
        let actor = Actor::new(Uuid::new_v4(), "owner@hoa.test", Role::User)
            .with_permissions(["viewReports"]);
        assert!(actor.can("viewReports"));
        assert!(!actor.can("viewAuditLogs"));
    }

    #[test]
    fn email_ownership_ignores_case_and_whitespace() {
        let actor = Actor::new(Uuid::new_v4(), "A@X.com ", Role::User);
        assert!(actor.owns_email("a@x.com"));
        assert!(actor.owns_email(" A@x.COM"));
        assert!(!actor.owns_email("b@x.com"));
    }

    #[test]
    fn blank_email_owns_nothing() {
        let actor = Actor::new(Uuid::new_v4(), "", Role::User);
        assert!(!actor.owns_email(""));
    }
}
