use super::actor::{Actor, PermissionSet};
use super::policy::{self, Action, Decision, Resource};
use super::role::Role;

/// `true` iff `required` is in the set. A missing or empty set never grants anything.
pub fn has_permission(actor_permissions: Option<&PermissionSet>, required: &str) -> bool {
    actor_permissions.is_some_and(|perms| perms.contains(required))
}

pub fn has_any_permission(actor_permissions: Option<&PermissionSet>, required: &[&str]) -> bool {
    match actor_permissions {
        Some(perms) => required.iter().any(|p| perms.contains(p)),
        None => false,
    }
}

/// `true` iff `required` is a subset of the held set. A missing set holds nothing,
/// not even the empty requirement.
pub fn has_all_permissions(actor_permissions: Option<&PermissionSet>, required: &[&str]) -> bool {
    match actor_permissions {
        Some(perms) => required.iter().all(|p| perms.contains(p)),
        None => false,
    }
}

pub fn is_admin(role: Option<&str>) -> bool {
    role.and_then(|r| r.parse::<Role>().ok()) == Some(Role::Admin)
}

/// Admins count as content editors.
pub fn is_content_editor(role: Option<&str>) -> bool {
    role.and_then(|r| r.parse::<Role>().ok())
        .is_some_and(|r| r.can_edit_content())
}

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Named-permission check with the admin override applied.
    fn can(&self, actor: &Actor, permission: &str) -> bool;

    /// Row-level decision for `action` on `resource`. `None` is an anonymous caller.
    fn decide(&self, actor: Option<&Actor>, action: Action, resource: &Resource<'_>) -> Decision;
}

/// Default evaluator
///
/// Permission checks:
/// 1. admin role -> allow
/// 2. explicit permission entry -> allow
/// 3. deny
///
/// Row-level checks go through the static policy table in [`policy::POLICIES`].
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn can(&self, actor: &Actor, permission: &str) -> bool {
        if actor.role.implies_all_permissions() {
            tracing::debug!(
                actor_id = %actor.id,
                permission = %permission,
                "admin bypass"
            );
            return true;
        }

        if has_permission(Some(&actor.permissions), permission) {
            tracing::debug!(
                actor_id = %actor.id,
                permission = %permission,
                "direct permission match"
            );
            return true;
        }

        tracing::debug!(
            actor_id = %actor.id,
            permission = %permission,
            "permission denied"
        );
        false
    }

    fn decide(&self, actor: Option<&Actor>, action: Action, resource: &Resource<'_>) -> Decision {
        let decision = policy::evaluate(actor, action, resource);
        tracing::debug!(
            actor_id = ?actor.map(|a| a.id),
            action = ?action,
            resource = resource.kind().as_str(),
            decision = ?decision,
            "row policy evaluated"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn set(perms: &[&str]) -> PermissionSet {
        perms.iter().copied().collect()
    }

    #[test]
    fn has_permission_is_membership() {
        let perms = set(&["manageDocuments", "viewReports"]);
        assert!(has_permission(Some(&perms), "manageDocuments"));
        assert!(has_permission(Some(&perms), "viewReports"));
        assert!(!has_permission(Some(&perms), "viewAuditLogs"));
    }

    #[test]
    fn has_permission_fails_closed() {
        assert!(!has_permission(None, "manageDocuments"));
        assert!(!has_permission(Some(&PermissionSet::new()), "manageDocuments"));
        assert!(!has_permission(Some(&PermissionSet::new()), ""));
    }

    #[test]
    fn any_versus_all() {
        let perms = set(&["manageDocuments"]);
        let wanted = ["manageDocuments", "approveRegistrations"];
        assert!(has_any_permission(Some(&perms), &wanted));
        assert!(!has_all_permissions(Some(&perms), &wanted));

        let both = set(&["manageDocuments", "approveRegistrations", "viewReports"]);
        assert!(has_all_permissions(Some(&both), &wanted));
    }

    #[test]
    fn any_and_all_fail_closed() {
        assert!(!has_any_permission(None, &["manageDocuments"]));
        assert!(!has_all_permissions(None, &["manageDocuments"]));
        assert!(!has_all_permissions(None, &[]));
        assert!(!has_any_permission(Some(&set(&["viewReports"])), &[]));
    }

    #[test]
    fn empty_requirement_is_a_subset_of_any_set() {
        assert!(has_all_permissions(Some(&set(&["viewReports"])), &[]));
        assert!(has_all_permissions(Some(&PermissionSet::new()), &[]));
    }

    #[test]
    fn is_admin_exact_match() {
        assert!(is_admin(Some("admin")));
        assert!(!is_admin(Some("contentEditor")));
        assert!(!is_admin(Some("user")));
        assert!(!is_admin(Some("ADMIN")));
        assert!(!is_admin(None));
    }

    #[test]
    fn content_editor_includes_admin() {
        assert!(is_content_editor(Some("admin")));
        assert!(is_content_editor(Some("contentEditor")));
        assert!(!is_content_editor(Some("user")));
        assert!(!is_content_editor(Some("editor")));
        assert!(!is_content_editor(None));
    }

    #[test]
    fn evaluator_admin_bypass() {
        let evaluator = DefaultPolicyEvaluator::new();
        let admin = Actor::new(Uuid::new_v4(), "admin@hoa.test", Role::Admin);
        assert!(evaluator.can(&admin, "viewAuditLogs"));
    }

    #[test]
    fn evaluator_direct_permission() {
        let evaluator = DefaultPolicyEvaluator::new();
        let editor = Actor::new(Uuid::new_v4(), "editor@hoa.test", Role::ContentEditor)
            .with_permissions(["viewReports"]);
        assert!(evaluator.can(&editor, "viewReports"));
        assert!(!evaluator.can(&editor, "viewAuditLogs"));
    }

    #[test]
    fn evaluator_denies_by_default() {
        let evaluator = DefaultPolicyEvaluator::new();
        let user = Actor::new(Uuid::new_v4(), "owner@hoa.test", Role::User);
        assert!(!evaluator.can(&user, "manageDocuments"));
    }
}
