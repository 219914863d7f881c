//! Authorization module - role/permission evaluation and row-level policy
//!
//! This module implements:
//! - Closed role set with an admin superuser override
//! - Explicit, individually granted permissions
//! - The declarative document / owner-registration policy table
//!
//! Every function here is pure: missing information is a denial, never an error.

mod actor;
mod evaluator;
pub mod policy;
mod role;

pub use actor::{Actor, PermissionSet};
pub use evaluator::{
    has_all_permissions, has_any_permission, has_permission, is_admin, is_content_editor,
    DefaultPolicyEvaluator, PolicyEvaluator,
};
pub use policy::{Action, Decision, Resource, ViewScope};
pub use role::{Role, UnknownRole};

/// Well-known permission names
pub mod permissions {
    pub const MANAGE_DOCUMENTS: &str = "manageDocuments";
    pub const MANAGE_REGISTRATIONS: &str = "manageRegistrations";
    pub const APPROVE_REGISTRATIONS: &str = "approveRegistrations";
    pub const VIEW_AUDIT_LOGS: &str = "viewAuditLogs";
    pub const MANAGE_USERS: &str = "manageUsers";
    pub const MANAGE_POLLS: &str = "managePolls";
    pub const MANAGE_WHATSAPP: &str = "manageWhatsapp";
    pub const VIEW_REPORTS: &str = "viewReports";

    pub const ALL: &[&str] = &[
        MANAGE_DOCUMENTS,
        MANAGE_REGISTRATIONS,
        APPROVE_REGISTRATIONS,
        VIEW_AUDIT_LOGS,
        MANAGE_USERS,
        MANAGE_POLLS,
        MANAGE_WHATSAPP,
        VIEW_REPORTS,
    ];

    pub fn is_known(name: &str) -> bool {
        ALL.contains(&name)
    }
}
