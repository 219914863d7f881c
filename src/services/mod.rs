pub mod permissions;

pub use permissions::{AuthzError, MutationOutcome, PermissionService};
