use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse-grained actor category.
///
/// `Admin` is a superuser: it implies every named permission and every
/// content-editor capability, regardless of what the explicit permission set
/// contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    User,
    ContentEditor,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::ContentEditor, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::ContentEditor => "contentEditor",
            Role::Admin => "admin",
        }
    }

    pub fn implies_all_permissions(&self) -> bool {
        matches!(self, Role::Admin)
    }

    pub fn can_edit_content(&self) -> bool {
        matches!(self, Role::ContentEditor | Role::Admin)
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_exactly() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("contentEditor".parse::<Role>(), Ok(Role::ContentEditor));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("Admin".parse::<Role>().is_err());
        assert!("content_editor".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_implies_all_permissions() {
        assert!(Role::Admin.implies_all_permissions());
        assert!(!Role::ContentEditor.implies_all_permissions());
        assert!(!Role::User.implies_all_permissions());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&Role::ContentEditor).unwrap();
        assert_eq!(json, "\"contentEditor\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
