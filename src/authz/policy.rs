//! Row-level data-access policy for documents and owner registrations, plus
//! the administrative rules for reviewing registrations and editing actors.
//!
//! The table below is the single source of truth. Several rules may exist for
//! one (resource, action) pair; any matching rule allows the action.

use super::actor::Actor;
use super::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Document,
    OwnerRegistration,
    Actor,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Document => "document",
            ResourceKind::OwnerRegistration => "owner_registration",
            ResourceKind::Actor => "actor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Update,
    Delete,
    /// Approve or reject a pending registration.
    Review,
}

/// The record a decision is about, carrying only the attributes rules look at.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Document,
    OwnerRegistration { email: &'a str },
    /// Another actor's role and permission set.
    Actor,
}

impl Resource<'_> {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Document => ResourceKind::Document,
            Resource::OwnerRegistration { .. } => ResourceKind::OwnerRegistration,
            Resource::Actor => ResourceKind::Actor,
        }
    }

    fn owner_email(&self) -> Option<&str> {
        match self {
            Resource::Document | Resource::Actor => None,
            Resource::OwnerRegistration { email } => Some(email),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Authenticated,
    RoleIn(&'static [Role]),
    /// Actor email equals the record's email.
    OwnerEmail,
}

impl Rule {
    fn admits(&self, actor: &Actor, resource: &Resource<'_>) -> bool {
        match self {
            Rule::Authenticated => true,
            Rule::RoleIn(roles) => roles.contains(&actor.role),
            Rule::OwnerEmail => resource
                .owner_email()
                .is_some_and(|email| actor.owns_email(email)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyRule {
    pub name: &'static str,
    pub resource: ResourceKind,
    pub action: Action,
    pub rule: Rule,
}

const EDITORS: &[Role] = &[Role::Admin, Role::ContentEditor];
const ADMINS: &[Role] = &[Role::Admin];

pub const POLICIES: &[PolicyRule] = &[
    PolicyRule { name: "documents_view_authenticated", resource: ResourceKind::Document, action: Action::View, rule: Rule::Authenticated },
    PolicyRule { name: "documents_create_editors", resource: ResourceKind::Document, action: Action::Create, rule: Rule::RoleIn(EDITORS) },
    PolicyRule { name: "documents_update_editors", resource: ResourceKind::Document, action: Action::Update, rule: Rule::RoleIn(EDITORS) },
    PolicyRule { name: "documents_delete_editors", resource: ResourceKind::Document, action: Action::Delete, rule: Rule::RoleIn(EDITORS) },
    PolicyRule { name: "registrations_view_own", resource: ResourceKind::OwnerRegistration, action: Action::View, rule: Rule::OwnerEmail },
    PolicyRule { name: "registrations_view_admin", resource: ResourceKind::OwnerRegistration, action: Action::View, rule: Rule::RoleIn(ADMINS) },
    PolicyRule { name: "registrations_create_own", resource: ResourceKind::OwnerRegistration, action: Action::Create, rule: Rule::OwnerEmail },
    PolicyRule { name: "registrations_update_own", resource: ResourceKind::OwnerRegistration, action: Action::Update, rule: Rule::OwnerEmail },
    PolicyRule { name: "registrations_update_admin", resource: ResourceKind::OwnerRegistration, action: Action::Update, rule: Rule::RoleIn(ADMINS) },
    PolicyRule { name: "registrations_delete_admin", resource: ResourceKind::OwnerRegistration, action: Action::Delete, rule: Rule::RoleIn(ADMINS) },
    PolicyRule { name: "registrations_review_admin", resource: ResourceKind::OwnerRegistration, action: Action::Review, rule: Rule::RoleIn(ADMINS) },
    PolicyRule { name: "actors_view_admin", resource: ResourceKind::Actor, action: Action::View, rule: Rule::RoleIn(ADMINS) },
    PolicyRule { name: "actors_update_admin", resource: ResourceKind::Actor, action: Action::Update, rule: Rule::RoleIn(ADMINS) },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

fn rules_for(kind: ResourceKind, action: Action) -> impl Iterator<Item = &'static PolicyRule> {
    POLICIES
        .iter()
        .filter(move |p| p.resource == kind && p.action == action)
}

pub fn evaluate(actor: Option<&Actor>, action: Action, resource: &Resource<'_>) -> Decision {
    let Some(actor) = actor else {
        return Decision::Deny;
    };

    if rules_for(resource.kind(), action).any(|p| p.rule.admits(actor, resource)) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Which owner registrations a listing may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewScope {
    All,
    OwnEmail(String),
    Nothing,
}

/// Derives the list filter for registrations from the view rules.
pub fn registration_view_scope(actor: Option<&Actor>) -> ViewScope {
    let Some(actor) = actor else {
        return ViewScope::Nothing;
    };

    let mut own = false;
    for policy in rules_for(ResourceKind::OwnerRegistration, Action::View) {
        match policy.rule {
            Rule::Authenticated => return ViewScope::All,
            Rule::RoleIn(roles) if roles.contains(&actor.role) => return ViewScope::All,
            Rule::RoleIn(_) => {}
            Rule::OwnerEmail => own = true,
        }
    }

    if own && !actor.email.is_empty() {
        ViewScope::OwnEmail(actor.email.clone())
    } else {
        ViewScope::Nothing
    }
}
