use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::events::{Loggable, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("registration already {0}")]
pub struct InvalidTransition(pub RegistrationStatus);

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "pending",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
        }
    }

    /// Only pending registrations can be reviewed; approved and rejected are terminal.
    pub fn review(self, decision: ReviewDecision) -> Result<Self, InvalidTransition> {
        match (self, decision) {
            (RegistrationStatus::Pending, ReviewDecision::Approve) => Ok(RegistrationStatus::Approved),
            (RegistrationStatus::Pending, ReviewDecision::Reject) => Ok(RegistrationStatus::Rejected),
            (terminal, _) => Err(InvalidTransition(terminal)),
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RegistrationStatus::Pending),
            "approved" => Ok(RegistrationStatus::Approved),
            "rejected" => Ok(RegistrationStatus::Rejected),
            other => Err(format!("unknown registration status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnerRegistration {
    pub id: Uuid,
    #[schema(example = "owner@example.com")]
    pub email: String,
    pub full_name: String,
    pub unit_number: String,
    pub phone: Option<String>,
    pub status: RegistrationStatus,
    pub review_note: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for OwnerRegistration {
    fn entity_type() -> &'static str { "registration" }
    fn subject_id(&self) -> Uuid { self.id }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "approved" | "rejected" | "deleted" => Severity::Critical,
            _ => self.severity(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegistrationCreateRequest {
    /// Defaults to the caller's own email; any other value is refused.
    #[schema(example = "owner@example.com")]
    pub email: Option<String>,
    #[schema(example = "Ada Lovelace")]
    pub full_name: String,
    #[schema(example = "12B")]
    pub unit_number: String,
    #[schema(example = "+15550100")]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegistrationUpdateRequest {
    pub full_name: Option<String>,
    pub unit_number: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReviewRequest {
    #[schema(example = "Deed verified")]
    pub note: Option<String>,
}
