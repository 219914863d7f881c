use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::events::Loggable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentCategory {
    Bylaws,
    Minutes,
    Financial,
    Notices,
    Forms,
    #[default]
    General,
}

impl DocumentCategory {
    pub const ALL: [DocumentCategory; 6] = [
        DocumentCategory::Bylaws,
        DocumentCategory::Minutes,
        DocumentCategory::Financial,
        DocumentCategory::Notices,
        DocumentCategory::Forms,
        DocumentCategory::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::Bylaws => "bylaws",
            DocumentCategory::Minutes => "minutes",
            DocumentCategory::Financial => "financial",
            DocumentCategory::Notices => "notices",
            DocumentCategory::Forms => "forms",
            DocumentCategory::General => "general",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown document category: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: DocumentCategory,
    /// Opaque reference into the hosted file store.
    pub storage_path: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loggable for Document {
    fn entity_type() -> &'static str { "document" }
    fn subject_id(&self) -> Uuid { self.id }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DocumentCreateRequest {
    #[schema(example = "2025 Annual Budget")]
    pub title: String,
    #[schema(example = "Approved at the March general meeting.")]
    pub description: Option<String>,
    pub category: Option<DocumentCategory>,
    #[schema(example = "documents/2025/budget.pdf")]
    pub storage_path: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DocumentUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<DocumentCategory>,
    pub storage_path: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DocumentQuery {
    /// Only return documents in this category
    pub category: Option<DocumentCategory>,
}
