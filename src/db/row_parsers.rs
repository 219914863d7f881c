use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::authz::{PermissionSet, Role};
use crate::models::actor::ActorRecord;
use crate::models::audit::AuditLogEntry;
use crate::models::document::{Document, DocumentCategory};
use crate::models::registration::{OwnerRegistration, RegistrationStatus};
use crate::store::StoreError;

pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP format
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| StoreError::corrupt("invalid datetime: date out of range"))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(StoreError::corrupt(format!("invalid datetime: {}", s)))
}

fn parse_opt_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, StoreError> {
    match s {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_datetime(&s)?)),
        _ => Ok(None),
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s.trim()).map_err(|e| StoreError::corrupt(format!("invalid uuid: {}", e)))
}

fn parse_opt_uuid(s: Option<String>) -> Result<Option<Uuid>, StoreError> {
    match s {
        Some(s) if !s.trim().is_empty() => Ok(Some(parse_uuid(&s)?)),
        _ => Ok(None),
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::corrupt(format!("missing {}: {}", name, e)))
}

pub fn actor_from_row(row: &SqliteRow) -> Result<ActorRecord, StoreError> {
    let id: String = column(row, "id")?;
    let role: String = column(row, "role")?;
    let permissions: String = column(row, "permissions")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    let role = role
        .parse::<Role>()
        .map_err(|e| StoreError::corrupt(e.to_string()))?;
    let permissions: PermissionSet = serde_json::from_str(&permissions)
        .map_err(|e| StoreError::corrupt(format!("invalid permissions json: {}", e)))?;

    Ok(ActorRecord {
        id: parse_uuid(&id)?,
        email: column(row, "email")?,
        display_name: column(row, "display_name")?,
        role,
        permissions,
        version: column(row, "version")?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

pub fn document_from_row(row: &SqliteRow) -> Result<Document, StoreError> {
    let id: String = column(row, "id")?;
    let owner_id: String = column(row, "owner_id")?;
    let category: String = column(row, "category")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(Document {
        id: parse_uuid(&id)?,
        title: column(row, "title")?,
        description: column(row, "description")?,
        category: category
            .parse::<DocumentCategory>()
            .map_err(StoreError::Corrupt)?,
        storage_path: column(row, "storage_path")?,
        owner_id: parse_uuid(&owner_id)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

pub fn registration_from_row(row: &SqliteRow) -> Result<OwnerRegistration, StoreError> {
    let id: String = column(row, "id")?;
    let status: String = column(row, "status")?;
    let created_at: String = column(row, "created_at")?;
    let updated_at: String = column(row, "updated_at")?;

    Ok(OwnerRegistration {
        id: parse_uuid(&id)?,
        email: column(row, "email")?,
        full_name: column(row, "full_name")?,
        unit_number: column(row, "unit_number")?,
        phone: column(row, "phone")?,
        status: status
            .parse::<RegistrationStatus>()
            .map_err(StoreError::Corrupt)?,
        review_note: column(row, "review_note")?,
        reviewed_by: parse_opt_uuid(column(row, "reviewed_by")?)?,
        reviewed_at: parse_opt_datetime(column(row, "reviewed_at")?)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

pub fn audit_entry_from_row(row: &SqliteRow) -> Result<AuditLogEntry, StoreError> {
    let id: String = column(row, "id")?;
    let occurred_at: String = column(row, "occurred_at")?;
    let payload: String = column(row, "payload")?;

    Ok(AuditLogEntry {
        id: parse_uuid(&id)?,
        event_name: column(row, "event_name")?,
        actor_id: parse_opt_uuid(column(row, "actor_id")?)?,
        subject_id: parse_opt_uuid(column(row, "subject_id")?)?,
        occurred_at: parse_datetime(&occurred_at)?,
        severity: column(row, "severity")?,
        payload: serde_json::from_str(&payload)
            .map_err(|e| StoreError::corrupt(format!("invalid audit payload: {}", e)))?,
        prev_hash: column(row, "prev_hash")?,
        hash: column(row, "hash")?,
    })
}
