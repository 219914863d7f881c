//! Owner registration routes.
//!
//! Visibility follows the row policy. A denied read or write reports the same
//! 404 as a missing record, and listings are silently filtered.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::policy::registration_view_scope;
use crate::authz::{Action, Resource, ViewScope};
use crate::db::row_parsers::registration_from_row;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, RequestContext};
use crate::jwt::CurrentActor;
use crate::models::registration::{
    OwnerRegistration, RegistrationCreateRequest, RegistrationStatus, RegistrationUpdateRequest,
    ReviewDecision, ReviewRequest,
};
use crate::utils::{normalize_email, utc_now};

const REGISTRATION_COLUMNS: &str = "id, email, full_name, unit_number, phone, status, review_note, reviewed_by, reviewed_at, created_at, updated_at";

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct RegistrationQuery {
    /// Only return registrations in this status
    pub status: Option<RegistrationStatus>,
}

fn allowed(state: &AppState, current: &CurrentActor, action: Action, registration: &OwnerRegistration) -> bool {
    state
        .evaluator
        .decide(
            Some(&current.actor),
            action,
            &Resource::OwnerRegistration { email: &registration.email },
        )
        .is_allowed()
}

/// A denied write behaves as if no row matched.
fn hidden() -> AppError {
    AppError::not_found("registration not found")
}

#[utoipa::path(
    get,
    path = "/registrations",
    tag = "Registrations",
    params(RegistrationQuery),
    responses((status = 200, description = "Registrations visible to the caller", body = [OwnerRegistration])),
    security(("bearerAuth" = []))
)]
pub async fn list_registrations(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(query): Query<RegistrationQuery>,
) -> AppResult<Json<Vec<OwnerRegistration>>> {
    let mut sql = format!("SELECT {REGISTRATION_COLUMNS} FROM owner_registrations WHERE 1 = 1");
    let mut binds: Vec<String> = Vec::new();

    match registration_view_scope(Some(&current.actor)) {
        ViewScope::All => {}
        ViewScope::OwnEmail(email) => {
            sql.push_str(" AND email = ?");
            binds.push(email);
        }
        ViewScope::Nothing => return Ok(Json(Vec::new())),
    }

    if let Some(status) = query.status {
        sql.push_str(" AND status = ?");
        binds.push(status.as_str().to_string());
    }
    sql.push_str(" ORDER BY created_at DESC");

    let mut q = sqlx::query(&sql);
    for value in &binds {
        q = q.bind(value);
    }
    let rows = q.fetch_all(&state.pool).await?;

    let registrations = rows
        .iter()
        .map(registration_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(registrations))
}

#[utoipa::path(
    post,
    path = "/registrations",
    tag = "Registrations",
    request_body = RegistrationCreateRequest,
    responses(
        (status = 201, description = "Registration submitted", body = OwnerRegistration),
        (status = 403, description = "Email does not belong to the caller"),
        (status = 409, description = "An open or approved registration already exists"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Json(payload): Json<RegistrationCreateRequest>,
) -> AppResult<(StatusCode, Json<OwnerRegistration>)> {
    let email = payload
        .email
        .as_deref()
        .map(normalize_email)
        .unwrap_or_else(|| current.actor.email.clone());

    let decision = state.evaluator.decide(
        Some(&current.actor),
        Action::Create,
        &Resource::OwnerRegistration { email: &email },
    );
    if !decision.is_allowed() {
        return Err(AppError::access_denied());
    }

    if payload.full_name.trim().is_empty() || payload.unit_number.trim().is_empty() {
        return Err(AppError::bad_request("full_name and unit_number are required"));
    }

    ensure_no_open_registration(&state.pool, &email).await?;

    let id = Uuid::new_v4();
    let now = utc_now().to_rfc3339();

    sqlx::query(
        "INSERT INTO owner_registrations (id, email, full_name, unit_number, phone, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(&email)
    .bind(payload.full_name.trim())
    .bind(payload.unit_number.trim())
    .bind(&payload.phone)
    .bind(RegistrationStatus::Pending.as_str())
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await?;

    let registration = fetch_registration(&state.pool, id).await?;

    log_activity(
        &state.event_bus,
        "created",
        Some(current.actor.id),
        &registration,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(registration)))
}

#[utoipa::path(
    get,
    path = "/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Registration detail", body = OwnerRegistration),
        (status = 404, description = "Registration not found or not visible"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<OwnerRegistration>> {
    let registration = fetch_registration(&state.pool, id).await?;
    if !allowed(&state, &current, Action::View, &registration) {
        return Err(hidden());
    }
    Ok(Json(registration))
}

#[utoipa::path(
    put,
    path = "/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration id")),
    request_body = RegistrationUpdateRequest,
    responses(
        (status = 200, description = "Registration updated", body = OwnerRegistration),
        (status = 404, description = "Registration not found or not visible"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<RegistrationUpdateRequest>,
) -> AppResult<Json<OwnerRegistration>> {
    let old = fetch_registration(&state.pool, id).await?;
    if !allowed(&state, &current, Action::Update, &old) {
        return Err(hidden());
    }

    let mut registration = old.clone();
    if let Some(full_name) = payload.full_name.as_ref() {
        registration.full_name = full_name.trim().to_string();
    }
    if let Some(unit_number) = payload.unit_number.as_ref() {
        registration.unit_number = unit_number.trim().to_string();
    }
    if payload.phone.is_some() {
        registration.phone = payload.phone.clone();
    }
    if registration.full_name.is_empty() || registration.unit_number.is_empty() {
        return Err(AppError::bad_request("full_name and unit_number are required"));
    }

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE owner_registrations SET full_name = ?, unit_number = ?, phone = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&registration.full_name)
    .bind(&registration.unit_number)
    .bind(&registration.phone)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("registration not found"));
    }
    registration.updated_at = now;

    log_activity(
        &state.event_bus,
        "updated",
        Some(current.actor.id),
        &registration,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(registration))
}

#[utoipa::path(
    delete,
    path = "/registrations/{id}",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration id")),
    responses(
        (status = 204, description = "Registration deleted"),
        (status = 404, description = "Registration not found or caller is not an admin"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let registration = fetch_registration(&state.pool, id).await?;
    if !allowed(&state, &current, Action::Delete, &registration) {
        return Err(hidden());
    }

    let affected = sqlx::query("DELETE FROM owner_registrations WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("registration not found"));
    }

    log_activity(
        &state.event_bus,
        "deleted",
        Some(current.actor.id),
        &registration,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/registrations/{id}/approve",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Registration approved", body = OwnerRegistration),
        (status = 404, description = "Registration not found or caller is not an admin"),
        (status = 409, description = "Registration already reviewed"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn approve_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> AppResult<Json<OwnerRegistration>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    review(&state, &current, &headers, id, ReviewDecision::Approve, payload).await
}

#[utoipa::path(
    post,
    path = "/registrations/{id}/reject",
    tag = "Registrations",
    params(("id" = Uuid, Path, description = "Registration id")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Registration rejected", body = OwnerRegistration),
        (status = 404, description = "Registration not found or caller is not an admin"),
        (status = 409, description = "Registration already reviewed"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn reject_registration(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> AppResult<Json<OwnerRegistration>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    review(&state, &current, &headers, id, ReviewDecision::Reject, payload).await
}

/// Status changes go through the review rule, which owners never match.
async fn review(
    state: &AppState,
    current: &CurrentActor,
    headers: &HeaderMap,
    id: Uuid,
    decision: ReviewDecision,
    payload: ReviewRequest,
) -> AppResult<Json<OwnerRegistration>> {
    let old = fetch_registration(&state.pool, id).await?;
    if !allowed(state, current, Action::Review, &old) {
        return Err(hidden());
    }

    let status = old
        .status
        .review(decision)
        .map_err(|e| AppError::conflict(e.to_string()))?;

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE owner_registrations SET status = ?, review_note = ?, reviewed_by = ?, reviewed_at = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(status.as_str())
    .bind(&payload.note)
    .bind(current.actor.id.to_string())
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .bind(RegistrationStatus::Pending.as_str())
    .execute(&state.pool)
    .await?;

    // lost a race with another reviewer
    if affected.rows_affected() == 0 {
        return Err(AppError::conflict("registration already reviewed"));
    }

    let registration = fetch_registration(&state.pool, id).await?;

    log_activity(
        &state.event_bus,
        status.as_str(),
        Some(current.actor.id),
        &registration,
        Some(&old),
        Some(RequestContext::from_headers(headers)),
    );

    Ok(Json(registration))
}

async fn ensure_no_open_registration(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(1) FROM owner_registrations WHERE email = ? AND status IN ('pending', 'approved')",
    )
    .bind(email)
    .fetch_one(pool)
    .await?;

    if count > 0 {
        return Err(AppError::conflict("a registration for this email is already open or approved"));
    }

    Ok(())
}

async fn fetch_registration(pool: &SqlitePool, id: Uuid) -> AppResult<OwnerRegistration> {
    let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM owner_registrations WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("registration not found"))?;

    Ok(registration_from_row(&row)?)
}
