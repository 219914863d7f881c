use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{permissions, Action, Resource};
use crate::db::row_parsers::audit_entry_from_row;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, RequestContext};
use crate::jwt::CurrentActor;
use crate::models::actor::{ActorMutationResponse, ActorRecord, GrantPermissionRequest, SetRoleRequest};
use crate::models::audit::{AuditLogEntry, AuditLogQuery};
use crate::services::MutationOutcome;
use crate::store::ActorStore;

const DEFAULT_AUDIT_LIMIT: i64 = 100;
const MAX_AUDIT_LIMIT: i64 = 500;

fn authorize(state: &AppState, current: &CurrentActor, action: Action) -> AppResult<()> {
    if state
        .evaluator
        .decide(Some(&current.actor), action, &Resource::Actor)
        .is_allowed()
    {
        Ok(())
    } else {
        Err(AppError::access_denied())
    }
}

async fn load_actor(state: &AppState, id: Uuid) -> AppResult<ActorRecord> {
    state
        .actors
        .find_actor(id)
        .await?
        .ok_or_else(|| AppError::not_found("actor not found"))
}

fn respond(
    state: &AppState,
    current: &CurrentActor,
    headers: &HeaderMap,
    action: &str,
    outcome: MutationOutcome,
) -> Json<ActorMutationResponse> {
    let changed = outcome.is_changed();
    if changed {
        log_activity(
            &state.event_bus,
            action,
            Some(current.actor.id),
            outcome.record(),
            outcome.previous(),
            Some(RequestContext::from_headers(headers)),
        );
    }

    Json(ActorMutationResponse {
        changed,
        actor: outcome.into_record(),
    })
}

#[utoipa::path(
    get,
    path = "/admin/actors/{id}",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Actor id")),
    responses(
        (status = 200, description = "Actor detail", body = ActorRecord),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Actor not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_actor(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActorRecord>> {
    authorize(&state, &current, Action::View)?;
    Ok(Json(load_actor(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/admin/actors/{id}/permissions",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Actor id")),
    request_body = GrantPermissionRequest,
    responses(
        (status = 200, description = "Permission granted or already present", body = ActorMutationResponse),
        (status = 400, description = "Unknown permission"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Actor not found"),
        (status = 409, description = "Actor kept changing underneath the request"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn grant_permission(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<GrantPermissionRequest>,
) -> AppResult<Json<ActorMutationResponse>> {
    authorize(&state, &current, Action::Update)?;

    let outcome = state.permissions.grant_permission(id, payload.permission.trim()).await?;

    Ok(respond(&state, &current, &headers, "permission_granted", outcome))
}

#[utoipa::path(
    delete,
    path = "/admin/actors/{id}/permissions/{permission}",
    tag = "Admin",
    params(
        ("id" = Uuid, Path, description = "Actor id"),
        ("permission" = String, Path, description = "Permission name"),
    ),
    responses(
        (status = 200, description = "Permission revoked or already absent", body = ActorMutationResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Actor not found"),
        (status = 409, description = "Actor kept changing underneath the request"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn revoke_permission(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path((id, permission)): Path<(Uuid, String)>,
) -> AppResult<Json<ActorMutationResponse>> {
    authorize(&state, &current, Action::Update)?;

    let outcome = state.permissions.revoke_permission(id, permission.trim()).await?;

    Ok(respond(&state, &current, &headers, "permission_revoked", outcome))
}

#[utoipa::path(
    put,
    path = "/admin/actors/{id}/role",
    tag = "Admin",
    params(("id" = Uuid, Path, description = "Actor id")),
    request_body = SetRoleRequest,
    responses(
        (status = 200, description = "Role set", body = ActorMutationResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Actor not found"),
        (status = 409, description = "Actor kept changing underneath the request"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn set_role(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetRoleRequest>,
) -> AppResult<Json<ActorMutationResponse>> {
    authorize(&state, &current, Action::Update)?;

    let outcome = state.permissions.set_role(id, payload.role).await?;

    Ok(respond(&state, &current, &headers, "role_changed", outcome))
}

#[utoipa::path(
    get,
    path = "/admin/audit-logs",
    tag = "Admin",
    params(AuditLogQuery),
    responses(
        (status = 200, description = "Most recent audit entries first", body = [AuditLogEntry]),
        (status = 403, description = "Caller lacks viewAuditLogs"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_audit_logs(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    if !state.evaluator.can(&current.actor, permissions::VIEW_AUDIT_LOGS) {
        return Err(AppError::access_denied());
    }

    let limit = query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);

    let rows = sqlx::query(
        "SELECT id, event_name, actor_id, subject_id, occurred_at, severity, payload, prev_hash, hash FROM audit_log ORDER BY rowid DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    let entries = rows
        .iter()
        .map(audit_entry_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(entries))
}
