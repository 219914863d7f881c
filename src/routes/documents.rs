use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{Action, Resource};
use crate::db::row_parsers::document_from_row;
use crate::errors::{AppError, AppResult};
use crate::events::{log_activity, RequestContext};
use crate::jwt::CurrentActor;
use crate::models::document::{Document, DocumentCreateRequest, DocumentQuery, DocumentUpdateRequest};
use crate::utils::utc_now;

const DOCUMENT_COLUMNS: &str =
    "id, title, description, category, storage_path, owner_id, created_at, updated_at";

fn authorize(state: &AppState, current: &CurrentActor, action: Action) -> AppResult<()> {
    if state
        .evaluator
        .decide(Some(&current.actor), action, &Resource::Document)
        .is_allowed()
    {
        Ok(())
    } else {
        Err(AppError::access_denied())
    }
}

#[utoipa::path(
    get,
    path = "/documents",
    tag = "Documents",
    params(DocumentQuery),
    responses((status = 200, description = "List documents", body = [Document])),
    security(("bearerAuth" = []))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    current: CurrentActor,
    Query(query): Query<DocumentQuery>,
) -> AppResult<Json<Vec<Document>>> {
    authorize(&state, &current, Action::View)?;

    let rows = match query.category {
        Some(category) => {
            let sql = format!(
                "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE category = ? ORDER BY created_at DESC"
            );
            sqlx::query(&sql)
                .bind(category.as_str())
                .fetch_all(&state.pool)
                .await?
        }
        None => {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents ORDER BY created_at DESC");
            sqlx::query(&sql).fetch_all(&state.pool).await?
        }
    };

    let documents = rows
        .iter()
        .map(document_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(documents))
}

#[utoipa::path(
    post,
    path = "/documents",
    tag = "Documents",
    request_body = DocumentCreateRequest,
    responses(
        (status = 201, description = "Document created", body = Document),
        (status = 403, description = "Caller is not a content editor"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn create_document(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Json(payload): Json<DocumentCreateRequest>,
) -> AppResult<(StatusCode, Json<Document>)> {
    authorize(&state, &current, Action::Create)?;

    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }

    let now = utc_now().to_rfc3339();
    let id = Uuid::new_v4();
    let category = payload.category.unwrap_or_default();

    sqlx::query(
        "INSERT INTO documents (id, title, description, category, storage_path, owner_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(category.as_str())
    .bind(&payload.storage_path)
    .bind(current.actor.id.to_string())
    .bind(&now)
    .bind(&now)
    .execute(&state.pool)
    .await?;

    let document = fetch_document(&state.pool, id).await?;

    log_activity(
        &state.event_bus,
        "created",
        Some(current.actor.id),
        &document,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    get,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document detail", body = Document),
        (status = 404, description = "Document not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_document(
    State(state): State<AppState>,
    current: CurrentActor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Document>> {
    authorize(&state, &current, Action::View)?;
    Ok(Json(fetch_document(&state.pool, id).await?))
}

#[utoipa::path(
    put,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    request_body = DocumentUpdateRequest,
    responses(
        (status = 200, description = "Document updated", body = Document),
        (status = 403, description = "Caller is not a content editor"),
        (status = 404, description = "Document not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn update_document(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(payload): Json<DocumentUpdateRequest>,
) -> AppResult<Json<Document>> {
    authorize(&state, &current, Action::Update)?;

    let old = fetch_document(&state.pool, id).await?;
    let mut document = old.clone();

    if let Some(title) = payload.title.as_ref() {
        if title.trim().is_empty() {
            return Err(AppError::bad_request("title must not be empty"));
        }
        document.title = title.trim().to_string();
    }
    if payload.description.is_some() {
        document.description = payload.description.clone();
    }
    if let Some(category) = payload.category {
        document.category = category;
    }
    if payload.storage_path.is_some() {
        document.storage_path = payload.storage_path.clone();
    }

    let now = utc_now();
    let affected = sqlx::query(
        "UPDATE documents SET title = ?, description = ?, category = ?, storage_path = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&document.title)
    .bind(&document.description)
    .bind(document.category.as_str())
    .bind(&document.storage_path)
    .bind(now.to_rfc3339())
    .bind(id.to_string())
    .execute(&state.pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("document not found"));
    }
    document.updated_at = now;

    log_activity(
        &state.event_bus,
        "updated",
        Some(current.actor.id),
        &document,
        Some(&old),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Json(document))
}

#[utoipa::path(
    delete,
    path = "/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 403, description = "Caller is not a content editor"),
        (status = 404, description = "Document not found"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    current: CurrentActor,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    authorize(&state, &current, Action::Delete)?;

    let document = fetch_document(&state.pool, id).await?;

    let affected = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id.to_string())
        .execute(&state.pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::not_found("document not found"));
    }

    log_activity(
        &state.event_bus,
        "deleted",
        Some(current.actor.id),
        &document,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_document(pool: &SqlitePool, id: Uuid) -> AppResult<Document> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?");
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("document not found"))?;

    Ok(document_from_row(&row)?)
}
