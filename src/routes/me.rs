use axum::Json;

use crate::errors::AppResult;
use crate::jwt::CurrentActor;
use crate::models::actor::ActorRecord;

#[utoipa::path(
    get,
    path = "/me",
    tag = "Actors",
    responses(
        (status = 200, description = "Current actor with role and explicit permissions", body = ActorRecord),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(current: CurrentActor) -> AppResult<Json<ActorRecord>> {
    Ok(Json(current.record))
}
