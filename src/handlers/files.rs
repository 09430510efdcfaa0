use super::AppState;
use crate::error::ApiError;
use crate::files::{self, FileQuery, FileUpdate, NewFile};
use crate::models::{Actor, FileAccess, PermissionSet};
use crate::permissions::actor_can;
use crate::profiles;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct RoleQuery {
    user_role: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateFileRequest {
    user_role: Option<String>,
    #[serde(flatten)]
    file: NewFile,
}

#[derive(Deserialize)]
pub struct UpdateFileRequest {
    user_role: Option<String>,
    #[serde(flatten)]
    update: FileUpdate,
}

#[derive(Deserialize)]
pub struct PermissionsRequest {
    permissions: PermissionSet,
}

#[derive(Deserialize)]
pub struct RollbackRequest {
    version: Option<u32>,
}

pub async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role.clone());
    let conn = state.db.lock().await;
    let files = files::list_files(&conn, &actor, &query)?;
    Ok(Json(files))
}

pub async fn create_file(
    State(state): State<AppState>,
    Json(request): Json<CreateFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(request.user_role);
    let conn = state.db.lock().await;
    if let Some(uid) = &request.file.uid {
        profiles::get_profile(&conn, uid)?;
    }
    let file = files::create_file(&conn, &actor, request.file)?;
    tracing::info!(file_id = %file.id, name = %file.name, "file created");
    Ok((StatusCode::CREATED, Json(file)))
}

/// A file the caller's role cannot read is indistinguishable from a missing
/// one, matching the original's visibility-scoped queryset.
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    let file = files::get_file(&conn, file_id)?;
    if !actor.is_admin() && !actor_can(&actor, FileAccess::Read, &file.permissions) {
        return Err(ApiError::NotFound("File"));
    }
    Ok(Json(file))
}

pub async fn update_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Json(request): Json<UpdateFileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(request.user_role);
    let conn = state.db.lock().await;
    let file = files::update_file(&conn, file_id, &actor, request.update)?;
    tracing::info!(file_id = %file.id, "file updated");
    Ok(Json(file))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    files::delete_file(&conn, file_id, &actor)?;
    tracing::info!(%file_id, "file deleted");
    Ok(Json(json!({
        "status": "success",
        "message": "File deleted successfully",
    })))
}

pub async fn update_permissions(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<RoleQuery>,
    Json(request): Json<PermissionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    let permissions = files::update_permissions(&conn, file_id, &actor, request.permissions)?;
    Ok(Json(json!({
        "status": "success",
        "message": "Permissions updated successfully",
        "permissions": permissions,
    })))
}

pub async fn generate_share_link(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    let link = files::generate_share_link(&conn, file_id, &actor)?;
    tracing::info!(%file_id, link_id = %link.link_id, "share link generated");
    Ok(Json(json!({
        "status": "success",
        "message": "Share link generated successfully",
        "url": format!("/share/{}", link.link_id),
        "expires_at": link.expires_at,
    })))
}

pub async fn access_share_link(
    State(state): State<AppState>,
    Path((file_id, link_id)): Path<(Uuid, String)>,
    Query(query): Query<RoleQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    let file = files::access_share_link(&conn, file_id, &link_id, &actor)?;
    Ok(Json(json!({
        "status": "success",
        "message": "Share link accessed successfully",
        "file": file,
    })))
}

pub async fn rollback_file(
    State(state): State<AppState>,
    Path(file_id): Path<Uuid>,
    Query(query): Query<RoleQuery>,
    Json(request): Json<RollbackRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let actor = Actor::from_param(query.user_role);
    let conn = state.db.lock().await;
    let version = request.version;
    let file = files::rollback_file(&conn, file_id, &actor, version)?;
    tracing::info!(%file_id, version = version.unwrap_or_default(), "file rolled back");
    Ok(Json(json!({
        "status": "success",
        "message": format!("Successfully rolled back to version {}", version.unwrap_or_default()),
        "file": file,
    })))
}
