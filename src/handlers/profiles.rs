use super::AppState;
use crate::error::ApiError;
use crate::profiles::{self, ProfileInput};
use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use base64::Engine;
use serde_json::json;
use std::path::Path as FsPath;

pub async fn get_profile(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    let profile = profiles::get_profile(&conn, &uid)?;
    Ok(Json(json!({
        "status": "success",
        "profile": profile,
    })))
}

/// Upsert keyed on `uid`. Accepts JSON or multipart; `profile_image` may be
/// a base64 data URL, an already-stored `/media/` path (left untouched), or
/// a multipart file part.
pub async fn save_profile(
    State(state): State<AppState>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let (input, upload) = if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| ApiError::validation("Invalid multipart body"))?;
        read_multipart(multipart).await?
    } else {
        let Json(input) = Json::<ProfileInput>::from_request(request, &())
            .await
            .map_err(|_| ApiError::validation("Invalid request body"))?;
        (input, None)
    };

    let uid = input
        .uid
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::validation("UID is required"))?;

    let image_path = store_image(&state, &uid, input.profile_image.as_deref(), upload).await?;

    let conn = state.db.lock().await;
    let profile = profiles::upsert_profile(&conn, input, image_path)?;
    tracing::info!(%uid, "profile saved");
    Ok(Json(json!({
        "status": "success",
        "message": "Profile saved successfully",
        "profile": profile,
    })))
}

struct ImageUpload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_multipart(
    mut multipart: Multipart,
) -> Result<(ProfileInput, Option<ImageUpload>), ApiError> {
    let mut input = ProfileInput::default();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Invalid multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "profile_image" {
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation("Invalid profile image upload"))?;
                upload = Some(ImageUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
                continue;
            }
        }
        let value = field
            .text()
            .await
            .map_err(|_| ApiError::validation("Invalid multipart body"))?;
        match name.as_str() {
            "uid" => input.uid = Some(value),
            "first_name" => input.first_name = Some(value),
            "last_name" => input.last_name = Some(value),
            "email" => input.email = Some(value),
            "phone_number" => input.phone_number = Some(value),
            "dob" => {
                input.dob = Some(
                    value
                        .parse()
                        .map_err(|_| ApiError::validation("Invalid date of birth"))?,
                )
            }
            "qualification" => input.qualification = Some(value),
            "address" => input.address = Some(value),
            "bio" => input.bio = Some(value),
            "role" => input.role = Some(value),
            "profile_image" => input.profile_image = Some(value),
            _ => {}
        }
    }
    Ok((input, upload))
}

/// Resolves the incoming image to a stored `/media/` path, or None when the
/// profile's existing image should be kept.
async fn store_image(
    state: &AppState,
    uid: &str,
    image_field: Option<&str>,
    upload: Option<ImageUpload>,
) -> Result<Option<String>, ApiError> {
    let (ext, bytes) = if let Some(upload) = upload {
        let ext = extension_of(&upload.file_name);
        (ext, upload.bytes)
    } else {
        match image_field {
            Some(value) if value.starts_with("data:image") => {
                let (header, encoded) = value
                    .split_once(";base64,")
                    .ok_or_else(|| ApiError::validation("Invalid profile image encoding"))?;
                let ext = header.rsplit('/').next().unwrap_or("png").to_string();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded)
                    .map_err(|_| ApiError::validation("Invalid profile image encoding"))?;
                (ext, bytes)
            }
            // An existing /media/ path or anything else leaves the stored
            // image untouched.
            _ => return Ok(None),
        }
    };

    let dir = state.media_dir.join("profile_images");
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|_| ApiError::Unexpected)?;
    let file_name = format!("profile_{uid}.{ext}");
    tokio::fs::write(dir.join(&file_name), bytes)
        .await
        .map_err(|_| ApiError::Unexpected)?;
    Ok(Some(format!("/media/profile_images/{file_name}")))
}

fn extension_of(file_name: &str) -> String {
    FsPath::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase()
}
