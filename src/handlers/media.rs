use super::AppState;
use crate::error::ApiError;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio::fs;
use tokio_util::io::ReaderStream;

pub async fn serve_profile_image(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response, ApiError> {
    // No traversal out of the media directory.
    if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
        return Err(ApiError::NotFound("File"));
    }

    let path = state.media_dir.join("profile_images").join(&file_name);
    let file = fs::File::open(&path)
        .await
        .map_err(|_| ApiError::NotFound("File"))?;

    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);
    let mime_type = mime_guess::from_path(&path).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type.as_ref())
        .header(header::CACHE_CONTROL, "public, max-age=31536000")
        .body(body)
        .map_err(|_| ApiError::Unexpected)
}
