use super::AppState;
use crate::error::ApiError;
use crate::models::Quiz;
use crate::quizzes::{self, NewQuiz, QuizUpdate};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Deserialize)]
pub struct QuizQuery {
    uid: Option<String>,
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    Query(query): Query<QuizQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    let quizzes = quizzes::list_quizzes(&conn, query.uid.as_deref())?;
    Ok(Json(quizzes))
}

pub async fn create_quiz(
    State(state): State<AppState>,
    Json(new): Json<NewQuiz>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    let quiz = quizzes::create_quiz(&conn, new)?;
    tracing::info!(quiz_id = %quiz.id, "quiz created");
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Query(query): Query<QuizQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    let quiz = quizzes::get_quiz(&conn, quiz_id)?;
    scope_check(&quiz, query.uid.as_deref())?;
    Ok(Json(quiz))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    Path(quiz_id): Path<Uuid>,
    Query(query): Query<QuizQuery>,
    Json(update): Json<QuizUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    let quiz = quizzes::get_quiz(&conn, quiz_id)?;
    scope_check(&quiz, query.uid.as_deref())?;
    let quiz = quizzes::update_quiz(&conn, quiz_id, update)?;
    tracing::info!(quiz_id = %quiz.id, "quiz updated");
    Ok(Json(quiz))
}

/// A quiz is only visible within its owner scope: a caller with a uid sees
/// their own quizzes, a caller without one sees unowned quizzes. Anything
/// else reads as absent.
fn scope_check(quiz: &Quiz, uid: Option<&str>) -> Result<(), ApiError> {
    let visible = match uid {
        Some(uid) => quiz.user.as_deref() == Some(uid),
        None => quiz.user.is_none(),
    };
    if visible {
        Ok(())
    } else {
        Err(ApiError::NotFound("Quiz"))
    }
}
