use super::AppState;
use crate::error::ApiError;
use crate::files::{self, NewFile};
use crate::gateway::resolve_generation;
use crate::models::{Actor, PlanKind, Profile};
use crate::plans::{self, NewCurriculum, NewLessonPlan};
use crate::profiles;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

const CURRICULUM_SYSTEM: &str = "You are an expert curriculum designer.";
const STANDARD_CURRICULUM_SYSTEM: &str =
    "You are an expert curriculum designer specializing in standard academic curricula.";
const LESSON_PLAN_SYSTEM: &str = "You are an expert lesson plan designer.";

#[derive(Deserialize)]
pub struct CustomCurriculumRequest {
    uid: Option<String>,
    degree: Option<String>,
    subject: Option<String>,
    topics: Option<String>,
}

#[derive(Deserialize)]
pub struct StandardCurriculumRequest {
    uid: Option<String>,
    degree: Option<String>,
    subject: Option<String>,
}

#[derive(Deserialize)]
pub struct LessonPlanRequest {
    uid: Option<String>,
    subject: Option<String>,
    topics: Option<String>,
    grade_level: Option<String>,
    duration: Option<String>,
}

pub async fn generate_custom_curriculum(
    State(state): State<AppState>,
    Json(request): Json<CustomCurriculumRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = require_uid(request.uid)?;
    let profile = lookup_profile(&state, &uid).await?;
    let (degree, subject, topics) =
        match (request.degree, request.subject, request.topics) {
            (Some(d), Some(s), Some(t)) if !d.is_empty() && !s.is_empty() && !t.is_empty() => {
                (d, s, t)
            }
            _ => {
                return Err(ApiError::validation(
                    "Degree, subject, and topics are required",
                ))
            }
        };

    let prompt = custom_curriculum_prompt(&degree, &subject, &topics);
    let result = state.gateway.generate(CURRICULUM_SYSTEM, &prompt).await;
    let content = resolve_generation(
        result,
        || custom_curriculum_fallback(&degree, &subject, &topics),
        "Failed to generate curriculum with OpenAI",
    )?;

    let conn = state.db.lock().await;
    let curriculum = plans::create_curriculum(
        &conn,
        NewCurriculum {
            user_uid: profile.uid.clone(),
            degree: degree.clone(),
            subject: subject.clone(),
            topics,
            generated_content: content.clone(),
            kind: PlanKind::Custom,
        },
    )?;
    let file_id = mirror_file(
        &conn,
        &profile,
        format!("{subject}_{degree}_curriculum.txt"),
        format!("Curriculum for {subject} - {degree}"),
        &content,
        "Curriculum",
    );

    tracing::info!(curriculum_id = %curriculum.id, "custom curriculum generated");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "curriculum": {
                "id": curriculum.id,
                "generated_content": content,
                "file_id": file_id,
            }
        })),
    ))
}

pub async fn generate_standard_curriculum(
    State(state): State<AppState>,
    Json(request): Json<StandardCurriculumRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = require_uid(request.uid)?;
    let profile = lookup_profile(&state, &uid).await?;
    let (degree, subject) = match (request.degree, request.subject) {
        (Some(d), Some(s)) if !d.is_empty() && !s.is_empty() => (d, s),
        _ => return Err(ApiError::validation("Degree and subject are required")),
    };

    let prompt = standard_curriculum_prompt(&degree, &subject);
    let result = state
        .gateway
        .generate(STANDARD_CURRICULUM_SYSTEM, &prompt)
        .await;
    let content = resolve_generation(
        result,
        || standard_curriculum_fallback(&degree, &subject),
        "Failed to generate curriculum with OpenAI",
    )?;

    let conn = state.db.lock().await;
    let curriculum = plans::create_curriculum(
        &conn,
        NewCurriculum {
            user_uid: profile.uid.clone(),
            degree: degree.clone(),
            subject: subject.clone(),
            topics: format!("Standard {subject} topics"),
            generated_content: content.clone(),
            kind: PlanKind::Standard,
        },
    )?;
    let file_id = mirror_file(
        &conn,
        &profile,
        format!("{subject}_{degree}_standard_curriculum.txt"),
        format!("Standard Curriculum for {subject} - {degree}"),
        &content,
        "Curriculum",
    );

    tracing::info!(curriculum_id = %curriculum.id, "standard curriculum generated");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "curriculum": {
                "id": curriculum.id,
                "generated_content": content,
                "file_id": file_id,
            }
        })),
    ))
}

pub async fn generate_lesson_plan(
    State(state): State<AppState>,
    Json(request): Json<LessonPlanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let uid = require_uid(request.uid)?;
    let profile = lookup_profile(&state, &uid).await?;
    let (subject, topics, grade_level) =
        match (request.subject, request.topics, request.grade_level) {
            (Some(s), Some(t), Some(g)) if !s.is_empty() && !t.is_empty() && !g.is_empty() => {
                (s, t, g)
            }
            _ => {
                return Err(ApiError::validation(
                    "Subject, topics, and grade level are required",
                ))
            }
        };
    let duration = request.duration.unwrap_or_else(|| "1 hour".to_string());

    let prompt = lesson_plan_prompt(&subject, &topics, &grade_level, &duration);
    let result = state.gateway.generate(LESSON_PLAN_SYSTEM, &prompt).await;
    let content = resolve_generation(
        result,
        || lesson_plan_fallback(&subject, &topics, &grade_level),
        "Failed to generate lesson plan with OpenAI",
    )?;

    let conn = state.db.lock().await;
    let plan = plans::create_lesson_plan(
        &conn,
        NewLessonPlan {
            user_uid: profile.uid.clone(),
            subject: subject.clone(),
            topics,
            grade_level: grade_level.clone(),
            duration,
            generated_content: content.clone(),
            kind: PlanKind::Custom,
        },
    )?;
    let file_id = mirror_file(
        &conn,
        &profile,
        format!("{subject}_{grade_level}_lesson_plan.txt"),
        format!("Lesson Plan for {subject} - {grade_level}"),
        &content,
        "Lesson Plan",
    );

    tracing::info!(lesson_plan_id = %plan.id, "lesson plan generated");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "lesson_plan": {
                "id": plan.id,
                "generated_content": content,
                "file_id": file_id,
            }
        })),
    ))
}

pub async fn get_user_curriculums(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    profiles::get_profile(&conn, &uid)?;
    let curriculums = plans::list_curriculums(&conn, &uid)?;
    Ok(Json(json!({
        "status": "success",
        "curriculums": curriculums,
    })))
}

pub async fn get_user_lesson_plans(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = state.db.lock().await;
    profiles::get_profile(&conn, &uid)?;
    let lesson_plans = plans::list_lesson_plans(&conn, &uid)?;
    Ok(Json(json!({
        "status": "success",
        "lesson_plans": lesson_plans,
    })))
}

fn require_uid(uid: Option<String>) -> Result<String, ApiError> {
    uid.filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::validation("UID is required"))
}

async fn lookup_profile(state: &AppState, uid: &str) -> Result<Profile, ApiError> {
    let conn = state.db.lock().await;
    profiles::get_profile(&conn, uid)
}

/// Best-effort mirror of generated content into the file manager. The
/// primary record stands even when this fails; the response then carries
/// `file_id: null`.
fn mirror_file(
    conn: &rusqlite::Connection,
    profile: &Profile,
    name: String,
    title: String,
    content: &str,
    category: &str,
) -> Option<Uuid> {
    let actor = Actor::new(profile.role.as_str());
    let result = files::create_file(
        conn,
        &actor,
        NewFile {
            uid: Some(profile.uid.clone()),
            name: Some(name),
            title: Some(title),
            file_type: Some("txt".into()),
            content: Some(content.to_string()),
            category: Some(category.to_string()),
            ..Default::default()
        },
    );
    match result {
        Ok(file) => Some(file.id),
        Err(err) => {
            tracing::warn!(error = %err, "failed to mirror generated content into the file manager");
            None
        }
    }
}

fn custom_curriculum_prompt(degree: &str, subject: &str, topics: &str) -> String {
    format!(
        "Generate a detailed curriculum for a {degree} degree focusing on the subject {subject}. \
         Include the following topics: {topics}. \
         Structure the curriculum with the following sections:\n\
         - Course Title\n\
         - Degree Overview\n\
         - Learning Objectives\n\
         - Course Modules (with detailed topics and subtopics)\n\
         - Assessments\n\
         - Resources\n\
         Ensure the curriculum is comprehensive and suitable for academic use."
    )
}

fn standard_curriculum_prompt(degree: &str, subject: &str) -> String {
    format!(
        "Generate a standard curriculum for a {degree} degree in the subject {subject}. \
         Base the curriculum on widely accepted academic standards. \
         Structure the curriculum with the following sections:\n\
         - Course Title\n\
         - Degree Overview\n\
         - Learning Objectives\n\
         - Course Modules (with detailed topics and subtopics)\n\
         - Assessments\n\
         - Resources\n\
         Ensure the curriculum is comprehensive, aligned with academic standards, and suitable for university use."
    )
}

fn lesson_plan_prompt(subject: &str, topics: &str, grade_level: &str, duration: &str) -> String {
    format!(
        "Generate a detailed lesson plan for a {grade_level} class focusing on the subject {subject}. \
         Include the following topics: {topics}. The lesson should last approximately {duration}. \
         Structure the lesson plan with the following sections:\n\
         - Lesson Title\n\
         - Subject Overview\n\
         - Learning Objectives\n\
         - Materials Needed\n\
         - Lesson Procedure (with time allocations for each activity)\n\
         - Assessments\n\
         - Resources (e.g., books, websites, worksheets)\n\
         Ensure the lesson plan is engaging, age-appropriate, and suitable for classroom use."
    )
}

fn custom_curriculum_fallback(degree: &str, subject: &str, topics: &str) -> String {
    format!(
        "Course Title\n\
         {subject} Curriculum for {degree}\n\n\
         Degree Overview\n\
         This curriculum introduces key concepts for {degree} students...\n\n\
         Learning Objectives\n\
         - Understand the basics of {topics}\n\
         - Apply {topics} in practical scenarios\n\n\
         Course Modules\n\
         - Module 1: Introduction to {subject}\n\
         - Module 2: {topics}\n\n\
         Assessments\n\
         - Midterm exam\n\
         - Final project\n\n\
         Resources\n\
         - Textbook: '{subject} Fundamentals'\n\
         - Website: www.{lower}-education.com",
        lower = subject.to_lowercase()
    )
}

fn standard_curriculum_fallback(degree: &str, subject: &str) -> String {
    format!(
        "Course Title\n\
         Standard {subject} Curriculum for {degree}\n\n\
         Degree Overview\n\
         This curriculum aligns with academic standards for {degree} students...\n\n\
         Learning Objectives\n\
         - Master core concepts of {subject}\n\
         - Develop critical thinking skills\n\n\
         Course Modules\n\
         - Module 1: Foundations of {subject}\n\
         - Module 2: Advanced {subject} Topics\n\n\
         Assessments\n\
         - Midterm exam\n\
         - Final project\n\n\
         Resources\n\
         - Textbook: '{subject} Essentials'\n\
         - Website: www.{lower}-standards.org",
        lower = subject.to_lowercase()
    )
}

fn lesson_plan_fallback(subject: &str, topics: &str, grade_level: &str) -> String {
    format!(
        "Lesson Title\n\
         Lesson Plan for {subject} - {grade_level}\n\n\
         Subject Overview\n\
         {subject} introduces key concepts for {grade_level} students...\n\n\
         Learning Objectives\n\
         - Understand the basics of {topics}\n\
         - Apply {topics} in classroom activities\n\n\
         Materials Needed\n\
         - Textbooks, worksheets, whiteboard\n\n\
         Lesson Procedure\n\
         0-10 min: Introduction to {subject}\n\
         10-40 min: Interactive activity on {topics}\n\
         40-60 min: Group discussion and wrap-up\n\n\
         Assessments\n\
         - Class participation\n\
         - Short quiz on {topics}\n\n\
         Resources\n\
         - Book: '{subject} for Beginners'\n\
         - Website: www.{lower}-education.com",
        lower = subject.to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::gateway::{GatewayError, GenerationGateway};
    use crate::profiles::{upsert_profile, ProfileInput};
    use async_trait::async_trait;
    use axum::body::to_bytes;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    enum StubOutcome {
        Content(&'static str),
        Auth,
        Upstream,
    }

    struct StubGateway(StubOutcome);

    #[async_trait]
    impl GenerationGateway for StubGateway {
        async fn generate(&self, _system: &str, _prompt: &str) -> Result<String, GatewayError> {
            match &self.0 {
                StubOutcome::Content(text) => Ok(text.to_string()),
                StubOutcome::Auth => Err(GatewayError::Auth),
                StubOutcome::Upstream => Err(GatewayError::Upstream("boom".into())),
            }
        }
    }

    fn test_state(outcome: StubOutcome) -> AppState {
        AppState {
            db: Arc::new(Mutex::new(db::test_connection())),
            gateway: Arc::new(StubGateway(outcome)),
            media_dir: std::env::temp_dir(),
        }
    }

    async fn seed_profile(state: &AppState, uid: &str, role: &str) {
        let conn = state.db.lock().await;
        upsert_profile(
            &conn,
            ProfileInput {
                uid: Some(uid.into()),
                first_name: Some("Ada".into()),
                email: Some(format!("{uid}@example.com")),
                role: Some(role.into()),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    }

    fn custom_request(uid: &str) -> CustomCurriculumRequest {
        CustomCurriculumRequest {
            uid: Some(uid.into()),
            degree: Some("BSc".into()),
            subject: Some("Algebra".into()),
            topics: Some("equations".into()),
        }
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn generation_persists_curriculum_and_mirror_file() {
        let state = test_state(StubOutcome::Content("generated curriculum"));
        seed_profile(&state, "u1", "teacher").await;

        let response = generate_custom_curriculum(State(state.clone()), Json(custom_request("u1")))
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["curriculum"]["generated_content"], "generated curriculum");
        assert!(!body["curriculum"]["file_id"].is_null());

        let conn = state.db.lock().await;
        let files: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(files, 1);
        let category: String = conn
            .query_row("SELECT category FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(category, "Curriculum");
    }

    #[tokio::test]
    async fn auth_failure_falls_back_to_the_template() {
        let state = test_state(StubOutcome::Auth);
        seed_profile(&state, "u1", "teacher").await;

        let response = generate_custom_curriculum(State(state.clone()), Json(custom_request("u1")))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;
        let content = body["curriculum"]["generated_content"].as_str().unwrap();
        assert!(content.contains("Algebra Curriculum for BSc"));
        assert!(content.contains("www.algebra-education.com"));
    }

    #[tokio::test]
    async fn upstream_failure_fails_the_request_and_persists_nothing() {
        let state = test_state(StubOutcome::Upstream);
        seed_profile(&state, "u1", "teacher").await;

        let err = generate_custom_curriculum(State(state.clone()), Json(custom_request("u1")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ApiError::GenerationFailed(_)));

        let conn = state.db.lock().await;
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM curriculums", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn mirror_failure_still_returns_the_curriculum() {
        // A student-owned profile cannot upload files, so the mirror write
        // is rejected while the curriculum row stands.
        let state = test_state(StubOutcome::Content("generated"));
        seed_profile(&state, "u1", "student").await;

        let response = generate_custom_curriculum(State(state.clone()), Json(custom_request("u1")))
            .await
            .unwrap()
            .into_response();
        let body = body_json(response).await;
        assert!(body["curriculum"]["file_id"].is_null());

        let conn = state.db.lock().await;
        let curriculums: i64 = conn
            .query_row("SELECT COUNT(*) FROM curriculums", [], |row| row.get(0))
            .unwrap();
        assert_eq!(curriculums, 1);
        let files: i64 = conn
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(files, 0);
    }

    #[tokio::test]
    async fn missing_uid_is_a_validation_error() {
        let state = test_state(StubOutcome::Content("x"));
        let mut request = custom_request("u1");
        request.uid = None;
        let err = generate_custom_curriculum(State(state), Json(request))
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "UID is required");
    }

    #[tokio::test]
    async fn unknown_profile_is_not_found() {
        let state = test_state(StubOutcome::Content("x"));
        let err = generate_custom_curriculum(State(state), Json(custom_request("ghost")))
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Profile not found");
    }

    #[tokio::test]
    async fn standard_curriculum_stores_standard_topics() {
        let state = test_state(StubOutcome::Auth);
        seed_profile(&state, "u1", "teacher").await;

        let response = generate_standard_curriculum(
            State(state.clone()),
            Json(StandardCurriculumRequest {
                uid: Some("u1".into()),
                degree: Some("BSc".into()),
                subject: Some("Physics".into()),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let conn = state.db.lock().await;
        let (topics, kind): (String, String) = conn
            .query_row(
                "SELECT topics, curriculum_type FROM curriculums",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(topics, "Standard Physics topics");
        assert_eq!(kind, "standard");
    }

    #[tokio::test]
    async fn lesson_plan_defaults_duration_and_mirrors_to_lesson_plan_category() {
        let state = test_state(StubOutcome::Content("plan"));
        seed_profile(&state, "u1", "teacher").await;

        let response = generate_lesson_plan(
            State(state.clone()),
            Json(LessonPlanRequest {
                uid: Some("u1".into()),
                subject: Some("Biology".into()),
                topics: Some("cells".into()),
                grade_level: Some("Grade 7".into()),
                duration: None,
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let conn = state.db.lock().await;
        let duration: String = conn
            .query_row("SELECT duration FROM lesson_plans", [], |row| row.get(0))
            .unwrap();
        assert_eq!(duration, "1 hour");
        let category: String = conn
            .query_row("SELECT category FROM files", [], |row| row.get(0))
            .unwrap();
        assert_eq!(category, "Lesson Plan");
    }

    #[test]
    fn prompts_carry_the_request_fields() {
        let prompt = custom_curriculum_prompt("BSc", "Algebra", "equations");
        assert!(prompt.contains("BSc degree"));
        assert!(prompt.contains("subject Algebra"));
        assert!(prompt.contains("Include the following topics: equations."));

        let lesson = lesson_plan_prompt("Biology", "cells", "Grade 7", "45 minutes");
        assert!(lesson.contains("Grade 7 class"));
        assert!(lesson.contains("approximately 45 minutes"));
    }
}
