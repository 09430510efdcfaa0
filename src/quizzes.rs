//! Quiz store. A quiz owns an ordered question set; supplying a new set on
//! update deletes and fully replaces the prior questions (no merge).

use crate::error::ApiError;
use crate::models::{Question, QuestionType, Quiz, QuizMode};
use crate::profiles;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct NewQuiz {
    pub uid: Option<String>,
    pub title: String,
    pub mode: QuizMode,
    pub difficulty: Option<String>,
    pub questions: Vec<QuestionInput>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuizUpdate {
    pub title: Option<String>,
    pub mode: Option<QuizMode>,
    pub difficulty: Option<String>,
    pub questions: Option<Vec<QuestionInput>>,
}

/// A `uid` whose profile does not exist stores the quiz unowned, matching
/// the original's fall-through.
pub fn create_quiz(conn: &Connection, new: NewQuiz) -> Result<Quiz, ApiError> {
    let owner = match new.uid {
        Some(uid) => profiles::find_profile(conn, &uid)?.map(|p| p.uid),
        None => None,
    };

    let quiz = Quiz {
        id: Uuid::new_v4(),
        user: owner,
        title: new.title,
        mode: new.mode,
        difficulty: new.difficulty.unwrap_or_else(|| "Medium".into()),
        created_at: Utc::now(),
        questions: Vec::new(),
    };

    conn.execute(
        "INSERT INTO quizzes (id, user_uid, title, mode, difficulty, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            quiz.id.to_string(),
            quiz.user,
            quiz.title,
            mode_str(quiz.mode),
            quiz.difficulty,
            quiz.created_at.to_rfc3339(),
        ],
    )?;
    insert_questions(conn, quiz.id, &new.questions)?;

    get_quiz(conn, quiz.id)
}

/// Listing without a uid returns unowned quizzes; a uid with no matching
/// profile yields an empty list.
pub fn list_quizzes(conn: &Connection, uid: Option<&str>) -> Result<Vec<Quiz>, ApiError> {
    let (sql, param): (&str, Option<String>) = match uid {
        Some(uid) => {
            if profiles::find_profile(conn, uid)?.is_none() {
                return Ok(Vec::new());
            }
            (
                "SELECT id, user_uid, title, mode, difficulty, created_at FROM quizzes WHERE user_uid = ?",
                Some(uid.to_string()),
            )
        }
        None => (
            "SELECT id, user_uid, title, mode, difficulty, created_at FROM quizzes WHERE user_uid IS NULL",
            None,
        ),
    };

    let mut stmt = conn.prepare(sql)?;
    let rows = match param {
        Some(p) => stmt.query_map([p], row_to_quiz)?,
        None => stmt.query_map([], row_to_quiz)?,
    };
    let mut quizzes = Vec::new();
    for row in rows {
        let mut quiz = row?;
        quiz.questions = load_questions(conn, quiz.id)?;
        quizzes.push(quiz);
    }
    Ok(quizzes)
}

pub fn get_quiz(conn: &Connection, id: Uuid) -> Result<Quiz, ApiError> {
    let mut quiz = conn
        .query_row(
            "SELECT id, user_uid, title, mode, difficulty, created_at FROM quizzes WHERE id = ?",
            [id.to_string()],
            row_to_quiz,
        )
        .optional()?
        .ok_or(ApiError::NotFound("Quiz"))?;
    quiz.questions = load_questions(conn, id)?;
    Ok(quiz)
}

pub fn update_quiz(conn: &Connection, id: Uuid, update: QuizUpdate) -> Result<Quiz, ApiError> {
    let quiz = get_quiz(conn, id)?;

    let title = update.title.unwrap_or(quiz.title);
    let mode = update.mode.unwrap_or(quiz.mode);
    let difficulty = update.difficulty.unwrap_or(quiz.difficulty);
    conn.execute(
        "UPDATE quizzes SET title = ?, mode = ?, difficulty = ? WHERE id = ?",
        params![title, mode_str(mode), difficulty, id.to_string()],
    )?;

    if let Some(questions) = update.questions {
        conn.execute("DELETE FROM questions WHERE quiz_id = ?", [id.to_string()])?;
        insert_questions(conn, id, &questions)?;
    }

    get_quiz(conn, id)
}

fn insert_questions(
    conn: &Connection,
    quiz_id: Uuid,
    questions: &[QuestionInput],
) -> Result<(), ApiError> {
    for (position, q) in questions.iter().enumerate() {
        conn.execute(
            "INSERT INTO questions (id, quiz_id, position, text, question_type, options, correct_answer, explanation) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                Uuid::new_v4().to_string(),
                quiz_id.to_string(),
                position as i64,
                q.text,
                type_str(q.question_type),
                serde_json::to_string(&q.options)?,
                q.correct_answer,
                q.explanation,
            ],
        )?;
    }
    Ok(())
}

fn load_questions(conn: &Connection, quiz_id: Uuid) -> Result<Vec<Question>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, text, question_type, options, correct_answer, explanation \
         FROM questions WHERE quiz_id = ? ORDER BY position",
    )?;
    let questions = stmt
        .query_map([quiz_id.to_string()], |row| {
            Ok(Question {
                id: parse_uuid(row.get::<_, String>(0)?, 0)?,
                text: row.get(1)?,
                question_type: parse_type(row.get::<_, String>(2)?, 2)?,
                options: decode_options(row.get::<_, String>(3)?, 3)?,
                correct_answer: row.get(4)?,
                explanation: row.get(5)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(questions)
}

fn mode_str(mode: QuizMode) -> &'static str {
    match mode {
        QuizMode::Quiz => "quiz",
        QuizMode::Assessment => "assessment",
    }
}

fn type_str(t: QuestionType) -> &'static str {
    match t {
        QuestionType::MultipleChoice => "mcq",
        QuestionType::TrueFalse => "truefalse",
        QuestionType::ShortAnswer => "shortanswer",
        QuestionType::Essay => "essay",
    }
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_uuid(text: String, idx: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&text).map_err(|e| conversion_err(idx, e))
}

fn parse_type(text: String, idx: usize) -> rusqlite::Result<QuestionType> {
    match text.as_str() {
        "mcq" => Ok(QuestionType::MultipleChoice),
        "truefalse" => Ok(QuestionType::TrueFalse),
        "shortanswer" => Ok(QuestionType::ShortAnswer),
        "essay" => Ok(QuestionType::Essay),
        other => Err(conversion_err(
            idx,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown question type {other}"),
            ),
        )),
    }
}

fn decode_options(text: String, idx: usize) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&text).map_err(|e| conversion_err(idx, e))
}

fn row_to_quiz(row: &Row) -> rusqlite::Result<Quiz> {
    let mode: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    Ok(Quiz {
        id: parse_uuid(row.get::<_, String>(0)?, 0)?,
        user: row.get(1)?,
        title: row.get(2)?,
        mode: match mode.as_str() {
            "assessment" => QuizMode::Assessment,
            _ => QuizMode::Quiz,
        },
        difficulty: row.get(4)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_err(5, e))?,
        questions: Vec::new(),
    })
}
