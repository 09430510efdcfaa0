//! Curriculum and lesson-plan store. Read-mostly rows owned by a profile;
//! listings come back newest first.

use crate::error::ApiError;
use crate::models::{Curriculum, LessonPlan, PlanKind};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

pub struct NewCurriculum {
    pub user_uid: String,
    pub degree: String,
    pub subject: String,
    pub topics: String,
    pub generated_content: String,
    pub kind: PlanKind,
}

pub struct NewLessonPlan {
    pub user_uid: String,
    pub subject: String,
    pub topics: String,
    pub grade_level: String,
    pub duration: String,
    pub generated_content: String,
    pub kind: PlanKind,
}

pub fn create_curriculum(conn: &Connection, new: NewCurriculum) -> Result<Curriculum, ApiError> {
    let now = Utc::now();
    let curriculum = Curriculum {
        id: Uuid::new_v4(),
        user: new.user_uid,
        user_email: None,
        degree: new.degree,
        subject: new.subject,
        topics: new.topics,
        generated_content: new.generated_content,
        created_at: now,
        updated_at: now,
        curriculum_type: new.kind,
    };
    conn.execute(
        "INSERT INTO curriculums (id, user_uid, degree, subject, topics, generated_content, \
         curriculum_type, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            curriculum.id.to_string(),
            curriculum.user,
            curriculum.degree,
            curriculum.subject,
            curriculum.topics,
            curriculum.generated_content,
            kind_str(curriculum.curriculum_type),
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;
    Ok(curriculum)
}

pub fn list_curriculums(conn: &Connection, user_uid: &str) -> Result<Vec<Curriculum>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.user_uid, p.email, c.degree, c.subject, c.topics, c.generated_content, \
         c.curriculum_type, c.created_at, c.updated_at \
         FROM curriculums c JOIN profiles p ON p.uid = c.user_uid \
         WHERE c.user_uid = ? ORDER BY c.created_at DESC",
    )?;
    let rows = stmt
        .query_map([user_uid], row_to_curriculum)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

pub fn create_lesson_plan(conn: &Connection, new: NewLessonPlan) -> Result<LessonPlan, ApiError> {
    let now = Utc::now();
    let plan = LessonPlan {
        id: Uuid::new_v4(),
        user: new.user_uid,
        user_email: None,
        subject: new.subject,
        topics: new.topics,
        grade_level: new.grade_level,
        duration: new.duration,
        generated_content: new.generated_content,
        created_at: now,
        updated_at: now,
        lesson_type: new.kind,
    };
    conn.execute(
        "INSERT INTO lesson_plans (id, user_uid, subject, topics, grade_level, duration, \
         generated_content, lesson_type, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            plan.id.to_string(),
            plan.user,
            plan.subject,
            plan.topics,
            plan.grade_level,
            plan.duration,
            plan.generated_content,
            kind_str(plan.lesson_type),
            now.to_rfc3339(),
            now.to_rfc3339(),
        ],
    )?;
    Ok(plan)
}

pub fn list_lesson_plans(conn: &Connection, user_uid: &str) -> Result<Vec<LessonPlan>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.user_uid, p.email, l.subject, l.topics, l.grade_level, l.duration, \
         l.generated_content, l.lesson_type, l.created_at, l.updated_at \
         FROM lesson_plans l JOIN profiles p ON p.uid = l.user_uid \
         WHERE l.user_uid = ? ORDER BY l.created_at DESC",
    )?;
    let rows = stmt
        .query_map([user_uid], row_to_lesson_plan)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn kind_str(kind: PlanKind) -> &'static str {
    match kind {
        PlanKind::Custom => "custom",
        PlanKind::Standard => "standard",
    }
}

fn parse_kind(text: &str) -> PlanKind {
    match text {
        "standard" => PlanKind::Standard,
        _ => PlanKind::Custom,
    }
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_datetime(text: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn row_to_curriculum(row: &Row) -> rusqlite::Result<Curriculum> {
    let id: String = row.get(0)?;
    let kind: String = row.get(7)?;
    Ok(Curriculum {
        id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
        user: row.get(1)?,
        user_email: row.get(2)?,
        degree: row.get(3)?,
        subject: row.get(4)?,
        topics: row.get(5)?,
        generated_content: row.get(6)?,
        curriculum_type: parse_kind(&kind),
        created_at: parse_datetime(row.get::<_, String>(8)?, 8)?,
        updated_at: parse_datetime(row.get::<_, String>(9)?, 9)?,
    })
}

fn row_to_lesson_plan(row: &Row) -> rusqlite::Result<LessonPlan> {
    let id: String = row.get(0)?;
    let kind: String = row.get(8)?;
    Ok(LessonPlan {
        id: Uuid::parse_str(&id).map_err(|e| conversion_err(0, e))?,
        user: row.get(1)?,
        user_email: row.get(2)?,
        subject: row.get(3)?,
        topics: row.get(4)?,
        grade_level: row.get(5)?,
        duration: row.get(6)?,
        generated_content: row.get(7)?,
        lesson_type: parse_kind(&kind),
        created_at: parse_datetime(row.get::<_, String>(9)?, 9)?,
        updated_at: parse_datetime(row.get::<_, String>(10)?, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::profiles::{upsert_profile, ProfileInput};

    fn seed_profile(conn: &Connection, uid: &str) {
        upsert_profile(
            conn,
            ProfileInput {
                uid: Some(uid.into()),
                first_name: Some("Ada".into()),
                email: Some(format!("{uid}@example.com")),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    }

    #[test]
    fn curriculum_listing_is_newest_first_with_owner_email() {
        let conn = test_connection();
        seed_profile(&conn, "u1");
        for (i, subject) in ["Algebra", "Geometry"].iter().enumerate() {
            let mut c = create_curriculum(
                &conn,
                NewCurriculum {
                    user_uid: "u1".into(),
                    degree: "BSc".into(),
                    subject: subject.to_string(),
                    topics: "basics".into(),
                    generated_content: "content".into(),
                    kind: PlanKind::Custom,
                },
            )
            .unwrap();
            // Distinct timestamps so the ordering is observable.
            c.created_at += chrono::Duration::seconds(i as i64);
            conn.execute(
                "UPDATE curriculums SET created_at = ? WHERE id = ?",
                params![c.created_at.to_rfc3339(), c.id.to_string()],
            )
            .unwrap();
        }

        let listed = list_curriculums(&conn, "u1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].subject, "Geometry");
        assert_eq!(listed[0].user_email.as_deref(), Some("u1@example.com"));
    }

    #[test]
    fn lesson_plan_round_trip() {
        let conn = test_connection();
        seed_profile(&conn, "u1");
        let plan = create_lesson_plan(
            &conn,
            NewLessonPlan {
                user_uid: "u1".into(),
                subject: "Physics".into(),
                topics: "motion".into(),
                grade_level: "Grade 8".into(),
                duration: "1 hour".into(),
                generated_content: "plan body".into(),
                kind: PlanKind::Custom,
            },
        )
        .unwrap();

        let listed = list_lesson_plans(&conn, "u1").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, plan.id);
        assert_eq!(listed[0].grade_level, "Grade 8");
        assert_eq!(listed[0].lesson_type, PlanKind::Custom);
    }
}
