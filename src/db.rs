use rusqlite::{Connection, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type DbConnection = Arc<Mutex<Connection>>;

pub fn establish_connection(path: &Path) -> Result<DbConnection> {
    let conn = Connection::open(path)?;
    let conn = init_schema(conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// JSON-shaped columns (permissions, history, audit_logs, tags, options)
/// hold serde_json text so the wire format round-trips unchanged.
pub fn init_schema(conn: Connection) -> Result<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            uid TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT,
            email TEXT NOT NULL UNIQUE,
            phone_number TEXT,
            dob TEXT,
            qualification TEXT,
            address TEXT,
            bio TEXT,
            role TEXT NOT NULL,
            profile_image TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS curriculums (
            id TEXT PRIMARY KEY,
            user_uid TEXT NOT NULL,
            degree TEXT NOT NULL,
            subject TEXT NOT NULL,
            topics TEXT NOT NULL,
            generated_content TEXT NOT NULL,
            curriculum_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_uid) REFERENCES profiles (uid) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lesson_plans (
            id TEXT PRIMARY KEY,
            user_uid TEXT NOT NULL,
            subject TEXT NOT NULL,
            topics TEXT NOT NULL,
            grade_level TEXT NOT NULL,
            duration TEXT NOT NULL,
            generated_content TEXT NOT NULL,
            lesson_type TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (user_uid) REFERENCES profiles (uid) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS quizzes (
            id TEXT PRIMARY KEY,
            user_uid TEXT,
            title TEXT NOT NULL,
            mode TEXT NOT NULL,
            difficulty TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (user_uid) REFERENCES profiles (uid) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS questions (
            id TEXT PRIMARY KEY,
            quiz_id TEXT NOT NULL,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            question_type TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            explanation TEXT NOT NULL,
            FOREIGN KEY (quiz_id) REFERENCES quizzes (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            id TEXT PRIMARY KEY,
            user_uid TEXT,
            name TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            uploaded_by TEXT NOT NULL,
            date TEXT NOT NULL,
            permissions TEXT NOT NULL,
            history TEXT NOT NULL,
            file_type TEXT NOT NULL,
            tags TEXT NOT NULL,
            content TEXT NOT NULL,
            course TEXT NOT NULL,
            department TEXT NOT NULL,
            semester TEXT NOT NULL,
            subject TEXT NOT NULL,
            class_name TEXT NOT NULL,
            category TEXT NOT NULL,
            audit_logs TEXT NOT NULL,
            FOREIGN KEY (user_uid) REFERENCES profiles (uid) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS share_links (
            link_id TEXT PRIMARY KEY,
            file_id TEXT NOT NULL,
            expires_at TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY (file_id) REFERENCES files (id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(conn)
}

#[cfg(test)]
pub fn test_connection() -> Connection {
    init_schema(Connection::open_in_memory().expect("in-memory sqlite")).expect("schema init")
}
