//! File repository: create/read/update/delete with permission gating, tag
//! normalization, version history and audit log composition, rollback, and
//! time-limited share links.
//!
//! Gating is intentionally asymmetric: deletion and listing treat Admin as
//! always privileged, while update, rollback, share generation and
//! permission replacement consult the per-file map only.

use crate::audit;
use crate::error::ApiError;
use crate::history;
use crate::models::{
    Actor, AuditEntry, FileAccess, FileRecord, HistoryEntry, PermissionSet, Role, ShareLink,
};
use crate::permissions::{actor_can, default_permissions};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use uuid::Uuid;

const SHARE_LINK_VALIDITY_DAYS: i64 = 7;

/// Tags arrive either as a JSON list or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
}

/// Trims, drops empties, and dedups while keeping first-seen order.
pub fn normalize_tags(input: TagsInput) -> Vec<String> {
    let raw = match input {
        TagsInput::List(list) => list,
        TagsInput::Csv(csv) => csv.split(',').map(str::to_string).collect(),
    };
    let mut tags: Vec<String> = Vec::new();
    for tag in raw {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

/// Lower-cased extension of the file name; the whole name when it has none.
pub fn derive_type(name: &str) -> String {
    name.rsplit('.').next().unwrap_or(name).to_lowercase()
}

#[derive(Debug, Default, Deserialize)]
pub struct NewFile {
    pub uid: Option<String>,
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub tags: Option<TagsInput>,
    pub content: Option<String>,
    pub course: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileUpdate {
    pub name: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub tags: Option<TagsInput>,
    pub content: Option<String>,
    pub course: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub category: Option<String>,
    pub permissions: Option<PermissionSet>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    pub uid: Option<String>,
    pub user_role: Option<String>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub uploaded_by: Option<String>,
    pub course: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub subject: Option<String>,
    pub class_name: Option<String>,
    pub category: Option<String>,
    pub date_range: Option<String>,
    pub tag: Option<String>,
}

/// Only Admin and Teacher may upload. The profile reference, when present,
/// must already be resolved by the caller.
pub fn create_file(conn: &Connection, actor: &Actor, new: NewFile) -> Result<FileRecord, ApiError> {
    if !matches!(actor.role, Some(Role::Admin) | Some(Role::Teacher)) {
        return Err(ApiError::PermissionDenied(
            "Permission denied: Only Admin and Teacher can upload files".into(),
        ));
    }

    let name = match new.name {
        Some(n) if !n.trim().is_empty() => n,
        _ => return Err(ApiError::validation("Name is required")),
    };
    let title = new.title.unwrap_or_default();
    let file_type = match new.file_type {
        Some(t) if !t.trim().is_empty() => t.to_lowercase(),
        _ => derive_type(&name),
    };
    let content = new
        .content
        .unwrap_or_else(|| format!("Mock content for {name}"));
    let tags = new.tags.map(normalize_tags).unwrap_or_default();

    let mut file = FileRecord {
        id: Uuid::new_v4(),
        user: new.uid,
        name,
        title,
        author: actor.name.clone(),
        uploaded_by: actor.name.clone(),
        date: Utc::now().date_naive(),
        permissions: default_permissions(),
        history: Vec::new(),
        file_type,
        tags,
        content,
        course: new.course.unwrap_or_default(),
        department: new.department.unwrap_or_default(),
        semester: new.semester.unwrap_or_default(),
        subject: new.subject.unwrap_or_default(),
        class_name: new.class_name.unwrap_or_default(),
        category: new.category.unwrap_or_else(|| "Curriculum".into()),
        audit_logs: Vec::new(),
        share_links: Vec::new(),
    };

    let state = file.version_state();
    history::append(&mut file.history, "Initial upload", state);
    audit::record(&mut file.audit_logs, actor, "uploaded");

    insert_file(conn, &file)?;
    Ok(file)
}

pub fn get_file(conn: &Connection, id: Uuid) -> Result<FileRecord, ApiError> {
    let mut file = conn
        .query_row(
            &format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ?"),
            [id.to_string()],
            row_to_file,
        )
        .optional()?
        .ok_or(ApiError::NotFound("File"))?;
    file.share_links = load_share_links(conn, id)?;
    Ok(file)
}

/// Exact-match (case-insensitive) filters run in SQL; tag containment and
/// read visibility are applied to the decoded rows.
pub fn list_files(
    conn: &Connection,
    actor: &Actor,
    query: &FileQuery,
) -> Result<Vec<FileRecord>, ApiError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    let exact: [(&str, &Option<String>); 8] = [
        ("LOWER(file_type) = LOWER(?)", &query.file_type),
        ("LOWER(uploaded_by) = LOWER(?)", &query.uploaded_by),
        ("LOWER(course) = LOWER(?)", &query.course),
        ("LOWER(department) = LOWER(?)", &query.department),
        ("LOWER(semester) = LOWER(?)", &query.semester),
        ("LOWER(subject) = LOWER(?)", &query.subject),
        ("LOWER(class_name) = LOWER(?)", &query.class_name),
        ("LOWER(category) = LOWER(?)", &query.category),
    ];
    for (clause, value) in exact {
        if let Some(v) = value {
            clauses.push(clause);
            values.push(v.clone());
        }
    }

    if let Some(range) = query.date_range.as_deref() {
        let days = match range {
            "7days" => Some(7),
            "30days" => Some(30),
            _ => None,
        };
        if let Some(days) = days {
            clauses.push("date >= ?");
            values.push((Utc::now().date_naive() - Duration::days(days)).to_string());
        }
    }

    if let Some(uid) = &query.uid {
        clauses.push("user_uid = ?");
        values.push(uid.clone());
    }

    let mut sql = format!("SELECT {FILE_COLUMNS} FROM files");
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_file)?;
    let mut files = Vec::new();
    for row in rows {
        let mut file = row?;
        if let Some(tag) = &query.tag {
            if !file.tags.iter().any(|t| t == tag) {
                continue;
            }
        }
        if !actor.is_admin() && !actor_can(actor, FileAccess::Read, &file.permissions) {
            continue;
        }
        file.share_links = load_share_links(conn, file.id)?;
        files.push(file);
    }
    Ok(files)
}

/// Partial update. A diff on name/title/content/type appends one
/// pre-mutation history snapshot and one "edited" audit entry; a
/// permissions-only change appends the audit entry alone.
pub fn update_file(
    conn: &Connection,
    id: Uuid,
    actor: &Actor,
    update: FileUpdate,
) -> Result<FileRecord, ApiError> {
    let mut file = get_file(conn, id)?;
    if !actor_can(actor, FileAccess::Write, &file.permissions) {
        return Err(ApiError::permission_denied());
    }

    let mut changed: Vec<String> = Vec::new();
    let pairs: [(&str, &Option<String>, &str); 4] = [
        ("name", &update.name, &file.name),
        ("title", &update.title, &file.title),
        ("content", &update.content, &file.content),
        ("type", &update.file_type, &file.file_type),
    ];
    for (field, requested, current) in pairs {
        if let Some(value) = requested {
            if value != current {
                changed.push(field.to_string());
            }
        }
    }

    if !changed.is_empty() {
        let next = file.history.len() as u32 + 1;
        let summary = format!("Updated to version {next}: {}", changed.join(", "));
        let state = file.version_state();
        history::append(&mut file.history, summary, state);
        audit::record_edit(&mut file.audit_logs, actor, changed);
    } else if update.permissions.is_some() {
        audit::record_edit(&mut file.audit_logs, actor, vec!["permissions".into()]);
    }

    if let Some(name) = update.name {
        file.name = name;
    }
    if let Some(title) = update.title {
        file.title = title;
    }
    if let Some(author) = update.author {
        file.author = author;
    }
    if let Some(file_type) = update.file_type {
        file.file_type = file_type;
    }
    if let Some(tags) = update.tags {
        file.tags = normalize_tags(tags);
    }
    if let Some(content) = update.content {
        file.content = content;
    }
    if let Some(course) = update.course {
        file.course = course;
    }
    if let Some(department) = update.department {
        file.department = department;
    }
    if let Some(semester) = update.semester {
        file.semester = semester;
    }
    if let Some(subject) = update.subject {
        file.subject = subject;
    }
    if let Some(class_name) = update.class_name {
        file.class_name = class_name;
    }
    if let Some(category) = update.category {
        file.category = category;
    }
    if let Some(permissions) = update.permissions {
        file.permissions = permissions;
    }

    save_file(conn, &file)?;
    Ok(file)
}

/// Admin deletes unconditionally; anyone else needs the map's delete grant.
/// The "deleted" audit entry is persisted before the row is removed.
pub fn delete_file(conn: &Connection, id: Uuid, actor: &Actor) -> Result<(), ApiError> {
    let mut file = get_file(conn, id)?;
    if !actor.is_admin() && !actor_can(actor, FileAccess::Delete, &file.permissions) {
        return Err(ApiError::permission_denied());
    }
    audit::record(&mut file.audit_logs, actor, "deleted");
    save_file(conn, &file)?;
    conn.execute("DELETE FROM files WHERE id = ?", [id.to_string()])?;
    Ok(())
}

/// Wholesale replacement of the permission map; requires exactly Admin
/// (no map-grant path here).
pub fn update_permissions(
    conn: &Connection,
    id: Uuid,
    actor: &Actor,
    permissions: PermissionSet,
) -> Result<PermissionSet, ApiError> {
    if !actor.is_admin() {
        return Err(ApiError::permission_denied());
    }
    let mut file = get_file(conn, id)?;
    file.permissions = permissions;
    audit::record(&mut file.audit_logs, actor, "updated permissions");
    save_file(conn, &file)?;
    Ok(file.permissions)
}

/// Restores the content fields recorded at `version`, appending a new
/// max-version history entry rather than truncating.
pub fn rollback_file(
    conn: &Connection,
    id: Uuid,
    actor: &Actor,
    version: Option<u32>,
) -> Result<FileRecord, ApiError> {
    let mut file = get_file(conn, id)?;
    if !actor_can(actor, FileAccess::Write, &file.permissions) {
        return Err(ApiError::permission_denied());
    }
    let version = version.ok_or_else(|| ApiError::validation("Version is required"))?;

    let state = history::apply_rollback(&mut file.history, version)?;
    audit::record(&mut file.audit_logs, actor, "rolled back");

    file.name = state.name;
    file.title = state.title;
    file.file_type = state.file_type;
    file.content = state.content;

    save_file(conn, &file)?;
    Ok(file)
}

/// Share generation consults the map's read grant for every role, Admin
/// included.
pub fn generate_share_link(
    conn: &Connection,
    file_id: Uuid,
    actor: &Actor,
) -> Result<ShareLink, ApiError> {
    let mut file = get_file(conn, file_id)?;
    if !actor_can(actor, FileAccess::Read, &file.permissions) {
        return Err(ApiError::permission_denied());
    }

    let now = Utc::now();
    let link = ShareLink {
        link_id: generate_link_id(),
        expires_at: now + Duration::days(SHARE_LINK_VALIDITY_DAYS),
        created_by: actor.name.clone(),
        created_at: now,
    };
    conn.execute(
        "INSERT INTO share_links (link_id, file_id, expires_at, created_by, created_at) VALUES (?, ?, ?, ?, ?)",
        params![
            link.link_id,
            file_id.to_string(),
            link.expires_at.to_rfc3339(),
            link.created_by,
            link.created_at.to_rfc3339()
        ],
    )?;

    audit::record(&mut file.audit_logs, actor, "generated share link");
    save_file(conn, &file)?;
    Ok(link)
}

/// Link existence and non-expiry are the only checks; no role permission is
/// consulted. Each access is audited on the file.
pub fn access_share_link(
    conn: &Connection,
    file_id: Uuid,
    link_id: &str,
    actor: &Actor,
) -> Result<FileRecord, ApiError> {
    let mut file = get_file(conn, file_id)?;
    let expires_at: DateTime<Utc> = conn
        .query_row(
            "SELECT expires_at FROM share_links WHERE file_id = ? AND link_id = ?",
            params![file_id.to_string(), link_id],
            |row| parse_datetime(row.get::<_, String>(0)?, 0),
        )
        .optional()?
        .ok_or(ApiError::NotFound("Share link"))?;

    if expires_at <= Utc::now() {
        return Err(ApiError::Expired);
    }

    audit::record(
        &mut file.audit_logs,
        actor,
        format!("accessed share link {link_id}"),
    );
    save_file(conn, &file)?;
    Ok(file)
}

fn generate_link_id() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

const FILE_COLUMNS: &str = "id, user_uid, name, title, author, uploaded_by, date, permissions, \
     history, file_type, tags, content, course, department, semester, subject, class_name, \
     category, audit_logs";

fn insert_file(conn: &Connection, file: &FileRecord) -> Result<(), ApiError> {
    conn.execute(
        &format!(
            "INSERT INTO files ({FILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            file.id.to_string(),
            file.user,
            file.name,
            file.title,
            file.author,
            file.uploaded_by,
            file.date.to_string(),
            serde_json::to_string(&file.permissions)?,
            serde_json::to_string(&file.history)?,
            file.file_type,
            serde_json::to_string(&file.tags)?,
            file.content,
            file.course,
            file.department,
            file.semester,
            file.subject,
            file.class_name,
            file.category,
            serde_json::to_string(&file.audit_logs)?,
        ],
    )?;
    Ok(())
}

fn save_file(conn: &Connection, file: &FileRecord) -> Result<(), ApiError> {
    conn.execute(
        "UPDATE files SET user_uid = ?, name = ?, title = ?, author = ?, uploaded_by = ?, \
         permissions = ?, history = ?, file_type = ?, tags = ?, content = ?, course = ?, \
         department = ?, semester = ?, subject = ?, class_name = ?, category = ?, audit_logs = ? \
         WHERE id = ?",
        params![
            file.user,
            file.name,
            file.title,
            file.author,
            file.uploaded_by,
            serde_json::to_string(&file.permissions)?,
            serde_json::to_string(&file.history)?,
            file.file_type,
            serde_json::to_string(&file.tags)?,
            file.content,
            file.course,
            file.department,
            file.semester,
            file.subject,
            file.class_name,
            file.category,
            serde_json::to_string(&file.audit_logs)?,
            file.id.to_string(),
        ],
    )?;
    Ok(())
}

fn load_share_links(conn: &Connection, file_id: Uuid) -> Result<Vec<ShareLink>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT link_id, expires_at, created_by, created_at FROM share_links \
         WHERE file_id = ? ORDER BY created_at",
    )?;
    let links = stmt
        .query_map([file_id.to_string()], |row| {
            Ok(ShareLink {
                link_id: row.get(0)?,
                expires_at: parse_datetime(row.get::<_, String>(1)?, 1)?,
                created_by: row.get(2)?,
                created_at: parse_datetime(row.get::<_, String>(3)?, 3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(links)
}

fn row_to_file(row: &Row) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: parse_uuid(row.get::<_, String>(0)?, 0)?,
        user: row.get(1)?,
        name: row.get(2)?,
        title: row.get(3)?,
        author: row.get(4)?,
        uploaded_by: row.get(5)?,
        date: parse_date(row.get::<_, String>(6)?, 6)?,
        permissions: decode_json::<PermissionSet>(row.get::<_, String>(7)?, 7)?,
        history: decode_json::<Vec<HistoryEntry>>(row.get::<_, String>(8)?, 8)?,
        file_type: row.get(9)?,
        tags: decode_json::<Vec<String>>(row.get::<_, String>(10)?, 10)?,
        content: row.get(11)?,
        course: row.get(12)?,
        department: row.get(13)?,
        semester: row.get(14)?,
        subject: row.get(15)?,
        class_name: row.get(16)?,
        category: row.get(17)?,
        audit_logs: decode_json::<Vec<AuditEntry>>(row.get::<_, String>(18)?, 18)?,
        share_links: Vec::new(),
    })
}

fn conversion_err(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn decode_json<T: serde::de::DeserializeOwned>(text: String, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_str(&text).map_err(|e| conversion_err(idx, e))
}

fn parse_uuid(text: String, idx: usize) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&text).map_err(|e| conversion_err(idx, e))
}

fn parse_date(text: String, idx: usize) -> rusqlite::Result<NaiveDate> {
    text.parse().map_err(|e| conversion_err(idx, e))
}

fn parse_datetime(text: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}
