use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Caller role. Also used as the lookup key in a file's permission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Teacher => "Teacher",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            _ => Err(()),
        }
    }
}

/// The caller as declared on the request. The raw string is kept for audit
/// display; an unrecognized role evaluates as absent from every permission
/// map.
#[derive(Debug, Clone)]
pub struct Actor {
    pub name: String,
    pub role: Option<Role>,
}

impl Actor {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let role = Role::from_str(&name).ok();
        let name = match role {
            Some(r) => r.as_str().to_string(),
            None => name,
        };
        Actor { name, role }
    }

    /// Resolves the `user_role` request parameter, defaulting to Student.
    pub fn from_param(param: Option<String>) -> Self {
        match param {
            Some(s) if !s.trim().is_empty() => Actor::new(s),
            _ => Actor::new(Role::Student.as_str()),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

/// Action gated by a file's permission map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    Read,
    Write,
    Delete,
}

/// Per-role capability grants. Missing keys deserialize to false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
}

pub type PermissionSet = BTreeMap<Role, Capability>;

/// The content fields a history entry snapshots. Rollback restores exactly
/// these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionState {
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub version: u32,
    pub date: NaiveDate,
    pub changes: String,
    pub state: VersionState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub user: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_fields: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLink {
    pub link_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub user: Option<String>,
    pub name: String,
    pub title: String,
    pub author: String,
    pub uploaded_by: String,
    pub date: NaiveDate,
    pub permissions: PermissionSet,
    pub history: Vec<HistoryEntry>,
    #[serde(rename = "type")]
    pub file_type: String,
    pub tags: Vec<String>,
    pub content: String,
    pub course: String,
    pub department: String,
    pub semester: String,
    pub subject: String,
    #[serde(rename = "class")]
    pub class_name: String,
    pub category: String,
    pub audit_logs: Vec<AuditEntry>,
    #[serde(default)]
    pub share_links: Vec<ShareLink>,
}

impl FileRecord {
    /// The fields a history snapshot captures, as they stand right now.
    pub fn version_state(&self) -> VersionState {
        VersionState {
            name: self.name.clone(),
            title: self.title.clone(),
            file_type: self.file_type.clone(),
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub uid: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone_number: Option<String>,
    pub dob: Option<NaiveDate>,
    pub qualification: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub profile_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Whether generated content came from a user-shaped request or a
/// standards-aligned one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanKind {
    Custom,
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Curriculum {
    pub id: Uuid,
    pub user: String,
    pub user_email: Option<String>,
    pub degree: String,
    pub subject: String,
    pub topics: String,
    pub generated_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub curriculum_type: PlanKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonPlan {
    pub id: Uuid,
    pub user: String,
    pub user_email: Option<String>,
    pub subject: String,
    pub topics: String,
    pub grade_level: String,
    pub duration: String,
    pub generated_content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lesson_type: PlanKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuizMode {
    Quiz,
    Assessment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "mcq")]
    MultipleChoice,
    #[serde(rename = "truefalse")]
    TrueFalse,
    #[serde(rename = "shortanswer")]
    ShortAnswer,
    #[serde(rename = "essay")]
    Essay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub title: String,
    pub mode: QuizMode,
    pub difficulty: String,
    pub created_at: DateTime<Utc>,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!(Role::from_str("teacher"), Ok(Role::Teacher));
        assert_eq!(Role::from_str("ADMIN"), Ok(Role::Admin));
        assert_eq!(Role::from_str(" Student "), Ok(Role::Student));
        assert!(Role::from_str("librarian").is_err());
    }

    #[test]
    fn actor_canonicalizes_known_roles() {
        let actor = Actor::new("teacher");
        assert_eq!(actor.name, "Teacher");
        assert_eq!(actor.role, Some(Role::Teacher));

        let unknown = Actor::new("Guest");
        assert_eq!(unknown.name, "Guest");
        assert_eq!(unknown.role, None);
    }

    #[test]
    fn actor_param_defaults_to_student() {
        let actor = Actor::from_param(None);
        assert_eq!(actor.role, Some(Role::Student));
        let blank = Actor::from_param(Some("  ".into()));
        assert_eq!(blank.role, Some(Role::Student));
    }

    #[test]
    fn capability_deserializes_missing_keys_as_false() {
        let cap: Capability = serde_json::from_str(r#"{"read": true}"#).unwrap();
        assert!(cap.read);
        assert!(!cap.write);
        assert!(!cap.delete);
    }

    #[test]
    fn permission_set_round_trips_wire_shape() {
        let json = r#"{"Admin":{"read":true,"write":true,"delete":true},"Student":{"read":true,"write":false,"delete":false}}"#;
        let set: PermissionSet = serde_json::from_str(json).unwrap();
        assert!(set[&Role::Admin].delete);
        assert!(!set[&Role::Student].write);
        let back = serde_json::to_string(&set).unwrap();
        assert_eq!(back, json);
    }

    #[test]
    fn question_type_uses_compact_tags() {
        assert_eq!(
            serde_json::to_string(&QuestionType::TrueFalse).unwrap(),
            "\"truefalse\""
        );
        let qt: QuestionType = serde_json::from_str("\"mcq\"").unwrap();
        assert_eq!(qt, QuestionType::MultipleChoice);
    }
}
