//! Profile store: upsert keyed on the external identity `uid`. Profiles are
//! never deleted in-band.

use crate::error::ApiError;
use crate::models::{Profile, Role};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProfileInput {
    pub uid: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub dob: Option<NaiveDate>,
    pub qualification: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub role: Option<String>,
    /// Raw value from the request: a data URL, an existing `/media/` path,
    /// or absent. The handler resolves it to a stored path before upsert.
    pub profile_image: Option<String>,
}

pub fn get_profile(conn: &Connection, uid: &str) -> Result<Profile, ApiError> {
    find_profile(conn, uid)?.ok_or(ApiError::NotFound("Profile"))
}

pub fn find_profile(conn: &Connection, uid: &str) -> Result<Option<Profile>, ApiError> {
    let profile = conn
        .query_row(
            "SELECT uid, first_name, last_name, email, phone_number, dob, qualification, \
             address, bio, role, profile_image, created_at FROM profiles WHERE uid = ?",
            [uid],
            row_to_profile,
        )
        .optional()?;
    Ok(profile)
}

/// Create-or-update keyed on `uid`. Absent fields keep their prior values;
/// creation requires `first_name` and `email`. `image_path` is the stored
/// media path when the request carried a new image.
pub fn upsert_profile(
    conn: &Connection,
    input: ProfileInput,
    image_path: Option<String>,
) -> Result<Profile, ApiError> {
    let uid = input
        .uid
        .clone()
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::validation("UID is required"))?;

    let role = input.role.as_deref().and_then(|r| Role::from_str(r).ok());

    match find_profile(conn, &uid)? {
        Some(mut profile) => {
            if let Some(first_name) = input.first_name {
                profile.first_name = first_name;
            }
            if input.last_name.is_some() {
                profile.last_name = input.last_name;
            }
            if let Some(email) = input.email {
                profile.email = email;
            }
            if input.phone_number.is_some() {
                profile.phone_number = input.phone_number;
            }
            if input.dob.is_some() {
                profile.dob = input.dob;
            }
            if input.qualification.is_some() {
                profile.qualification = input.qualification;
            }
            if input.address.is_some() {
                profile.address = input.address;
            }
            if input.bio.is_some() {
                profile.bio = input.bio;
            }
            if let Some(role) = role {
                profile.role = role;
            }
            if image_path.is_some() {
                profile.profile_image = image_path;
            }

            conn.execute(
                "UPDATE profiles SET first_name = ?, last_name = ?, email = ?, phone_number = ?, \
                 dob = ?, qualification = ?, address = ?, bio = ?, role = ?, profile_image = ? \
                 WHERE uid = ?",
                params![
                    profile.first_name,
                    profile.last_name,
                    profile.email,
                    profile.phone_number,
                    profile.dob.map(|d| d.to_string()),
                    profile.qualification,
                    profile.address,
                    profile.bio,
                    profile.role.as_str(),
                    profile.profile_image,
                    uid,
                ],
            )
            .map_err(map_integrity)?;
            Ok(profile)
        }
        None => {
            let first_name = input
                .first_name
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| ApiError::validation("Profile validation failed"))?;
            let email = input
                .email
                .filter(|e| !e.trim().is_empty())
                .ok_or_else(|| ApiError::validation("Profile validation failed"))?;

            let profile = Profile {
                uid: uid.clone(),
                first_name,
                last_name: input.last_name,
                email,
                phone_number: input.phone_number,
                dob: input.dob,
                qualification: input.qualification,
                address: input.address,
                bio: input.bio,
                role: role.unwrap_or(Role::Teacher),
                profile_image: image_path,
                created_at: Utc::now(),
            };

            conn.execute(
                "INSERT INTO profiles (uid, first_name, last_name, email, phone_number, dob, \
                 qualification, address, bio, role, profile_image, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    profile.uid,
                    profile.first_name,
                    profile.last_name,
                    profile.email,
                    profile.phone_number,
                    profile.dob.map(|d| d.to_string()),
                    profile.qualification,
                    profile.address,
                    profile.bio,
                    profile.role.as_str(),
                    profile.profile_image,
                    profile.created_at.to_rfc3339(),
                ],
            )
            .map_err(map_integrity)?;
            Ok(profile)
        }
    }
}

fn map_integrity(err: rusqlite::Error) -> ApiError {
    match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            ApiError::validation("Database integrity error")
        }
        _ => ApiError::Database(err),
    }
}

fn row_to_profile(row: &Row) -> rusqlite::Result<Profile> {
    let role: String = row.get(9)?;
    let created_at: String = row.get(11)?;
    Ok(Profile {
        uid: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        phone_number: row.get(4)?,
        dob: row
            .get::<_, Option<String>>(5)?
            .map(|d| d.parse())
            .transpose()
            .map_err(|e: chrono::ParseError| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
        qualification: row.get(6)?,
        address: row.get(7)?,
        bio: row.get(8)?,
        role: Role::from_str(&role).unwrap_or(Role::Teacher),
        profile_image: row.get(10)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    11,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;

    fn input(uid: &str, first_name: &str, email: &str) -> ProfileInput {
        ProfileInput {
            uid: Some(uid.into()),
            first_name: Some(first_name.into()),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[test]
    fn upsert_twice_keeps_one_row_with_latest_values() {
        let conn = test_connection();
        upsert_profile(&conn, input("u1", "Ada", "ada@example.com"), None).unwrap();
        upsert_profile(&conn, input("u1", "Adaline", "ada@example.com"), None).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM profiles", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        let profile = get_profile(&conn, "u1").unwrap();
        assert_eq!(profile.first_name, "Adaline");
    }

    #[test]
    fn partial_update_keeps_prior_values() {
        let conn = test_connection();
        let mut first = input("u1", "Ada", "ada@example.com");
        first.bio = Some("algebra teacher".into());
        upsert_profile(&conn, first, None).unwrap();

        upsert_profile(
            &conn,
            ProfileInput {
                uid: Some("u1".into()),
                qualification: Some("MSc".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap();

        let profile = get_profile(&conn, "u1").unwrap();
        assert_eq!(profile.bio.as_deref(), Some("algebra teacher"));
        assert_eq!(profile.qualification.as_deref(), Some("MSc"));
        assert_eq!(profile.first_name, "Ada");
    }

    #[test]
    fn create_requires_first_name_and_email() {
        let conn = test_connection();
        let err = upsert_profile(
            &conn,
            ProfileInput {
                uid: Some("u1".into()),
                first_name: Some("Ada".into()),
                ..Default::default()
            },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn missing_uid_is_rejected() {
        let conn = test_connection();
        let err = upsert_profile(&conn, ProfileInput::default(), None).unwrap_err();
        assert_eq!(err.to_string(), "UID is required");
    }

    #[test]
    fn role_defaults_to_teacher_and_parses_loosely() {
        let conn = test_connection();
        upsert_profile(&conn, input("u1", "Ada", "ada@example.com"), None).unwrap();
        assert_eq!(get_profile(&conn, "u1").unwrap().role, Role::Teacher);

        let mut admin = input("u2", "Grace", "grace@example.com");
        admin.role = Some("admin".into());
        upsert_profile(&conn, admin, None).unwrap();
        assert_eq!(get_profile(&conn, "u2").unwrap().role, Role::Admin);
    }

    #[test]
    fn duplicate_email_on_another_uid_is_an_integrity_error() {
        let conn = test_connection();
        upsert_profile(&conn, input("u1", "Ada", "shared@example.com"), None).unwrap();
        let err =
            upsert_profile(&conn, input("u2", "Grace", "shared@example.com"), None).unwrap_err();
        assert_eq!(err.to_string(), "Database integrity error");
    }

    #[test]
    fn unknown_profile_is_not_found() {
        let conn = test_connection();
        assert!(matches!(
            get_profile(&conn, "ghost"),
            Err(ApiError::NotFound("Profile"))
        ));
    }
}
