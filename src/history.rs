//! Version history log: an append-only sequence of content snapshots.
//!
//! Versions are assigned as `len + 1` at append time, so a well-formed log
//! numbers its entries exactly 1..len with no gaps. Rollback is itself a
//! forward append; the log is never truncated.

use crate::error::ApiError;
use crate::models::{HistoryEntry, VersionState};
use chrono::Utc;

/// Appends a snapshot and returns the version number it was assigned.
pub fn append(history: &mut Vec<HistoryEntry>, changes: impl Into<String>, state: VersionState) -> u32 {
    let version = history.len() as u32 + 1;
    history.push(HistoryEntry {
        version,
        date: Utc::now().date_naive(),
        changes: changes.into(),
        state,
    });
    version
}

/// First entry carrying the given version number, if any.
pub fn find(history: &[HistoryEntry], version: u32) -> Option<&HistoryEntry> {
    history.iter().find(|entry| entry.version == version)
}

/// Computes a rollback: appends a new max-version entry whose state is the
/// target version's state, and returns that state for the caller to apply
/// to the file's current fields.
pub fn apply_rollback(
    history: &mut Vec<HistoryEntry>,
    target_version: u32,
) -> Result<VersionState, ApiError> {
    let state = find(history, target_version)
        .map(|entry| entry.state.clone())
        .ok_or(ApiError::VersionNotFound)?;
    append(
        history,
        format!("Rolled back to version {target_version}"),
        state.clone(),
    );
    Ok(state)
}
