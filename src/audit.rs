//! Audit log: append-only action records per file. Entries are ordered by
//! append; wall-clock ties between adjacent entries are allowed.

use crate::models::{Actor, AuditEntry};
use chrono::Utc;

pub fn record(log: &mut Vec<AuditEntry>, actor: &Actor, action: impl Into<String>) {
    log.push(AuditEntry {
        timestamp: Utc::now(),
        user: actor.name.clone(),
        action: action.into(),
        changed_fields: None,
    });
}

pub fn record_edit(log: &mut Vec<AuditEntry>, actor: &Actor, changed_fields: Vec<String>) {
    log.push(AuditEntry {
        timestamp: Utc::now(),
        user: actor.name.clone(),
        action: "edited".into(),
        changed_fields: Some(changed_fields),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_append_in_order() {
        let actor = Actor::new("Teacher");
        let mut log = Vec::new();
        record(&mut log, &actor, "uploaded");
        record(&mut log, &actor, "generated share link");
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].action, "uploaded");
        assert_eq!(log[1].action, "generated share link");
        assert!(log[0].timestamp <= log[1].timestamp);
        assert_eq!(log[0].user, "Teacher");
    }

    #[test]
    fn edit_entries_carry_changed_fields() {
        let actor = Actor::new("Admin");
        let mut log = Vec::new();
        record_edit(&mut log, &actor, vec!["name".into(), "content".into()]);
        record_edit(&mut log, &actor, vec!["permissions".into()]);
        assert_eq!(
            log[0].changed_fields.as_deref(),
            Some(&["name".to_string(), "content".to_string()][..])
        );
        assert_eq!(
            log[1].changed_fields.as_deref(),
            Some(&["permissions".to_string()][..])
        );
    }

    #[test]
    fn plain_entries_omit_changed_fields_on_the_wire() {
        let actor = Actor::new("Student");
        let mut log = Vec::new();
        record(&mut log, &actor, "accessed share link abc");
        let json = serde_json::to_value(&log[0]).unwrap();
        assert!(json.get("changed_fields").is_none());
        assert_eq!(json["user"], "Student");
    }
}
