//! Permission model: pure lookups against a file's role capability map.
//!
//! There is no Admin special case here. Callers that grant
//! Admin unconditional access (file deletion, listing) check the role
//! themselves before consulting the map; write, share and
//! permission-replacement paths rely on the map alone.

use crate::models::{Actor, Capability, FileAccess, PermissionSet, Role};

/// Default grants applied to every newly created file.
pub fn default_permissions() -> PermissionSet {
    PermissionSet::from([
        (
            Role::Admin,
            Capability {
                read: true,
                write: true,
                delete: true,
            },
        ),
        (
            Role::Teacher,
            Capability {
                read: true,
                write: true,
                delete: false,
            },
        ),
        (
            Role::Student,
            Capability {
                read: true,
                write: false,
                delete: false,
            },
        ),
    ])
}

/// A role absent from the map holds no grants.
pub fn can(role: Role, action: FileAccess, permissions: &PermissionSet) -> bool {
    let cap = match permissions.get(&role) {
        Some(cap) => cap,
        None => return false,
    };
    match action {
        FileAccess::Read => cap.read,
        FileAccess::Write => cap.write,
        FileAccess::Delete => cap.delete,
    }
}

/// An actor whose declared role string did not parse holds no grants either.
pub fn actor_can(actor: &Actor, action: FileAccess, permissions: &PermissionSet) -> bool {
    match actor.role {
        Some(role) => can(role, action, permissions),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_grant_table() {
        let perms = default_permissions();
        assert!(can(Role::Admin, FileAccess::Delete, &perms));
        assert!(can(Role::Teacher, FileAccess::Write, &perms));
        assert!(!can(Role::Teacher, FileAccess::Delete, &perms));
        assert!(can(Role::Student, FileAccess::Read, &perms));
        assert!(!can(Role::Student, FileAccess::Write, &perms));
    }

    #[test]
    fn missing_role_evaluates_false() {
        let mut perms = default_permissions();
        perms.remove(&Role::Student);
        assert!(!can(Role::Student, FileAccess::Read, &perms));
    }

    #[test]
    fn admin_gets_no_implicit_bypass_here() {
        let mut perms = default_permissions();
        perms.insert(Role::Admin, Capability::default());
        assert!(!can(Role::Admin, FileAccess::Read, &perms));
        assert!(!can(Role::Admin, FileAccess::Write, &perms));
        assert!(!can(Role::Admin, FileAccess::Delete, &perms));
    }

    #[test]
    fn unparsed_actor_role_holds_no_grants() {
        let perms = default_permissions();
        let actor = Actor::new("Guest");
        assert!(!actor_can(&actor, FileAccess::Read, &perms));
    }
}
