//! Role and ownership checks.
//!
//! Roles map to a fixed capability set. Ownership-scoped capabilities
//! (`*Own`) only apply when the actor owns the document in question.

use serde::{Deserialize, Serialize};

/// Closed set of roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
    /// The enrichment pipeline. Never accepted from request headers.
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
            Role::System => "System",
        }
    }

    /// Parse a role asserted by a caller. `System` is not assertable.
    pub fn from_external(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Parse any stored role name, including `System`.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Some(Role::System),
            other => Self::from_external(other),
        }
    }

    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Role::User => &[Upload, ViewOwn, EditOwn, DeleteOwn],
            Role::Manager => &[
                Upload,
                DelegateOwner,
                ViewAny,
                EditAny,
                DeleteAny,
                SearchAny,
                ReadAudit,
                ReadStats,
            ],
            Role::Admin => &[ViewAny, SearchAny, ReadAudit, ReadStats],
            Role::System => &[WriteEnrichment],
        }
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Upload,
    /// Upload on behalf of another owner.
    DelegateOwner,
    ViewOwn,
    ViewAny,
    EditOwn,
    EditAny,
    DeleteOwn,
    DeleteAny,
    /// Search across all owners. Without it, search is scoped to the actor.
    SearchAny,
    ReadAudit,
    /// Archive-wide dashboard counts.
    ReadStats,
    WriteEnrichment,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub department: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            department: None,
        }
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// The enrichment pipeline actor.
    pub fn system() -> Self {
        Self::new(crate::models::SYSTEM_ACTOR_ID, Role::System)
    }

    fn owns(&self, owner_id: &str) -> bool {
        self.id == owner_id
    }

    fn any_or_own(&self, any: Capability, own: Capability, owner_id: &str) -> bool {
        self.role.has(any) || (self.role.has(own) && self.owns(owner_id))
    }
}

/// Which documents a search may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchScope {
    All,
    OwnedBy(String),
}

pub fn can_add(actor: &Actor) -> bool {
    actor.role.has(Capability::Upload)
}

/// Whether `actor` may upload on behalf of `owner_id`.
pub fn can_delegate_owner(actor: &Actor, owner_id: &str) -> bool {
    actor.owns(owner_id) || actor.role.has(Capability::DelegateOwner)
}

/// View and download share one predicate.
pub fn can_view(actor: &Actor, owner_id: &str) -> bool {
    actor.any_or_own(Capability::ViewAny, Capability::ViewOwn, owner_id)
}

pub fn can_download(actor: &Actor, owner_id: &str) -> bool {
    can_view(actor, owner_id)
}

pub fn can_edit(actor: &Actor, owner_id: &str) -> bool {
    actor.any_or_own(Capability::EditAny, Capability::EditOwn, owner_id)
}

pub fn can_delete(actor: &Actor, owner_id: &str) -> bool {
    actor.any_or_own(Capability::DeleteAny, Capability::DeleteOwn, owner_id)
}

/// User-initiated metadata edits follow document edit rights.
pub fn can_edit_metadata(actor: &Actor, owner_id: &str) -> bool {
    can_edit(actor, owner_id)
}

pub fn can_view_metadata(actor: &Actor, owner_id: &str) -> bool {
    can_view(actor, owner_id)
}

pub fn can_write_enrichment(actor: &Actor) -> bool {
    actor.role.has(Capability::WriteEnrichment)
}

pub fn can_read_audit(actor: &Actor) -> bool {
    actor.role.has(Capability::ReadAudit)
}

pub fn can_read_stats(actor: &Actor) -> bool {
    actor.role.has(Capability::ReadStats)
}

pub fn search_scope(actor: &Actor) -> SearchScope {
    if actor.role.has(Capability::SearchAny) {
        SearchScope::All
    } else {
        SearchScope::OwnedBy(actor.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> Actor {
        Actor::new(id, Role::User)
    }

    #[test]
    fn test_upload_roles() {
        assert!(can_add(&user("u1")));
        assert!(can_add(&Actor::new("m1", Role::Manager)));
        assert!(!can_add(&Actor::new("a1", Role::Admin)));
        assert!(!can_add(&Actor::system()));
    }

    #[test]
    fn test_delegation() {
        assert!(can_delegate_owner(&user("u1"), "u1"));
        assert!(!can_delegate_owner(&user("u1"), "u2"));
        assert!(can_delegate_owner(&Actor::new("m1", Role::Manager), "u2"));
    }

    #[test]
    fn test_user_ownership_scoping() {
        let u = user("u1");
        assert!(can_view(&u, "u1"));
        assert!(can_edit(&u, "u1"));
        assert!(can_delete(&u, "u1"));
        assert!(!can_view(&u, "u2"));
        assert!(!can_edit(&u, "u2"));
        assert!(!can_delete(&u, "u2"));
        assert_eq!(search_scope(&u), SearchScope::OwnedBy("u1".to_string()));
    }

    #[test]
    fn test_admin_is_read_only() {
        let a = Actor::new("a1", Role::Admin);
        assert!(can_view(&a, "u1"));
        assert!(can_download(&a, "u1"));
        assert!(can_view_metadata(&a, "u1"));
        assert!(!can_edit_metadata(&a, "u1"));
        assert!(!can_edit(&a, "u1"));
        assert!(!can_delete(&a, "u1"));
        assert!(can_read_audit(&a));
        assert!(can_read_stats(&a));
        assert_eq!(search_scope(&a), SearchScope::All);
    }

    #[test]
    fn test_manager_edits_anything() {
        let m = Actor::new("m1", Role::Manager);
        assert!(can_edit_metadata(&m, "u9"));
        assert!(can_delete(&m, "u9"));
        assert!(can_read_audit(&m));
        assert!(!can_read_audit(&user("u1")));
        assert!(can_read_stats(&m));
        assert!(!can_read_stats(&user("u1")));
        assert!(!can_read_stats(&Actor::system()));
    }

    #[test]
    fn test_system_role_not_assertable() {
        assert_eq!(Role::from_external("system"), None);
        assert_eq!(Role::from_external(" MANAGER "), Some(Role::Manager));
        assert_eq!(Role::from_str("System"), Some(Role::System));
        assert!(can_write_enrichment(&Actor::system()));
        assert!(!can_write_enrichment(&Actor::new("m1", Role::Manager)));
    }
}
