//! Persistence contract
//!
//! These traits are the only boundary between the access model and storage.
//! Implementations own transactional isolation; the access layer only
//! requires that binding deletes for a user land before binding inserts for
//! the same user within one reconciliation.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt;

use broadcaster_rbac::{RbacResult, Role, RoleId, User, UserId};

/// Reference to a role by id or by unique name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoleRef {
    /// Look up by id.
    Id(RoleId),
    /// Look up by name.
    Name(String),
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleRef::Id(id) => write!(f, "{}", id),
            RoleRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<RoleId> for RoleRef {
    fn from(id: RoleId) -> Self {
        RoleRef::Id(id)
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        RoleRef::Name(name.to_string())
    }
}

impl From<String> for RoleRef {
    fn from(name: String) -> Self {
        RoleRef::Name(name)
    }
}

/// Reference to a user by id or by unique username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRef {
    /// Look up by id.
    Id(UserId),
    /// Look up by username.
    Name(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRef::Id(id) => write!(f, "{}", id),
            UserRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        UserRef::Id(id)
    }
}

impl From<&str> for UserRef {
    fn from(name: &str) -> Self {
        UserRef::Name(name.to_string())
    }
}

impl From<String> for UserRef {
    fn from(name: String) -> Self {
        UserRef::Name(name)
    }
}

/// Role storage.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Load one role.
    ///
    /// Fails with `NotFound` if no role matches.
    async fn load_role(&self, role: &RoleRef) -> RbacResult<Role>;

    /// Load the roles with the given names.
    ///
    /// Whether unknown names are skipped or reported as `NotFound` is up to
    /// the implementation.
    async fn load_roles_by_name(&self, names: &[String]) -> RbacResult<Vec<Role>>;

    /// Load every stored role.
    async fn list_roles(&self) -> RbacResult<Vec<Role>>;

    /// Insert or update a role. Role names are unique.
    async fn save_role(&self, role: &Role) -> RbacResult<()>;

    /// Delete a role, dropping it from other roles' parents and from every
    /// binding.
    async fn delete_role(&self, id: RoleId) -> RbacResult<()>;
}

/// User row storage. Bound roles are not part of the row.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Load a user row. The returned user has no roles attached.
    async fn load_user(&self, user: &UserRef) -> RbacResult<User>;

    /// Insert or update a user row. Usernames are unique.
    async fn save_user(&self, user: &User) -> RbacResult<()>;

    /// Delete a user row. Bindings are handled by reconciliation.
    async fn delete_user(&self, id: UserId) -> RbacResult<()>;
}

/// User ↔ role binding storage.
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// Role ids currently bound to `user_id`.
    async fn load_user_bindings(&self, user_id: UserId) -> RbacResult<BTreeSet<RoleId>>;

    /// Remove the bindings of `user_id` to each of `role_ids` in one request.
    async fn delete_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()>;

    /// Add bindings of `user_id` to each of `role_ids` in one request.
    async fn insert_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()>;

    /// Apply one reconciliation: a bulk delete, then a bulk insert.
    ///
    /// Empty sets skip their request entirely. The first failure is returned
    /// as is and nothing further is attempted.
    async fn apply_binding_changes(
        &self,
        user_id: UserId,
        to_delete: &BTreeSet<RoleId>,
        to_insert: &BTreeSet<RoleId>,
    ) -> RbacResult<()> {
        if !to_delete.is_empty() {
            self.delete_bindings(user_id, to_delete).await?;
        }
        if !to_insert.is_empty() {
            self.insert_bindings(user_id, to_insert).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ref_conversions() {
        let id = RoleId::new();
        assert_eq!(RoleRef::from(id), RoleRef::Id(id));
        assert_eq!(RoleRef::from("admin"), RoleRef::Name("admin".to_string()));
        assert_eq!(RoleRef::from("admin").to_string(), "admin");
    }

    #[test]
    fn test_user_ref_conversions() {
        let id = UserId::new();
        assert_eq!(UserRef::from(id).to_string(), id.to_string());
        assert_eq!(
            UserRef::from(String::from("alice")),
            UserRef::Name("alice".to_string())
        );
    }
}
