//! In-memory store implementation
//!
//! Implements every persistence trait over maps guarded by a single lock.
//! It enforces the same uniqueness rules a relational backend would: unique
//! role names, unique usernames and a unique `(user, role)` binding pair.
//! Suitable for tests and single-process tools.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use broadcaster_rbac::{RbacError, RbacResult, Role, RoleGraph, RoleId, User, UserId};

use crate::config::MissingRolePolicy;
use crate::membership::UserRoleBinding;
use crate::store::{BindingStore, RoleRef, RoleStore, UserRef, UserStore};

#[derive(Debug, Default)]
struct Tables {
    roles: RoleGraph,
    users: HashMap<UserId, User>,
    bindings: BTreeSet<UserRoleBinding>,
}

/// In-memory role, user and binding store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    missing_role_policy: MissingRolePolicy,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("missing_role_policy", &self.missing_role_policy)
            .finish()
    }
}

impl MemoryStore {
    /// Create an empty store that omits unknown role names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with an explicit missing-role policy.
    pub fn with_policy(missing_role_policy: MissingRolePolicy) -> Self {
        Self {
            tables: Arc::default(),
            missing_role_policy,
        }
    }

    /// Every binding row currently stored, sorted.
    pub async fn bindings(&self) -> Vec<UserRoleBinding> {
        self.tables.read().await.bindings.iter().copied().collect()
    }

    /// Number of stored roles.
    pub async fn role_count(&self) -> usize {
        self.tables.read().await.roles.len()
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn load_role(&self, role: &RoleRef) -> RbacResult<Role> {
        let tables = self.tables.read().await;
        let found = match role {
            RoleRef::Id(id) => tables.roles.get(*id),
            RoleRef::Name(name) => tables.roles.get_by_name(name),
        };
        found
            .cloned()
            .ok_or_else(|| RbacError::not_found("role", role))
    }

    async fn load_roles_by_name(&self, names: &[String]) -> RbacResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            match tables.roles.get_by_name(name) {
                Some(role) => roles.push(role.clone()),
                None if self.missing_role_policy == MissingRolePolicy::Report => {
                    return Err(RbacError::not_found("role", name));
                }
                None => {}
            }
        }
        Ok(roles)
    }

    async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables.roles.iter().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn save_role(&self, role: &Role) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.roles.get_by_name(&role.name) {
            if existing.id != role.id {
                return Err(RbacError::invalid(format!(
                    "role name '{}' already exists",
                    role.name
                )));
            }
        }
        tables.roles.insert(role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        if tables.roles.remove(id).is_none() {
            return Err(RbacError::not_found("role", id));
        }
        tables.bindings.retain(|b| b.role_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn load_user(&self, user: &UserRef) -> RbacResult<User> {
        let tables = self.tables.read().await;
        let found = match user {
            UserRef::Id(id) => tables.users.get(id),
            UserRef::Name(name) => tables.users.values().find(|u| &u.username == name),
        };
        found
            .cloned()
            .ok_or_else(|| RbacError::not_found("user", user))
    }

    async fn save_user(&self, user: &User) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        let taken = tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id);
        if taken {
            return Err(RbacError::invalid(format!(
                "username '{}' already exists",
                user.username
            )));
        }

        let mut row = user.clone();
        row.roles.clear();
        tables.users.insert(row.id, row);
        Ok(())
    }

    async fn delete_user(&self, id: UserId) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        match tables.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(RbacError::not_found("user", id)),
        }
    }
}

#[async_trait]
impl BindingStore for MemoryStore {
    async fn load_user_bindings(&self, user_id: UserId) -> RbacResult<BTreeSet<RoleId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bindings
            .iter()
            .filter(|b| b.user_id == user_id)
            .map(|b| b.role_id)
            .collect())
    }

    async fn delete_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .bindings
            .retain(|b| b.user_id != user_id || !role_ids.contains(&b.role_id));
        Ok(())
    }

    async fn insert_bindings(&self, user_id: UserId, role_ids: &BTreeSet<RoleId>) -> RbacResult<()> {
        let mut tables = self.tables.write().await;
        let rows = UserRoleBinding::rows(user_id, role_ids.iter().copied());

        // The whole batch is rejected if any pair exists, like a unique index.
        if let Some(dup) = rows.iter().find(|row| tables.bindings.contains(row)) {
            return Err(RbacError::persistence(format!(
                "binding ({}, {}) already exists",
                dup.user_id, dup.role_id
            )));
        }
        tables.bindings.extend(rows);
        Ok(())
    }
}
