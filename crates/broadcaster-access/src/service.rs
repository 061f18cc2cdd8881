//! Access service
//!
//! Orchestrates role and user operations over the persistence traits. Every
//! user save or delete is followed by an explicit binding reconciliation,
//! so bindings never depend on storage-level lifecycle hooks.
//!
//! Errors from storage are logged and returned unchanged; nothing is retried.
//! Callers that need atomicity run each call inside their own transaction.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use broadcaster_rbac::{
    PermissionSet, RbacError, RbacResult, Role, RoleGraph, RoleId, User, UserId,
};

use crate::config::{AccessConfig, DanglingBindingPolicy, MissingRolePolicy};
use crate::reconcile::{AssociationReconciler, ChangeSet};
use crate::store::{BindingStore, RoleRef, RoleStore, UserRef, UserStore};

/// A single permission change on one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "permission", rename_all = "snake_case")]
pub enum RoleModification {
    /// Grant the permission.
    Assign(String),
    /// Clear an explicit grant or denial.
    Remove(String),
    /// Explicitly deny the permission.
    Revoke(String),
}

impl RoleModification {
    /// Apply this change to `role`.
    pub fn apply(&self, role: &mut Role) -> RbacResult<()> {
        match self {
            Self::Assign(perm) => role.assign(perm),
            Self::Remove(perm) => role.remove(perm),
            Self::Revoke(perm) => role.revoke(perm),
        }
    }
}

/// Human-readable summary of one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDescription {
    /// Role ID
    pub id: RoleId,
    /// Role name
    pub name: String,
    /// Names of direct parents that still exist
    pub parents: Vec<String>,
    /// Explicitly granted permissions
    pub granted: Vec<String>,
    /// Explicitly denied permissions
    pub denied: Vec<String>,
}

/// A user together with the role graph its permissions resolve against.
///
/// Built by [`AccessService::load_user`]. Queries are pure reads over the
/// snapshot taken at load time.
#[derive(Debug, Clone)]
pub struct UserAccess {
    /// The user and its bound role copies
    pub user: User,
    /// Bound roles and all of their ancestors
    pub graph: RoleGraph,
}

impl UserAccess {
    /// Whether any bound role effectively permits `perm`.
    pub fn has_permit(&self, perm: &str) -> bool {
        self.user.has_permit(&self.graph, perm)
    }

    /// Whether every bound role effectively permits `perm`.
    pub fn all_permit(&self, perm: &str) -> bool {
        self.user.all_permit(&self.graph, perm)
    }

    /// Whether any bound role explicitly denies `perm` on itself.
    pub fn any_deny(&self, perm: &str) -> bool {
        self.user.any_deny(perm)
    }
}

/// Role, user and binding operations over pluggable storage.
#[derive(Clone)]
pub struct AccessService {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
    bindings: Arc<dyn BindingStore>,
    reconciler: AssociationReconciler,
    config: AccessConfig,
}

impl std::fmt::Debug for AccessService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessService")
            .field("config", &self.config)
            .finish()
    }
}

impl AccessService {
    /// Create a service over separate stores.
    pub fn new(
        roles: Arc<dyn RoleStore>,
        users: Arc<dyn UserStore>,
        bindings: Arc<dyn BindingStore>,
        config: AccessConfig,
    ) -> Self {
        Self {
            roles,
            users,
            bindings,
            reconciler: AssociationReconciler::new(),
            config,
        }
    }

    /// Create a service over one backend that implements every store.
    pub fn with_store<S>(store: Arc<S>, config: AccessConfig) -> Self
    where
        S: RoleStore + UserStore + BindingStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config)
    }

    /// Active configuration.
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    // ---------------------------------------------------------------------
    // Roles
    // ---------------------------------------------------------------------

    /// Create a role granting `grants` under the named parents.
    ///
    /// Unknown parent names follow the configured missing-role policy.
    #[instrument(skip(self, grants, parent_names))]
    pub async fn create_role(
        &self,
        name: &str,
        grants: &[String],
        parent_names: &[String],
    ) -> RbacResult<Role> {
        if name.is_empty() {
            return Err(RbacError::invalid("empty role name"));
        }
        let permissions = PermissionSet::from_grants(grants)?;
        let parents = self.load_named_roles(parent_names).await?;

        let role = Role::new(name, parents.iter().map(|p| p.id)).with_permissions(permissions);
        self.persist_role(&role).await?;
        info!(role = %role.name, role_id = %role.id, "Created role");
        Ok(role)
    }

    /// Replace a role's name, grants and parents.
    ///
    /// An empty `name` keeps the current name.
    #[instrument(skip(self, grants, parent_names))]
    pub async fn update_role(
        &self,
        role: RoleRef,
        name: &str,
        grants: &[String],
        parent_names: &[String],
    ) -> RbacResult<Role> {
        let mut stored = self.roles.load_role(&role).await?;
        let parents = self.load_named_roles(parent_names).await?;

        stored.update(name, grants, parents.iter().map(|p| p.id))?;
        self.persist_role(&stored).await?;
        info!(role = %stored.name, role_id = %stored.id, "Updated role");
        Ok(stored)
    }

    /// Apply one permission change to a stored role.
    #[instrument(skip(self))]
    pub async fn modify_role(&self, role: RoleRef, change: RoleModification) -> RbacResult<Role> {
        let mut stored = self.roles.load_role(&role).await?;
        change.apply(&mut stored)?;
        self.persist_role(&stored).await?;
        debug!(role = %stored.name, ?change, "Modified role");
        Ok(stored)
    }

    /// Add a parent to a stored role.
    #[instrument(skip(self))]
    pub async fn add_parent(&self, role: RoleRef, parent: RoleRef) -> RbacResult<Role> {
        let mut stored = self.roles.load_role(&role).await?;
        let parent = self.roles.load_role(&parent).await?;
        stored.add_parent(parent.id);
        self.persist_role(&stored).await?;
        Ok(stored)
    }

    /// Drop a parent from a stored role. A parent that is not listed is a
    /// no-op.
    #[instrument(skip(self))]
    pub async fn remove_parent(&self, role: RoleRef, parent: RoleRef) -> RbacResult<Role> {
        let mut stored = self.roles.load_role(&role).await?;
        let parent = self.roles.load_role(&parent).await?;
        if stored.remove_parent(parent.id) {
            self.persist_role(&stored).await?;
        }
        Ok(stored)
    }

    /// Delete a role. The store drops it from other roles' parents and from
    /// every binding.
    #[instrument(skip(self))]
    pub async fn delete_role(&self, role: RoleRef) -> RbacResult<()> {
        let stored = self.roles.load_role(&role).await?;
        self.roles.delete_role(stored.id).await.map_err(|e| {
            warn!(role = %stored.name, error = %e, "Failed to delete role");
            e
        })?;
        info!(role = %stored.name, role_id = %stored.id, "Deleted role");
        Ok(())
    }

    /// Summarise a stored role.
    pub async fn describe_role(&self, role: RoleRef) -> RbacResult<RoleDescription> {
        let stored = self.roles.load_role(&role).await?;

        let mut parents = Vec::with_capacity(stored.parents.len());
        for parent_id in &stored.parents {
            match self.roles.load_role(&RoleRef::Id(*parent_id)).await {
                Ok(parent) => parents.push(parent.name),
                Err(RbacError::NotFound { .. }) => {
                    debug!(role = %stored.name, parent_id = %parent_id, "Skipping dangling parent");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(RoleDescription {
            id: stored.id,
            name: stored.name.clone(),
            parents,
            granted: stored.permissions.granted().map(str::to_string).collect(),
            denied: stored.permissions.denied().map(str::to_string).collect(),
        })
    }

    /// Every stored role, sorted by name.
    pub async fn list_roles(&self) -> RbacResult<Vec<Role>> {
        self.roles.list_roles().await
    }

    /// Load roles by name, applying the configured missing-role policy on
    /// top of whatever the store returned.
    async fn load_named_roles(&self, names: &[String]) -> RbacResult<Vec<Role>> {
        let roles = self.roles.load_roles_by_name(names).await?;
        if self.config.missing_role_policy == MissingRolePolicy::Report {
            if let Some(missing) = names.iter().find(|n| !roles.iter().any(|r| &r.name == *n)) {
                return Err(RbacError::not_found("role", missing));
            }
        }
        Ok(roles)
    }

    async fn persist_role(&self, role: &Role) -> RbacResult<()> {
        self.roles.save_role(role).await.map_err(|e| {
            warn!(role = %role.name, error = %e, "Failed to save role");
            e
        })
    }

    // ---------------------------------------------------------------------
    // Users
    // ---------------------------------------------------------------------

    /// Create a user bound to the named roles.
    #[instrument(skip(self, role_names))]
    pub async fn create_user(&self, username: &str, role_names: &[String]) -> RbacResult<User> {
        let mut user = User::new(username)?;
        let roles = self.load_named_roles(role_names).await?;
        user.set_roles(roles);

        self.save_user(&user).await?;
        info!(user = %user.username, user_id = %user.id, "Created user");
        Ok(user)
    }

    /// Load a user with its bound roles and the graph they resolve against.
    ///
    /// Bindings are an unordered set, so `user.roles` comes back sorted by
    /// role id, which for v7 ids is role creation order.
    #[instrument(skip(self))]
    pub async fn load_user(&self, user: UserRef) -> RbacResult<UserAccess> {
        let mut loaded = self.users.load_user(&user).await?;
        let bound = self.bindings.load_user_bindings(loaded.id).await?;

        let mut graph = RoleGraph::new();
        let mut roles = Vec::with_capacity(bound.len());
        for role_id in bound {
            match self.roles.load_role(&RoleRef::Id(role_id)).await {
                Ok(role) => roles.push(role),
                Err(RbacError::NotFound { .. })
                    if self.config.dangling_bindings == DanglingBindingPolicy::Skip =>
                {
                    warn!(user_id = %loaded.id, role_id = %role_id, "Skipping binding to missing role");
                }
                Err(e) => return Err(e),
            }
        }

        for role in &roles {
            self.collect_ancestry(role, &mut graph).await?;
        }
        loaded.set_roles(roles);

        Ok(UserAccess {
            user: loaded,
            graph,
        })
    }

    /// Insert the role and every reachable ancestor into `graph`.
    ///
    /// Roles already present are not revisited, so cyclic parent links
    /// terminate. Missing parents are left out and resolve as not permitted.
    async fn collect_ancestry(&self, role: &Role, graph: &mut RoleGraph) -> RbacResult<()> {
        if graph.contains(role.id) {
            return Ok(());
        }
        graph.insert(role.clone());

        let mut pending: Vec<RoleId> = role.parents.clone();
        while let Some(id) = pending.pop() {
            if graph.contains(id) {
                continue;
            }
            match self.roles.load_role(&RoleRef::Id(id)).await {
                Ok(parent) => {
                    pending.extend(parent.parents.iter().copied());
                    graph.insert(parent);
                }
                Err(RbacError::NotFound { .. }) => {
                    debug!(role_id = %id, "Parent role missing from store");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Save the user row, then reconcile its bindings with `user.roles`.
    ///
    /// # Returns
    ///
    /// The binding changes that were applied
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn save_user(&self, user: &User) -> RbacResult<ChangeSet> {
        self.users.save_user(user).await.map_err(|e| {
            warn!(user = %user.username, error = %e, "Failed to save user");
            e
        })?;
        self.sync_bindings(user.id, user.role_ids()).await
    }

    /// Delete the user row, then remove all of its bindings.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, user: UserRef) -> RbacResult<ChangeSet> {
        let stored = self.users.load_user(&user).await?;
        self.users.delete_user(stored.id).await.map_err(|e| {
            warn!(user = %stored.username, error = %e, "Failed to delete user");
            e
        })?;

        let changes = self
            .reconciler
            .purge(self.bindings.as_ref(), stored.id)
            .await
            .map_err(|e| {
                warn!(user_id = %stored.id, error = %e, "Failed to remove bindings of deleted user");
                e
            })?;
        info!(user = %stored.username, removed = changes.to_delete.len(), "Deleted user");
        Ok(changes)
    }

    /// Bind a stored role to a stored user. Already bound roles are a no-op.
    #[instrument(skip(self))]
    pub async fn add_role_to_user(&self, user: UserRef, role: RoleRef) -> RbacResult<UserAccess> {
        let mut access = self.load_user(user).await?;
        let role = self.roles.load_role(&role).await?;
        if access.user.add_role(&role) {
            self.save_user(&access.user).await?;
            self.collect_ancestry(&role, &mut access.graph).await?;
        }
        Ok(access)
    }

    /// Unbind a role from a stored user. Unbound roles are a no-op.
    #[instrument(skip(self))]
    pub async fn remove_role_from_user(
        &self,
        user: UserRef,
        role: RoleRef,
    ) -> RbacResult<UserAccess> {
        let mut access = self.load_user(user).await?;
        let role = self.roles.load_role(&role).await?;
        if access.user.remove_role(&role) {
            self.save_user(&access.user).await?;
        }
        Ok(access)
    }

    async fn sync_bindings(
        &self,
        user_id: UserId,
        desired: impl IntoIterator<Item = RoleId> + Send,
    ) -> RbacResult<ChangeSet> {
        let changes = self
            .reconciler
            .sync(self.bindings.as_ref(), user_id, desired)
            .await
            .map_err(|e| {
                warn!(user_id = %user_id, error = %e, "Failed to reconcile role bindings");
                e
            })?;

        if !changes.is_empty() {
            debug!(
                user_id = %user_id,
                removed = changes.to_delete.len(),
                added = changes.to_insert.len(),
                "Reconciled role bindings"
            );
        }
        Ok(changes)
    }
}
