//! Role domain model
//!
//! A role is a named node in the permission-inheritance graph. It holds its
//! own explicit permission overrides and refers to its parents by id, never
//! by ownership, so the graph may be stored flat and may even contain cycles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RbacResult;
use crate::permissions::{PermissionSet, PermissionState};

/// Stable role identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    /// Generate a fresh time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for RoleId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A named role with explicit permission overrides and parent roles.
///
/// Permissions set directly on a role always win over anything inherited.
/// Self references in the parent list are dropped on every write; longer
/// cycles are tolerated and cut during resolution.
///
/// # Examples
///
/// ```
/// use broadcaster_rbac::Role;
///
/// let mut admin = Role::new("admin", []);
/// admin.assign("manage").unwrap();
///
/// let editor = Role::new("editor", [admin.id]);
/// assert_eq!(editor.parents, vec![admin.id]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Role {
    /// Unique role ID
    pub id: RoleId,

    /// Unique role name
    pub name: String,

    /// Parent role IDs in declared (resolution) order
    #[serde(default)]
    pub parents: Vec<RoleId>,

    /// Explicit permission overrides on this role
    #[serde(default)]
    pub permissions: PermissionSet,

    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Creates a new role with a generated id and no permissions.
    pub fn new(name: impl Into<String>, parents: impl IntoIterator<Item = RoleId>) -> Self {
        Self::with_id(RoleId::new(), name, parents)
    }

    /// Creates a role with a known id, e.g. when rebuilding from storage.
    pub fn with_id(
        id: RoleId,
        name: impl Into<String>,
        parents: impl IntoIterator<Item = RoleId>,
    ) -> Self {
        let mut role = Self {
            id,
            name: name.into(),
            parents: Vec::new(),
            permissions: PermissionSet::new(),
            created_at: Utc::now(),
        };
        role.set_parents(parents);
        role
    }

    /// Replace the permission set, builder style.
    pub fn with_permissions(mut self, permissions: PermissionSet) -> Self {
        self.permissions = permissions;
        self
    }

    /// Get the role name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grant a permission on this role.
    pub fn assign(&mut self, perm: &str) -> RbacResult<()> {
        self.permissions.assign(perm)
    }

    /// Explicitly deny a permission on this role.
    pub fn revoke(&mut self, perm: &str) -> RbacResult<()> {
        self.permissions.revoke(perm)
    }

    /// Clear an explicit grant or denial on this role.
    pub fn remove(&mut self, perm: &str) -> RbacResult<()> {
        self.permissions.unset(perm)
    }

    /// Explicit state of `perm` on this role only.
    pub fn lookup(&self, perm: &str) -> PermissionState {
        self.permissions.lookup(perm)
    }

    /// Whether this role, ignoring its parents, explicitly denies `perm`.
    pub fn deny(&self, perm: &str) -> bool {
        self.permissions.deny(perm)
    }

    /// Append a parent. Self references and duplicates are ignored.
    pub fn add_parent(&mut self, parent: RoleId) {
        if parent != self.id && !self.parents.contains(&parent) {
            self.parents.push(parent);
        }
    }

    /// Drop a parent if present.
    ///
    /// # Returns
    ///
    /// `true` if the parent was listed
    pub fn remove_parent(&mut self, parent: RoleId) -> bool {
        let before = self.parents.len();
        self.parents.retain(|p| *p != parent);
        before != self.parents.len()
    }

    /// Replace the parent list, keeping declared order.
    pub fn set_parents(&mut self, parents: impl IntoIterator<Item = RoleId>) {
        self.parents.clear();
        for parent in parents {
            self.add_parent(parent);
        }
    }

    /// Check if `parent` is a direct parent of this role.
    pub fn has_parent(&self, parent: RoleId) -> bool {
        self.parents.contains(&parent)
    }

    /// Replace name, permissions and parents in one step.
    ///
    /// An empty `name` keeps the current one. Every entry in `grants` is
    /// assigned on a fresh permission set; the role is left untouched if any
    /// grant is invalid.
    pub fn update<S: AsRef<str>>(
        &mut self,
        name: &str,
        grants: &[S],
        parents: impl IntoIterator<Item = RoleId>,
    ) -> RbacResult<()> {
        let permissions = PermissionSet::from_grants(grants)?;
        if !name.is_empty() {
            self.name = name.to_string();
        }
        self.permissions = permissions;
        self.set_parents(parents);
        Ok(())
    }
}
