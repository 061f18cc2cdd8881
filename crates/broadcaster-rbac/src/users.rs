//! User domain model
//!
//! A user carries copies of the roles bound to it. The copies are taken when
//! the user is loaded, so permission queries are pure reads over a snapshot
//! and never touch storage. Inherited permissions are resolved through a
//! [`RoleGraph`] snapshot supplied by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

use crate::error::{RbacError, RbacResult};
use crate::graph::RoleGraph;
use crate::roles::{Role, RoleId};

/// Stable user identifier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a fresh time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// A library user and the roles bound to it.
///
/// # Examples
///
/// ```
/// use broadcaster_rbac::{Role, RoleGraph, User};
///
/// let mut dj = Role::new("dj", []);
/// dj.assign("stream.start").unwrap();
///
/// let mut user = User::new("alice").unwrap();
/// user.add_role(&dj);
///
/// let graph = RoleGraph::from_roles([dj]);
/// assert!(user.has_permit(&graph, "stream.start"));
/// assert!(!user.any_deny("stream.start"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user ID
    pub id: UserId,

    /// Unique login name
    pub username: String,

    /// Snapshot of bound roles, in binding order
    #[serde(default)]
    pub roles: Vec<Role>,

    /// When the user was created
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user with no roles.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `username` is empty.
    pub fn new(username: impl Into<String>) -> RbacResult<Self> {
        Self::with_id(UserId::new(), username)
    }

    /// Creates a user with a known id.
    pub fn with_id(id: UserId, username: impl Into<String>) -> RbacResult<Self> {
        let username = username.into();
        if username.is_empty() {
            return Err(RbacError::invalid("empty username"));
        }
        Ok(Self {
            id,
            username,
            roles: Vec::new(),
            created_at: Utc::now(),
        })
    }

    /// Bind a role unless one with the same name is already bound.
    ///
    /// # Returns
    ///
    /// `true` if the role was appended
    pub fn add_role(&mut self, role: &Role) -> bool {
        if self.roles.iter().any(|r| r.name == role.name) {
            return false;
        }
        self.roles.push(role.clone());
        true
    }

    /// Unbind the first role with the same name as `role`.
    ///
    /// # Returns
    ///
    /// `true` if a role was removed
    pub fn remove_role(&mut self, role: &Role) -> bool {
        match self.roles.iter().position(|r| r.name == role.name) {
            Some(pos) => {
                self.roles.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Replace every bound role, dropping later duplicates by name.
    pub fn set_roles(&mut self, roles: impl IntoIterator<Item = Role>) {
        self.roles.clear();
        for role in roles {
            self.add_role(&role);
        }
    }

    /// Check if a role with this name is bound.
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// Names of the bound roles, in binding order.
    pub fn role_names(&self) -> Vec<&str> {
        self.roles.iter().map(|r| r.name.as_str()).collect()
    }

    /// Ids of the bound roles, de-duplicated. This is the desired set handed
    /// to binding reconciliation.
    pub fn role_ids(&self) -> HashSet<RoleId> {
        self.roles.iter().map(|r| r.id).collect()
    }

    /// Whether any bound role effectively permits `perm`.
    pub fn has_permit(&self, graph: &RoleGraph, perm: &str) -> bool {
        let resolver = graph.resolver();
        self.roles.iter().any(|role| resolver.permit(role, perm))
    }

    /// Whether every bound role effectively permits `perm`.
    ///
    /// A user with no roles passes vacuously.
    pub fn all_permit(&self, graph: &RoleGraph, perm: &str) -> bool {
        let resolver = graph.resolver();
        self.roles.iter().all(|role| resolver.permit(role, perm))
    }

    /// Whether any bound role explicitly denies `perm` on itself.
    pub fn any_deny(&self, perm: &str) -> bool {
        self.roles.iter().any(|role| role.deny(perm))
    }
}
