//! # Role graph and permission resolution
//!
//! Roles are stored flat in an arena keyed by [`RoleId`]. Parent links are
//! plain ids, so a graph can hold dangling references (a parent that was
//! deleted) and cycles longer than one hop. Resolution handles both: a
//! missing parent resolves to "not permitted", and every top-level query
//! carries its own visited set so a cycle ends the branch instead of
//! recursing forever.
//!
//! ```text
//! permit(role, perm):
//!   local Granted  -> true
//!   local Denied   -> false
//!   local Unset    -> OR over parents (declared order), each visited once
//! ```

use std::collections::{HashMap, HashSet, VecDeque};

use crate::permissions::PermissionState;
use crate::roles::{Role, RoleId};

/// Arena of roles indexed by id, with a secondary index by name.
///
/// # Example
///
/// ```
/// use broadcaster_rbac::{Role, RoleGraph};
///
/// let mut admin = Role::new("admin", []);
/// admin.assign("manage").unwrap();
/// let editor = Role::new("editor", [admin.id]);
///
/// let graph = RoleGraph::from_roles([admin, editor.clone()]);
/// assert!(graph.resolver().permit(&editor, "manage"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleGraph {
    roles: HashMap<RoleId, Role>,
    names: HashMap<String, RoleId>,
}

impl RoleGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a list of roles. Later roles replace earlier ones
    /// with the same id or the same name.
    pub fn from_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut graph = Self::new();
        for role in roles {
            graph.insert(role);
        }
        graph
    }

    /// Insert or replace a role.
    ///
    /// Names are unique: a different role already holding `role.name` is
    /// evicted. Parent links to the evicted id are left in place and resolve
    /// as dangling.
    ///
    /// # Returns
    ///
    /// The previous role stored under the same id, if any
    pub fn insert(&mut self, role: Role) -> Option<Role> {
        if let Some(holder) = self.names.get(&role.name).copied() {
            if holder != role.id {
                self.roles.remove(&holder);
            }
        }
        let previous = self.roles.remove(&role.id);
        if let Some(ref old) = previous {
            self.unindex(&old.name, old.id);
        }
        self.names.insert(role.name.clone(), role.id);
        self.roles.insert(role.id, role);
        previous
    }

    /// Remove a role and strip its id from every other role's parents.
    pub fn remove(&mut self, id: RoleId) -> Option<Role> {
        let removed = self.roles.remove(&id)?;
        self.unindex(&removed.name, id);
        for role in self.roles.values_mut() {
            role.remove_parent(id);
        }
        Some(removed)
    }

    fn unindex(&mut self, name: &str, id: RoleId) {
        if self.names.get(name) == Some(&id) {
            self.names.remove(name);
        }
    }

    /// Look up a role by id.
    pub fn get(&self, id: RoleId) -> Option<&Role> {
        self.roles.get(&id)
    }

    /// Look up a role by name.
    pub fn get_by_name(&self, name: &str) -> Option<&Role> {
        self.names.get(name).and_then(|id| self.roles.get(id))
    }

    /// Check if a role id is present.
    pub fn contains(&self, id: RoleId) -> bool {
        self.roles.contains_key(&id)
    }

    /// Iterate over all roles in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.roles.values()
    }

    /// Get the number of roles.
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Borrow a resolver over this graph.
    pub fn resolver(&self) -> PermissionResolver<'_> {
        PermissionResolver::new(self)
    }
}

impl FromIterator<Role> for RoleGraph {
    fn from_iter<T: IntoIterator<Item = Role>>(iter: T) -> Self {
        Self::from_roles(iter)
    }
}

/// Per-query visitation state for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    /// On the current resolution path.
    Visiting,
    /// Fully evaluated without granting.
    Done,
}

/// Computes effective permit/deny decisions over a [`RoleGraph`].
///
/// The resolver is a cheap borrow; create one per batch of queries.
#[derive(Debug, Clone, Copy)]
pub struct PermissionResolver<'g> {
    graph: &'g RoleGraph,
}

impl<'g> PermissionResolver<'g> {
    /// Create a resolver over `graph`.
    pub fn new(graph: &'g RoleGraph) -> Self {
        Self { graph }
    }

    /// Effective decision for `perm` on `role`.
    ///
    /// An explicit local grant or denial is returned as is. Otherwise the
    /// parents are consulted in declared order and the first one that
    /// permits wins. Parents missing from the graph and roles reached a
    /// second time through a cycle count as not permitting.
    ///
    /// `role` does not need to be stored in the graph; only its parents are
    /// looked up.
    pub fn permit(&self, role: &Role, perm: &str) -> bool {
        let mut visited = HashMap::new();
        self.permit_inner(role, perm, &mut visited)
    }

    /// Effective decision for the role stored under `id`.
    ///
    /// Unknown ids resolve to `false`.
    pub fn permit_id(&self, id: RoleId, perm: &str) -> bool {
        self.graph
            .get(id)
            .map(|role| self.permit(role, perm))
            .unwrap_or(false)
    }

    /// Whether `role` itself explicitly denies `perm`. Parents are ignored.
    pub fn deny(&self, role: &Role, perm: &str) -> bool {
        role.deny(perm)
    }

    fn permit_inner(&self, role: &Role, perm: &str, visited: &mut HashMap<RoleId, Visit>) -> bool {
        if visited.contains_key(&role.id) {
            return false;
        }

        match role.lookup(perm) {
            PermissionState::Granted => return true,
            PermissionState::Denied => return false,
            PermissionState::Unset => {}
        }

        visited.insert(role.id, Visit::Visiting);
        for parent_id in &role.parents {
            let Some(parent) = self.graph.get(*parent_id) else {
                continue;
            };
            if self.permit_inner(parent, perm, visited) {
                return true;
            }
        }
        visited.insert(role.id, Visit::Done);
        false
    }

    /// Ids of every role reachable through parent links from `role`,
    /// breadth first in declared order, excluding `role` itself.
    ///
    /// Dangling ids are skipped and each ancestor is reported once, so the
    /// walk terminates on cyclic graphs.
    pub fn ancestors(&self, role: &Role) -> Vec<RoleId> {
        let mut seen = HashSet::from([role.id]);
        let mut queue: VecDeque<RoleId> = role.parents.iter().copied().collect();
        let mut out = Vec::new();

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Some(parent) = self.graph.get(id) else {
                continue;
            };
            out.push(id);
            queue.extend(parent.parents.iter().copied());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role_with(name: &str, parents: &[RoleId], grants: &[&str], denials: &[&str]) -> Role {
        let mut role = Role::new(name, parents.iter().copied());
        for g in grants {
            role.assign(g).unwrap();
        }
        for d in denials {
            role.revoke(d).unwrap();
        }
        role
    }

    #[test]
    fn test_inherits_from_parent() {
        let admin = role_with("admin", &[], &["manage"], &[]);
        let editor = role_with("editor", &[admin.id], &[], &[]);
        let graph = RoleGraph::from_roles([admin, editor.clone()]);

        assert!(graph.resolver().permit(&editor, "manage"));
    }

    #[test]
    fn test_local_denial_wins_over_parent() {
        let admin = role_with("admin", &[], &["manage"], &[]);
        let editor = role_with("editor", &[admin.id], &[], &["manage"]);
        let graph = RoleGraph::from_roles([admin.clone(), editor.clone()]);
        let resolver = graph.resolver();

        assert!(!resolver.permit(&editor, "manage"));
        assert!(resolver.permit(&admin, "manage"));
    }

    #[test]
    fn test_local_grant_wins_over_parent_denial() {
        let base = role_with("base", &[], &[], &["upload"]);
        let uploader = role_with("uploader", &[base.id], &["upload"], &[]);
        let graph = RoleGraph::from_roles([base, uploader.clone()]);

        assert!(graph.resolver().permit(&uploader, "upload"));
    }

    #[test]
    fn test_or_across_parents() {
        let a = role_with("a", &[], &[], &["stream"]);
        let b = role_with("b", &[], &["stream"], &[]);
        let child = role_with("child", &[a.id, b.id], &[], &[]);
        let graph = RoleGraph::from_roles([a, b, child.clone()]);

        assert!(graph.resolver().permit(&child, "stream"));
    }

    #[test]
    fn test_grandparent_inheritance() {
        let root = role_with("root", &[], &["scan"], &[]);
        let mid = role_with("mid", &[root.id], &[], &[]);
        let leaf = role_with("leaf", &[mid.id], &[], &[]);
        let graph = RoleGraph::from_roles([root, mid, leaf.clone()]);

        assert!(graph.resolver().permit(&leaf, "scan"));
        assert!(!graph.resolver().permit(&leaf, "delete"));
    }

    #[test]
    fn test_intermediate_denial_blocks_grandparent() {
        let root = role_with("root", &[], &["scan"], &[]);
        let mid = role_with("mid", &[root.id], &[], &["scan"]);
        let leaf = role_with("leaf", &[mid.id], &[], &[]);
        let graph = RoleGraph::from_roles([root, mid, leaf.clone()]);

        assert!(!graph.resolver().permit(&leaf, "scan"));
    }

    #[test]
    fn test_dangling_parent_is_not_permitted() {
        let orphan = role_with("orphan", &[RoleId::new()], &[], &[]);
        let graph = RoleGraph::from_roles([orphan.clone()]);
        assert!(!graph.resolver().permit(&orphan, "anything"));
    }

    #[test]
    fn test_cycle_terminates() {
        let a_id = RoleId::new();
        let b_id = RoleId::new();
        let c_id = RoleId::new();
        let a = Role::with_id(a_id, "a", [b_id]);
        let b = Role::with_id(b_id, "b", [c_id]);
        let c = Role::with_id(c_id, "c", [a_id]);
        let graph = RoleGraph::from_roles([a.clone(), b, c]);

        assert!(!graph.resolver().permit(&a, "loop"));
    }

    #[test]
    fn test_cycle_still_finds_grant_on_other_branch() {
        let a_id = RoleId::new();
        let b_id = RoleId::new();
        let granting = role_with("granting", &[], &["play"], &[]);
        let a = Role::with_id(a_id, "a", [b_id, granting.id]);
        let b = Role::with_id(b_id, "b", [a_id]);
        let graph = RoleGraph::from_roles([a.clone(), b, granting]);

        assert!(graph.resolver().permit(&a, "play"));
    }

    #[test]
    fn test_diamond_visits_shared_ancestor_once() {
        let top = role_with("top", &[], &[], &[]);
        let left = role_with("left", &[top.id], &[], &[]);
        let right = role_with("right", &[top.id], &["edit"], &[]);
        let bottom = role_with("bottom", &[left.id, right.id], &[], &[]);
        let graph = RoleGraph::from_roles([top, left, right, bottom.clone()]);

        assert!(graph.resolver().permit(&bottom, "edit"));
    }

    #[test]
    fn test_deny_is_local_only() {
        let admin = role_with("admin", &[], &[], &["delete"]);
        let editor = role_with("editor", &[admin.id], &[], &[]);
        let graph = RoleGraph::from_roles([admin.clone(), editor.clone()]);
        let resolver = graph.resolver();

        assert!(resolver.deny(&admin, "delete"));
        assert!(!resolver.deny(&editor, "delete"));
    }

    #[test]
    fn test_permit_id_unknown() {
        let graph = RoleGraph::new();
        assert!(!graph.resolver().permit_id(RoleId::new(), "x"));
    }

    #[test]
    fn test_remove_strips_parent_links() {
        let admin = role_with("admin", &[], &["manage"], &[]);
        let editor = role_with("editor", &[admin.id], &[], &[]);
        let editor_id = editor.id;
        let mut graph = RoleGraph::from_roles([admin.clone(), editor]);

        assert!(graph.remove(admin.id).is_some());
        assert!(graph.get_by_name("admin").is_none());
        assert!(graph.get(editor_id).unwrap().parents.is_empty());
        assert!(!graph.resolver().permit_id(editor_id, "manage"));
    }

    #[test]
    fn test_insert_rename_updates_index() {
        let mut role = role_with("old", &[], &[], &[]);
        let mut graph = RoleGraph::from_roles([role.clone()]);

        role.name = "new".to_string();
        assert!(graph.insert(role).is_some());
        assert!(graph.get_by_name("old").is_none());
        assert!(graph.get_by_name("new").is_some());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_duplicate_name_evicts_earlier_role() {
        let first = role_with("a", &[], &["x"], &[]);
        let second = role_with("a", &[], &[], &[]);
        let mut graph = RoleGraph::from_roles([first.clone(), second.clone()]);

        assert_eq!(graph.len(), 1);
        assert!(!graph.contains(first.id));
        assert_eq!(graph.get_by_name("a").map(|r| r.id), Some(second.id));

        graph.remove(second.id);
        assert!(graph.is_empty());
        assert!(graph.get_by_name("a").is_none());
    }

    #[test]
    fn test_rename_into_taken_name_keeps_index_consistent() {
        let taken = role_with("shared", &[], &[], &[]);
        let mut mover = role_with("mover", &[taken.id], &[], &[]);
        let mut graph = RoleGraph::from_roles([taken.clone(), mover.clone()]);

        mover.name = "shared".to_string();
        assert!(graph.insert(mover.clone()).is_some());

        assert_eq!(graph.len(), 1);
        assert!(graph.get_by_name("mover").is_none());
        assert_eq!(graph.get_by_name("shared").map(|r| r.id), Some(mover.id));
        // The evicted parent is now dangling
        assert!(graph.resolver().ancestors(&mover).is_empty());
    }

    #[test]
    fn test_ancestors_breadth_first_and_cycle_safe() {
        let a_id = RoleId::new();
        let b_id = RoleId::new();
        let c_id = RoleId::new();
        let missing = RoleId::new();
        let a = Role::with_id(a_id, "a", [b_id, missing]);
        let b = Role::with_id(b_id, "b", [c_id]);
        let c = Role::with_id(c_id, "c", [a_id, b_id]);
        let graph = RoleGraph::from_roles([a.clone(), b, c]);

        assert_eq!(graph.resolver().ancestors(&a), vec![b_id, c_id]);
    }
}
