//! Binding reconciliation
//!
//! Brings a user's persisted role bindings in line with the role set held in
//! memory. The diff is a pure set difference; applying it issues at most one
//! bulk delete followed by at most one bulk insert.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use broadcaster_rbac::{RbacResult, RoleId, UserId};

use crate::store::BindingStore;

/// The minimal set of binding changes for one user.
///
/// Both sets are disjoint and sorted, so applying them is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Persisted role ids that are no longer desired.
    pub to_delete: BTreeSet<RoleId>,

    /// Desired role ids that are not yet persisted.
    pub to_insert: BTreeSet<RoleId>,
}

impl ChangeSet {
    /// Whether applying this change set would touch storage at all.
    pub fn is_empty(&self) -> bool {
        self.to_delete.is_empty() && self.to_insert.is_empty()
    }

    /// Total number of binding rows affected.
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_insert.len()
    }
}

/// Computes and applies binding change sets.
///
/// # Examples
///
/// ```
/// use broadcaster_access::AssociationReconciler;
/// use broadcaster_rbac::RoleId;
///
/// let (a, b, c) = (RoleId::new(), RoleId::new(), RoleId::new());
/// let changes = AssociationReconciler::new().reconcile([b, c], [a, b]);
///
/// assert!(changes.to_delete.contains(&a));
/// assert!(changes.to_insert.contains(&c));
/// assert_eq!(changes.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationReconciler;

impl AssociationReconciler {
    /// Create a reconciler.
    pub fn new() -> Self {
        Self
    }

    /// Diff the desired role ids against the persisted ones.
    ///
    /// Input order and duplicates do not affect the result.
    pub fn reconcile(
        &self,
        desired: impl IntoIterator<Item = RoleId>,
        persisted: impl IntoIterator<Item = RoleId>,
    ) -> ChangeSet {
        let desired: HashSet<RoleId> = desired.into_iter().collect();
        let persisted: HashSet<RoleId> = persisted.into_iter().collect();

        ChangeSet {
            to_delete: persisted.difference(&desired).copied().collect(),
            to_insert: desired.difference(&persisted).copied().collect(),
        }
    }

    /// Change set that removes every persisted binding, used when the user
    /// itself is deleted.
    pub fn cascade(&self, persisted: impl IntoIterator<Item = RoleId>) -> ChangeSet {
        ChangeSet {
            to_delete: persisted.into_iter().collect(),
            to_insert: BTreeSet::new(),
        }
    }

    /// Apply a change set for `user_id`.
    ///
    /// Deletes go first. Storage errors are returned unchanged and are not
    /// retried.
    pub async fn apply(
        &self,
        store: &dyn BindingStore,
        user_id: UserId,
        changes: &ChangeSet,
    ) -> RbacResult<()> {
        if changes.is_empty() {
            return Ok(());
        }
        store
            .apply_binding_changes(user_id, &changes.to_delete, &changes.to_insert)
            .await
    }

    /// Load the persisted bindings for `user_id`, diff them against
    /// `desired`, and apply the result.
    ///
    /// # Returns
    ///
    /// The change set that was applied
    pub async fn sync(
        &self,
        store: &dyn BindingStore,
        user_id: UserId,
        desired: impl IntoIterator<Item = RoleId> + Send,
    ) -> RbacResult<ChangeSet> {
        let persisted = store.load_user_bindings(user_id).await?;
        let changes = self.reconcile(desired, persisted);
        self.apply(store, user_id, &changes).await?;
        Ok(changes)
    }

    /// Remove every binding of `user_id`.
    ///
    /// # Returns
    ///
    /// The change set that was applied
    pub async fn purge(&self, store: &dyn BindingStore, user_id: UserId) -> RbacResult<ChangeSet> {
        let persisted = store.load_user_bindings(user_id).await?;
        let changes = self.cascade(persisted);
        self.apply(store, user_id, &changes).await?;
        Ok(changes)
    }
}
