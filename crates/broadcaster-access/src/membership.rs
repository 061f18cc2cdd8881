//! Binding domain model
//!
//! A binding is one row of the user ↔ role association. It has no identity
//! beyond the pair and is only created or removed by binding reconciliation.

use serde::{Deserialize, Serialize};

use broadcaster_rbac::{RoleId, UserId};

/// Persisted association linking one user to one role.
///
/// # Examples
///
/// ```
/// use broadcaster_access::UserRoleBinding;
/// use broadcaster_rbac::{RoleId, UserId};
///
/// let user_id = UserId::new();
/// let role_id = RoleId::new();
/// let binding = UserRoleBinding::new(user_id, role_id);
/// assert_eq!(binding.role_id, role_id);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserRoleBinding {
    /// User ID
    pub user_id: UserId,

    /// Role ID
    pub role_id: RoleId,
}

impl UserRoleBinding {
    /// Creates a binding row for the pair.
    pub fn new(user_id: UserId, role_id: RoleId) -> Self {
        Self { user_id, role_id }
    }

    /// Rows for binding `user_id` to each of `role_ids`.
    pub fn rows(user_id: UserId, role_ids: impl IntoIterator<Item = RoleId>) -> Vec<Self> {
        role_ids
            .into_iter()
            .map(|role_id| Self::new(user_id, role_id))
            .collect()
    }
}
