//! # Permissions
//!
//! Tri-state permission storage for a single role.
//! A permission is a plain capability name such as `"library.scan"`.
//! Each role either grants it, denies it, or leaves it unset so that the
//! decision falls through to the role's parents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RbacError, RbacResult};

/// Explicit state of one permission on one role.
///
/// # Example
///
/// ```
/// use broadcaster_rbac::PermissionState;
///
/// assert_eq!(PermissionState::Granted.value(), Some(true));
/// assert_eq!(PermissionState::Denied.value(), Some(false));
/// assert_eq!(PermissionState::Unset.value(), None);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Explicitly assigned on this role.
    Granted,

    /// Explicitly revoked on this role.
    Denied,

    /// Not mentioned on this role; inherit from parents.
    #[default]
    Unset,
}

impl PermissionState {
    /// The explicit boolean value, or `None` when unset.
    pub fn value(&self) -> Option<bool> {
        match self {
            Self::Granted => Some(true),
            Self::Denied => Some(false),
            Self::Unset => None,
        }
    }

    /// Whether the permission was explicitly set (granted or denied).
    pub fn is_set(&self) -> bool {
        !matches!(self, Self::Unset)
    }

    /// Get string representation of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Unset => "unset",
        }
    }
}

impl From<bool> for PermissionState {
    fn from(value: bool) -> Self {
        if value {
            Self::Granted
        } else {
            Self::Denied
        }
    }
}

/// Reject empty permission names before any mutation.
pub(crate) fn validate_permission(perm: &str) -> RbacResult<()> {
    if perm.is_empty() {
        return Err(RbacError::invalid("empty permission"));
    }
    Ok(())
}

/// The explicit permission overrides held by one role.
///
/// Only granted and denied entries are stored. A name is present if and only
/// if it was explicitly assigned or revoked on this exact role; removing it
/// returns the permission to the inherited state.
///
/// # Example
///
/// ```
/// use broadcaster_rbac::{PermissionSet, PermissionState};
///
/// let mut set = PermissionSet::new();
/// set.assign("library.scan").unwrap();
/// set.revoke("library.delete").unwrap();
///
/// assert_eq!(set.lookup("library.scan"), PermissionState::Granted);
/// assert_eq!(set.lookup("library.delete"), PermissionState::Denied);
/// assert_eq!(set.lookup("library.rename"), PermissionState::Unset);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    entries: BTreeMap<String, bool>,
}

impl PermissionSet {
    /// Create a new empty permission set.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a set that grants every name in `grants`.
    ///
    /// Fails on the first empty name.
    pub fn from_grants<I, S>(grants: I) -> RbacResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for perm in grants {
            set.assign(perm.as_ref())?;
        }
        Ok(set)
    }

    /// Grant a permission.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `perm` is empty.
    pub fn assign(&mut self, perm: &str) -> RbacResult<()> {
        validate_permission(perm)?;
        self.entries.insert(perm.to_string(), true);
        Ok(())
    }

    /// Explicitly deny a permission.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `perm` is empty.
    pub fn revoke(&mut self, perm: &str) -> RbacResult<()> {
        validate_permission(perm)?;
        self.entries.insert(perm.to_string(), false);
        Ok(())
    }

    /// Clear an explicit grant or denial so the permission is inherited again.
    ///
    /// Callers that want an idempotent clear should ignore
    /// [`RbacError::NotAssigned`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if `perm` is empty, `NotAssigned` if it was never set.
    pub fn unset(&mut self, perm: &str) -> RbacResult<()> {
        validate_permission(perm)?;
        match self.entries.remove(perm) {
            Some(_) => Ok(()),
            None => Err(RbacError::NotAssigned(perm.to_string())),
        }
    }

    /// Read the explicit state of a permission.
    pub fn lookup(&self, perm: &str) -> PermissionState {
        self.entries
            .get(perm)
            .map(|granted| PermissionState::from(*granted))
            .unwrap_or_default()
    }

    /// Whether this set explicitly grants `perm`.
    pub fn permit(&self, perm: &str) -> bool {
        self.lookup(perm) == PermissionState::Granted
    }

    /// Whether this set explicitly denies `perm`.
    pub fn deny(&self, perm: &str) -> bool {
        self.lookup(perm) == PermissionState::Denied
    }

    /// Names explicitly granted, in sorted order.
    pub fn granted(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, granted)| **granted)
            .map(|(name, _)| name.as_str())
    }

    /// Names explicitly denied, in sorted order.
    pub fn denied(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, granted)| !**granted)
            .map(|(name, _)| name.as_str())
    }

    /// Iterate every explicit entry with its state.
    pub fn iter(&self) -> impl Iterator<Item = (&str, PermissionState)> {
        self.entries
            .iter()
            .map(|(name, granted)| (name.as_str(), PermissionState::from(*granted)))
    }

    /// Get the count of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all explicit entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
